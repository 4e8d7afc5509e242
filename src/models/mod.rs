pub mod field;
pub mod reading;
pub mod record_store;
pub mod stats;

pub use field::Field;
pub use reading::{ParsedRow, ParsedValue, RawReading, Reading, RowRejection};
pub use record_store::{IngestReport, RecordStore};
pub use stats::{AggregateStats, ColumnStats, CorrelationMatrix, GroupBy, GroupKey};
