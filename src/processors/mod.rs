pub mod aggregator;
pub mod cleaner;
pub mod pipeline;
pub mod station_ranker;
pub mod time_series;

pub use aggregator::Aggregator;
pub use cleaner::{Cleaner, CleaningPolicy, CleaningReport, FieldCorrections};
pub use pipeline::{AnalysisPipeline, AnalysisReport, FieldRanking};
pub use station_ranker::{DailyExceedance, RankOrder, StationRank, StationRanker};
pub use time_series::{SeriesPoint, TimeSeriesExtractor, TimeWindow};
