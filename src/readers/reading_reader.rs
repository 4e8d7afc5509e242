use crate::error::Result;
use crate::models::{RawReading, RecordStore};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Reads the sensor CSV export into raw rows and typed readings
pub struct ReadingReader {
    delimiter: u8,
}

impl ReadingReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Raw string rows; columns are matched by header name and absent
    /// columns read as empty text. Invalid UTF-8 is decoded lossily so a bad
    /// cell surfaces as a malformed value instead of failing the file.
    pub fn read_raw<R: Read>(&self, source: R) -> Result<Vec<RawReading>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers = StringRecord::from_byte_record_lossy(reader.byte_headers()?.clone());

        let mut rows = Vec::new();
        for result in reader.byte_records() {
            let record = StringRecord::from_byte_record_lossy(result?);
            let row: RawReading = record.deserialize(Some(&headers))?;
            rows.push(row);
        }

        Ok(rows)
    }

    pub fn read_store<R: Read>(&self, source: R) -> Result<RecordStore> {
        let rows = self.read_raw(source)?;
        let store = RecordStore::from_raw(&rows);

        let ingest = store.ingest_report();
        info!(
            "Ingested {} of {} rows ({} stations)",
            ingest.accepted_rows,
            ingest.total_rows,
            store.stations().len()
        );
        if ingest.dropped_rows() > 0 {
            warn!(
                "Dropped {} rows: {} without station id, {} with unparseable timestamp",
                ingest.dropped_rows(),
                ingest.empty_station_rows,
                ingest.bad_timestamp_rows
            );
        }
        if ingest.total_malformed() > 0 {
            warn!("{} malformed values recovered as missing", ingest.total_malformed());
        }

        Ok(store)
    }

    /// Read a CSV file from disk
    pub fn read_file(&self, path: &Path) -> Result<RecordStore> {
        let file = File::open(path)?;
        self.read_store(file)
    }
}

impl Default for ReadingReader {
    fn default() -> Self {
        Self::new()
    }
}
