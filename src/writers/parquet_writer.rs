use crate::analyzers::AqiClassifier;
use crate::error::{ProcessingError, Result};
use crate::models::{Field, Reading};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_CHUNK_SIZE, DEFAULT_ROW_GROUP_SIZE,
};
use crate::utils::progress::ProgressReporter;
use arrow::array::*;
use arrow::datatypes::{DataType, Field as ArrowField, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const COLUMN_STATION_ID: &str = "station_id";
pub const COLUMN_TIMESTAMP: &str = "timestamp";
pub const COLUMN_PM25_AQI: &str = "pm25_aqi";
pub const COLUMN_PM25_CATEGORY: &str = "pm25_category";

/// Writes cleaned readings, with their PM2.5 index, to Parquet
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
    batch_size: usize,
    classifier: AqiClassifier,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            batch_size: DEFAULT_CHUNK_SIZE,
            classifier: AqiClassifier::default(),
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_classifier(mut self, classifier: AqiClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Write readings in batches. An empty input still produces a file
    /// carrying the schema.
    pub fn write_readings(&self, records: &[Reading], path: &Path) -> Result<()> {
        self.write_readings_with_progress(records, path, None)
    }

    /// Write readings, advancing `progress` by the size of each batch
    pub fn write_readings_with_progress(
        &self,
        records: &[Reading],
        path: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<()> {
        let schema = Self::create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in records.chunks(self.batch_size) {
            let batch = self.readings_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
            if let Some(p) = progress {
                p.increment(chunk.len() as u64);
            }
        }

        writer.close()?;
        debug!("Wrote {} readings to {}", records.len(), path.display());
        Ok(())
    }

    /// Arrow schema of the cleaned export
    pub fn create_schema() -> Arc<Schema> {
        let mut fields = vec![
            ArrowField::new(COLUMN_STATION_ID, DataType::Utf8, false),
            ArrowField::new(
                COLUMN_TIMESTAMP,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
        ];
        fields.extend(
            Field::ALL
                .iter()
                .map(|f| ArrowField::new(f.name(), DataType::Float64, true)),
        );
        fields.push(ArrowField::new(COLUMN_PM25_AQI, DataType::UInt32, true));
        fields.push(ArrowField::new(COLUMN_PM25_CATEGORY, DataType::Utf8, true));

        Arc::new(Schema::new(fields))
    }

    fn readings_to_batch(&self, records: &[Reading], schema: Arc<Schema>) -> Result<RecordBatch> {
        let station_ids: Vec<&str> = records.iter().map(|r| r.station_id.as_str()).collect();
        let timestamps: Vec<i64> = records
            .iter()
            .map(|r| r.timestamp.and_utc().timestamp_millis())
            .collect();

        let aqi = self.classifier.classify_all(records);
        let scores: Vec<Option<u32>> = aqi.iter().map(|a| a.as_ref().map(|a| a.index_score)).collect();
        let categories: Vec<Option<&str>> = aqi
            .iter()
            .map(|a| a.as_ref().map(|a| a.category.as_str()))
            .collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(station_ids)),
            Arc::new(TimestampMillisecondArray::from(timestamps)),
        ];
        for field in Field::ALL {
            let values: Vec<Option<f64>> = records.iter().map(|r| r.get(field)).collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }
        columns.push(Arc::new(UInt32Array::from(scores)));
        columns.push(Arc::new(StringArray::from(categories)));

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read up to `limit` readings back from a file written by this writer
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<Reading>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;

            let station_ids = column::<StringArray>(&batch, COLUMN_STATION_ID)?;
            let timestamps = column::<TimestampMillisecondArray>(&batch, COLUMN_TIMESTAMP)?;
            let values = Field::ALL
                .iter()
                .map(|f| Ok((*f, column::<Float64Array>(&batch, f.name())?)))
                .collect::<Result<Vec<_>>>()?;

            for i in 0..batch.num_rows() {
                if records.len() >= limit {
                    return Ok(records);
                }

                let timestamp = DateTime::from_timestamp_millis(timestamps.value(i))
                    .ok_or_else(|| {
                        ProcessingError::InvalidFormat("Invalid timestamp in Parquet file".to_string())
                    })?
                    .naive_utc();

                let mut reading = Reading::new(station_ids.value(i), timestamp);
                for (field, array) in &values {
                    if !array.is_null(i) {
                        *field.slot(&mut reading) = Some(array.value(i));
                    }
                }
                records.push(reading);
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();
        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };
        let columns = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        Ok(ParquetFileInfo {
            total_rows: file_metadata.num_rows(),
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size: std::fs::metadata(path)?.len(),
            compression,
            columns,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid or missing {} column", name)))
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
    pub columns: Vec<String>,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}\n\
            - Columns: {}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows,
            self.columns.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::NamedTempFile;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample() -> Vec<Reading> {
        (0..25)
            .map(|h| {
                Reading::new(if h % 2 == 0 { "S001" } else { "S002" }, at(h % 24))
                    .with(Field::Pm25, 5.0 + h as f64 * 3.0)
                    .with(Field::Humidity, 60.0)
            })
            .collect()
    }

    #[test]
    fn test_write_empty_records() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_readings(&[], temp_file.path())?;
        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 0);
        assert_eq!(info.columns.len(), 10);
        Ok(())
    }

    #[test]
    fn test_round_trip_preserves_values() -> Result<()> {
        let writer = ParquetWriter::new().with_batch_size(7).with_row_group_size(10);
        let temp_file = NamedTempFile::new()?;
        let records = sample();

        writer.write_readings(&records, temp_file.path())?;
        let back = writer.read_sample_records(temp_file.path(), usize::MAX)?;
        assert_eq!(back, records);

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 25);
        assert_eq!(info.row_groups, 3);
        assert!(info.summary().contains("pm25_category"));
        Ok(())
    }

    #[test]
    fn test_write_with_progress_bar() -> Result<()> {
        let writer = ParquetWriter::new().with_batch_size(10);
        let temp_file = NamedTempFile::new()?;
        let records = sample();

        let progress = ProgressReporter::new(records.len() as u64, "Writing", false);
        writer.write_readings_with_progress(&records, temp_file.path(), Some(&progress))?;
        progress.finish_with_message("done");

        assert_eq!(writer.get_file_info(temp_file.path())?.total_rows, records.len() as i64);
        Ok(())
    }

    #[test]
    fn test_read_sample_respects_limit() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        writer.write_readings(&sample(), temp_file.path())?;

        let back = writer.read_sample_records(temp_file.path(), 4)?;
        assert_eq!(back.len(), 4);
        assert_eq!(back[1].station_id, "S002");
        Ok(())
    }

    #[test]
    fn test_aqi_columns() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let records = vec![
            Reading::new("S001", at(0)).with(Field::Pm25, 0.0),
            Reading::new("S001", at(1)),
        ];
        writer.write_readings(&records, temp_file.path())?;

        let file = File::open(temp_file.path())?;
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batch = reader.next().unwrap()?;

        let scores = column::<UInt32Array>(&batch, COLUMN_PM25_AQI)?;
        let categories = column::<StringArray>(&batch, COLUMN_PM25_CATEGORY)?;
        assert_eq!(scores.value(0), 0);
        assert_eq!(categories.value(0), "Good");
        assert!(scores.is_null(1));
        assert!(categories.is_null(1));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;
            writer.write_readings(&sample(), temp_file.path())?;
            assert_eq!(writer.read_sample_records(temp_file.path(), 100)?.len(), 25);
        }

        assert!(ParquetWriter::new().with_compression("brotli-ish").is_err());
        Ok(())
    }
}
