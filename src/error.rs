use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Insufficient data for station {station_id}: no valid {field} values to impute from")]
    InsufficientData { station_id: String, field: String },

    #[error("No data for station {station_id}, {field}: {details}")]
    NoData {
        station_id: String,
        field: String,
        details: String,
    },

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl ProcessingError {
    pub fn no_data(station_id: &str, field: impl ToString, details: impl Into<String>) -> Self {
        ProcessingError::NoData {
            station_id: station_id.to_string(),
            field: field.to_string(),
            details: details.into(),
        }
    }
}
