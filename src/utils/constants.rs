/// Cleaning defaults
pub const DEFAULT_MIN_STATION_SAMPLES: usize = 3;
pub const DEFAULT_OUTLIER_K: f64 = 3.0;
pub const MAX_OUTLIER_PASSES: usize = 32;

/// Physical bounds
pub const MIN_CONCENTRATION: f64 = 0.0;
pub const MIN_HUMIDITY: f64 = 0.0;
pub const MAX_HUMIDITY: f64 = 100.0;

/// Tokens treated as an absent value rather than a malformed one
pub const MISSING_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

/// Accepted timestamp layouts, tried in order
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Threshold used by the original daily exceedance report (µg/m³)
pub const DEFAULT_EXCEEDANCE_THRESHOLD: f64 = 50.0;

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "AIRQ";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
