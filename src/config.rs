//! Layered runtime settings.
//!
//! Values come from built-in defaults, an optional TOML file and finally
//! `AIRQ_`-prefixed environment variables (`AIRQ_CLEANING__OUTLIER_K=2.5`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

use crate::analyzers::{Breakpoint, BreakpointTable};
use crate::error::Result;
use crate::processors::CleaningPolicy;
use crate::utils::constants::{
    COMPRESSION_SNAPPY, DEFAULT_CHUNK_SIZE, DEFAULT_ROW_GROUP_SIZE, ENV_PREFIX,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AqiSettings {
    /// Ascending, contiguous PM2.5 breakpoints
    pub breakpoints: Vec<Breakpoint>,
}

impl Default for AqiSettings {
    fn default() -> Self {
        Self {
            breakpoints: BreakpointTable::standard().rows().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Threads in the per-station worker pool
    #[validate(range(min = 1))]
    pub max_workers: usize,

    /// Rows per Parquet write batch
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    #[validate(range(min = 1))]
    pub row_group_size: usize,

    pub compression: String,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            compression: COMPRESSION_SNAPPY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub cleaning: CleaningPolicy,

    pub aqi: AqiSettings,

    #[validate(nested)]
    pub processing: ProcessingSettings,
}

impl Settings {
    /// Load and validate settings. A missing `path` means defaults plus
    /// environment overrides; a named file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Settings::load`], reading overrides from `env` instead of the
    /// process environment when it is given
    pub fn load_with_env(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        settings.breakpoint_table()?;

        Ok(settings)
    }

    pub fn breakpoint_table(&self) -> Result<BreakpointTable> {
        BreakpointTable::new(self.aqi.breakpoints.clone())
    }
}
