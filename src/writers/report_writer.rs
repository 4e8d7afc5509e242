use crate::error::Result;
use crate::processors::{DailyExceedance, SeriesPoint, StationRank};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// JSON reports and CSV tuple sequences
pub struct ReportWriter {
    pretty: bool,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }

    pub fn write_json<T: Serialize>(&self, value: &T, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_json(value)?.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_rankings_csv(&self, ranking: &[StationRank], path: &Path) -> Result<()> {
        write_csv(ranking, path)
    }

    pub fn write_series_csv(&self, series: &[SeriesPoint], path: &Path) -> Result<()> {
        write_csv(series, path)
    }

    pub fn write_exceedances_csv(&self, days: &[DailyExceedance], path: &Path) -> Result<()> {
        write_csv(days, path)
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
