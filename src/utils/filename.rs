use chrono::{Datelike, Local, NaiveDate};
use std::path::PathBuf;

/// Default cleaned export path: output/airq-clean-{YYMMDD}.parquet
pub fn generate_default_parquet_filename() -> PathBuf {
    parquet_filename_for(Local::now().date_naive())
}

pub fn parquet_filename_for(date: NaiveDate) -> PathBuf {
    let filename = format!(
        "airq-clean-{:02}{:02}{:02}.parquet",
        date.year() % 100,
        date.month(),
        date.day()
    );
    PathBuf::from("output").join(filename)
}
