use crate::models::reading::parse_timestamp;
use crate::models::Field;
use crate::processors::RankOrder;
use crate::utils::constants::DEFAULT_EXCEEDANCE_THRESHOLD;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "airq-processor")]
#[command(about = "Multi-station air quality cleaning, statistics and AQI classification")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Settings file (TOML)")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a sensor CSV export and write it to Parquet
    Clean {
        #[arg(short, long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/airq-clean-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, help = "Compression [default: from settings]")]
        compression: Option<String>,

        #[arg(short, long)]
        station_id: Option<String>,

        #[arg(long, help = "Write the cleaning report as JSON")]
        report: Option<PathBuf>,

        #[arg(long, default_value = "false")]
        validate_only: bool,
    },

    /// Descriptive statistics and correlations
    Stats {
        #[arg(short, long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(long, help = "Group statistics by station")]
        by_station: bool,

        #[arg(long, help = "Aggregate the readings as read, without cleaning")]
        raw: bool,

        #[arg(long, help = "Write the statistics as JSON")]
        json: Option<PathBuf>,
    },

    /// Rank stations by the mean of a column
    Rank {
        #[arg(short, long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(short, long, value_enum, default_value = "pm25")]
        metric: Field,

        #[arg(long, value_enum, default_value = "highest")]
        order: RankOrder,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, help = "Write the ranking as CSV")]
        output: Option<PathBuf>,
    },

    /// Days whose mean concentration exceeds a threshold
    Exceedances {
        #[arg(short, long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(short, long)]
        station_id: String,

        #[arg(short, long, value_enum, default_value = "pm25")]
        pollutant: Field,

        #[arg(short, long, default_value_t = DEFAULT_EXCEEDANCE_THRESHOLD)]
        threshold: f64,

        #[arg(short, long, help = "Write the exceeding days as CSV")]
        output: Option<PathBuf>,
    },

    /// Time series of one station and pollutant
    Series {
        #[arg(short, long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(short, long)]
        station_id: String,

        #[arg(short, long, value_enum, default_value = "pm25")]
        pollutant: Field,

        #[arg(
            long,
            conflicts_with_all = ["start", "first_day", "station_first_day"],
            help = "Calendar day (YYYY-MM-DD)"
        )]
        day: Option<NaiveDate>,

        #[arg(
            long,
            value_parser = parse_start,
            conflicts_with_all = ["first_day", "station_first_day"],
            help = "Start of a 24h span"
        )]
        start: Option<NaiveDateTime>,

        #[arg(long, help = "Restrict to the first day of data in the whole file")]
        first_day: bool,

        #[arg(
            long,
            conflicts_with = "first_day",
            help = "Restrict to the station's own first day of data"
        )]
        station_first_day: bool,

        #[arg(long, help = "Average points within each clock hour")]
        hourly: bool,

        #[arg(short, long, help = "Write the series as CSV")]
        output: Option<PathBuf>,
    },

    /// Classify a PM2.5 value, or the category distribution of a dataset
    Aqi {
        #[arg(long, allow_negative_numbers = true, required_unless_present = "input")]
        value: Option<f64>,

        #[arg(short, long, conflicts_with = "value", help = "Input CSV file")]
        input: Option<PathBuf>,
    },

    /// Full pipeline: clean, aggregate, rank and classify
    Analyze {
        #[arg(short, long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(short, long, help = "Write the analysis report as JSON")]
        output: Option<PathBuf>,

        #[arg(long, help = "Worker threads [default: from settings]")]
        max_workers: Option<usize>,
    },

    /// Display information about a cleaned Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

fn parse_start(text: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(text).ok_or_else(|| format!("invalid timestamp '{}'", text))
}
