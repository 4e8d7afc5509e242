use crate::analyzers::AqiClassifier;
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::models::{Field, GroupBy, Reading};
use crate::processors::{
    AnalysisPipeline, Aggregator, Cleaner, StationRanker, TimeSeriesExtractor, TimeWindow,
};
use crate::readers::ReadingReader;
use crate::utils::filename::generate_default_parquet_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{ParquetWriter, ReportWriter};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

pub fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.log_file.as_deref())?;

    let settings = Settings::load(cli.config.as_deref())?;
    debug!("Settings: {:?}", settings);

    let cleaner = Cleaner::new(settings.cleaning.clone())?;
    let classifier = AqiClassifier::new(settings.breakpoint_table()?);
    let pipeline = AnalysisPipeline::new(settings.processing.max_workers)
        .with_cleaner(cleaner)
        .with_classifier(classifier.clone());

    match cli.command {
        Commands::Clean {
            input,
            output_file,
            compression,
            station_id,
            report,
            validate_only,
        } => {
            println!("Cleaning air quality data...");
            println!("Input file: {}", input.display());

            let progress = ProgressReporter::new_spinner("Processing data...", false);
            let (store, cleaning) = pipeline.clean_file(&input, Some(&progress))?;
            progress.finish_with_message(&format!("Cleaned {} readings", store.len()));

            println!("\n{}", cleaning.summary());

            if let Some(path) = report {
                ensure_parent(&path)?;
                ReportWriter::new().write_json(&cleaning, &path)?;
                println!("Cleaning report written to {}", path.display());
            }

            if validate_only {
                println!("Validation complete - no output file written");
                return Ok(());
            }

            let readings: Vec<Reading> = match station_id {
                Some(id) => store.into_readings().into_iter().filter(|r| r.station_id == id).collect(),
                None => store.into_readings(),
            };

            if readings.is_empty() {
                println!("No records to write");
                return Ok(());
            }

            let output_file = output_file.unwrap_or_else(generate_default_parquet_filename);
            let compression = compression.unwrap_or_else(|| settings.processing.compression.clone());
            println!("Writing {} records to {}...", readings.len(), output_file.display());

            let writer = ParquetWriter::new()
                .with_compression(&compression)?
                .with_row_group_size(settings.processing.row_group_size)
                .with_batch_size(settings.processing.chunk_size)
                .with_classifier(classifier);

            ensure_parent(&output_file)?;
            let progress = ProgressReporter::new(readings.len() as u64, "Writing Parquet...", false);
            writer.write_readings_with_progress(&readings, &output_file, Some(&progress))?;
            progress.finish_with_message(&format!("Wrote {} records", readings.len()));

            let file_info = writer.get_file_info(&output_file)?;
            println!("\n{}", file_info.summary());
            println!("Processing complete!");
        }

        Commands::Stats {
            input,
            by_station,
            raw,
            json,
        } => {
            let store = if raw {
                ReadingReader::new().read_file(&input)?
            } else {
                pipeline.clean_file(&input, None)?.0
            };

            let group_by = if by_station { GroupBy::Station } else { GroupBy::None };
            let grouped = Aggregator::new().aggregate(store.readings(), group_by);

            for (key, stats) in &grouped {
                println!("=== {} ===\n{}", key, stats.summary());
                for (a, b, r) in stats.correlation.strongest_pairs(3) {
                    println!("  corr({}, {}) = {:.3}", a, b, r);
                }
                println!();
            }

            if let Some(path) = json {
                ensure_parent(&path)?;
                ReportWriter::new().write_json(&grouped, &path)?;
                println!("Statistics written to {}", path.display());
            }
        }

        Commands::Rank {
            input,
            metric,
            order,
            limit,
            output,
        } => {
            let (store, _) = pipeline.clean_file(&input, None)?;
            let (_, stations) = pipeline.aggregate(&store)?;

            let mut ranking = StationRanker::new().rank(&stations, metric, order);
            if let Some(limit) = limit {
                ranking.truncate(limit);
            }

            println!("Stations by {:?} mean {} ({}):", order, metric, metric.unit());
            for (i, entry) in ranking.iter().enumerate() {
                println!("{:>3}. {:<12} {:>10.2}", i + 1, entry.station_id, entry.value);
            }

            if let Some(path) = output {
                ensure_parent(&path)?;
                ReportWriter::new().write_rankings_csv(&ranking, &path)?;
            }
        }

        Commands::Exceedances {
            input,
            station_id,
            pollutant,
            threshold,
            output,
        } => {
            let (store, _) = pipeline.clean_file(&input, None)?;
            let days = StationRanker::new().exceedance_days(
                store.readings(),
                &station_id,
                pollutant,
                threshold,
            )?;

            println!(
                "{} days where {} daily mean {} exceeded {}:",
                days.len(),
                station_id,
                pollutant,
                threshold
            );
            for day in &days {
                println!("  {}  {:.2}", day.date, day.mean);
            }

            if let Some(path) = output {
                ensure_parent(&path)?;
                ReportWriter::new().write_exceedances_csv(&days, &path)?;
            }
        }

        Commands::Series {
            input,
            station_id,
            pollutant,
            day,
            start,
            first_day,
            station_first_day,
            hourly,
            output,
        } => {
            let (store, _) = pipeline.clean_file(&input, None)?;
            let extractor = TimeSeriesExtractor::new();

            let window = if let Some(day) = day {
                Some(TimeWindow::Day(day))
            } else if let Some(start) = start {
                Some(TimeWindow::Span { start })
            } else if first_day {
                let day = extractor.dataset_first_day(store.readings()).ok_or_else(|| {
                    ProcessingError::no_data(&station_id, pollutant, "file has no readings")
                })?;
                Some(TimeWindow::Day(day))
            } else if station_first_day {
                let day = extractor.first_day(store.readings(), &station_id).ok_or_else(|| {
                    ProcessingError::no_data(&station_id, pollutant, "station has no readings")
                })?;
                Some(TimeWindow::Day(day))
            } else {
                None
            };

            let mut series = extractor.extract(store.readings(), &station_id, pollutant, window)?;
            if hourly {
                series = extractor.resample_hourly(&series);
            }
            let peak = extractor.peak(&series)?;

            for point in &series {
                println!("{}  {:>10.2}", point.timestamp, point.value);
            }
            println!(
                "\nPeak {} at {}: {:.2} {}",
                pollutant,
                peak.timestamp,
                peak.value,
                pollutant.unit()
            );

            if let Some(path) = output {
                ensure_parent(&path)?;
                ReportWriter::new().write_series_csv(&series, &path)?;
            }
        }

        Commands::Aqi { value, input } => {
            if let Some(value) = value {
                let result = classifier.classify(value);
                println!(
                    "PM2.5 {:.1} -> AQI {} ({})",
                    result.pm25_value, result.index_score, result.category
                );
            } else if let Some(input) = input {
                let (store, _) = pipeline.clean_file(&input, None)?;
                let total = store.len().max(1) as f64;
                for (category, count) in classifier.category_distribution(store.readings()) {
                    println!(
                        "{:<32} {:>8} ({:>5.1}%)",
                        category,
                        count,
                        count as f64 / total * 100.0
                    );
                }
            }
        }

        Commands::Analyze {
            input,
            output,
            max_workers,
        } => {
            let pipeline = match max_workers {
                Some(workers) => AnalysisPipeline::new(workers)
                    .with_cleaner(Cleaner::new(settings.cleaning.clone())?)
                    .with_classifier(classifier),
                None => pipeline,
            };

            let progress = ProgressReporter::new_spinner("Analyzing data...", false);
            let report = pipeline.analyze_file(&input, Some(&progress))?;

            println!("\n{}", report.summary());

            if let Some(path) = output {
                ensure_parent(&path)?;
                ReportWriter::new().write_json(&report, &path)?;
                println!("Analysis report written to {}", path.display());
            }
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;
            println!("\n{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing up to {} records):", sample);
                match writer.read_sample_records(&file, sample) {
                    Ok(records) => {
                        for (i, record) in records.iter().enumerate() {
                            let values: Vec<String> = Field::ALL
                                .iter()
                                .map(|f| match record.get(*f) {
                                    Some(v) => format!("{}={:.1}", f.header(), v),
                                    None => format!("{}=-", f.header()),
                                })
                                .collect();
                            println!(
                                "{}. {} at {}: {}",
                                i + 1,
                                record.station_id,
                                record.timestamp,
                                values.join(", ")
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Initialise tracing. `RUST_LOG` wins over the verbosity flag.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("airq_processor={}", log_level)));

    let result = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init(),
    };
    result.map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
