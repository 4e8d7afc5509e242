use airq_processor::analyzers::AqiClassifier;
use airq_processor::models::{Field, GroupBy, GroupKey};
use airq_processor::processors::{
    AnalysisPipeline, Aggregator, Cleaner, StationRanker, TimeSeriesExtractor, TimeWindow,
};
use airq_processor::readers::ReadingReader;
use airq_processor::writers::{ParquetWriter, ReportWriter};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "Station ID,Timestamp,PM2.5,PM10,O3,NO2,Temperature,Humidity").unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn s003_day() -> NamedTempFile {
    write_csv(&[
        "S003,2025-07-15 08:00:00,10,20,30,15,21,55",
        "S003,2025-07-15 09:00:00,,21,31,16,22,150",
        "S003,2025-07-15 10:00:00,200,22,32,17,23,57",
        "S003,2025-07-15 11:00:00,15,23,33,18,24,58",
        "S001,2025-07-15 08:00:00,12,25,40,20,20,60",
        "S001,2025-07-15 09:00:00,13,26,41,21,20,61",
    ])
}

#[test]
fn test_s003_imputation_and_exceedance_from_csv() {
    let file = s003_day();
    let store = ReadingReader::new().read_file(file.path()).unwrap();
    let (clean, report) = Cleaner::default().clean_store(&store).unwrap();

    assert!(clean.is_clean());
    let s003: Vec<f64> = clean
        .station_readings("S003")
        .map(|r| r.pm25.unwrap())
        .collect();
    assert_eq!(s003[1], 75.0);
    assert_eq!(report.field(Field::Pm25).missing_imputed, 1);

    let days = StationRanker::new()
        .exceedance_days(clean.readings(), "S003", Field::Pm25, 50.0)
        .unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].mean, 75.0);
}

#[test]
fn test_single_humidity_clamped() {
    let file = write_csv(&["S009,2025-07-15 08:00:00,10,20,30,15,21,150"]);
    let store = ReadingReader::new().read_file(file.path()).unwrap();
    let (clean, report) = Cleaner::default().clean_store(&store).unwrap();

    assert_eq!(clean.readings()[0].humidity, Some(100.0));
    assert_eq!(report.field(Field::Humidity).clamped, 1);
}

#[test]
fn test_cleaning_is_idempotent_end_to_end() {
    let file = s003_day();
    let store = ReadingReader::new().read_file(file.path()).unwrap();
    let cleaner = Cleaner::default();

    let (once, _) = cleaner.clean(store.readings()).unwrap();
    let (twice, report) = cleaner.clean(&once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(report.total_corrections(), 0);
}

#[test]
fn test_grouped_statistics_and_ranking() {
    let file = s003_day();
    let store = ReadingReader::new().read_file(file.path()).unwrap();
    let (clean, _) = Cleaner::default().clean_store(&store).unwrap();

    let grouped = Aggregator::new().aggregate(clean.readings(), GroupBy::Station);
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[&GroupKey::Station("S001".to_string())].record_count, 2);

    let stations = Aggregator::new().aggregate_by_station(clean.readings());
    let top = StationRanker::new().highest(&stations, Field::Pm25).unwrap();
    assert_eq!(top.station_id, "S003");
}

#[test]
fn test_series_peak_for_day() {
    let file = s003_day();
    let store = ReadingReader::new().read_file(file.path()).unwrap();
    let (clean, _) = Cleaner::default().clean_store(&store).unwrap();

    let extractor = TimeSeriesExtractor::new();
    let day = extractor.first_day(clean.readings(), "S003").unwrap();
    assert_eq!(day, NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());

    let series = extractor
        .extract(clean.readings(), "S003", Field::Pm25, Some(TimeWindow::Day(day)))
        .unwrap();
    assert_eq!(series.len(), 4);
    let peak = extractor.peak(&series).unwrap();
    assert_eq!(peak.value, series.iter().map(|p| p.value).fold(f64::MIN, f64::max));
}

#[test]
fn test_parquet_export_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = s003_day();
    let store = ReadingReader::new().read_file(file.path()).unwrap();
    let (clean, _) = Cleaner::default().clean_store(&store).unwrap();

    let output_path = temp_dir.path().join("clean.parquet");
    let writer = ParquetWriter::new().with_compression("zstd").unwrap();
    writer.write_readings(clean.readings(), &output_path).unwrap();

    let file_info = writer.get_file_info(&output_path).unwrap();
    assert_eq!(file_info.total_rows, 6);

    let back = writer.read_sample_records(&output_path, 100).unwrap();
    assert_eq!(back, clean.readings().to_vec());
}

#[test]
fn test_analysis_report_json() {
    let temp_dir = TempDir::new().unwrap();
    let file = s003_day();
    let report = AnalysisPipeline::new(2).analyze_file(file.path(), None).unwrap();

    let path = temp_dir.path().join("report.json");
    ReportWriter::new().write_json(&report, &path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["global"]["record_count"], 6);
    assert_eq!(json["cleaning"]["fields"]["humidity"]["clamped"], 1);
    assert_eq!(json["rankings"]["pm25"]["highest"][0]["station_id"], "S003");
    assert!(json["stations"]["S001"].is_object());
}

#[test]
fn test_aqi_scenarios() {
    let classifier = AqiClassifier::default();

    let zero = classifier.classify(0.0);
    assert_eq!((zero.index_score, zero.category.as_str()), (0, "Good"));

    let extreme = classifier.classify(900.0);
    assert_eq!((extreme.index_score, extreme.category.as_str()), (500, "Hazardous"));
}
