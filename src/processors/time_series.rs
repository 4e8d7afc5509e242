use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ProcessingError, Result};
use crate::models::{Field, Reading};
use crate::utils::statistics;

/// One point of a station/pollutant series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Optional bound on an extracted series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// A calendar day, midnight to midnight
    Day(NaiveDate),
    /// `[start, start + 24h)`
    Span { start: NaiveDateTime },
}

impl TimeWindow {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        match self {
            TimeWindow::Day(date) => timestamp.date() == *date,
            TimeWindow::Span { start } => timestamp >= *start && timestamp < *start + Duration::hours(24),
        }
    }

    fn describe(&self) -> String {
        match self {
            TimeWindow::Day(date) => format!("no readings on {}", date),
            TimeWindow::Span { start } => format!("no readings in the 24h from {}", start),
        }
    }
}

/// Slices readings into ordered per-station series
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesExtractor;

impl TimeSeriesExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Points for one station/pollutant ordered by timestamp ascending.
    /// Readings without a value for the pollutant are skipped.
    pub fn extract(
        &self,
        records: &[Reading],
        station_id: &str,
        pollutant: Field,
        window: Option<TimeWindow>,
    ) -> Result<Vec<SeriesPoint>> {
        let mut series: Vec<SeriesPoint> = records
            .iter()
            .filter(|r| r.station_id == station_id)
            .filter(|r| window.map_or(true, |w| w.contains(r.timestamp)))
            .filter_map(|r| {
                Some(SeriesPoint {
                    timestamp: r.timestamp,
                    value: r.get(pollutant)?,
                })
            })
            .collect();

        if series.is_empty() {
            let details = window
                .map(|w| w.describe())
                .unwrap_or_else(|| "station has no readings".to_string());
            return Err(ProcessingError::no_data(station_id, pollutant, details));
        }

        series.sort_by_key(|p| p.timestamp);
        Ok(series)
    }

    /// Earliest calendar date with a reading for the station
    pub fn first_day(&self, records: &[Reading], station_id: &str) -> Option<NaiveDate> {
        records
            .iter()
            .filter(|r| r.station_id == station_id)
            .map(Reading::date)
            .min()
    }

    /// Earliest calendar date with a reading from any station
    pub fn dataset_first_day(&self, records: &[Reading]) -> Option<NaiveDate> {
        records.iter().map(Reading::date).min()
    }

    /// Point with the maximum value; the earliest timestamp wins ties
    pub fn peak(&self, series: &[SeriesPoint]) -> Result<SeriesPoint> {
        series
            .iter()
            .copied()
            .reduce(|best, p| {
                if p.value > best.value || (p.value == best.value && p.timestamp < best.timestamp) {
                    p
                } else {
                    best
                }
            })
            .ok_or_else(|| ProcessingError::NoData {
                station_id: String::new(),
                field: String::new(),
                details: "cannot take the peak of an empty series".to_string(),
            })
    }

    /// Average points falling in the same clock hour
    pub fn resample_hourly(&self, series: &[SeriesPoint]) -> Vec<SeriesPoint> {
        let mut hours: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
        for point in series {
            hours.entry(truncate_to_hour(point.timestamp)).or_default().push(point.value);
        }

        hours
            .into_iter()
            .filter_map(|(timestamp, values)| {
                Some(SeriesPoint {
                    timestamp,
                    value: statistics::mean(&values)?,
                })
            })
            .collect()
    }
}

fn truncate_to_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .date()
        .and_hms_opt(timestamp.hour(), 0, 0)
        .unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn pm25(station: &str, ts: NaiveDateTime, value: f64) -> Reading {
        Reading::new(station, ts).with(Field::Pm25, value)
    }

    fn sample() -> Vec<Reading> {
        vec![
            pm25("S001", at(2, 1, 0), 30.0),
            pm25("S001", at(1, 10, 0), 45.0),
            pm25("S002", at(1, 10, 0), 99.0),
            pm25("S001", at(1, 8, 0), 20.0),
            pm25("S001", at(1, 23, 0), 45.0),
            Reading::new("S001", at(1, 12, 0)),
        ]
    }

    #[test]
    fn test_extract_sorted_without_window() {
        let series = TimeSeriesExtractor::new()
            .extract(&sample(), "S001", Field::Pm25, None)
            .unwrap();

        let stamps: Vec<NaiveDateTime> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![at(1, 8, 0), at(1, 10, 0), at(1, 23, 0), at(2, 1, 0)]);
    }

    #[test]
    fn test_extract_day_and_span_windows() {
        let extractor = TimeSeriesExtractor::new();
        let day = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();

        let series = extractor
            .extract(&sample(), "S001", Field::Pm25, Some(TimeWindow::Day(day)))
            .unwrap();
        assert_eq!(series.len(), 3);

        let span = TimeWindow::Span { start: at(1, 10, 0) };
        let series = extractor.extract(&sample(), "S001", Field::Pm25, Some(span)).unwrap();
        let stamps: Vec<NaiveDateTime> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![at(1, 10, 0), at(1, 23, 0), at(2, 1, 0)]);

        assert!(!span.contains(at(2, 10, 0)));
        assert!(span.contains(at(2, 9, 59)));
    }

    #[test]
    fn test_extract_no_data() {
        let extractor = TimeSeriesExtractor::new();
        let empty_day = TimeWindow::Day(NaiveDate::from_ymd_opt(2025, 7, 9).unwrap());

        assert!(matches!(
            extractor.extract(&sample(), "S001", Field::Pm25, Some(empty_day)),
            Err(ProcessingError::NoData { .. })
        ));
        assert!(matches!(
            extractor.extract(&sample(), "S404", Field::Pm25, None),
            Err(ProcessingError::NoData { .. })
        ));
        assert!(matches!(
            extractor.extract(&sample(), "S001", Field::O3, None),
            Err(ProcessingError::NoData { .. })
        ));
    }

    #[test]
    fn test_peak_prefers_earliest_on_tie() {
        let extractor = TimeSeriesExtractor::new();
        let series = extractor.extract(&sample(), "S001", Field::Pm25, None).unwrap();

        let peak = extractor.peak(&series).unwrap();
        assert_eq!(peak.value, 45.0);
        assert_eq!(peak.timestamp, at(1, 10, 0));

        let mut reversed = series.clone();
        reversed.reverse();
        assert_eq!(extractor.peak(&reversed).unwrap(), peak);

        assert!(extractor.peak(&[]).is_err());
    }

    #[test]
    fn test_first_day() {
        let extractor = TimeSeriesExtractor::new();
        assert_eq!(
            extractor.first_day(&sample(), "S001"),
            NaiveDate::from_ymd_opt(2025, 7, 1)
        );
        assert_eq!(extractor.first_day(&sample(), "S404"), None);
    }

    #[test]
    fn test_first_day_station_versus_dataset() {
        let extractor = TimeSeriesExtractor::new();
        let mut records = sample();
        let late_june = NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        records.push(pm25("S002", late_june, 5.0));

        assert_eq!(extractor.first_day(&records, "S001"), NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(extractor.dataset_first_day(&records), NaiveDate::from_ymd_opt(2025, 6, 30));
        assert_eq!(extractor.dataset_first_day(&[]), None);
    }

    #[test]
    fn test_resample_hourly() {
        let series = vec![
            SeriesPoint { timestamp: at(1, 10, 15), value: 10.0 },
            SeriesPoint { timestamp: at(1, 10, 45), value: 20.0 },
            SeriesPoint { timestamp: at(1, 9, 5), value: 7.0 },
        ];

        let hourly = TimeSeriesExtractor::new().resample_hourly(&series);
        assert_eq!(
            hourly,
            vec![
                SeriesPoint { timestamp: at(1, 9, 0), value: 7.0 },
                SeriesPoint { timestamp: at(1, 10, 0), value: 15.0 },
            ]
        );
    }
}
