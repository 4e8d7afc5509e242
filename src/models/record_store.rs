use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::models::{Field, RawReading, Reading, RowRejection};

/// Counts gathered while converting raw rows into readings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub empty_station_rows: usize,
    pub bad_timestamp_rows: usize,
    pub malformed: BTreeMap<Field, usize>,
}

impl IngestReport {
    pub fn dropped_rows(&self) -> usize {
        self.empty_station_rows + self.bad_timestamp_rows
    }

    pub fn malformed_count(&self, field: Field) -> usize {
        self.malformed.get(&field).copied().unwrap_or(0)
    }

    pub fn total_malformed(&self) -> usize {
        self.malformed.values().sum()
    }
}

/// Ordered collection of readings. Input order is preserved; time ordering is
/// only produced on request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    readings: Vec<Reading>,
    ingest: IngestReport,
}

impl RecordStore {
    pub fn new(readings: Vec<Reading>) -> Self {
        let ingest = IngestReport {
            total_rows: readings.len(),
            accepted_rows: readings.len(),
            ..Default::default()
        };
        Self { readings, ingest }
    }

    /// Build a store from raw rows, recovering malformed fields as missing
    pub fn from_raw(rows: &[RawReading]) -> Self {
        let mut ingest = IngestReport {
            total_rows: rows.len(),
            ..Default::default()
        };
        let mut readings = Vec::with_capacity(rows.len());

        for row in rows {
            match row.parse() {
                Ok(parsed) => {
                    for field in parsed.malformed {
                        *ingest.malformed.entry(field).or_default() += 1;
                    }
                    readings.push(parsed.reading);
                }
                Err(RowRejection::EmptyStationId) => ingest.empty_station_rows += 1,
                Err(RowRejection::BadTimestamp(text)) => {
                    debug!("Dropping row with unparseable timestamp '{}'", text);
                    ingest.bad_timestamp_rows += 1;
                }
            }
        }

        ingest.accepted_rows = readings.len();
        Self { readings, ingest }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }

    pub fn ingest_report(&self) -> &IngestReport {
        &self.ingest
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn stations(&self) -> BTreeSet<&str> {
        self.readings.iter().map(|r| r.station_id.as_str()).collect()
    }

    /// Readings of one station in input order
    pub fn station_readings<'a>(&'a self, station_id: &'a str) -> impl Iterator<Item = &'a Reading> + 'a {
        self.readings.iter().filter(move |r| r.station_id == station_id)
    }

    /// Partition by station, keeping input order inside each group
    pub fn by_station(&self) -> BTreeMap<&str, Vec<&Reading>> {
        group_by_station(&self.readings)
    }

    /// Readings ordered by timestamp; equal timestamps keep input order
    pub fn sorted_by_timestamp(&self) -> Vec<&Reading> {
        let mut sorted: Vec<&Reading> = self.readings.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);
        sorted
    }

    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let min = self.readings.iter().map(|r| r.timestamp).min()?;
        let max = self.readings.iter().map(|r| r.timestamp).max()?;
        Some((min, max))
    }

    /// Indices of readings repeating an earlier (station_id, timestamp) pair
    pub fn duplicate_indices(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.readings
            .iter()
            .enumerate()
            .filter(|(_, r)| !seen.insert((r.station_id.as_str(), r.timestamp)))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn missing_count(&self, field: Field) -> usize {
        self.readings.iter().filter(|r| r.get(field).is_none()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.readings.iter().all(Reading::is_clean)
    }
}

impl From<Vec<Reading>> for RecordStore {
    fn from(readings: Vec<Reading>) -> Self {
        Self::new(readings)
    }
}

pub fn group_by_station(readings: &[Reading]) -> BTreeMap<&str, Vec<&Reading>> {
    let mut groups: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        groups
            .entry(reading.station_id.as_str())
            .or_default()
            .push(reading);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn raw(station: &str, ts: &str, pm25: &str) -> RawReading {
        RawReading {
            station_id: station.to_string(),
            timestamp: ts.to_string(),
            pm25: pm25.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_raw_counts_issues() {
        let rows = vec![
            raw("S001", "2025-07-15 10:00:00", "12.0"),
            raw("S001", "not a time", "13.0"),
            raw("", "2025-07-15 11:00:00", "14.0"),
            raw("S002", "2025-07-15 10:00:00", "bad"),
        ];

        let store = RecordStore::from_raw(&rows);
        let ingest = store.ingest_report();

        assert_eq!(store.len(), 2);
        assert_eq!(ingest.total_rows, 4);
        assert_eq!(ingest.accepted_rows, 2);
        assert_eq!(ingest.dropped_rows(), 2);
        assert_eq!(ingest.bad_timestamp_rows, 1);
        assert_eq!(ingest.empty_station_rows, 1);
        assert_eq!(ingest.malformed_count(Field::Pm25), 1);
        assert_eq!(store.missing_count(Field::Pm25), 1);
    }

    #[test]
    fn test_order_preserved_until_sorted() {
        let store = RecordStore::new(vec![
            Reading::new("S002", at(12)),
            Reading::new("S001", at(10)),
            Reading::new("S002", at(11)),
        ]);

        let ids: Vec<&str> = store.iter().map(|r| r.station_id.as_str()).collect();
        assert_eq!(ids, vec!["S002", "S001", "S002"]);

        let hours: Vec<NaiveDateTime> = store.sorted_by_timestamp().iter().map(|r| r.timestamp).collect();
        assert_eq!(hours, vec![at(10), at(11), at(12)]);

        let groups = store.by_station();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec!["S001", "S002"]);
        assert_eq!(groups["S002"][0].timestamp, at(12));
        assert_eq!(store.time_range(), Some((at(10), at(12))));
    }

    #[test]
    fn test_duplicate_detection() {
        let store = RecordStore::new(vec![
            Reading::new("S001", at(10)),
            Reading::new("S002", at(10)),
            Reading::new("S001", at(10)),
            Reading::new("S001", at(11)),
        ]);
        assert_eq!(store.duplicate_indices(), vec![2]);
    }
}
