use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::record_store::group_by_station;
use crate::models::{AggregateStats, ColumnStats, CorrelationMatrix, Field, GroupBy, GroupKey, Reading};
use crate::utils::statistics;

/// Computes descriptive statistics and correlations over readings
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate globally or per station. Grouped mode keeps every station,
    /// including those with a single reading.
    pub fn aggregate(&self, records: &[Reading], group_by: GroupBy) -> BTreeMap<GroupKey, AggregateStats> {
        match group_by {
            GroupBy::None => BTreeMap::from([(GroupKey::All, self.aggregate_global(records))]),
            GroupBy::Station => self
                .aggregate_by_station(records)
                .into_iter()
                .map(|(station, stats)| (GroupKey::Station(station), stats))
                .collect(),
        }
    }

    pub fn aggregate_global(&self, records: &[Reading]) -> AggregateStats {
        let refs: Vec<&Reading> = records.iter().collect();
        compute_stats(&refs)
    }

    /// Per-station statistics. Stations are reduced in parallel on the
    /// current rayon pool and merged into an ordered map.
    pub fn aggregate_by_station(&self, records: &[Reading]) -> BTreeMap<String, AggregateStats> {
        let groups: Vec<(&str, Vec<&Reading>)> = group_by_station(records).into_iter().collect();
        debug!("Aggregating {} readings across {} stations", records.len(), groups.len());

        groups
            .par_iter()
            .map(|(station, readings)| (station.to_string(), compute_stats(readings)))
            .collect()
    }
}

fn compute_stats(readings: &[&Reading]) -> AggregateStats {
    let mut columns = BTreeMap::new();
    for field in Field::ALL {
        let values: Vec<f64> = readings.iter().filter_map(|r| r.get(field)).collect();
        if let Some(stats) = column_stats(&values) {
            columns.insert(field, stats);
        }
    }

    AggregateStats {
        record_count: readings.len(),
        columns,
        correlation: correlation_matrix(readings),
    }
}

/// Statistics of one column, `None` when it has no values
pub fn column_stats(values: &[f64]) -> Option<ColumnStats> {
    let sorted = statistics::sorted(values);
    let min = *sorted.first()?;
    let max = *sorted.last()?;

    Some(ColumnStats {
        count: sorted.len(),
        mean: statistics::mean(&sorted)?,
        median: statistics::quantile_sorted(&sorted, 0.5)?,
        q1: statistics::quantile_sorted(&sorted, 0.25)?,
        q3: statistics::quantile_sorted(&sorted, 0.75)?,
        std: statistics::std_dev(&sorted),
        min,
        max,
    })
}

/// Pearson correlation for every column pair over rows where both are present
pub fn correlation_matrix(readings: &[&Reading]) -> CorrelationMatrix {
    let mut matrix = CorrelationMatrix::default();

    for (i, a) in Field::ALL.iter().enumerate() {
        for b in &Field::ALL[i..] {
            let pairs: Vec<(f64, f64)> = readings
                .iter()
                .filter_map(|r| Some((r.get(*a)?, r.get(*b)?)))
                .collect();
            matrix.insert(*a, *b, statistics::pearson(&pairs));
        }
    }

    matrix
}
