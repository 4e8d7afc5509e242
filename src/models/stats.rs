use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::Field;

/// Descriptive statistics of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// 25th percentile
    pub q1: f64,
    /// 75th percentile
    pub q3: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Pairwise Pearson correlations between the measurement columns
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrelationMatrix {
    values: BTreeMap<Field, BTreeMap<Field, f64>>,
}

impl CorrelationMatrix {
    pub fn insert(&mut self, a: Field, b: Field, value: f64) {
        self.values.entry(a).or_default().insert(b, value);
        self.values.entry(b).or_default().insert(a, value);
    }

    /// Correlation between two columns; 0 when it was never computed
    pub fn get(&self, a: Field, b: Field) -> f64 {
        self.values
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    /// Most strongly correlated distinct pairs, strongest first
    pub fn strongest_pairs(&self, limit: usize) -> Vec<(Field, Field, f64)> {
        let mut pairs: Vec<(Field, Field, f64)> = self
            .values
            .iter()
            .flat_map(|(a, row)| {
                row.iter()
                    .filter(move |(b, _)| a < *b)
                    .map(move |(b, v)| (*a, *b, *v))
            })
            .collect();
        pairs.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()).then(x.0.cmp(&y.0)).then(x.1.cmp(&y.1)));
        pairs.truncate(limit);
        pairs
    }
}

/// Statistics over a set of readings; created once, never mutated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub record_count: usize,
    pub columns: BTreeMap<Field, ColumnStats>,
    pub correlation: CorrelationMatrix,
}

impl AggregateStats {
    pub fn column(&self, field: Field) -> Option<&ColumnStats> {
        self.columns.get(&field)
    }

    pub fn mean(&self, field: Field) -> Option<f64> {
        self.column(field).map(|c| c.mean)
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("Records: {}\n", self.record_count);
        summary.push_str(&format!(
            "{:<12} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        ));
        for (field, stats) in &self.columns {
            summary.push_str(&format!(
                "{:<12} {:>7} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}\n",
                field.name(),
                stats.count,
                stats.mean,
                stats.std,
                stats.min,
                stats.q1,
                stats.median,
                stats.q3,
                stats.max
            ));
        }
        summary
    }
}

/// How readings are partitioned before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    None,
    Station,
}

/// Key of an aggregation group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    All,
    Station(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("all"),
            GroupKey::Station(id) => f.write_str(id),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
