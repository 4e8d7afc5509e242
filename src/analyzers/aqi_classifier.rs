use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::Reading;

/// One row of a PM2.5 breakpoint table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub low: f64,
    pub high: f64,
    pub index_low: u32,
    pub index_high: u32,
    pub category: String,
}

impl Breakpoint {
    pub fn new(low: f64, high: f64, index_low: u32, index_high: u32, category: &str) -> Self {
        Self {
            low,
            high,
            index_low,
            index_high,
            category: category.to_string(),
        }
    }

    fn interpolate(&self, concentration: f64) -> f64 {
        let span = f64::from(self.index_high - self.index_low);
        f64::from(self.index_low) + span / (self.high - self.low) * (concentration - self.low)
    }
}

/// An ascending, contiguous breakpoint table. Only constructed through
/// validation, so a classifier never sees a partially valid table.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    rows: Vec<Breakpoint>,
}

impl BreakpointTable {
    pub fn new(rows: Vec<Breakpoint>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ProcessingError::Config("breakpoint table is empty".to_string()));
        }

        for (i, row) in rows.iter().enumerate() {
            if !row.low.is_finite() || !row.high.is_finite() {
                return Err(ProcessingError::Config(format!(
                    "breakpoint {} has non-finite bounds",
                    i
                )));
            }
            if row.low >= row.high {
                return Err(ProcessingError::Config(format!(
                    "breakpoint {} low {} is not below high {}",
                    i, row.low, row.high
                )));
            }
            if row.index_low > row.index_high {
                return Err(ProcessingError::Config(format!(
                    "breakpoint {} index_low {} exceeds index_high {}",
                    i, row.index_low, row.index_high
                )));
            }
            if row.category.trim().is_empty() {
                return Err(ProcessingError::Config(format!("breakpoint {} has no category", i)));
            }
        }

        for (i, pair) in rows.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.low != prev.high {
                return Err(ProcessingError::Config(format!(
                    "breakpoints {} and {} are not contiguous ({} != {})",
                    i,
                    i + 1,
                    prev.high,
                    next.low
                )));
            }
            if next.index_low < prev.index_high {
                return Err(ProcessingError::Config(format!(
                    "breakpoint {} index range overlaps the previous one",
                    i + 1
                )));
            }
        }

        Ok(Self { rows })
    }

    /// Contiguous form of the standard PM2.5 categories
    pub fn standard() -> Self {
        Self {
            rows: vec![
                Breakpoint::new(0.0, 12.1, 0, 50, "Good"),
                Breakpoint::new(12.1, 35.5, 51, 100, "Moderate"),
                Breakpoint::new(35.5, 55.5, 101, 150, "Unhealthy for Sensitive Groups"),
                Breakpoint::new(55.5, 150.5, 151, 200, "Unhealthy"),
                Breakpoint::new(150.5, 250.5, 201, 300, "Very Unhealthy"),
                Breakpoint::new(250.5, 500.5, 301, 500, "Hazardous"),
            ],
        }
    }

    pub fn rows(&self) -> &[Breakpoint] {
        &self.rows
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.category.as_str())
    }

    fn top(&self) -> &Breakpoint {
        // non-empty by construction
        &self.rows[self.rows.len() - 1]
    }

    /// Row whose `[low, high)` range holds the concentration; the last row is
    /// closed at `high`.
    fn locate(&self, concentration: f64) -> Option<&Breakpoint> {
        let last = self.rows.len() - 1;
        self.rows.iter().enumerate().find_map(|(i, row)| {
            let below_high = if i == last {
                concentration <= row.high
            } else {
                concentration < row.high
            };
            (concentration >= row.low && below_high).then_some(row)
        })
    }
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiResult {
    pub pm25_value: f64,
    pub index_score: u32,
    pub category: String,
}

/// Maps PM2.5 concentrations onto the index scale
#[derive(Debug, Clone, Default)]
pub struct AqiClassifier {
    table: BreakpointTable,
}

impl AqiClassifier {
    pub fn new(table: BreakpointTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &BreakpointTable {
        &self.table
    }

    pub fn classify(&self, pm25: f64) -> AqiResult {
        let concentration = match pm25 {
            v if v.is_nan() || v < 0.0 => 0.0,
            v => v,
        };

        let (index, category) = match self.table.locate(concentration) {
            Some(row) => (row.interpolate(concentration).round(), &row.category),
            None if concentration >= self.table.top().high => {
                let top = self.table.top();
                (f64::from(top.index_high), &top.category)
            }
            None => {
                // below the first row when the table does not start at 0
                let first = &self.table.rows[0];
                (f64::from(first.index_low), &first.category)
            }
        };

        AqiResult {
            pm25_value: concentration,
            index_score: index as u32,
            category: category.clone(),
        }
    }

    /// Classify every reading that has a PM2.5 value, in input order
    pub fn classify_all(&self, records: &[Reading]) -> Vec<Option<AqiResult>> {
        records.iter().map(|r| r.pm25.map(|v| self.classify(v))).collect()
    }

    /// Readings per category in table order; categories with no readings
    /// are reported with a zero count.
    pub fn category_distribution(&self, records: &[Reading]) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> =
            self.table.categories().map(|c| (c.to_string(), 0)).collect();

        for result in self.classify_all(records).into_iter().flatten() {
            if let Some(entry) = counts.iter_mut().find(|(c, _)| *c == result.category) {
                entry.1 += 1;
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;
    use chrono::NaiveDate;

    #[test]
    fn test_zero_is_good_with_lowest_index() {
        let result = AqiClassifier::default().classify(0.0);
        assert_eq!(result.category, "Good");
        assert_eq!(result.index_score, 0);
        assert_eq!(result.pm25_value, 0.0);
    }

    #[test]
    fn test_negative_and_nan_clamped_to_zero() {
        let classifier = AqiClassifier::default();
        assert_eq!(classifier.classify(-5.0), classifier.classify(0.0));
        assert_eq!(classifier.classify(f64::NAN), classifier.classify(0.0));
    }

    #[test]
    fn test_above_table_caps_index() {
        let classifier = AqiClassifier::default();
        for value in [500.5, 600.0, 10_000.0, f64::INFINITY] {
            let result = classifier.classify(value);
            assert_eq!(result.category, "Hazardous");
            assert_eq!(result.index_score, 500);
        }
    }

    #[test]
    fn test_known_values() {
        let classifier = AqiClassifier::default();
        assert_eq!(classifier.classify(12.0).category, "Good");
        assert_eq!(classifier.classify(35.0).category, "Moderate");
        assert_eq!(classifier.classify(75.0).category, "Unhealthy");
        assert_eq!(classifier.classify(200.0).category, "Very Unhealthy");
        assert_eq!(classifier.classify(55.5).index_score, 151);
    }

    #[test]
    fn test_monotonic() {
        let classifier = AqiClassifier::default();
        let mut previous = 0;
        let mut value = 0.0;
        while value < 700.0 {
            let score = classifier.classify(value).index_score;
            assert!(score >= previous, "score dropped at {}", value);
            previous = score;
            value += 0.05;
        }
    }

    #[test]
    fn test_boundary_steps_by_one() {
        let classifier = AqiClassifier::default();
        for pair in classifier.table().rows().windows(2) {
            let boundary = pair[1].low;
            let below = classifier.classify(boundary - 1e-9).index_score;
            let at = classifier.classify(boundary).index_score;
            assert_eq!(at - below, 1, "boundary {}", boundary);
        }
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let good = BreakpointTable::standard().rows().to_vec();

        assert!(BreakpointTable::new(vec![]).is_err());

        let mut gap = good.clone();
        gap[1].low = 13.0;
        assert!(matches!(BreakpointTable::new(gap), Err(ProcessingError::Config(_))));

        let mut descending = good.clone();
        descending.swap(0, 1);
        assert!(BreakpointTable::new(descending).is_err());

        let mut inverted = good.clone();
        inverted[2].index_low = 200;
        assert!(BreakpointTable::new(inverted).is_err());

        let mut unlabeled = good.clone();
        unlabeled[0].category = " ".to_string();
        assert!(BreakpointTable::new(unlabeled).is_err());

        assert!(BreakpointTable::new(good).is_ok());
    }

    #[test]
    fn test_category_distribution() {
        let ts = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let records = vec![
            Reading::new("S001", ts).with(Field::Pm25, 5.0),
            Reading::new("S001", ts).with(Field::Pm25, 8.0),
            Reading::new("S002", ts).with(Field::Pm25, 70.0),
            Reading::new("S003", ts),
        ];

        let classifier = AqiClassifier::default();
        let distribution = classifier.category_distribution(&records);
        assert_eq!(distribution.len(), 6);
        assert_eq!(distribution[0], ("Good".to_string(), 2));
        assert_eq!(distribution[3], ("Unhealthy".to_string(), 1));
        assert_eq!(distribution.iter().map(|(_, n)| n).sum::<usize>(), 3);

        let all = classifier.classify_all(&records);
        assert!(all[3].is_none());
    }
}
