use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError};

use crate::error::{ProcessingError, Result};
use crate::models::{Field, IngestReport, Reading, RecordStore};
use crate::utils::constants::{
    DEFAULT_MIN_STATION_SAMPLES, DEFAULT_OUTLIER_K, MAX_HUMIDITY, MAX_OUTLIER_PASSES,
    MIN_CONCENTRATION, MIN_HUMIDITY,
};
use crate::utils::statistics;

/// Tunable parameters of the cleaning pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CleaningPolicy {
    /// Valid values a station needs before its own mean is used for imputation
    #[validate(range(min = 1))]
    pub min_station_samples: usize,

    /// Multiplier of the IQR above the station median that marks an outlier
    #[validate(range(min = 1.0), custom(function = "validate_finite"))]
    pub outlier_k: f64,

    pub drop_duplicates: bool,

    /// Fail instead of falling back to the global mean when a station has no
    /// valid value for a column
    pub require_station_data: bool,
}

/// Rejects NaN and infinities, which `range` lets through
fn validate_finite(value: f64) -> std::result::Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new("not_finite"));
    }
    Ok(())
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self {
            min_station_samples: DEFAULT_MIN_STATION_SAMPLES,
            outlier_k: DEFAULT_OUTLIER_K,
            drop_duplicates: true,
            require_station_data: false,
        }
    }
}

impl CleaningPolicy {
    pub fn with_min_station_samples(mut self, samples: usize) -> Self {
        self.min_station_samples = samples;
        self
    }

    pub fn with_outlier_k(mut self, k: f64) -> Self {
        self.outlier_k = k;
        self
    }

    pub fn with_drop_duplicates(mut self, drop_duplicates: bool) -> Self {
        self.drop_duplicates = drop_duplicates;
        self
    }

    pub fn with_require_station_data(mut self, require: bool) -> Self {
        self.require_station_data = require;
        self
    }
}

/// Per-column repair counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldCorrections {
    pub missing_imputed: usize,
    pub negative_corrected: usize,
    pub outlier_corrected: usize,
    pub clamped: usize,
    /// Unparseable source values; these were also imputed as missing
    pub malformed: usize,
}

impl FieldCorrections {
    pub fn total(&self) -> usize {
        self.missing_imputed + self.negative_corrected + self.outlier_corrected + self.clamped
    }
}

/// Audit trail of everything the cleaner changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub input_records: usize,
    pub output_records: usize,
    pub dropped_records: usize,
    pub duplicates_removed: usize,
    pub fields: BTreeMap<Field, FieldCorrections>,
}

impl CleaningReport {
    pub fn field(&self, field: Field) -> FieldCorrections {
        self.fields.get(&field).copied().unwrap_or_default()
    }

    pub fn total_corrections(&self) -> usize {
        self.fields.values().map(FieldCorrections::total).sum()
    }

    /// Fold ingestion issues into the report
    pub fn merge_ingest(&mut self, ingest: &IngestReport) {
        self.dropped_records += ingest.dropped_rows();
        for (field, count) in &ingest.malformed {
            self.fields.entry(*field).or_default().malformed += count;
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Cleaning Report ===\n");
        summary.push_str(&format!("Input Records: {}\n", self.input_records));
        summary.push_str(&format!("Output Records: {}\n", self.output_records));
        summary.push_str(&format!("Dropped Records: {}\n", self.dropped_records));
        summary.push_str(&format!("Duplicates Removed: {}\n", self.duplicates_removed));
        summary.push_str(&format!(
            "\n{:<12} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
            "column", "imputed", "negative", "outlier", "clamped", "malformed"
        ));
        for (field, c) in &self.fields {
            summary.push_str(&format!(
                "{:<12} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
                field.name(),
                c.missing_imputed,
                c.negative_corrected,
                c.outlier_corrected,
                c.clamped,
                c.malformed
            ));
        }
        summary.push_str(&format!("\nTotal Corrections: {}\n", self.total_corrections()));

        summary
    }
}

/// Repairs missing and invalid measurements, producing new readings
pub struct Cleaner {
    policy: CleaningPolicy,
}

impl Cleaner {
    pub fn new(policy: CleaningPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &CleaningPolicy {
        &self.policy
    }

    /// Clean a store, carrying its ingestion issues into the report
    pub fn clean_store(&self, store: &RecordStore) -> Result<(RecordStore, CleaningReport)> {
        let (readings, mut report) = self.clean(store.readings())?;
        report.merge_ingest(store.ingest_report());
        report.input_records = store.ingest_report().total_rows.max(report.input_records);
        Ok((RecordStore::new(readings), report))
    }

    /// Clean a sequence of readings. The input is left untouched; identity
    /// (station_id, timestamp) is preserved on every output reading.
    pub fn clean(&self, records: &[Reading]) -> Result<(Vec<Reading>, CleaningReport)> {
        let mut report = CleaningReport {
            input_records: records.len(),
            ..Default::default()
        };

        let mut cleaned: Vec<Reading> = if self.policy.drop_duplicates {
            let mut seen = HashSet::new();
            records
                .iter()
                .filter(|r| seen.insert((r.station_id.as_str(), r.timestamp)))
                .cloned()
                .collect()
        } else {
            records.to_vec()
        };
        report.duplicates_removed = records.len() - cleaned.len();

        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, reading) in cleaned.iter().enumerate() {
            groups.entry(reading.station_id.clone()).or_default().push(i);
        }

        for field in Field::ALL {
            let corrections = self.clean_column(&mut cleaned, &groups, field)?;
            report.fields.insert(field, corrections);
        }

        report.output_records = cleaned.len();

        info!(
            "Cleaning complete: {} -> {} readings across {} stations ({} corrections, {} duplicates removed)",
            report.input_records,
            report.output_records,
            groups.len(),
            report.total_corrections(),
            report.duplicates_removed
        );

        Ok((cleaned, report))
    }

    fn clean_column(
        &self,
        readings: &mut [Reading],
        groups: &BTreeMap<String, Vec<usize>>,
        field: Field,
    ) -> Result<FieldCorrections> {
        let mut corrections = FieldCorrections::default();

        // Domain repair: negatives become holes, humidity is clamped
        for reading in readings.iter_mut() {
            let slot = field.slot(reading);
            match *slot {
                None => corrections.missing_imputed += 1,
                Some(v) if field.is_pollutant() && v < MIN_CONCENTRATION => {
                    corrections.negative_corrected += 1;
                    *slot = None;
                }
                Some(v) if field == Field::Humidity && !(MIN_HUMIDITY..=MAX_HUMIDITY).contains(&v) => {
                    corrections.clamped += 1;
                    *slot = Some(v.clamp(MIN_HUMIDITY, MAX_HUMIDITY));
                }
                Some(_) => {}
            }
        }

        let mut outliers = BTreeSet::new();
        for (station_id, indices) in groups {
            self.correct_outliers(readings, station_id, indices, field, &mut outliers);
        }

        let global_values: Vec<f64> = readings.iter().filter_map(|r| field.value(r)).collect();
        let global_mean = statistics::bounded_mean(&global_values);
        let mut filled = BTreeSet::new();

        for (station_id, indices) in groups {
            let holes: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&i| field.value(&readings[i]).is_none())
                .collect();
            if holes.is_empty() {
                continue;
            }

            let station_values: Vec<f64> = indices
                .iter()
                .filter_map(|&i| field.value(&readings[i]))
                .collect();

            let insufficient = || ProcessingError::InsufficientData {
                station_id: station_id.clone(),
                field: field.to_string(),
            };

            if station_values.is_empty() && self.policy.require_station_data {
                return Err(insufficient());
            }

            let fill = if station_values.len() >= self.policy.min_station_samples {
                statistics::bounded_mean(&station_values)
            } else {
                debug!(
                    "Station {} has {} valid {} values, imputing with global mean",
                    station_id,
                    station_values.len(),
                    field
                );
                global_mean
            }
            .ok_or_else(insufficient)?;

            for i in holes {
                *field.slot(&mut readings[i]) = Some(fill);
                filled.insert(i);
            }

            // Imputed values shift the quartiles; settle the column again
            self.correct_outliers(readings, station_id, indices, field, &mut outliers);
        }

        // A filled hole replaced again by the settling pass stays counted as imputed
        corrections.outlier_corrected = outliers.difference(&filled).count();
        Ok(corrections)
    }

    /// Replace values above `median + k * IQR` with the station median until
    /// none remain
    fn correct_outliers(
        &self,
        readings: &mut [Reading],
        station_id: &str,
        indices: &[usize],
        field: Field,
        corrected: &mut BTreeSet<usize>,
    ) {
        for _ in 0..MAX_OUTLIER_PASSES {
            let values: Vec<f64> = indices
                .iter()
                .filter_map(|&i| field.value(&readings[i]))
                .collect();

            let Some(threshold) = self.outlier_threshold(&values) else {
                return;
            };
            let Some(median) = statistics::median(&values) else {
                return;
            };

            let flagged: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&i| matches!(field.value(&readings[i]), Some(v) if v > threshold))
                .collect();

            if flagged.is_empty() {
                return;
            }

            for i in flagged {
                *field.slot(&mut readings[i]) = Some(median);
                corrected.insert(i);
            }
        }

        warn!(
            "Outlier correction for station {} ({}) did not settle after {} passes",
            station_id, field, MAX_OUTLIER_PASSES
        );
    }

    /// Upper outlier bound for a station column, `None` when it has no values
    pub fn outlier_threshold(&self, values: &[f64]) -> Option<f64> {
        let median = statistics::median(values)?;
        let (q1, q3) = statistics::quartiles(values)?;
        Some(median + self.policy.outlier_k * (q3 - q1))
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self {
            policy: CleaningPolicy::default(),
        }
    }
}
