use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ProcessingError, Result};
use crate::models::{AggregateStats, Field, Reading};
use crate::utils::statistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    Highest,
    Lowest,
}

/// One station's position in a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRank {
    pub station_id: String,
    pub value: f64,
}

/// A day whose mean concentration exceeded the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExceedance {
    pub date: NaiveDate,
    pub mean: f64,
}

/// Station-level extremes and threshold checks
#[derive(Debug, Clone, Copy, Default)]
pub struct StationRanker;

impl StationRanker {
    pub fn new() -> Self {
        Self
    }

    /// Stations ordered by the metric's mean. Ties are broken by station id
    /// ascending in both directions; stations without the metric are skipped.
    pub fn rank(
        &self,
        grouped: &BTreeMap<String, AggregateStats>,
        metric: Field,
        order: RankOrder,
    ) -> Vec<StationRank> {
        let mut ranking: Vec<StationRank> = grouped
            .iter()
            .filter_map(|(station_id, stats)| {
                Some(StationRank {
                    station_id: station_id.clone(),
                    value: stats.mean(metric)?,
                })
            })
            .collect();

        ranking.sort_by(|a, b| {
            let by_value = match order {
                RankOrder::Highest => b.value.total_cmp(&a.value),
                RankOrder::Lowest => a.value.total_cmp(&b.value),
            };
            by_value.then_with(|| a.station_id.cmp(&b.station_id))
        });

        ranking
    }

    pub fn highest(&self, grouped: &BTreeMap<String, AggregateStats>, metric: Field) -> Option<StationRank> {
        self.rank(grouped, metric, RankOrder::Highest).into_iter().next()
    }

    pub fn lowest(&self, grouped: &BTreeMap<String, AggregateStats>, metric: Field) -> Option<StationRank> {
        self.rank(grouped, metric, RankOrder::Lowest).into_iter().next()
    }

    /// Mean of a station's readings per calendar date, in date order
    pub fn daily_means(&self, records: &[Reading], station_id: &str, field: Field) -> BTreeMap<NaiveDate, f64> {
        let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for reading in records.iter().filter(|r| r.station_id == station_id) {
            if let Some(value) = reading.get(field) {
                days.entry(reading.date()).or_default().push(value);
            }
        }

        days.into_iter()
            .filter_map(|(date, values)| Some((date, statistics::mean(&values)?)))
            .collect()
    }

    /// Days whose mean strictly exceeds `threshold`, sorted by date
    pub fn exceedance_days(
        &self,
        records: &[Reading],
        station_id: &str,
        pollutant: Field,
        threshold: f64,
    ) -> Result<Vec<DailyExceedance>> {
        if !records.iter().any(|r| r.station_id == station_id) {
            return Err(ProcessingError::no_data(
                station_id,
                pollutant,
                "station has no readings",
            ));
        }

        Ok(self
            .daily_means(records, station_id, pollutant)
            .into_iter()
            .filter(|(_, mean)| *mean > threshold)
            .map(|(date, mean)| DailyExceedance { date, mean })
            .collect())
    }
}
