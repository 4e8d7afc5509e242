use crate::analyzers::AqiClassifier;
use crate::error::{ProcessingError, Result};
use crate::models::{AggregateStats, Field, RecordStore};
use crate::processors::{Aggregator, Cleaner, CleaningReport, RankOrder, StationRank, StationRanker};
use crate::readers::ReadingReader;
use crate::utils::progress::ProgressReporter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Highest and lowest station averages for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRanking {
    pub highest: Vec<StationRank>,
    pub lowest: Vec<StationRank>,
}

/// Everything a full run produces, in serializable form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub cleaning: CleaningReport,
    pub global: AggregateStats,
    pub stations: BTreeMap<String, AggregateStats>,
    pub rankings: BTreeMap<Field, FieldRanking>,
    pub aqi_distribution: Vec<(String, usize)>,
}

impl AnalysisReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&self.cleaning.summary());
        summary.push_str("\n=== Global Statistics ===\n");
        summary.push_str(&self.global.summary());

        summary.push_str(&format!("\n=== Stations ({}) ===\n", self.stations.len()));
        for (field, ranking) in &self.rankings {
            if let (Some(top), Some(bottom)) = (ranking.highest.first(), ranking.lowest.first()) {
                summary.push_str(&format!(
                    "{:<12} highest {} ({:.2}), lowest {} ({:.2})\n",
                    field.name(),
                    top.station_id,
                    top.value,
                    bottom.station_id,
                    bottom.value
                ));
            }
        }

        summary.push_str("\n=== PM2.5 AQI Categories ===\n");
        for (category, count) in &self.aqi_distribution {
            summary.push_str(&format!("{:<32} {:>8}\n", category, count));
        }

        summary
    }
}

/// Runs read, clean and aggregate stages on a bounded worker pool
pub struct AnalysisPipeline {
    max_workers: usize,
    cleaner: Cleaner,
    classifier: AqiClassifier,
}

impl AnalysisPipeline {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            cleaner: Cleaner::default(),
            classifier: AqiClassifier::default(),
        }
    }

    pub fn with_cleaner(mut self, cleaner: Cleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn with_classifier(mut self, classifier: AqiClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn cleaner(&self) -> &Cleaner {
        &self.cleaner
    }

    pub fn classifier(&self) -> &AqiClassifier {
        &self.classifier
    }

    /// Read and clean a CSV file
    pub fn clean_file(
        &self,
        path: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<(RecordStore, CleaningReport)> {
        if let Some(p) = progress {
            p.set_message(&format!("Reading {}...", path.display()));
        }
        let store = ReadingReader::new().read_file(path)?;

        if let Some(p) = progress {
            p.set_message(&format!("Cleaning {} readings...", store.len()));
        }
        self.cleaner.clean_store(&store)
    }

    /// Global and per-station statistics; stations are processed on a pool
    /// of `max_workers` threads
    pub fn aggregate(&self, store: &RecordStore) -> Result<(AggregateStats, BTreeMap<String, AggregateStats>)> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let aggregator = Aggregator::new();
        let (global, stations) = pool.install(|| {
            rayon::join(
                || aggregator.aggregate_global(store.readings()),
                || aggregator.aggregate_by_station(store.readings()),
            )
        });

        Ok((global, stations))
    }

    /// Full run over an already-cleaned store
    pub fn analyze_store(
        &self,
        store: &RecordStore,
        cleaning: CleaningReport,
        progress: Option<&ProgressReporter>,
    ) -> Result<AnalysisReport> {
        if let Some(p) = progress {
            p.set_message(&format!(
                "Aggregating {} stations on {} workers...",
                store.stations().len(),
                self.max_workers
            ));
        }
        let (global, stations) = self.aggregate(store)?;

        if let Some(p) = progress {
            p.set_message("Ranking stations...");
        }
        let ranker = StationRanker::new();
        let rankings = Field::ALL
            .iter()
            .map(|field| {
                let ranking = FieldRanking {
                    highest: ranker.rank(&stations, *field, RankOrder::Highest),
                    lowest: ranker.rank(&stations, *field, RankOrder::Lowest),
                };
                (*field, ranking)
            })
            .collect();

        let aqi_distribution = self.classifier.category_distribution(store.readings());

        info!(
            "Analyzed {} readings from {} stations",
            global.record_count,
            stations.len()
        );

        if let Some(p) = progress {
            p.finish_with_message("Analysis complete");
        }

        Ok(AnalysisReport {
            cleaning,
            global,
            stations,
            rankings,
            aqi_distribution,
        })
    }

    /// Read, clean and analyze a CSV file
    pub fn analyze_file(&self, path: &Path, progress: Option<&ProgressReporter>) -> Result<AnalysisReport> {
        let (store, cleaning) = self.clean_file(path, progress)?;
        self.analyze_store(&store, cleaning, progress)
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
