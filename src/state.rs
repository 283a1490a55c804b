use std::collections::BTreeMap;
use std::path::Path;

use crate::analysis::pipeline::process;
use crate::analysis::snapshot::{snapshot, SnapshotResult};
use crate::analysis::stats::{summarize_all, StatsSummary};
use crate::analysis::ProcessingSettings;
use crate::data::error::LoadError;
use crate::data::filter::{default_selection, selected_keys};
use crate::data::loader;
use crate::data::model::{ProcessedSeries, SeriesKey, SourceDataset};
use crate::data::store::SeriesStore;

// ---------------------------------------------------------------------------
// Analysis session state
// ---------------------------------------------------------------------------

/// Everything one analysis session holds, independent of presentation.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    /// Every source loaded so far.
    pub store: SeriesStore,

    /// Metrics chosen for processing.
    pub selected_metrics: Vec<String>,

    /// Smoothing / derivative settings for the next `reprocess`.
    pub settings: ProcessingSettings,

    /// Result of the last `reprocess`, replaced wholesale each time.
    pub processed: BTreeMap<SeriesKey, ProcessedSeries>,

    /// Status line summarising the loaded files.
    pub status_message: Option<String>,
}

impl AnalysisSession {
    pub fn new(settings: ProcessingSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Load one file into the store and return its confirmation line.
    ///
    /// A failure leaves the store untouched.
    pub fn load_path(&mut self, path: &Path) -> Result<String, LoadError> {
        let dataset = loader::load_file(path)?;
        Ok(self.add_dataset(dataset))
    }

    /// Load an in-memory upload into the store.
    pub fn load_bytes(&mut self, bytes: impl Into<Vec<u8>>, source_name: &str) -> Result<String, LoadError> {
        let dataset = loader::load_bytes(bytes, source_name)?;
        Ok(self.add_dataset(dataset))
    }

    /// Append a parsed dataset, refresh the status line and make sure some
    /// metric is selected.
    pub fn add_dataset(&mut self, dataset: SourceDataset) -> String {
        let message = dataset.load_message();
        self.store.add(dataset);

        let snapshot = self.store.snapshot();
        self.status_message = Some(format!("Files loaded: {}", snapshot.len()));
        if self.selected_metrics.is_empty() {
            self.selected_metrics = default_selection(&snapshot);
        }
        message
    }

    /// Sorted catalog of every metric across loaded files.
    pub fn metrics(&self) -> Vec<String> {
        self.store.list_metrics()
    }

    /// Replace the metric selection.
    pub fn set_selected_metrics(&mut self, metrics: Vec<String>) {
        self.selected_metrics = metrics;
    }

    /// Recompute the processed set from the current store and settings.
    pub fn reprocess(&mut self) -> &BTreeMap<SeriesKey, ProcessedSeries> {
        let snapshot = self.store.snapshot();
        self.processed = process(&snapshot, &self.selected_metrics, &self.settings);
        &self.processed
    }

    /// Keys the current selection expands to, including sources lacking a metric.
    pub fn selected_keys(&self) -> Vec<SeriesKey> {
        selected_keys(&self.store.snapshot(), &self.selected_metrics)
    }

    /// Nearest-sample values at `time_delta` for every selected key.
    pub fn snapshot(&self, time_delta: f64) -> BTreeMap<SeriesKey, SnapshotResult> {
        snapshot(&self.processed, &self.selected_keys(), time_delta)
    }

    /// Statistics over the current processed set.
    pub fn stats(&self) -> BTreeMap<SeriesKey, StatsSummary> {
        summarize_all(&self.processed)
    }
}
