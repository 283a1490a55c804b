use serde::Serialize;

use crate::analysis::snapshot::SnapshotResult;
use crate::analysis::stats::StatsSummary;
use crate::analysis::ProcessingSettings;
use crate::data::model::{ProcessedSeries, SeriesKey};
use crate::state::AnalysisSession;

// ---------------------------------------------------------------------------
// Machine-readable report for external charting
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct KeyedStats {
    pub key: SeriesKey,
    pub stats: StatsSummary,
}

#[derive(Debug, Serialize)]
pub struct KeyedSnapshot {
    pub key: SeriesKey,
    pub result: SnapshotResult,
}

#[derive(Debug, Serialize)]
pub struct SnapshotSection {
    pub target: f64,
    pub results: Vec<KeyedSnapshot>,
}

/// Series keys are structs, so every map is emitted as a list of entries.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub files_loaded: usize,
    pub metrics: Vec<String>,
    pub selected_metrics: &'a [String],
    pub settings: ProcessingSettings,
    pub stats: Vec<KeyedStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<&'a ProcessedSeries>>,
}

impl<'a> JsonReport<'a> {
    /// Collect the report from a session that has already been reprocessed.
    pub fn from_session(session: &'a AnalysisSession, snapshot_at: Option<f64>, include_series: bool) -> Self {
        JsonReport {
            files_loaded: session.store.len(),
            metrics: session.metrics(),
            selected_metrics: &session.selected_metrics,
            settings: session.settings,
            stats: session
                .stats()
                .into_iter()
                .map(|(key, stats)| KeyedStats { key, stats })
                .collect(),
            snapshot: snapshot_at.map(|target| SnapshotSection {
                target,
                results: session
                    .snapshot(target)
                    .into_iter()
                    .map(|(key, result)| KeyedSnapshot { key, result })
                    .collect(),
            }),
            series: include_series.then(|| session.processed.values().collect()),
        }
    }
}

pub fn render_json(session: &AnalysisSession, snapshot_at: Option<f64>, include_series: bool) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport::from_session(session, snapshot_at, include_series))
}
