use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::model::{SeriesKey, SourceDataset, SourceId, TimedRecord};

// ---------------------------------------------------------------------------
// SeriesStore – append-only collection of loaded sources
// ---------------------------------------------------------------------------

/// A loaded dataset together with its identity in the store.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub id: SourceId,
    pub dataset: Arc<SourceDataset>,
}

/// Immutable view of the store at one point in time.
///
/// `version` counts appended sources, so two snapshots with the same
/// version hold the same data.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub version: u64,
    pub sources: Vec<LoadedSource>,
}

impl StoreSnapshot {
    /// All distinct metric names across every source, sorted.
    pub fn list_metrics(&self) -> Vec<String> {
        let metrics: BTreeSet<&str> = self
            .sources
            .iter()
            .flat_map(|s| s.dataset.records.iter().map(|r| r.record.metric.as_str()))
            .collect();
        metrics.into_iter().map(str::to_string).collect()
    }

    /// Records of one series ordered by time delta. Equal deltas keep their
    /// input order. Empty when the source or metric is unknown.
    pub fn slice(&self, key: &SeriesKey) -> Vec<&TimedRecord> {
        let Some(source) = self.source(&key.source) else {
            return Vec::new();
        };

        let mut records: Vec<&TimedRecord> = source
            .dataset
            .records
            .iter()
            .filter(|r| r.record.metric == key.metric)
            .collect();
        // `sort_by` is stable.
        records.sort_by(|a, b| a.time_delta.total_cmp(&b.time_delta));
        records
    }

    /// Look a source up by identity.
    pub fn source(&self, id: &SourceId) -> Option<&LoadedSource> {
        self.sources.get(id.index).filter(|s| s.id == *id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Accumulates every source loaded during a session.
///
/// Readers take a cheap [`StoreSnapshot`] and never see a half-finished
/// append: `add` builds the next snapshot off to the side and swaps it in
/// atomically.
#[derive(Debug, Default)]
pub struct SeriesStore {
    current: ArcSwap<StoreSnapshot>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dataset. Same-named sources are kept side by side.
    pub fn add(&self, dataset: SourceDataset) -> SourceId {
        let dataset = Arc::new(dataset);

        // `rcu` may rerun the closure if another writer got in first.
        let previous = self.current.rcu(|snap| {
            let mut sources = snap.sources.clone();
            sources.push(LoadedSource {
                id: SourceId {
                    index: snap.sources.len(),
                    name: dataset.name.clone(),
                },
                dataset: Arc::clone(&dataset),
            });
            StoreSnapshot {
                version: snap.version + 1,
                sources,
            }
        });

        let id = SourceId {
            index: previous.sources.len(),
            name: dataset.name.clone(),
        };
        log::info!(
            "Added source #{} '{}' (store version {})",
            id.index,
            id.name,
            previous.version + 1
        );
        id
    }

    /// The current state of the store.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.current.load_full()
    }

    pub fn list_metrics(&self) -> Vec<String> {
        self.snapshot().list_metrics()
    }

    /// Owned copy of one series' records, sorted by time delta.
    pub fn slice(&self, key: &SeriesKey) -> Vec<TimedRecord> {
        self.snapshot().slice(key).into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
