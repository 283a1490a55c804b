use std::collections::BTreeSet;

use super::model::SeriesKey;
use super::store::StoreSnapshot;

// ---------------------------------------------------------------------------
// Metric selection → series keys
// ---------------------------------------------------------------------------

/// Expand selected metric names into one key per (source, metric).
///
/// Sources come in load order, metrics in selection order with duplicates
/// dropped. Every source is paired with every metric, including sources
/// that never recorded it, so that queries can report "no data" for them.
pub fn selected_keys(snapshot: &StoreSnapshot, metrics: &[String]) -> Vec<SeriesKey> {
    let mut seen = BTreeSet::new();
    let metrics: Vec<&String> = metrics.iter().filter(|m| seen.insert(m.as_str())).collect();

    snapshot
        .sources
        .iter()
        .flat_map(|source| {
            metrics
                .iter()
                .map(move |metric| SeriesKey::new(source.id.clone(), metric.as_str()))
        })
        .collect()
}

/// Default selection after a load: the first metric of the catalog, if any.
pub fn default_selection(snapshot: &StoreSnapshot) -> Vec<String> {
    snapshot.list_metrics().into_iter().take(1).collect()
}
