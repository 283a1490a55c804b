use std::collections::BTreeMap;

use crate::data::filter::selected_keys;
use crate::data::model::{ProcessedSeries, Sample, SeriesKey};
use crate::data::store::StoreSnapshot;

use super::{derivative, smoothing, ProcessingSettings};

// ---------------------------------------------------------------------------
// Series processing: slice → smooth → differentiate
// ---------------------------------------------------------------------------

/// Process one series. `None` when the source has no records of the metric.
pub fn process_series(
    snapshot: &StoreSnapshot,
    key: &SeriesKey,
    settings: &ProcessingSettings,
) -> Option<ProcessedSeries> {
    let records = snapshot.slice(key);
    if records.is_empty() {
        return None;
    }

    let values: Vec<f64> = records.iter().map(|r| r.record.value).collect();
    let smoothed = smoothing::smooth(&values, settings.smoothing);

    let samples: Vec<Sample> = records
        .iter()
        .zip(smoothed)
        .map(|(r, smoothed)| Sample {
            time_delta: r.time_delta,
            value: r.record.value,
            smoothed,
            derivative: None,
        })
        .collect();

    Some(ProcessedSeries {
        key: key.clone(),
        samples: derivative::estimate(samples, settings.ignore_initial_transient),
    })
}

/// Process every (source, metric) pair for the selected metrics.
///
/// Pairs whose source never recorded the metric are left out of the result.
/// The output depends only on the snapshot, `metrics` and `settings`.
pub fn process(
    snapshot: &StoreSnapshot,
    metrics: &[String],
    settings: &ProcessingSettings,
) -> BTreeMap<SeriesKey, ProcessedSeries> {
    let processed: BTreeMap<SeriesKey, ProcessedSeries> = selected_keys(snapshot, metrics)
        .iter()
        .filter_map(|key| process_series(snapshot, key, settings))
        .map(|series| (series.key.clone(), series))
        .collect();

    log::info!(
        "Processed {} series (store version {}, smoothing {}, ignore transient {})",
        processed.len(),
        snapshot.version,
        settings.smoothing,
        settings.ignore_initial_transient
    );
    processed
}
