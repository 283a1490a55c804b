use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::data::model::{ProcessedSeries, Sample, SeriesKey};

/// Marker printed in place of an undefined derivative.
pub const NO_VALUE: &str = "n/a";

/// Values of the sample nearest to the requested time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotValues {
    /// Time delta of the chosen sample, which may differ from the target.
    pub time_delta: f64,
    pub value: f64,
    pub smoothed: f64,
    pub derivative: Option<f64>,
}

impl SnapshotValues {
    /// `value`, `smoothed` and `derivative` at four decimals.
    pub fn formatted(&self) -> [String; 3] {
        [
            format!("{:.4}", self.value),
            format!("{:.4}", self.smoothed),
            self.derivative
                .map(|d| format!("{d:.4}"))
                .unwrap_or_else(|| NO_VALUE.to_string()),
        ]
    }
}

impl From<&Sample> for SnapshotValues {
    fn from(s: &Sample) -> Self {
        SnapshotValues {
            time_delta: s.time_delta,
            value: s.value,
            smoothed: s.smoothed,
            derivative: s.derivative,
        }
    }
}

/// Per-series snapshot outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotResult {
    Sample(SnapshotValues),
    NoData,
}

impl fmt::Display for SnapshotResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotResult::Sample(values) => {
                let [value, smoothed, derivative] = values.formatted();
                writeln!(f, "  Value     = {value}")?;
                writeln!(f, "  Smoothed  = {smoothed}")?;
                write!(f, "  Deriv     = {derivative}")
            }
            SnapshotResult::NoData => write!(f, "  no data"),
        }
    }
}

/// Index of the sample closest to `target`. Ties go to the earliest sample.
pub fn nearest_index(samples: &[Sample], target: f64) -> Option<usize> {
    if !target.is_finite() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, s) in samples.iter().enumerate() {
        let distance = (s.time_delta - target).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Nearest-sample lookup for one series.
pub fn snapshot_series(series: &ProcessedSeries, target: f64) -> SnapshotResult {
    nearest_index(&series.samples, target)
        .map(|i| SnapshotResult::Sample(SnapshotValues::from(&series.samples[i])))
        .unwrap_or(SnapshotResult::NoData)
}

/// Snapshot every key in `keys`. Keys without a processed series, or with an
/// empty one, map to [`SnapshotResult::NoData`].
pub fn snapshot(
    processed: &BTreeMap<SeriesKey, ProcessedSeries>,
    keys: &[SeriesKey],
    target: f64,
) -> BTreeMap<SeriesKey, SnapshotResult> {
    keys.iter()
        .map(|key| {
            let result = processed
                .get(key)
                .map(|series| snapshot_series(series, target))
                .unwrap_or(SnapshotResult::NoData);
            (key.clone(), result)
        })
        .collect()
}
