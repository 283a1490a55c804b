use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{ProcessedSeries, SeriesKey};

/// Summary of one processed series.
///
/// Derivative fields are `None` (and left out of serialized output) when
/// the series has no defined derivative at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub value_mean: f64,
    pub value_min: f64,
    pub value_max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivative_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivative_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivative_max: Option<f64>,
}

/// Mean, min and max of a non-empty sequence.
///
/// If the plain sum overflows, the mean is recomputed from pre-scaled
/// terms so it stays finite.
fn mean_min_max(values: impl Iterator<Item = f64> + Clone) -> Option<(f64, f64, f64)> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.clone() {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        return None;
    }

    let n = count as f64;
    let mean = if sum.is_finite() {
        sum / n
    } else {
        values.map(|v| v / n).sum()
    };
    Some((mean, min, max))
}

/// Statistics for one series; `None` when it has no samples.
pub fn summarize(series: &ProcessedSeries) -> Option<StatsSummary> {
    let (value_mean, value_min, value_max) = mean_min_max(series.samples.iter().map(|s| s.value))?;
    let derivative = mean_min_max(series.samples.iter().filter_map(|s| s.derivative));

    Some(StatsSummary {
        value_mean,
        value_min,
        value_max,
        derivative_mean: derivative.map(|(mean, _, _)| mean),
        derivative_min: derivative.map(|(_, min, _)| min),
        derivative_max: derivative.map(|(_, _, max)| max),
    })
}

/// Statistics for every non-empty series in the processed set.
pub fn summarize_all(processed: &BTreeMap<SeriesKey, ProcessedSeries>) -> BTreeMap<SeriesKey, StatsSummary> {
    processed
        .iter()
        .filter_map(|(key, series)| summarize(series).map(|stats| (key.clone(), stats)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Sample, SourceId};

    fn series(points: &[(f64, Option<f64>)]) -> ProcessedSeries {
        ProcessedSeries {
            key: SeriesKey::new(
                SourceId {
                    index: 0,
                    name: "node.csv".into(),
                },
                "cpu",
            ),
            samples: points
                .iter()
                .enumerate()
                .map(|(i, &(value, derivative))| Sample {
                    time_delta: i as f64,
                    value,
                    smoothed: value,
                    derivative,
                })
                .collect(),
        }
    }

    #[test]
    fn test_value_and_derivative_stats() {
        let stats = summarize(&series(&[(1.0, None), (3.0, Some(2.0)), (8.0, Some(-4.0))])).unwrap();
        assert_eq!(stats.value_mean, 4.0);
        assert_eq!(stats.value_min, 1.0);
        assert_eq!(stats.value_max, 8.0);
        assert_eq!(stats.derivative_mean, Some(-1.0));
        assert_eq!(stats.derivative_min, Some(-4.0));
        assert_eq!(stats.derivative_max, Some(2.0));
    }

    #[test]
    fn test_all_undefined_derivatives_are_absent() {
        let stats = summarize(&series(&[(1.0, None), (2.0, None)])).unwrap();
        assert_eq!(stats.derivative_mean, None);

        let json = serde_json::to_value(stats).unwrap();
        assert!(json.get("derivative_mean").is_none());
        assert_eq!(json["value_mean"], 1.5);
    }

    #[test]
    fn test_mean_near_f64_max_stays_finite() {
        let big = f64::MAX * 0.75;
        let stats = summarize(&series(&[(big, None), (big, Some(big)), (big, Some(big))])).unwrap();
        assert!(stats.value_mean.is_finite());
        assert!((stats.value_mean - big).abs() <= big * 1e-12);
        assert_eq!(stats.derivative_mean, Some(big));

        let json = serde_json::to_value(stats).unwrap();
        assert!(json["value_mean"].is_number());
    }

    #[test]
    fn test_empty_series_has_no_stats() {
        assert!(summarize(&series(&[])).is_none());

        let mut processed = BTreeMap::new();
        let empty = series(&[]);
        processed.insert(empty.key.clone(), empty);
        assert!(summarize_all(&processed).is_empty());
    }
}
