//! Finite-difference derivative of a smoothed series.
//!
//! Three steps, in order:
//! 1. drop the start-up transient (optional),
//! 2. difference consecutive samples over their time step,
//! 3. clip derivatives far outside the 5th–95th percentile band.

use crate::data::model::Sample;

/// Samples within this many seconds of the first one form the transient.
pub const TRANSIENT_WINDOW_SECS: f64 = 5.0;

/// Transient suppression only applies to series longer than this.
pub const MIN_SAMPLES_FOR_TRANSIENT: usize = 10;

/// Clipping only applies with more defined derivatives than this.
pub const MIN_DERIVATIVES_FOR_CLIPPING: usize = 10;

pub const LOWER_QUANTILE: f64 = 0.05;
pub const UPPER_QUANTILE: f64 = 0.95;

/// Clip band half-width, in multiples of the inter-quantile range.
pub const CLIP_SPREAD: f64 = 3.0;

/// Run all three steps over smoothed samples sorted by time delta.
///
/// Incoming `derivative` fields are ignored and recomputed.
pub fn estimate(samples: Vec<Sample>, ignore_initial_transient: bool) -> Vec<Sample> {
    let samples = if ignore_initial_transient {
        suppress_initial_transient(samples)
    } else {
        samples
    };

    let mut samples = finite_difference(samples);
    clip_outliers(&mut samples);
    samples
}

/// Keep only samples more than [`TRANSIENT_WINDOW_SECS`] after the first.
///
/// Series of [`MIN_SAMPLES_FOR_TRANSIENT`] samples or fewer are returned as is.
pub fn suppress_initial_transient(samples: Vec<Sample>) -> Vec<Sample> {
    if samples.len() <= MIN_SAMPLES_FOR_TRANSIENT {
        return samples;
    }

    let cutoff = samples[0].time_delta + TRANSIENT_WINDOW_SECS;
    let before = samples.len();
    let kept: Vec<Sample> = samples.into_iter().filter(|s| s.time_delta > cutoff).collect();

    log::debug!(
        "transient suppression dropped {} of {before} samples (cutoff {cutoff:.3}s)",
        before - kept.len()
    );
    kept
}

/// `(smoothed[i] - smoothed[i-1]) / (t[i] - t[i-1])` for every sample but the
/// first. Non-finite quotients (zero time step) become `None`.
pub fn finite_difference(mut samples: Vec<Sample>) -> Vec<Sample> {
    let mut prev: Option<(f64, f64)> = None;

    for sample in &mut samples {
        sample.derivative = prev.and_then(|(t, s)| {
            let d = (sample.smoothed - s) / (sample.time_delta - t);
            d.is_finite().then_some(d)
        });
        prev = Some((sample.time_delta, sample.smoothed));
    }

    samples
}

/// Bounds derived from the defined derivatives, or `None` when there are too
/// few of them for the percentiles to mean anything.
///
/// Also `None` when the band overflows `f64` or comes out inverted, so
/// extreme derivatives are left alone rather than clamped to nonsense.
pub fn clip_bounds(samples: &[Sample]) -> Option<(f64, f64)> {
    let mut defined: Vec<f64> = samples.iter().filter_map(|s| s.derivative).collect();
    if defined.len() <= MIN_DERIVATIVES_FOR_CLIPPING {
        return None;
    }

    defined.sort_by(f64::total_cmp);
    let q_low = quantile_sorted(&defined, LOWER_QUANTILE);
    let q_high = quantile_sorted(&defined, UPPER_QUANTILE);
    let spread = q_high - q_low;

    let low = q_low - CLIP_SPREAD * spread;
    let high = q_high + CLIP_SPREAD * spread;

    if !(low.is_finite() && high.is_finite() && low <= high) {
        log::debug!("derivative clip band [{low}, {high}] is unusable; skipping clipping");
        return None;
    }
    Some((low, high))
}

/// Clamp every defined derivative into [`clip_bounds`]. Undefined stays undefined.
pub fn clip_outliers(samples: &mut [Sample]) {
    let Some((low, high)) = clip_bounds(samples) else {
        return;
    };
    log::debug!("clipping derivatives to [{low:.6}, {high:.6}]");

    for sample in samples.iter_mut() {
        if let Some(d) = sample.derivative.as_mut() {
            *d = d.clamp(low, high);
        }
    }
}

/// Linear-interpolated quantile of already sorted, non-empty data.
///
/// Weights the two neighbours instead of scaling their difference, which
/// overflows when they sit near opposite ends of the `f64` range.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    if frac == 0.0 {
        return sorted[lo];
    }
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn samples(points: &[(f64, f64)]) -> Vec<Sample> {
        points
            .iter()
            .map(|&(t, v)| Sample {
                time_delta: t,
                value: v,
                smoothed: v,
                derivative: None,
            })
            .collect()
    }

    fn derivatives(samples: &[Sample]) -> Vec<Option<f64>> {
        samples.iter().map(|s| s.derivative).collect()
    }

    #[test]
    fn test_first_sample_has_no_derivative() {
        let out = finite_difference(samples(&[(0.0, 1.0), (2.0, 5.0), (4.0, 4.0)]));
        assert_eq!(derivatives(&out), vec![None, Some(2.0), Some(-0.5)]);
    }

    #[test]
    fn test_zero_time_step_is_undefined() {
        let out = finite_difference(samples(&[(0.0, 1.0), (1.0, 2.0), (1.0, 7.0), (1.0, 7.0), (3.0, 9.0)]));
        // 5/0 = inf, 0/0 = NaN: both undefined
        assert_eq!(derivatives(&out), vec![None, Some(1.0), None, None, Some(1.0)]);
    }

    #[test]
    fn test_transient_suppression_keeps_after_cutoff() {
        let input = samples(
            &(0..20)
                .map(|i| (10.0 + i as f64, i as f64))
                .collect::<Vec<_>>(),
        );
        let kept = suppress_initial_transient(input);
        // first = 10, cutoff 15 exclusive
        assert_eq!(kept.first().map(|s| s.time_delta), Some(16.0));
        assert_eq!(kept.len(), 14);
    }

    #[test]
    fn test_transient_suppression_skips_short_series() {
        let input = samples(&(0..10).map(|i| (i as f64, 0.0)).collect::<Vec<_>>());
        assert_eq!(suppress_initial_transient(input.clone()), input);
    }

    #[test]
    fn test_estimate_without_suppression_keeps_all_samples() {
        let input = samples(&(0..20).map(|i| (i as f64, 2.0 * i as f64)).collect::<Vec<_>>());
        let out = estimate(input, false);
        assert_eq!(out.len(), 20);
        assert_eq!(out[0].derivative, None);
        assert!(out[1..].iter().all(|s| s.derivative == Some(2.0)));
    }

    #[test]
    fn test_spike_is_clipped() {
        // Steady slope 1 with one jump of 1000 between t=10 and t=11.
        let mut points: Vec<(f64, f64)> = (0..30).map(|i| (i as f64, i as f64)).collect();
        for p in points.iter_mut().skip(11) {
            p.1 += 1000.0;
        }
        let out = estimate(samples(&points), false);

        let (low, high) = clip_bounds(&finite_difference(samples(&points))).unwrap();
        let spike = out[11].derivative.unwrap();
        assert!(spike < 1001.0);
        assert!(spike >= low && spike <= high);
    }

    #[test]
    fn test_no_clipping_with_few_derivatives() {
        // 10 defined derivatives: not more than the threshold.
        let mut points: Vec<(f64, f64)> = (0..11).map(|i| (i as f64, 0.0)).collect();
        points[10].1 = 1e9;
        let out = estimate(samples(&points), false);
        assert_eq!(out[10].derivative, Some(1e9));
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        assert_eq!(quantile_sorted(&sorted, 0.05), 0.5);
        assert_eq!(quantile_sorted(&sorted, 0.95), 9.5);
        assert_eq!(quantile_sorted(&[4.0], 0.95), 4.0);
    }

    #[test]
    fn test_quantile_of_extreme_neighbours_stays_finite() {
        let sorted = [-f64::MAX, f64::MAX];
        assert_eq!(quantile_sorted(&sorted, 0.5), 0.0);
        assert!(quantile_sorted(&sorted, 0.05).is_finite());
        assert!(quantile_sorted(&sorted, 0.95).is_finite());
    }

    #[test]
    fn test_derivatives_near_f64_limits_are_left_unclipped() {
        // One plunge to -1.5e308, then a climb of 0.15e308 every 0.1 s:
        // derivatives of about -1.5e308 and +1.5e308, all finite.
        let mut points = vec![(0.0, 0.0), (1.0, -1.5e308)];
        for k in 1..=19 {
            points.push((1.0 + 0.1 * k as f64, -1.5e308 + 0.15e308 * k as f64));
        }

        let raw = finite_difference(samples(&points));
        assert_eq!(raw.iter().filter(|s| s.derivative.is_some()).count(), 20);
        assert_eq!(clip_bounds(&raw), None);

        let out = estimate(samples(&points), false);
        assert_eq!(derivatives(&out), derivatives(&raw));
        assert_eq!(out[1].derivative, Some(-1.5e308));
    }

    proptest! {
        #[test]
        fn prop_clipped_values_within_pre_clip_bounds(
            steps in prop::collection::vec((0.0f64..5.0, -1e3f64..1e3), 1..200),
        ) {
            let mut t = 0.0;
            let points: Vec<(f64, f64)> = steps
                .iter()
                .map(|&(dt, v)| { t += dt; (t, v) })
                .collect();

            let raw = finite_difference(samples(&points));
            let bounds = clip_bounds(&raw);
            let out = estimate(samples(&points), false);

            prop_assert_eq!(out[0].derivative, None);
            if let Some((low, high)) = bounds {
                for d in out.iter().filter_map(|s| s.derivative) {
                    prop_assert!(d >= low && d <= high);
                }
            }
            for (a, b) in raw.iter().zip(&out) {
                prop_assert!(a.derivative.is_none() == b.derivative.is_none());
            }
        }

        #[test]
        fn prop_extreme_derivatives_never_panic(
            steps in prop::collection::vec((1e-3f64..1.0, -1e308f64..1e308), 1..80),
        ) {
            let mut t = 0.0;
            let points: Vec<(f64, f64)> = steps
                .iter()
                .map(|&(dt, v)| { t += dt; (t, v) })
                .collect();

            let out = estimate(samples(&points), false);
            prop_assert_eq!(out.len(), points.len());
            if let Some((low, high)) = clip_bounds(&finite_difference(samples(&points))) {
                prop_assert!(low.is_finite() && high.is_finite() && low <= high);
            }
        }

        #[test]
        fn prop_suppression_removes_exactly_the_transient(
            deltas in prop::collection::vec(0.0f64..2.0, 1..60),
        ) {
            let mut t = 0.0;
            let points: Vec<(f64, f64)> = deltas.iter().map(|&dt| { t += dt; (t, 0.0) }).collect();
            let input = samples(&points);
            let first = input[0].time_delta;
            let out = estimate(input.clone(), true);

            if input.len() > MIN_SAMPLES_FOR_TRANSIENT {
                let expected: Vec<f64> = input
                    .iter()
                    .map(|s| s.time_delta)
                    .filter(|&t| t > first + TRANSIENT_WINDOW_SECS)
                    .collect();
                let got: Vec<f64> = out.iter().map(|s| s.time_delta).collect();
                prop_assert_eq!(got, expected);
            } else {
                prop_assert_eq!(out.len(), input.len());
            }
        }
    }
}
