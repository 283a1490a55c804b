//! Adaptive-width median filter.
//!
//! The window grows with the series length and the requested intensity,
//! so a slider setting means roughly the same visual smoothing for short
//! and long logs.

pub const MAX_INTENSITY: u8 = 100;
pub const MIN_WINDOW: usize = 3;
pub const MAX_WINDOW: usize = 51;

/// Series of this length or shorter are never smoothed.
pub const MIN_SAMPLES: usize = 5;

/// Median window width for `len` samples at `intensity` (0–100).
///
/// Always odd and within `[MIN_WINDOW, MAX_WINDOW]`.
pub fn window_size(len: usize, intensity: u8) -> usize {
    let intensity = intensity.min(MAX_INTENSITY) as f64;
    let raw = (len as f64 * intensity / 200.0).round() as usize;
    let width = raw.clamp(MIN_WINDOW, MAX_WINDOW);
    if width % 2 == 0 {
        width + 1
    } else {
        width
    }
}

/// Smooth `values` with a median filter. Returns exactly one output per input.
///
/// Intensity `0` and series of `MIN_SAMPLES` or fewer pass through
/// unchanged, as does any series the window would not fit.
pub fn smooth(values: &[f64], intensity: u8) -> Vec<f64> {
    if intensity == 0 || values.len() <= MIN_SAMPLES {
        return values.to_vec();
    }

    let width = window_size(values.len(), intensity);
    log::debug!("median filter: {} samples, window {width}", values.len());
    median_filter(values, width)
}

/// Sliding median of odd `width` with edge replication at both ends.
///
/// A window that does not fit the series leaves it unchanged.
pub fn median_filter(values: &[f64], width: usize) -> Vec<f64> {
    if values.is_empty() || width < 2 {
        return values.to_vec();
    }
    if width > values.len() {
        log::warn!(
            "median window {width} exceeds series length {}; leaving values unsmoothed",
            values.len()
        );
        return values.to_vec();
    }

    let half = width / 2;
    let last = values.len() - 1;
    let mut window = Vec::with_capacity(width);

    (0..values.len())
        .map(|i| {
            window.clear();
            window.extend((0..width).map(|k| {
                let pos = (i + k).saturating_sub(half).min(last);
                values[pos]
            }));
            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable_by(mid, f64::total_cmp);
            *median
        })
        .collect()
}
