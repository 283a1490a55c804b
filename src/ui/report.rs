use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::analysis::snapshot::SnapshotResult;
use crate::analysis::stats::StatsSummary;
use crate::data::model::SeriesKey;
use crate::state::AnalysisSession;

// ---------------------------------------------------------------------------
// Plain-text report
// ---------------------------------------------------------------------------

/// One-line description of a smoothing intensity.
pub fn smoothing_label(intensity: u8) -> &'static str {
    match intensity {
        0 => "Smoothing disabled",
        1..=29 => "Light smoothing (fast changes preserved)",
        30..=69 => "Moderate smoothing (balance of detail and stability)",
        _ => "Strong smoothing (emphasis on overall trends)",
    }
}

pub fn render_catalog(metrics: &[String]) -> String {
    if metrics.is_empty() {
        return "No metrics loaded\n".to_string();
    }
    let mut out = String::from("Metrics:\n");
    for m in metrics {
        let _ = writeln!(out, "  {m}");
    }
    out
}

/// Values at two decimals, derivatives at four; derivative lines are left
/// out when no derivative is defined.
pub fn render_stats(stats: &BTreeMap<SeriesKey, StatsSummary>) -> String {
    if stats.is_empty() {
        return "No data to display\n".to_string();
    }

    let mut out = String::new();
    for (key, s) in stats {
        let _ = writeln!(out, "{key}");
        let _ = writeln!(out, "  Mean value: {:.2}", s.value_mean);
        let _ = writeln!(out, "  Min/max value: {:.2} / {:.2}", s.value_min, s.value_max);
        if let Some(mean) = s.derivative_mean {
            let _ = writeln!(out, "  Mean derivative: {mean:.4}");
        }
        if let (Some(min), Some(max)) = (s.derivative_min, s.derivative_max) {
            let _ = writeln!(out, "  Min/max derivative: {min:.4} / {max:.4}");
        }
        out.push_str("----\n");
    }
    out
}

pub fn render_snapshot(target: f64, results: &BTreeMap<SeriesKey, SnapshotResult>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Snapshot at TimeDelta = {target:.2} s:");
    for (key, result) in results {
        let _ = writeln!(out, "\n{key}:");
        let _ = writeln!(out, "{result}");
    }
    out
}

/// Full text report for a session that has already been reprocessed.
pub fn render_report(session: &AnalysisSession, snapshot_at: Option<f64>) -> String {
    let mut out = String::new();

    if let Some(status) = &session.status_message {
        let _ = writeln!(out, "{status}");
    }
    out.push_str(&render_catalog(&session.metrics()));
    let _ = writeln!(
        out,
        "{} ({}), initial transient {}",
        smoothing_label(session.settings.smoothing),
        session.settings.smoothing,
        if session.settings.ignore_initial_transient {
            "ignored"
        } else {
            "kept"
        }
    );

    if session.selected_metrics.is_empty() {
        out.push_str("\nSelect metrics to display statistics\n");
        return out;
    }

    out.push('\n');
    out.push_str(&render_stats(&session.stats()));

    if let Some(t) = snapshot_at {
        out.push('\n');
        out.push_str(&render_snapshot(t, &session.snapshot(t)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::snapshot::SnapshotValues;
    use crate::data::model::SourceId;

    fn key(metric: &str) -> SeriesKey {
        SeriesKey::new(
            SourceId {
                index: 0,
                name: "a.csv".into(),
            },
            metric,
        )
    }

    #[test]
    fn test_smoothing_labels() {
        assert_eq!(smoothing_label(0), "Smoothing disabled");
        assert!(smoothing_label(29).starts_with("Light"));
        assert!(smoothing_label(30).starts_with("Moderate"));
        assert!(smoothing_label(70).starts_with("Strong"));
    }

    #[test]
    fn test_stats_omit_undefined_derivative() {
        let mut stats = BTreeMap::new();
        stats.insert(
            key("cpu"),
            StatsSummary {
                value_mean: 1.5,
                value_min: 1.0,
                value_max: 2.0,
                derivative_mean: None,
                derivative_min: None,
                derivative_max: None,
            },
        );
        let text = render_stats(&stats);
        assert!(text.contains("cpu (a.csv)"));
        assert!(text.contains("Mean value: 1.50"));
        assert!(!text.contains("derivative"));
    }

    #[test]
    fn test_snapshot_block() {
        let mut results = BTreeMap::new();
        results.insert(
            key("cpu"),
            SnapshotResult::Sample(SnapshotValues {
                time_delta: 2.0,
                value: 1.0,
                smoothed: 1.25,
                derivative: None,
            }),
        );
        results.insert(key("mem"), SnapshotResult::NoData);

        let text = render_snapshot(2.0, &results);
        assert!(text.starts_with("Snapshot at TimeDelta = 2.00 s:"));
        assert!(text.contains("  Smoothed  = 1.2500"));
        assert!(text.contains("  Deriv     = n/a"));
        assert!(text.contains("mem (a.csv):\n  no data"));
    }
}
