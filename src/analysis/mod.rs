/// Signal processing over series taken from a store snapshot.
///
/// ```text
///   StoreSnapshot + selected metrics
///        │
///        ▼
///   ┌───────────┐   ┌────────────┐
///   │ smoothing  │ → │ derivative  │   pipeline: one ProcessedSeries per key
///   └───────────┘   └────────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌─────────┐
///   │ snapshot  │   │  stats   │
///   └──────────┘   └─────────┘
/// ```

pub mod derivative;
pub mod pipeline;
pub mod smoothing;
pub mod snapshot;
pub mod stats;

use serde::Serialize;

/// Knobs of a processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessingSettings {
    /// Median smoothing intensity, 0 (off) to 100.
    pub smoothing: u8,
    /// Drop the first five seconds of each series before differentiating.
    pub ignore_initial_transient: bool,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            smoothing: 30,
            ignore_initial_transient: true,
        }
    }
}
