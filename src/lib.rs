//! Offline analysis of timestamped metric logs collected from several hosts.
//!
//! Each loaded file keeps its own relative time axis. Selected metrics are
//! median-smoothed, differentiated with start-up transient suppression and
//! outlier clipping, and can be queried for statistics and nearest-time
//! snapshots.

pub mod analysis;
pub mod app;
pub mod data;
pub mod state;
pub mod ui;
