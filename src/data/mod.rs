/// Data layer: core types, loading, storage and selection.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode + parse → SourceDataset (TimeDelta per record)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  store    │  append-only, copy-on-write snapshots
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  selected metrics → SeriesKeys across sources
///   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod store;
