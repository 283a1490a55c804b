use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// RawRecord – one row of a telemetry log
// ---------------------------------------------------------------------------

/// A single parsed input row. Extra columns of the source table are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Wall-clock time of the sample, normalised to UTC.
    pub timestamp: NaiveDateTime,
    pub metric: String,
    pub value: f64,
}

/// A record together with its offset from the dataset's earliest timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedRecord {
    pub record: RawRecord,
    /// Seconds since `SourceDataset::min_timestamp`. Always `>= 0`.
    pub time_delta: f64,
}

// ---------------------------------------------------------------------------
// SourceDataset – everything parsed from one input file
// ---------------------------------------------------------------------------

/// All records of one loaded file, aligned to the file's own time axis.
///
/// `time_delta` values are relative to this dataset only; two datasets
/// loaded from hosts with unsynchronised clocks are never compared on an
/// absolute axis.
#[derive(Debug, Clone)]
pub struct SourceDataset {
    /// Display name of the source (usually the file name).
    pub name: String,
    /// Records in input order.
    pub records: Vec<TimedRecord>,
    /// Earliest timestamp in the file; `None` for a table with no rows.
    pub min_timestamp: Option<NaiveDateTime>,
}

impl SourceDataset {
    /// Compute the minimum timestamp and every record's time delta.
    pub fn from_records(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        let min_timestamp = records.iter().map(|r| r.timestamp).min();

        let records = records
            .into_iter()
            .map(|record| {
                let time_delta = min_timestamp
                    .map(|min| seconds_between(min, record.timestamp))
                    .unwrap_or(0.0);
                TimedRecord { record, time_delta }
            })
            .collect();

        SourceDataset {
            name: name.into(),
            records,
            min_timestamp,
        }
    }

    /// Number of records (input rows).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Confirmation line shown after a successful load.
    pub fn load_message(&self) -> String {
        format!("Loaded: {}, rows: {}", self.name, self.len())
    }
}

/// Elapsed seconds from `start` to `end`, with sub-microsecond precision
/// where the span fits in an `i64` of nanoseconds.
fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let span = end - start;
    match span.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => span.num_milliseconds() as f64 / 1e3,
    }
}

// ---------------------------------------------------------------------------
// Series addressing
// ---------------------------------------------------------------------------

/// Identity of a loaded source. Sources with the same name are told apart
/// by `index`, their position in load order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceId {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One analysable series: a metric within one source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SeriesKey {
    pub source: SourceId,
    pub metric: String,
}

impl SeriesKey {
    pub fn new(source: SourceId, metric: impl Into<String>) -> Self {
        SeriesKey {
            source,
            metric: metric.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.metric, self.source)
    }
}

// ---------------------------------------------------------------------------
// Processed output
// ---------------------------------------------------------------------------

/// One point of a processed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time_delta: f64,
    pub value: f64,
    pub smoothed: f64,
    /// `None` for the first retained sample and wherever the time step is zero.
    pub derivative: Option<f64>,
}

/// Derived view of one series, rebuilt from scratch on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedSeries {
    pub key: SeriesKey,
    pub samples: Vec<Sample>,
}

impl ProcessedSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    fn rec(ts: NaiveDateTime, metric: &str, value: f64) -> RawRecord {
        RawRecord {
            timestamp: ts,
            metric: metric.to_string(),
            value,
        }
    }

    #[test]
    fn test_time_delta_relative_to_minimum() {
        let ds = SourceDataset::from_records(
            "node-a.csv",
            vec![
                rec(at(10, 0, 5, 0), "cpu", 1.0),
                rec(at(10, 0, 0, 0), "cpu", 2.0),
                rec(at(10, 0, 0, 500), "mem", 3.0),
            ],
        );

        assert_eq!(ds.min_timestamp, Some(at(10, 0, 0, 0)));
        let deltas: Vec<f64> = ds.records.iter().map(|r| r.time_delta).collect();
        assert_eq!(deltas, vec![5.0, 0.0, 0.5]);
    }

    #[test]
    fn test_empty_dataset_has_no_minimum() {
        let ds = SourceDataset::from_records("empty.csv", Vec::new());
        assert!(ds.is_empty());
        assert_eq!(ds.min_timestamp, None);
    }

    #[test]
    fn test_series_key_orders_by_load_order_first() {
        let early = SeriesKey::new(SourceId { index: 0, name: "z.csv".into() }, "b");
        let late = SeriesKey::new(SourceId { index: 1, name: "a.csv".into() }, "a");
        assert!(early < late);
        assert_eq!(early.to_string(), "b (z.csv)");
    }
}
