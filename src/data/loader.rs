use std::borrow::Cow;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit, TimestampMicrosecondType, Float64Type};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use encoding_rs::{UTF_8, WINDOWS_1251};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{RawRecord, SourceDataset};

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const METRIC_COLUMN: &str = "Metric";
pub const VALUE_COLUMN: &str = "Value";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// What encoding_rs yields for the one undefined Windows-1251 byte (0x98).
const CP1251_UNASSIGNED: char = '\u{98}';

/// Textual layouts tried, in order, after RFC 3339.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a telemetry log from disk. The file name becomes the source name.
pub fn load_file(path: &Path) -> Result<SourceDataset, LoadError> {
    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = std::fs::read(path).map_err(|err| LoadError::Io {
        source_name: source_name.clone(),
        err,
    })?;

    load_bytes(bytes, &source_name)
}

/// Parse an in-memory upload. Dispatch by the extension of `source_name`.
///
/// Supported formats:
/// * `.parquet` / `.pq` – long table with `Timestamp`, `Metric`, `Value` columns
/// * `.json`            – `[{ "Timestamp": ..., "Metric": ..., "Value": ... }, ...]`
/// * anything else      – delimited text with a header row
pub fn load_bytes(bytes: impl Into<Vec<u8>>, source_name: &str) -> Result<SourceDataset, LoadError> {
    let bytes = bytes.into();
    let ext = Path::new(source_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(Bytes::from(bytes), source_name)?,
        "json" => load_json(&decode_text(&bytes, source_name)?, source_name)?,
        _ => load_csv(&decode_text(&bytes, source_name)?, source_name)?,
    };

    log::info!("{}", dataset.load_message());
    Ok(dataset)
}

/// Decode as UTF-8, falling back to Windows-1251 for legacy Cyrillic logs.
pub fn decode_text<'a>(bytes: &'a [u8], source_name: &str) -> Result<Cow<'a, str>, LoadError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(body) {
        return Ok(text);
    }

    log::warn!("{source_name}: not valid UTF-8, retrying as Windows-1251");
    WINDOWS_1251
        .decode_without_bom_handling_and_without_replacement(body)
        // Byte 0x98 has no character in code page 1251; the WHATWG table
        // passes it through as the C1 control U+0098.
        .filter(|text| !text.contains(CP1251_UNASSIGNED))
        .ok_or_else(|| LoadError::Decode {
            source_name: source_name.to_string(),
        })
}

/// Parse a date-time cell. Offsets are converted to UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ---------------------------------------------------------------------------
// Column lookup and cell parsing shared by all formats
// ---------------------------------------------------------------------------

/// Positions of the three required columns in a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    timestamp: usize,
    metric: usize,
    value: usize,
}

fn locate_columns<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    source_name: &str,
) -> Result<ColumnIndex, LoadError> {
    let headers: Vec<&str> = headers.into_iter().collect();
    let find = |name: &str| headers.iter().position(|h| *h == name);

    match (find(TIMESTAMP_COLUMN), find(METRIC_COLUMN), find(VALUE_COLUMN)) {
        (Some(timestamp), Some(metric), Some(value)) => Ok(ColumnIndex {
            timestamp,
            metric,
            value,
        }),
        _ => Err(LoadError::MissingColumns {
            source_name: source_name.to_string(),
            missing: [TIMESTAMP_COLUMN, METRIC_COLUMN, VALUE_COLUMN]
                .into_iter()
                .filter(|c| find(c).is_none())
                .collect(),
        }),
    }
}

fn timestamp_cell(text: &str, row: usize, source_name: &str) -> Result<NaiveDateTime, LoadError> {
    parse_timestamp(text).ok_or_else(|| LoadError::TimestampParse {
        source_name: source_name.to_string(),
        row,
        value: text.to_string(),
    })
}

fn metric_cell(text: &str, row: usize, source_name: &str) -> Result<String, LoadError> {
    let metric = text.trim();
    if metric.is_empty() {
        return Err(LoadError::ValueParse {
            source_name: source_name.to_string(),
            row,
            column: METRIC_COLUMN,
            value: text.to_string(),
        });
    }
    Ok(metric.to_string())
}

fn value_cell(text: &str, row: usize, source_name: &str) -> Result<f64, LoadError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(finite)
        .ok_or_else(|| LoadError::ValueParse {
            source_name: source_name.to_string(),
            row,
            column: VALUE_COLUMN,
            value: text.to_string(),
        })
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names; `Timestamp`, `Metric` and
/// `Value` must be present, all other columns are ignored.
/// Rows are numbered from 1, not counting the header.
fn load_csv(text: &str, source_name: &str) -> Result<SourceDataset, LoadError> {
    let csv_err = |err| LoadError::Csv {
        source_name: source_name.to_string(),
        err,
    };

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().map_err(csv_err)?.clone();
    let columns = locate_columns(headers.iter(), source_name)?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = row_no + 1;
        let record = result.map_err(csv_err)?;

        let timestamp = timestamp_cell(record.get(columns.timestamp).unwrap_or(""), row, source_name)?;
        let metric = metric_cell(record.get(columns.metric).unwrap_or(""), row, source_name)?;
        let value = value_cell(record.get(columns.value).unwrap_or(""), row, source_name)?;

        records.push(RawRecord {
            timestamp,
            metric,
            value,
        });
    }

    Ok(SourceDataset::from_records(source_name, records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "Timestamp": "2024-03-01 10:00:00", "Metric": "cpu", "Value": 12.5 },
///   ...
/// ]
/// ```
///
/// Numeric timestamps are read as epoch milliseconds.
fn load_json(text: &str, source_name: &str) -> Result<SourceDataset, LoadError> {
    let root: JsonValue = serde_json::from_str(text).map_err(|err| LoadError::Json {
        source_name: source_name.to_string(),
        err,
    })?;

    let malformed = |detail: String| LoadError::Malformed {
        source_name: source_name.to_string(),
        detail,
    };

    let rows = root
        .as_array()
        .ok_or_else(|| malformed("expected a top-level JSON array".to_string()))?;

    if let Some(first) = rows.first() {
        let obj = first
            .as_object()
            .ok_or_else(|| malformed("row 1 is not a JSON object".to_string()))?;
        locate_columns(obj.keys().map(String::as_str), source_name)?;
    }

    let mut records = Vec::with_capacity(rows.len());

    for (row_no, rec) in rows.iter().enumerate() {
        let row = row_no + 1;
        let obj = rec
            .as_object()
            .ok_or_else(|| malformed(format!("row {row} is not a JSON object")))?;

        let ts_cell = obj.get(TIMESTAMP_COLUMN).unwrap_or(&JsonValue::Null);
        let timestamp = match ts_cell {
            JsonValue::String(s) => timestamp_cell(s, row, source_name)?,
            JsonValue::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| LoadError::TimestampParse {
                    source_name: source_name.to_string(),
                    row,
                    value: n.to_string(),
                })?,
            other => timestamp_cell(&other.to_string(), row, source_name)?,
        };

        let metric = match obj.get(METRIC_COLUMN).unwrap_or(&JsonValue::Null) {
            JsonValue::String(s) => metric_cell(s, row, source_name)?,
            JsonValue::Null => metric_cell("", row, source_name)?,
            other => metric_cell(&other.to_string(), row, source_name)?,
        };

        let value = match obj.get(VALUE_COLUMN).unwrap_or(&JsonValue::Null) {
            JsonValue::Number(n) => n.as_f64().and_then(finite).ok_or_else(|| {
                LoadError::ValueParse {
                    source_name: source_name.to_string(),
                    row,
                    column: VALUE_COLUMN,
                    value: n.to_string(),
                }
            })?,
            JsonValue::String(s) => value_cell(s, row, source_name)?,
            other => value_cell(&other.to_string(), row, source_name)?,
        };

        records.push(RawRecord {
            timestamp,
            metric,
            value,
        });
    }

    Ok(SourceDataset::from_records(source_name, records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a long-format Parquet table.
///
/// Expected schema:
/// - `Timestamp`: any Arrow timestamp/date type, or text parsed like CSV cells
/// - `Metric`: text (other types are cast to text)
/// - `Value`: any numeric type, or text
///
/// Works with files written by both Pandas (`df.to_parquet()`) and
/// Polars (`df.write_parquet()`).
fn load_parquet(bytes: Bytes, source_name: &str) -> Result<SourceDataset, LoadError> {
    let parquet_err = |err| LoadError::Parquet {
        source_name: source_name.to_string(),
        err,
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).map_err(parquet_err)?;
    let field_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let columns = locate_columns(field_names.iter().map(String::as_str), source_name)?;
    let reader = builder.build().map_err(parquet_err)?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|err| arrow_err(source_name, "reading record batch", err))?;
        let first_row = records.len() + 1;

        let timestamps = timestamp_column(batch.column(columns.timestamp), first_row, source_name)?;
        let metrics = metric_column(batch.column(columns.metric), first_row, source_name)?;
        let values = value_column(batch.column(columns.value), first_row, source_name)?;

        records.extend(
            timestamps
                .into_iter()
                .zip(metrics)
                .zip(values)
                .map(|((timestamp, metric), value)| RawRecord {
                    timestamp,
                    metric,
                    value,
                }),
        );
    }

    Ok(SourceDataset::from_records(source_name, records))
}

// -- Arrow column helpers --

fn arrow_err(source_name: &str, context: &str, err: arrow::error::ArrowError) -> LoadError {
    LoadError::Arrow {
        source_name: source_name.to_string(),
        context: context.to_string(),
        err,
    }
}

fn cast_column(col: &ArrayRef, to: &DataType, column: &str, source_name: &str) -> Result<ArrayRef, LoadError> {
    cast(col, to).map_err(|err| arrow_err(source_name, &format!("converting column {column}"), err))
}

fn unexpected_type(column: &str, source_name: &str) -> LoadError {
    LoadError::Malformed {
        source_name: source_name.to_string(),
        detail: format!("column {column} has an unexpected type after conversion"),
    }
}

fn timestamp_column(col: &ArrayRef, first_row: usize, source_name: &str) -> Result<Vec<NaiveDateTime>, LoadError> {
    let native = match col.data_type() {
        // Keep the zone so the cast does not shift values to local wall time.
        DataType::Timestamp(_, tz) => Some(DataType::Timestamp(TimeUnit::Microsecond, tz.clone())),
        DataType::Date32 | DataType::Date64 => Some(DataType::Timestamp(TimeUnit::Microsecond, None)),
        _ => None,
    };

    let Some(target) = native else {
        let text = cast_column(col, &DataType::Utf8, TIMESTAMP_COLUMN, source_name)?;
        let text = text
            .as_string_opt::<i32>()
            .ok_or_else(|| unexpected_type(TIMESTAMP_COLUMN, source_name))?;
        return (0..text.len())
            .map(|i| {
                let cell = if text.is_null(i) { "" } else { text.value(i) };
                timestamp_cell(cell, first_row + i, source_name)
            })
            .collect();
    };

    let micros = cast_column(col, &target, TIMESTAMP_COLUMN, source_name)?;
    let micros = micros
        .as_primitive_opt::<TimestampMicrosecondType>()
        .ok_or_else(|| unexpected_type(TIMESTAMP_COLUMN, source_name))?;

    (0..micros.len())
        .map(|i| {
            let parsed = if micros.is_null(i) {
                None
            } else {
                DateTime::from_timestamp_micros(micros.value(i)).map(|dt| dt.naive_utc())
            };
            parsed.ok_or_else(|| LoadError::TimestampParse {
                source_name: source_name.to_string(),
                row: first_row + i,
                value: if micros.is_null(i) {
                    "<null>".to_string()
                } else {
                    micros.value(i).to_string()
                },
            })
        })
        .collect()
}

fn metric_column(col: &ArrayRef, first_row: usize, source_name: &str) -> Result<Vec<String>, LoadError> {
    let text = cast_column(col, &DataType::Utf8, METRIC_COLUMN, source_name)?;
    let text = text
        .as_string_opt::<i32>()
        .ok_or_else(|| unexpected_type(METRIC_COLUMN, source_name))?;

    (0..text.len())
        .map(|i| {
            let cell = if text.is_null(i) { "" } else { text.value(i) };
            metric_cell(cell, first_row + i, source_name)
        })
        .collect()
}

fn value_column(col: &ArrayRef, first_row: usize, source_name: &str) -> Result<Vec<f64>, LoadError> {
    if matches!(col.data_type(), DataType::Utf8 | DataType::LargeUtf8) {
        let text = cast_column(col, &DataType::Utf8, VALUE_COLUMN, source_name)?;
        let text = text
            .as_string_opt::<i32>()
            .ok_or_else(|| unexpected_type(VALUE_COLUMN, source_name))?;
        return (0..text.len())
            .map(|i| {
                let cell = if text.is_null(i) { "" } else { text.value(i) };
                value_cell(cell, first_row + i, source_name)
            })
            .collect();
    }

    let numbers = cast_column(col, &DataType::Float64, VALUE_COLUMN, source_name)?;
    let numbers = numbers
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| unexpected_type(VALUE_COLUMN, source_name))?;

    (0..numbers.len())
        .map(|i| {
            let cell = (!numbers.is_null(i)).then(|| numbers.value(i));
            cell.and_then(finite).ok_or_else(|| LoadError::ValueParse {
                source_name: source_name.to_string(),
                row: first_row + i,
                column: VALUE_COLUMN,
                value: cell.map(|v| v.to_string()).unwrap_or_else(|| "<null>".to_string()),
            })
        })
        .collect()
}
