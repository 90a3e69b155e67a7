use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array,
    Int32Array, Int64Array, StringArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, CustomerTable, Row};

/// At most this many records reach the dashboard per fetch.
pub const ROW_CAP: usize = 50;

/// Source field the fetch orders by, ascending, before the cap is applied.
pub const SORT_FIELD: &str = "_id";

/// Fields stripped from every record before it reaches the filter engine.
pub const EXCLUDED_FIELDS: [&str; 4] = ["_id", "accounts", "tier_and_details", "active"];

/// Structural problems the loader distinguishes for the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error("record {0} is not a JSON object")]
    MalformedRecord(usize),
    #[error("expected a top-level JSON array of records")]
    NotAnArray,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Fetch the customers table from an export file. Dispatch by extension.
///
/// Supported formats:
/// * `.json`    – array of record objects (mongoexport `--jsonArray` style,
///                extended-JSON `$oid`/`$date`/`$number*` wrappers included)
/// * `.csv`     – header row with column names, scalar cells
/// * `.parquet` – scalar columns
///
/// Regardless of format the result is sorted ascending by [`SORT_FIELD`],
/// capped at [`ROW_CAP`] rows, and stripped of [`EXCLUDED_FIELDS`].
pub fn load_file(path: &Path) -> Result<CustomerTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (columns, rows) = match ext.as_str() {
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(SourceError::UnsupportedExtension(other.to_string()).into()),
    };

    Ok(clean(columns, rows))
}

/// Sort, cap, and strip the raw records into the display table.
fn clean(columns: Vec<String>, mut rows: Vec<Row>) -> CustomerTable {
    rows.sort_by(|a, b| {
        let ka = a.get(SORT_FIELD).unwrap_or(&CellValue::Null);
        let kb = b.get(SORT_FIELD).unwrap_or(&CellValue::Null);
        ka.cmp(kb)
    });
    rows.truncate(ROW_CAP);

    for row in &mut rows {
        for field in EXCLUDED_FIELDS {
            row.remove(field);
        }
    }
    let columns = columns
        .into_iter()
        .filter(|c| !EXCLUDED_FIELDS.contains(&c.as_str()))
        .collect();

    CustomerTable::new(columns, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<(Vec<String>, Vec<Row>)> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().ok_or(SourceError::NotAnArray)?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or(SourceError::MalformedRecord(i))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok((columns, rows))
}

/// Convert one JSON value, unwrapping the extended-JSON scalar wrappers a
/// document-store export emits (`$oid`, `$date`, `$numberLong`, ...).
fn json_to_cell(val: &JsonValue) -> CellValue {
    if let Some(cell) = extended_json_to_cell(val) {
        return cell;
    }
    match val {
        JsonValue::String(s) => parse_string_cell(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

fn extended_json_to_cell(val: &JsonValue) -> Option<CellValue> {
    let obj = val.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    let (key, inner) = obj.iter().next()?;
    match key.as_str() {
        "$oid" => Some(CellValue::String(inner.as_str()?.to_string())),
        "$date" => match inner {
            // {"$date": "1977-03-02T02:20:31Z"}
            JsonValue::String(s) => Some(
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| CellValue::DateTime(dt.naive_utc()))
                    .unwrap_or_else(|_| CellValue::String(s.clone())),
            ),
            // {"$date": {"$numberLong": "1567612800000"}} – epoch millis
            other => {
                let millis = match extended_json_to_cell(other) {
                    Some(CellValue::Integer(i)) => i,
                    _ => other.as_i64()?,
                };
                DateTime::from_timestamp_millis(millis)
                    .map(|dt| CellValue::DateTime(dt.naive_utc()))
            }
        },
        "$numberInt" | "$numberLong" => {
            let i = inner
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .or_else(|| inner.as_i64())?;
            Some(CellValue::Integer(i))
        }
        "$numberDouble" => {
            let f = inner
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .or_else(|| inner.as_f64())?;
            Some(CellValue::Float(f))
        }
        _ => None,
    }
}

/// Strings that parse as RFC 3339 timestamps become temporal cells up front,
/// with the offset dropped. Anything else stays text; the filter engine does
/// its own `%d/%m/%Y` promotion later.
fn parse_string_cell(s: &str) -> CellValue {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => CellValue::DateTime(dt.naive_utc()),
        Err(_) => CellValue::String(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<(Vec<String>, Vec<Row>)> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut row = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            let Some(col_name) = headers.get(col_idx) else {
                continue;
            };
            row.insert(col_name.clone(), guess_cell_type(value));
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    parse_string_cell(s)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet customers export. Every column is read as a scalar;
/// timestamp and date columns become timezone-naive cells.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<(Vec<String>, Vec<Row>)> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if columns.is_empty() {
            columns = schema.fields().iter().map(|f| f.name().clone()).collect();
        }

        for row_idx in 0..batch.num_rows() {
            let mut row = BTreeMap::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = extract_cell(batch.column(col_idx), row_idx);
                row.insert(field.name().clone(), value);
            }
            rows.push(row);
        }
    }

    Ok((columns, rows))
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                parse_string_cell(s.value(row))
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                parse_string_cell(s.value(row))
            }
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            CellValue::Bool(arr.value(row))
        }
        DataType::Timestamp(unit, _tz) => {
            // Offset annotations are dropped: comparisons downstream are
            // over naive timestamps.
            let nanos = match unit {
                TimeUnit::Second => col
                    .as_any()
                    .downcast_ref::<TimestampSecondArray>()
                    .map(|a| a.value(row) as i128 * 1_000_000_000),
                TimeUnit::Millisecond => col
                    .as_any()
                    .downcast_ref::<TimestampMillisecondArray>()
                    .map(|a| a.value(row) as i128 * 1_000_000),
                TimeUnit::Microsecond => col
                    .as_any()
                    .downcast_ref::<TimestampMicrosecondArray>()
                    .map(|a| a.value(row) as i128 * 1_000),
                TimeUnit::Nanosecond => col
                    .as_any()
                    .downcast_ref::<TimestampNanosecondArray>()
                    .map(|a| a.value(row) as i128),
            };
            nanos
                .and_then(nanos_to_datetime)
                .unwrap_or(CellValue::Null)
        }
        DataType::Date32 => {
            let arr = col.as_any().downcast_ref::<Date32Array>().unwrap();
            nanos_to_datetime(arr.value(row) as i128 * 86_400 * 1_000_000_000)
                .unwrap_or(CellValue::Null)
        }
        DataType::Date64 => {
            let arr = col.as_any().downcast_ref::<Date64Array>().unwrap();
            nanos_to_datetime(arr.value(row) as i128 * 1_000_000).unwrap_or(CellValue::Null)
        }
        other => CellValue::String(format!("{other:?}")),
    }
}

fn nanos_to_datetime(nanos: i128) -> Option<CellValue> {
    let secs = i64::try_from(nanos.div_euclid(1_000_000_000)).ok()?;
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec).map(|dt| CellValue::DateTime(dt.naive_utc()))
}
