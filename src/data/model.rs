use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the customers table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value covering the scalar types a customers
/// export can carry. Using `BTreeMap` / `BTreeSet` downstream so `CellValue`
/// must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Timezone-naive timestamp; any source offset is stripped on ingest.
    DateTime(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                DateTime(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for interval comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The timestamp payload, if this is a temporal cell.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Row – one record of the customers table
// ---------------------------------------------------------------------------

/// A single customer record (one row of the source collection):
/// column_name → value.
pub type Row = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// CustomerTable – the complete fetched table
// ---------------------------------------------------------------------------

/// The full table with pre-computed column indices. Filtering never mutates
/// a table in place; each pass builds a fresh one from surviving rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerTable {
    /// All records (rows), in source order.
    pub rows: Vec<Row>,
    /// Column names in source order.
    pub columns: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl CustomerTable {
    /// Build a table from rows, keeping the caller-supplied column order.
    /// Columns present in a row but missing from `columns` are appended in
    /// first-seen order so no data is silently dropped.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut columns = columns;
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();

        for row in &rows {
            for (col, val) in row {
                if !columns.iter().any(|c| c == col) {
                    columns.push(col.clone());
                }
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }

        CustomerTable {
            rows,
            columns,
            unique_values,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell at (row, column); absent keys read as `Null`.
    pub fn value(&self, row: usize, column: &str) -> &CellValue {
        const NULL: &CellValue = &CellValue::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(NULL)
    }

    /// Iterate the values of one column in row order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CellValue> {
        const NULL: &CellValue = &CellValue::Null;
        self.rows.iter().map(move |row| row.get(column).unwrap_or(NULL))
    }

    /// Numeric [min, max] of a column, ignoring non-numeric cells.
    pub fn numeric_range(&self, column: &str) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for v in self.column_values(column).filter_map(CellValue::as_f64) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range
    }

    /// Date [min, max] of a column, ignoring non-temporal cells.
    pub fn date_range(&self, column: &str) -> Option<(NaiveDate, NaiveDate)> {
        let mut range: Option<(NaiveDate, NaiveDate)> = None;
        for d in self
            .column_values(column)
            .filter_map(|v| v.as_datetime().map(|dt| dt.date()))
        {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
                None => (d, d),
            });
        }
        range
    }
}
