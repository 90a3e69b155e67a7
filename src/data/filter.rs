use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::model::{CellValue, CustomerTable};

/// Columns with fewer distinct values than this are treated as categorical,
/// regardless of the underlying value type.
pub const CATEGORICAL_MAX_DISTINCT: usize = 10;

/// Pattern tried when opportunistically promoting a text column to temporal.
pub const DATE_PATTERN: &str = "%d/%m/%Y";

// ---------------------------------------------------------------------------
// Column classification
// ---------------------------------------------------------------------------

/// The semantic class of a column, inferred fresh from live data on every
/// filter invocation. A column can reclassify between invocations if the
/// upstream data composition changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Numeric,
    Temporal,
    Text,
}

/// Classify one column. Precedence, first match wins:
/// 1. Categorical – fewer than [`CATEGORICAL_MAX_DISTINCT`] distinct
///    non-null values (missing cells do not count toward the threshold).
/// 2. Numeric – every non-null cell is an integer or float.
/// 3. Temporal – every non-null cell is a timestamp.
/// 4. Text – everything else.
///
/// The order matters: a numeric column with nine distinct values is
/// categorical, not numeric.
pub fn classify_column(table: &CustomerTable, column: &str) -> ColumnKind {
    let distinct = table
        .unique_values
        .get(column)
        .map(|vals| vals.iter().filter(|v| !v.is_null()).count())
        .unwrap_or(0);
    if distinct < CATEGORICAL_MAX_DISTINCT {
        return ColumnKind::Categorical;
    }

    let mut any_value = false;
    let mut all_numeric = true;
    let mut all_temporal = true;
    for v in table.column_values(column) {
        if v.is_null() {
            continue;
        }
        any_value = true;
        all_numeric &= v.as_f64().is_some();
        all_temporal &= v.as_datetime().is_some();
    }

    if any_value && all_numeric {
        ColumnKind::Numeric
    } else if any_value && all_temporal {
        ColumnKind::Temporal
    } else {
        ColumnKind::Text
    }
}

// ---------------------------------------------------------------------------
// Opportunistic temporal promotion
// ---------------------------------------------------------------------------

/// Parse a cell under [`DATE_PATTERN`]. `None` means "leave the column's
/// classification unchanged"; nulls pass through untouched.
fn parse_date_cell(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Null => Some(CellValue::Null),
        CellValue::String(s) => NaiveDate::parse_from_str(s, DATE_PATTERN)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(CellValue::DateTime),
        _ => None,
    }
}

/// Return a copy of the table where every text column whose values all parse
/// under [`DATE_PATTERN`] is promoted to timestamps. A single parse miss
/// leaves that column exactly as it was; nothing is ever reported. Promoted
/// values are timezone-naive by construction, so interval comparisons are
/// well-defined regardless of source timezone annotations.
pub fn coerce_temporal(table: &CustomerTable) -> CustomerTable {
    let mut rows = table.rows.clone();

    for col in &table.columns {
        let parsed: Option<Vec<CellValue>> =
            table.column_values(col).map(parse_date_cell).collect();
        let Some(parsed) = parsed else {
            continue;
        };
        // All-null columns gain nothing from promotion.
        if parsed.iter().all(CellValue::is_null) {
            continue;
        }
        for (row, cell) in rows.iter_mut().zip(parsed) {
            row.insert(col.clone(), cell);
        }
    }

    CustomerTable::new(table.columns.clone(), rows)
}

// ---------------------------------------------------------------------------
// Constraints and filter state
// ---------------------------------------------------------------------------

/// A per-column constraint whose shape matches the column's inferred kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    /// Keep rows whose value is in the selected set.
    Categorical(BTreeSet<CellValue>),
    /// Keep rows with `lo <= value <= hi`, inclusive on both ends.
    Numeric { lo: f64, hi: f64 },
    /// Keep rows whose date falls in `[start, end]`. Takes effect only when
    /// both endpoints are supplied; otherwise the column is left unfiltered.
    Temporal {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    /// Keep rows whose text representation matches the pattern (regex when it
    /// compiles, plain substring otherwise). An empty pattern is a no-op.
    Text(String),
}

/// Caller-owned filter configuration, re-supplied in full on every
/// invocation: the "Add filters" toggle plus one constraint per selected
/// column. Inserting a constraint for a column twice has no extra effect;
/// removing the entry de-selects the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub enabled: bool,
    pub constraints: BTreeMap<String, ColumnConstraint>,
}

impl FilterState {
    pub fn select(&mut self, column: &str, constraint: ColumnConstraint) {
        self.constraints.insert(column.to_string(), constraint);
    }

    pub fn deselect(&mut self, column: &str) {
        self.constraints.remove(column);
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.constraints.contains_key(column)
    }
}

// ---------------------------------------------------------------------------
// The filter pass
// ---------------------------------------------------------------------------

/// One active constraint with its pre-compiled comparison.
enum Predicate {
    InSet(BTreeSet<CellValue>),
    Between(f64, f64),
    DateBetween(NaiveDateTime, NaiveDateTime),
    Matches(Regex),
    Contains(String),
}

impl Predicate {
    fn passes(&self, value: &CellValue) -> bool {
        match self {
            Predicate::InSet(selected) => selected.contains(value),
            Predicate::Between(lo, hi) => value
                .as_f64()
                .is_some_and(|v| *lo <= v && v <= *hi),
            Predicate::DateBetween(start, end) => value
                .as_datetime()
                .is_some_and(|dt| *start <= dt && dt <= *end),
            Predicate::Matches(re) => re.is_match(&value.to_string()),
            Predicate::Contains(needle) => value.to_string().contains(needle),
        }
    }
}

/// Build the predicate for one selected column, or `None` when the
/// constraint is currently inert (single date endpoint, empty pattern, or a
/// shape that does not match the column's inferred kind).
fn build_predicate(
    table: &CustomerTable,
    column: &str,
    constraint: &ColumnConstraint,
) -> Option<Predicate> {
    match (classify_column(table, column), constraint) {
        (ColumnKind::Categorical, ColumnConstraint::Categorical(selected)) => {
            Some(Predicate::InSet(selected.clone()))
        }
        (ColumnKind::Numeric, ColumnConstraint::Numeric { lo, hi }) => {
            Some(Predicate::Between(*lo, *hi))
        }
        (ColumnKind::Temporal, ColumnConstraint::Temporal { start, end }) => {
            // Both endpoints required, matching a half-configured range
            // picker leaving the column unfiltered.
            let (start, end) = ((*start)?, (*end)?);
            Some(Predicate::DateBetween(
                start.and_hms_opt(0, 0, 0)?,
                end.and_hms_opt(23, 59, 59)?,
            ))
        }
        (ColumnKind::Text, ColumnConstraint::Text(pattern)) => {
            if pattern.is_empty() {
                return None;
            }
            match Regex::new(pattern) {
                Ok(re) => Some(Predicate::Matches(re)),
                Err(_) => Some(Predicate::Contains(pattern.clone())),
            }
        }
        // Kind/constraint mismatch: stale widget state after a
        // reclassification. Leave the column unfiltered for this pass.
        _ => None,
    }
}

/// Apply the caller's filter state to a table, producing a new table.
///
/// * `state.enabled == false` returns the input unchanged, no classification
///   work done.
/// * Otherwise text columns are opportunistically promoted to temporal
///   ([`coerce_temporal`]), each selected column is classified and its
///   constraint applied, and constraints across columns combine with AND.
///
/// Rows only ever drop out (output rows are a subset of input rows, relative
/// order preserved) and every column is retained. Pure function: same
/// inputs, same output, no side effects.
pub fn filter_table(table: &CustomerTable, state: &FilterState) -> CustomerTable {
    if !state.enabled {
        return table.clone();
    }

    let table = coerce_temporal(table);

    let predicates: Vec<(&String, Predicate)> = state
        .constraints
        .iter()
        .filter_map(|(col, c)| build_predicate(&table, col, c).map(|p| (col, p)))
        .collect();

    let rows = table
        .rows
        .iter()
        .filter(|row| {
            predicates.iter().all(|(col, pred)| {
                pred.passes(row.get(*col).unwrap_or(&CellValue::Null))
            })
        })
        .cloned()
        .collect();

    CustomerTable::new(table.columns.clone(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;

    fn table(columns: &[&str], rows: Vec<Vec<CellValue>>) -> CustomerTable {
        let rows = rows
            .into_iter()
            .map(|vals| {
                columns
                    .iter()
                    .zip(vals)
                    .map(|(c, v)| (c.to_string(), v))
                    .collect::<Row>()
            })
            .collect();
        CustomerTable::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn i(v: i64) -> CellValue {
        CellValue::Integer(v)
    }

    /// 50 rows cycling a nine-value numeric column and a wide numeric column.
    fn sample() -> CustomerTable {
        let rows = (0..50)
            .map(|n| vec![i(n % 9 + 1), i(10 + (n % 41)), s(&format!("cust{n:02}"))])
            .collect();
        table(&["bucket", "balance", "name"], rows)
    }

    fn filters(pairs: Vec<(&str, ColumnConstraint)>) -> FilterState {
        FilterState {
            enabled: true,
            constraints: pairs
                .into_iter()
                .map(|(c, v)| (c.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn flag_off_is_identity() {
        let t = sample();
        let state = FilterState {
            enabled: false,
            constraints: filters(vec![(
                "balance",
                ColumnConstraint::Numeric { lo: 0.0, hi: 0.0 },
            )])
            .constraints,
        };
        assert_eq!(filter_table(&t, &state), t);
    }

    #[test]
    fn output_rows_are_an_ordered_subset() {
        let t = sample();
        let state = filters(vec![(
            "balance",
            ColumnConstraint::Numeric { lo: 15.0, hi: 30.0 },
        )]);
        let out = filter_table(&t, &state);
        assert!(out.len() <= t.len());
        // Every surviving row appears in the input, in the same relative order.
        let mut cursor = 0;
        for row in &out.rows {
            let pos = t.rows[cursor..]
                .iter()
                .position(|r| r == row)
                .expect("filtered row missing from input");
            cursor += pos + 1;
        }
        assert_eq!(out.columns, t.columns);
    }

    #[test]
    fn constraints_compose_with_and() {
        let t = sample();
        let a = (
            "bucket",
            ColumnConstraint::Categorical([i(1), i(3), i(5)].into_iter().collect()),
        );
        let b = (
            "balance",
            ColumnConstraint::Numeric { lo: 20.0, hi: 40.0 },
        );

        let both = filter_table(&t, &filters(vec![a.clone(), b.clone()]));
        let sequential =
            filter_table(&filter_table(&t, &filters(vec![a])), &filters(vec![b]));
        assert_eq!(both, sequential);
    }

    #[test]
    fn nine_distinct_numeric_values_filter_as_categorical() {
        let t = sample();
        assert_eq!(classify_column(&t, "bucket"), ColumnKind::Categorical);

        let state = filters(vec![(
            "bucket",
            ColumnConstraint::Categorical([i(1), i(3), i(5)].into_iter().collect()),
        )]);
        let out = filter_table(&t, &state);
        assert!(!out.is_empty());
        for row in &out.rows {
            assert!(matches!(row["bucket"], CellValue::Integer(1 | 3 | 5)));
        }

        // A numeric interval on the same column is a shape mismatch and must
        // not filter anything.
        let mismatched = filters(vec![(
            "bucket",
            ColumnConstraint::Numeric { lo: 1.0, hi: 2.0 },
        )]);
        assert_eq!(filter_table(&t, &mismatched).len(), t.len());
    }

    #[test]
    fn nulls_do_not_count_toward_the_categorical_threshold() {
        // Nine distinct values plus missing cells must stay categorical.
        let rows = (0..50)
            .map(|n| {
                let v = if n % 10 == 9 { CellValue::Null } else { i(n % 9 + 1) };
                vec![v, s(&format!("cust{n:02}"))]
            })
            .collect();
        let t = table(&["bucket", "name"], rows);
        assert_eq!(classify_column(&t, "bucket"), ColumnKind::Categorical);

        let state = filters(vec![(
            "bucket",
            ColumnConstraint::Categorical([i(2)].into_iter().collect()),
        )]);
        let out = filter_table(&t, &state);
        assert!(!out.is_empty());
        for row in &out.rows {
            assert_eq!(row["bucket"], i(2));
        }
    }

    #[test]
    fn numeric_interval_is_inclusive_on_both_ends() {
        let rows = (10..=50).map(|n| vec![i(n), s(&n.to_string())]).collect();
        let t = table(&["value", "label"], rows);
        assert_eq!(classify_column(&t, "value"), ColumnKind::Numeric);

        let state = filters(vec![(
            "value",
            ColumnConstraint::Numeric { lo: 20.0, hi: 40.0 },
        )]);
        let out = filter_table(&t, &state);
        assert_eq!(out.len(), 21);
        assert_eq!(out.value(0, "value"), &i(20));
        assert_eq!(out.value(20, "value"), &i(40));
    }

    fn dated_table() -> CustomerTable {
        // 24 distinct dates so the column is not categorical.
        let rows = (0..24)
            .map(|n| {
                let month = n / 2 + 1;
                let day = n % 2 * 14 + 1;
                vec![s(&format!("{day:02}/{month:02}/2020")), i(100 + n)]
            })
            .collect();
        table(&["joined", "seq"], rows)
    }

    #[test]
    fn text_dates_promote_to_temporal() {
        let promoted = coerce_temporal(&dated_table());
        assert_eq!(classify_column(&promoted, "joined"), ColumnKind::Temporal);
    }

    #[test]
    fn one_parse_miss_keeps_the_column_textual() {
        let mut t = dated_table();
        t.rows[5].insert("joined".to_string(), s("not a date"));
        let t = CustomerTable::new(t.columns.clone(), t.rows);

        let promoted = coerce_temporal(&t);
        assert_eq!(classify_column(&promoted, "joined"), ColumnKind::Text);
        assert_eq!(promoted, t);
    }

    #[test]
    fn temporal_filter_needs_both_endpoints() {
        let t = dated_table();
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();

        let half_open = filters(vec![(
            "joined",
            ColumnConstraint::Temporal {
                start: Some(start),
                end: None,
            },
        )]);
        assert_eq!(filter_table(&t, &half_open).len(), t.len());

        let closed = filters(vec![(
            "joined",
            ColumnConstraint::Temporal {
                start: Some(start),
                end: Some(end),
            },
        )]);
        let out = filter_table(&t, &closed);
        assert_eq!(out.len(), 8);
        for dt in out.column_values("joined") {
            let d = dt.as_datetime().unwrap().date();
            assert!(start <= d && d <= end);
        }
    }

    #[test]
    fn empty_text_pattern_is_a_no_op() {
        let rows = (0..15)
            .map(|n| vec![s(&format!("customer-{n:02}@example.com"))])
            .collect();
        let t = table(&["email"], rows);
        assert_eq!(classify_column(&t, "email"), ColumnKind::Text);

        let state = filters(vec![("email", ColumnConstraint::Text(String::new()))]);
        assert_eq!(filter_table(&t, &state).len(), t.len());
    }

    #[test]
    fn text_pattern_matches_as_regex_with_substring_fallback() {
        let rows = (0..15)
            .map(|n| vec![s(&format!("customer-{n:02}@example.com"))])
            .collect();
        let t = table(&["email"], rows);

        let regex = filters(vec![("email", ColumnConstraint::Text("0[13]@".into()))]);
        assert_eq!(filter_table(&t, &regex).len(), 2);

        // Unbalanced bracket fails to compile; falls back to substring.
        let invalid = filters(vec![("email", ColumnConstraint::Text("[0".into()))]);
        assert_eq!(filter_table(&t, &invalid).len(), 0);
    }

    #[test]
    fn refiltering_is_idempotent() {
        let t = sample();
        let state = filters(vec![
            (
                "bucket",
                ColumnConstraint::Categorical([i(2), i(4)].into_iter().collect()),
            ),
            (
                "balance",
                ColumnConstraint::Numeric { lo: 12.0, hi: 44.0 },
            ),
        ]);
        let once = filter_table(&t, &state);
        let twice = filter_table(&once, &state);
        assert_eq!(once, twice);
    }

    #[test]
    fn excluding_range_yields_empty_table_not_an_error() {
        let t = sample();
        let state = filters(vec![(
            "balance",
            ColumnConstraint::Numeric {
                lo: 1000.0,
                hi: 2000.0,
            },
        )]);
        let out = filter_table(&t, &state);
        assert!(out.is_empty());
        assert_eq!(out.columns, t.columns);
    }
}
