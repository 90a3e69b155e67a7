use std::path::PathBuf;

use crate::data::cache::CachedTable;
use crate::data::filter::{
    ColumnConstraint, ColumnKind, FilterState, classify_column, coerce_temporal, filter_table,
};
use crate::data::loader;
use crate::data::model::CustomerTable;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering. Widget state (the filter
/// toggle and per-column constraints) lives here and is re-supplied to the
/// filter engine on every pass; the engine itself keeps nothing between
/// invocations.
pub struct AppState {
    /// Fetched table as the loader produced it (None until a file is opened).
    pub table: Option<CustomerTable>,

    /// Temporal-coerced copy of `table`, used to choose widgets and ranges.
    pub working: Option<CustomerTable>,

    /// Result of the latest filter pass (what the central panel renders).
    pub view: Option<CustomerTable>,

    /// The "Add filters" toggle plus per-column constraints.
    pub filters: FilterState,

    /// Read-through TTL cache in front of the loader.
    pub cache: CachedTable,

    /// Path of the currently opened export file.
    pub source_path: Option<PathBuf>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a load operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            table: None,
            working: None,
            view: None,
            filters: FilterState::default(),
            cache: CachedTable::default(),
            source_path: None,
            status_message: None,
            loading: false,
        }
    }
}

impl AppState {
    /// Ingest a freshly fetched table, resetting filters and the view.
    pub fn set_table(&mut self, table: CustomerTable) {
        self.working = Some(coerce_temporal(&table));
        self.view = Some(table.clone());
        self.filters = FilterState::default();
        self.table = Some(table);
        self.status_message = None;
        self.loading = false;
    }

    /// Recompute the rendered view after any filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.view = Some(filter_table(table, &self.filters));
        }
    }

    /// Select or de-select a column for filtering. Selecting installs the
    /// column's default (all-pass) constraint; de-selecting removes it.
    pub fn toggle_column(&mut self, column: &str) {
        if self.filters.is_selected(column) {
            self.filters.deselect(column);
        } else if let Some(constraint) = self
            .working
            .as_ref()
            .map(|t| default_constraint(t, column))
        {
            self.filters.select(column, constraint);
        }
        self.refilter();
    }

    /// Open a new export file, bypassing any cached table.
    pub fn open_path(&mut self, path: PathBuf) {
        self.cache.invalidate();
        self.source_path = Some(path);
        self.fetch();
    }

    /// Re-read the current file through the cache (no-op inside the TTL).
    pub fn reload(&mut self) {
        self.fetch();
    }

    fn fetch(&mut self) {
        let Some(path) = self.source_path.clone() else {
            return;
        };
        self.loading = true;
        let cache_hit = self.cache.is_fresh();
        let fetched = self
            .cache
            .get_or_fetch(|| loader::load_file(&path))
            .map(|table| table.clone());
        match fetched {
            Ok(table) => {
                // A fresh cache entry means no new data arrived; keep the
                // current filter selections and view.
                if cache_hit && self.table.is_some() {
                    self.loading = false;
                    return;
                }
                log::info!(
                    "loaded {} customers with columns {:?}",
                    table.len(),
                    table.columns
                );
                self.set_table(table);
            }
            Err(e) => {
                log::error!("failed to load {}: {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
                self.loading = false;
            }
        }
    }
}

/// The all-pass constraint a column starts from when first selected:
/// every value checked, the full [min, max] span, or an empty pattern.
pub fn default_constraint(table: &CustomerTable, column: &str) -> ColumnConstraint {
    match classify_column(table, column) {
        ColumnKind::Categorical => ColumnConstraint::Categorical(
            table
                .unique_values
                .get(column)
                .cloned()
                .unwrap_or_default(),
        ),
        ColumnKind::Numeric => {
            let (lo, hi) = table.numeric_range(column).unwrap_or((0.0, 0.0));
            ColumnConstraint::Numeric { lo, hi }
        }
        ColumnKind::Temporal => {
            let range = table.date_range(column);
            ColumnConstraint::Temporal {
                start: range.map(|(lo, _)| lo),
                end: range.map(|(_, hi)| hi),
            }
        }
        ColumnKind::Text => ColumnConstraint::Text(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Row};

    fn table() -> CustomerTable {
        let rows = (0..30)
            .map(|n| {
                [
                    (
                        "tier".to_string(),
                        CellValue::String(["Basic", "Gold"][n % 2].to_string()),
                    ),
                    ("balance".to_string(), CellValue::Integer(n as i64 * 3)),
                ]
                .into_iter()
                .collect::<Row>()
            })
            .collect();
        CustomerTable::new(vec!["tier".into(), "balance".into()], rows)
    }

    #[test]
    fn toggling_a_column_twice_removes_its_constraint() {
        let mut state = AppState::default();
        state.set_table(table());

        state.toggle_column("balance");
        assert!(state.filters.is_selected("balance"));
        state.toggle_column("balance");
        assert!(!state.filters.is_selected("balance"));
    }

    #[test]
    fn default_constraints_are_all_pass() {
        let mut state = AppState::default();
        state.set_table(table());
        state.filters.enabled = true;
        state.toggle_column("tier");
        state.toggle_column("balance");

        let view = state.view.as_ref().unwrap();
        assert_eq!(view.len(), 30);
    }

    #[test]
    fn reload_inside_ttl_keeps_filter_selections() {
        let path = std::env::temp_dir().join(format!(
            "customerlens-reload-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[{"_id": 1, "tier": "Gold"}, {"_id": 2, "tier": "Basic"}]"#,
        )
        .unwrap();

        let mut state = AppState::default();
        state.open_path(path.clone());
        assert!(state.table.is_some());

        state.filters.enabled = true;
        state.toggle_column("tier");
        assert!(state.filters.is_selected("tier"));

        // Cached table is still fresh; selections must survive the reload.
        state.reload();
        std::fs::remove_file(&path).ok();

        assert!(state.filters.enabled);
        assert!(state.filters.is_selected("tier"));
    }

    #[test]
    fn set_table_resets_filters() {
        let mut state = AppState::default();
        state.set_table(table());
        state.filters.enabled = true;
        state.toggle_column("tier");

        state.set_table(table());
        assert!(!state.filters.enabled);
        assert!(state.filters.constraints.is_empty());
    }
}
