use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::ColumnConstraint;
use crate::data::model::CustomerTable;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel: the "Add filters" toggle, the column
/// multi-select, and one type-appropriate widget per selected column.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    // Clone the working copy so we can mutate state inside the loops.
    let working = match &state.working {
        Some(w) => w.clone(),
        None => {
            ui.label("No data loaded.");
            return;
        }
    };

    ui.checkbox(&mut state.filters.enabled, "Add filters");

    if state.filters.enabled {
        ui.add_space(4.0);
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui: &mut Ui| {
                // ---- Column multi-select ----
                ui.strong("Filter table on");
                for col in &working.columns {
                    let mut selected = state.filters.is_selected(col);
                    if ui.checkbox(&mut selected, col).changed() {
                        state.toggle_column(col);
                    }
                }
                ui.separator();

                // ---- Per-column constraint widgets ----
                for col in &working.columns {
                    if state.filters.is_selected(col) {
                        constraint_widget(ui, state, &working, col);
                    }
                }
            });
    }

    // Recompute the view after any widget changes.
    state.refilter();
}

/// The kind-specific constraint editor for one selected column.
fn constraint_widget(ui: &mut Ui, state: &mut AppState, working: &CustomerTable, col: &str) {
    let Some(constraint) = state.filters.constraints.get_mut(col) else {
        return;
    };

    egui::CollapsingHeader::new(RichText::new(format!("Values for {col}")).strong())
        .id_salt(col)
        .default_open(true)
        .show(ui, |ui: &mut Ui| match constraint {
            ColumnConstraint::Categorical(selected) => {
                let Some(all_values) = working.unique_values.get(col) else {
                    return;
                };
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        *selected = all_values.clone();
                    }
                    if ui.small_button("None").clicked() {
                        selected.clear();
                    }
                    ui.label(format!("{}/{}", selected.len(), all_values.len()));
                });
                for val in all_values {
                    let mut checked = selected.contains(val);
                    if ui.checkbox(&mut checked, val.to_string()).changed() {
                        if checked {
                            selected.insert(val.clone());
                        } else {
                            selected.remove(val);
                        }
                    }
                }
            }

            ColumnConstraint::Numeric { lo, hi } => {
                let (min, max) = working.numeric_range(col).unwrap_or((0.0, 1.0));
                // Dual-ended range: two sliders over [min, max] in 100 steps.
                let step = (max - min) / 100.0;
                ui.add(Slider::new(lo, min..=max).step_by(step).text("from"));
                ui.add(Slider::new(hi, min..=max).step_by(step).text("to"));
            }

            ColumnConstraint::Temporal { start, end } => {
                let fallback = working
                    .date_range(col)
                    .unwrap_or_else(|| (default_date(), default_date()));
                date_endpoint(ui, "from", start, fallback.0, &format!("{col}-from"));
                date_endpoint(ui, "to", end, fallback.1, &format!("{col}-to"));
                if start.is_none() || end.is_none() {
                    ui.label(
                        RichText::new("Pick both dates to apply this filter")
                            .small()
                            .color(Color32::GRAY),
                    );
                }
            }

            ColumnConstraint::Text(pattern) => {
                ui.label(format!("Substring or regex in {col}"));
                ui.text_edit_singleline(pattern);
            }
        });
}

/// One optional endpoint of a date range: a checkbox arming the bound plus a
/// picker when armed.
fn date_endpoint(
    ui: &mut Ui,
    label: &str,
    slot: &mut Option<NaiveDate>,
    fallback: NaiveDate,
    salt: &str,
) {
    ui.horizontal(|ui: &mut Ui| {
        let mut armed = slot.is_some();
        if ui.checkbox(&mut armed, label).changed() {
            *slot = if armed { Some(fallback) } else { None };
        }
        if let Some(date) = slot.as_mut() {
            ui.add(DatePickerButton::new(date).id_salt(salt));
        }
    });
}

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(table), Some(view)) = (&state.table, &state.view) {
            ui.label(format!(
                "{} customers loaded, {} shown",
                table.len(),
                view.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open customers export")
        .add_filter("Supported files", &["json", "csv", "parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(path);
    }
}
