use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Customer table (central panel)
// ---------------------------------------------------------------------------

/// Render the filtered table in the central panel. No synthetic row index
/// column; only the source columns are shown.
pub fn customer_table(ui: &mut Ui, state: &AppState) {
    let view = match &state.view {
        Some(v) => v,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a customers export to begin  (File → Open…)");
            });
            return;
        }
    };

    if view.is_empty() {
        ui.label("No rows match the current filters.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(60.0).clip(true), view.columns.len())
        .header(20.0, |mut header| {
            for col in &view.columns {
                header.col(|ui| {
                    ui.strong(col);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, view.len(), |mut row| {
                let idx = row.index();
                for col in &view.columns {
                    row.col(|ui| {
                        ui.label(view.value(idx, col).to_string());
                    });
                }
            });
        });
}
