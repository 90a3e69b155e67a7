use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CustomerLensApp {
    pub state: AppState,
}

impl eframe::App for CustomerLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: the customers table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("My Customers");
            ui.label("Explore a sample of the customers collection and narrow it column by column.");
            ui.add_space(8.0);
            table::customer_table(ui, &self.state);
        });
    }
}
