//! Settings window: row geometry, price step, contrast and overlay toggles.

use crate::ui::window::{AppState, AppWindow};
use eframe::egui;

#[derive(Default)]
pub struct SettingsView {
    open: bool,
}

impl AppWindow for SettingsView {
    fn name(&self) -> &str {
        "Chart Settings"
    }

    fn toggle(&mut self) {
        self.open = !self.open;
    }

    fn show(&mut self, ctx: &egui::Context, state: &mut AppState<'_>) {
        egui::Window::new(self.name())
            .open(&mut self.open)
            .show(ctx, |ui| {
                let settings = &mut *state.settings;
                ui.horizontal(|ui| {
                    ui.label("Row height (px):");
                    ui.add(egui::Slider::new(&mut settings.row_height, 1.0..=20.0));
                });
                ui.horizontal(|ui| {
                    ui.label("Ticks per row:");
                    ui.add(egui::Slider::new(&mut settings.step_ticks, 1..=200).logarithmic(true));
                });
                ui.horizontal(|ui| {
                    ui.label("Contrast (σ above mean):");
                    ui.add(egui::Slider::new(&mut state.scale.contrast, 0.5..=12.0));
                    if ui.button("Reset Stats").clicked() {
                        state.scale.reset();
                    }
                });
                ui.checkbox(&mut settings.follow_price, "Follow price");
                ui.checkbox(&mut settings.show_lines, "Best bid/ask lines");
                ui.checkbox(&mut settings.show_trades, "Trade bubbles");
                ui.checkbox(&mut settings.show_labels, "Time labels");
                ui.separator();
                if ui.button("Rebuild history framing").clicked() {
                    state.series.invalidate_rows();
                    log::info!("cached rows dropped on request");
                }
                ui.label(format!(
                    "{} slots of {}px, {} samples in size scale",
                    state.series.len(),
                    state.series.slot_width(),
                    state.scale.samples
                ));
            });
    }
}
