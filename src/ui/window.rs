//! The `AppWindow` trait and the shared `AppState` view passed to each window.
//!
//! To add a new window:
//! 1. Create a new file in `ui/windows/`.
//! 2. Implement `AppWindow` for your struct.
//! 3. Push `Box::new(MyWindow::default())` into `App::windows` in `App::new()`.

use crate::engine::{collector::SlotCollector, scale::SizeScale, series::SlotSeries};

/// UI-only chart settings, edited in the settings window and turned into a
/// fresh render configuration every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    /// Pixel height of one price row.
    pub row_height: f64,
    /// Price step per row, in instrument ticks.
    pub step_ticks: u32,
    /// Keep the mid price inside the middle of the chart.
    pub follow_price: bool,
    pub show_lines: bool,
    pub show_trades: bool,
    pub show_labels: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            row_height: 4.0,
            step_ticks: 1,
            follow_price: true,
            show_lines: true,
            show_trades: true,
            show_labels: true,
        }
    }
}

/// View of engine state shared with every window's `show` call.
pub struct AppState<'a> {
    pub series: &'a mut SlotSeries,
    pub collector: &'a SlotCollector,
    pub scale: &'a mut SizeScale,
    pub settings: &'a mut ViewSettings,
    /// Instrument tick size, if known.
    pub tick_size: Option<f64>,
    pub price_prec: usize,
}

/// Trait implemented by every window/panel.
///
/// Each window owns its own open/closed flag and any window-specific UI state.
/// The orchestrator (`App`) iterates over all registered windows and calls
/// `show` on each frame.
pub trait AppWindow {
    /// Display name shown on the toggle button and as the egui window title.
    fn name(&self) -> &str;

    /// Toggle the window's open/closed state.
    fn toggle(&mut self);

    /// Draw the window contents.  Called every frame by `App::update`.
    fn show(&mut self, ctx: &egui::Context, state: &mut AppState<'_>);
}
