//! Bookmap window: price/time liquidity heatmap with best bid/ask lines,
//! trade bubbles and a time axis.

use crate::engine::layout::RowLayout;
use crate::error::Result;
use crate::render::heatmap::HeatmapRenderer;
use crate::render::overlay::OverlayRenderer;
use crate::render::{Surface, TextSurface};
use crate::ui::colors;
use crate::ui::painter::EguiSurface;
use crate::ui::window::{AppState, AppWindow};
use eframe::egui;

/// Pixels reserved below the rows for time labels.
const TIME_AXIS_HEIGHT: f64 = 16.0;
/// Pixels reserved right of the newest slot for price labels.
const PRICE_AXIS_WIDTH: f64 = 72.0;
/// A price label every this many rows.
const PRICE_LABEL_ROWS: usize = 10;
/// Mid price may wander between these fractions of the chart height before
/// follow mode recentres it.
const FOLLOW_BAND: (f64, f64) = (0.25, 0.75);

pub struct BookmapView {
    open: bool,
    chart: ChartState,
}

impl Default for BookmapView {
    fn default() -> Self {
        Self {
            open: true,
            chart: ChartState::default(),
        }
    }
}

/// Framing carried between frames.
struct ChartState {
    heatmap: HeatmapRenderer,
    overlay: OverlayRenderer,
    /// Current price of row 0.
    anchor: Option<f64>,
    /// `(rows_count, price_step)` the cached slot rows were built for.
    framing: Option<(usize, f64)>,
    last_error: Option<String>,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            heatmap: HeatmapRenderer::new(colors::HEAT_HIGH, colors::HEAT_LOW),
            overlay: OverlayRenderer {
                ask_line: colors::ASK_LINE,
                bid_line: colors::BID_LINE,
                ask_trade: colors::BUY_TRADE,
                bid_trade: colors::SELL_TRADE,
                label: colors::LABEL,
                line_width: 2.0,
                label_every: 30,
            },
            anchor: None,
            framing: None,
            last_error: None,
        }
    }
}

/// Price step guess for instruments whose tick size is unknown.
fn fallback_step(mid: f64) -> f64 {
    10f64.powf(mid.abs().max(1e-12).log10().floor() - 4.0)
}

impl ChartState {
    /// Row framing for this frame: keeps the previous anchor unless follow
    /// mode needs to recentre on `mid`.
    fn layout(&mut self, mid: f64, rows: usize, row_height: f64, step: f64, follow: bool) -> Result<RowLayout> {
        let centered = RowLayout::centered_on(mid, rows, row_height, step)?;
        let layout = match self.anchor {
            Some(anchor) => RowLayout::new(rows, row_height, anchor, step)?,
            None => centered,
        };
        let mid_row = (layout.price_anchor - mid) / step / rows as f64;
        let drifted = mid_row < FOLLOW_BAND.0 || mid_row > FOLLOW_BAND.1;
        let layout = if follow && drifted { centered } else { layout };
        self.anchor = Some(layout.price_anchor);
        Ok(layout)
    }

    /// Shift the anchor by a vertical drag of `dy` pixels.
    fn scroll(&mut self, dy: f64, row_height: f64, step: f64) {
        if let Some(anchor) = self.anchor.as_mut() {
            *anchor += dy / row_height * step;
        }
    }

    fn render<S: Surface + TextSurface>(
        &mut self,
        surface: &mut S,
        state: &mut AppState<'_>,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let mid = state.collector.mid_price().filter(|_| !state.series.is_empty());
        let Some(mid) = mid else {
            surface.draw_text(8.0, 8.0, "Waiting for order book...", colors::LABEL);
            return Ok(());
        };

        let settings = &*state.settings;
        let row_height = settings.row_height;
        let step = state.tick_size.unwrap_or_else(|| fallback_step(mid)) * f64::from(settings.step_ticks);
        let rows = ((height - TIME_AXIS_HEIGHT) / row_height).floor().max(1.0) as usize;

        if self.framing != Some((rows, step)) {
            if self.framing.is_some() {
                state.series.invalidate_rows();
                log::info!("chart framing changed to {rows} rows of {step}, rebuilding rows");
            }
            self.framing = Some((rows, step));
            self.anchor = None;
        }

        let layout = self.layout(mid, rows, row_height, step, settings.follow_price)?;
        let origin_x = (width - PRICE_AXIS_WIDTH).max(0.0);

        match state.scale.max_row_size(settings.step_ticks) {
            Some(max_size) => self
                .heatmap
                .draw(surface, state.series, origin_x, &layout, max_size)?,
            // Scale not warmed up: build rows, draw nothing.
            None => state.series.refresh_rows(origin_x, &layout)?,
        }
        if settings.show_lines {
            self.overlay
                .draw_boundary_lines(surface, state.series, origin_x, &layout)?;
        }
        if settings.show_trades {
            let max_trade = state.series.max_visible_trade_size(origin_x);
            if max_trade > 0.0 {
                self.overlay
                    .draw_trade_markers(surface, state.series, origin_x, &layout, max_trade)?;
            }
        }
        if settings.show_labels {
            self.overlay
                .draw_time_labels(surface, state.series, origin_x, layout.height() + 2.0)?;
        }

        for i in (0..rows).step_by(PRICE_LABEL_ROWS) {
            let price = layout.price_anchor - i as f64 * step;
            let label = format!("{price:.prec$}", prec = state.price_prec);
            surface.draw_text(origin_x + 4.0, i as f64 * row_height, &label, colors::LABEL);
        }
        Ok(())
    }
}

impl AppWindow for BookmapView {
    fn name(&self) -> &str {
        "Bookmap"
    }

    fn toggle(&mut self) {
        self.open = !self.open;
    }

    fn show(&mut self, ctx: &egui::Context, state: &mut AppState<'_>) {
        let chart = &mut self.chart;
        egui::Window::new("Bookmap")
            .open(&mut self.open)
            .default_size([960.0, 540.0])
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
                let painter = ui.painter_at(rect);
                painter.rect_filled(rect, 0.0, colors::BACKGROUND);

                if response.dragged() && !state.settings.follow_price {
                    let step = chart.framing.map_or(0.0, |(_, step)| step);
                    chart.scroll(f64::from(response.drag_delta().y), state.settings.row_height, step);
                }

                let mut surface = EguiSurface::new(&painter, rect.min);
                let result = chart.render(
                    &mut surface,
                    state,
                    f64::from(rect.width()),
                    f64::from(rect.height()),
                );
                match result {
                    Ok(()) => chart.last_error = None,
                    Err(e) => {
                        let msg = e.to_string();
                        if chart.last_error.as_deref() != Some(msg.as_str()) {
                            log::warn!("chart not rendered: {msg}");
                        }
                        surface.draw_text(8.0, 8.0, &msg, colors::ASK_LINE);
                        chart.last_error = Some(msg);
                    }
                }
            });
    }
}
