//! Overlays drawn on top of the heatmap: best bid/ask stair lines, trade
//! bubbles and the time axis.

use std::f64::consts::TAU;

use eframe::egui::Color32;

use crate::engine::layout::RowLayout;
use crate::engine::series::SlotSeries;
use crate::engine::timeslot::Side;
use crate::error::{Result, ensure_finite, ensure_positive};
use crate::render::{Surface, TextSurface};
use crate::utils::format_clock;

/// Smallest trade bubble radius in pixels.
pub const MARKER_MIN_RADIUS: f64 = 4.0;
/// Largest trade bubble radius in pixels.
pub const MARKER_MAX_RADIUS: f64 = 19.0;
/// Fraction of the maximum trade size that already saturates a bubble.
const MARKER_SATURATION: f64 = 0.8;

pub struct OverlayRenderer {
    /// Best-ask line.
    pub ask_line: Color32,
    /// Best-bid line.
    pub bid_line: Color32,
    /// Bubbles for trades that lifted the ask (taker buys).
    pub ask_trade: Color32,
    /// Bubbles for trades that hit the bid (taker sells).
    pub bid_trade: Color32,
    pub label: Color32,
    pub line_width: f64,
    /// A time label is drawn on every slot whose index is a multiple of this.
    pub label_every: usize,
}

/// Bubble radius for `trade_size`, growing linearly from
/// [`MARKER_MIN_RADIUS`] until `0.8 * max_trade_size`.
pub fn marker_radius(trade_size: f64, max_trade_size: f64) -> f64 {
    let t = (trade_size / (max_trade_size * MARKER_SATURATION)).clamp(0.0, 1.0);
    MARKER_MIN_RADIUS + t * (MARKER_MAX_RADIUS - MARKER_MIN_RADIUS)
}

impl OverlayRenderer {
    /// Draw one filled bubble per slot and side that saw trades.
    pub fn draw_trade_markers<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        series: &SlotSeries,
        origin_x: f64,
        layout: &RowLayout,
        max_trade_size: f64,
    ) -> Result<()> {
        layout.validate()?;
        ensure_positive("max_trade_size", max_trade_size)?;

        for (side, color) in [(Side::Ask, self.ask_trade), (Side::Bid, self.bid_trade)] {
            for col in series.columns(origin_x) {
                let slot = &series.slots()[col.index];
                let size = slot.trade_size(side);
                if slot.is_empty() || size == 0.0 {
                    continue;
                }
                let y = layout.price_to_y(slot.price(side));
                let r = marker_radius(size, max_trade_size);
                surface.draw_arc(col.center(), y, r, r, 0.0, TAU);
                surface.set_fill_color(color);
                surface.fill();
            }
        }
        Ok(())
    }

    /// Draw the best ask and best bid as stair-step polylines, broken into
    /// separate segments wherever a slot has no quote.
    pub fn draw_boundary_lines<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        series: &SlotSeries,
        origin_x: f64,
        layout: &RowLayout,
    ) -> Result<()> {
        layout.validate()?;
        surface.set_line_width(self.line_width);

        for (side, color) in [(Side::Ask, self.ask_line), (Side::Bid, self.bid_line)] {
            surface.set_stroke_color(color);
            let mut start = true;
            for col in series.columns(origin_x) {
                let slot = &series.slots()[col.index];
                let price = slot.price(side);
                if slot.is_empty() || price == 0.0 {
                    surface.stroke();
                    start = true;
                    continue;
                }

                let y = layout.price_to_y(price);
                if start {
                    start = false;
                    surface.move_to(col.right(), y);
                } else {
                    surface.line_to(col.right(), y);
                }
                surface.line_to(col.x, y);
            }
            surface.stroke();
        }

        surface.set_line_width(1.0);
        Ok(())
    }

    /// Draw `HH:MM:SS` labels at every `label_every`-th slot.
    pub fn draw_time_labels<T: TextSurface + ?Sized>(
        &self,
        text: &mut T,
        series: &SlotSeries,
        origin_x: f64,
        y: f64,
    ) -> Result<()> {
        ensure_finite("label y", y)?;
        let every = self.label_every.max(1);
        for col in series.columns(origin_x) {
            if col.index % every != 0 {
                continue;
            }
            let label = format_clock(series.slots()[col.index].from);
            text.draw_text(col.x, y, &label, self.label);
        }
        Ok(())
    }
}
