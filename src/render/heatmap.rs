//! Heatmap renderer: one column of shaded row cells per visible slot.

use eframe::egui::Color32;

use crate::engine::gradient::blend;
use crate::engine::layout::RowLayout;
use crate::engine::series::SlotSeries;
use crate::error::{Result, ensure_positive};
use crate::render::Surface;

pub struct HeatmapRenderer {
    /// Colour at full strength.
    pub foreground: Color32,
    /// Colour at zero strength.
    pub background: Color32,
}

impl HeatmapRenderer {
    pub fn new(foreground: Color32, background: Color32) -> Self {
        Self {
            foreground,
            background,
        }
    }

    /// Draw every visible slot right-to-left from `origin_x`, building or
    /// refreshing rows on the way. Rows with no size are left transparent.
    pub fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        series: &mut SlotSeries,
        origin_x: f64,
        layout: &RowLayout,
        max_size: f64,
    ) -> Result<()> {
        layout.validate()?;
        ensure_positive("max_size", max_size)?;

        for col in series.columns(origin_x) {
            let Some(slot) = series.prepare_slot(col.index, layout) else {
                continue;
            };
            for (i, row) in slot.rows().iter().enumerate() {
                let strength = row.size / max_size;
                if strength <= 0.0 {
                    continue;
                }
                let y = i as f64 * layout.row_height;
                surface.set_fill_color(blend(strength, self.foreground, self.background));
                surface.fill_rectangle(col.x, y, col.right(), y + layout.row_height);
            }
        }
        Ok(())
    }
}
