//! Per-frame price/row geometry shared by the heatmap and overlay renderers.

use crate::error::{AppError, Result, ensure_finite, ensure_positive};

/// Vertical framing of the chart: which price sits at row 0 and how far
/// apart consecutive rows are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLayout {
    pub rows_count: usize,
    /// Pixel height of one row.
    pub row_height: f64,
    /// Price of row 0 (top of the window).
    pub price_anchor: f64,
    /// Price distance between consecutive rows.
    pub price_step: f64,
}

impl RowLayout {
    pub fn new(rows_count: usize, row_height: f64, price_anchor: f64, price_step: f64) -> Result<Self> {
        let layout = Self {
            rows_count,
            row_height,
            price_anchor,
            price_step,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Build a layout that puts `mid` on the middle row, with the anchor
    /// snapped to a multiple of `price_step` so rows land on whole steps.
    pub fn centered_on(mid: f64, rows_count: usize, row_height: f64, price_step: f64) -> Result<Self> {
        ensure_finite("mid price", mid)?;
        let probe = Self::new(rows_count, row_height, mid, price_step)?;
        let top = mid + (rows_count / 2) as f64 * price_step;
        let anchor = (top / price_step).round() * price_step;
        Ok(Self {
            price_anchor: anchor,
            ..probe
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_count == 0 {
            return Err(AppError::InvalidConfiguration {
                name: "rows_count",
                reason: "must be at least one",
            });
        }
        ensure_positive("row_height", self.row_height)?;
        ensure_finite("price_anchor", self.price_anchor)?;
        ensure_finite("price_step", self.price_step)?;
        if self.price_step == 0.0 {
            return Err(AppError::InvalidConfiguration {
                name: "price_step",
                reason: "must not be zero",
            });
        }
        Ok(())
    }

    /// Vertical pixel position of `price` relative to the top of the window.
    #[inline]
    pub fn price_to_y(&self, price: f64) -> f64 {
        (self.price_anchor - price) / self.price_step * self.row_height
    }

    /// Total pixel height covered by all rows.
    pub fn height(&self) -> f64 {
        self.rows_count as f64 * self.row_height
    }
}
