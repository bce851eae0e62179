//! The rolling slot sequence and its row cache policy.
//!
//! Rendering walks the series newest to oldest, one slot column per
//! `slot_width` pixels, stopping at the left edge. A slot's rows are built the
//! first time it becomes visible; after that only the newest [`HOT_SLOTS`]
//! slots are ever re-aggregated from their book snapshot. Older slots are
//! frozen and keep the sizes they were last filled with.

use jiff::Timestamp;

use crate::engine::layout::RowLayout;
use crate::engine::timeslot::{Side, Timeslot};
use crate::error::{Result, ensure_positive};

/// Number of newest slots still eligible for refill.
pub const HOT_SLOTS: usize = 3;
/// Book levels per side a frozen slot keeps for regenerating its rows.
pub const FROZEN_STATS_DEPTH: usize = 100;

/// One on-screen slot column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    /// Index into the series.
    pub index: usize,
    /// Left edge in pixels.
    pub x: f64,
    pub width: f64,
}

impl Column {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// Newest-to-oldest walk over slot columns ending right before `origin_x`.
///
/// Holds no borrow of the series, so callers may mutate slots while walking.
#[derive(Debug, Clone)]
pub struct Columns {
    remaining: usize,
    cx: f64,
    width: f64,
}

impl Iterator for Columns {
    type Item = Column;

    fn next(&mut self) -> Option<Column> {
        if self.remaining == 0 {
            return None;
        }
        self.cx -= self.width;
        if self.cx < 0.0 {
            self.remaining = 0;
            return None;
        }
        self.remaining -= 1;
        Some(Column {
            index: self.remaining,
            x: self.cx,
            width: self.width,
        })
    }
}

/// Append-only sequence of timeslots, newest last.
#[derive(Debug, Clone)]
pub struct SlotSeries {
    slots: Vec<Timeslot>,
    slot_width: f64,
}

impl SlotSeries {
    pub fn new(slot_width: f64) -> Result<Self> {
        ensure_positive("slot_width", slot_width)?;
        Ok(Self {
            slots: Vec::new(),
            slot_width,
        })
    }

    pub fn slot_width(&self) -> f64 {
        self.slot_width
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Timeslot] {
        &self.slots
    }

    pub fn last(&self) -> Option<&Timeslot> {
        self.slots.last()
    }

    /// Mutable access for the producer; only the newest slots are expected
    /// to still change.
    pub fn last_mut(&mut self) -> Option<&mut Timeslot> {
        self.slots.last_mut()
    }

    /// Append the newest slot. The slot leaving the hot window keeps only
    /// [`FROZEN_STATS_DEPTH`] levels per side of its book snapshot.
    pub fn push(&mut self, slot: Timeslot) {
        self.slots.push(slot);
        if let Some(frozen) = self.slots.len().checked_sub(HOT_SLOTS + 1) {
            self.slots[frozen].compact_stats(FROZEN_STATS_DEPTH);
        }
    }

    /// Hot slot whose interval covers `ts`, or the newest slot when none
    /// does. Late events never reach frozen slots.
    pub fn hot_slot_at_mut(&mut self, ts: Timestamp) -> Option<&mut Timeslot> {
        let len = self.slots.len();
        let index = (len.saturating_sub(HOT_SLOTS)..len)
            .rev()
            .find(|&i| self.slots[i].contains(ts))
            .or(len.checked_sub(1))?;
        self.slots.get_mut(index)
    }

    /// Drop all slots (called on symbol change).
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Visible slot columns, newest first, for a chart whose right edge is
    /// at `origin_x`.
    pub fn columns(&self, origin_x: f64) -> Columns {
        Columns {
            remaining: self.slots.len(),
            cx: origin_x,
            width: self.slot_width,
        }
    }

    /// Whether the slot at `index` may still be refilled.
    pub fn is_hot(&self, index: usize) -> bool {
        index + HOT_SLOTS >= self.slots.len()
    }

    /// Make sure the slot at `index` has rows for `layout` and apply the
    /// refill policy, then return it for drawing.
    pub fn prepare_slot(&mut self, index: usize, layout: &RowLayout) -> Option<&Timeslot> {
        let hot = self.is_hot(index);
        let slot = self.slots.get_mut(index)?;
        if slot.rows().is_empty() {
            slot.generate_rows(layout.rows_count, layout.price_anchor, layout.price_step);
            slot.refill();
        } else if hot && slot.is_stale() {
            slot.refill();
        }
        Some(slot)
    }

    /// Prepare every visible slot without drawing.
    pub fn refresh_rows(&mut self, origin_x: f64, layout: &RowLayout) -> Result<()> {
        layout.validate()?;
        for col in self.columns(origin_x) {
            self.prepare_slot(col.index, layout);
        }
        Ok(())
    }

    /// Forget every slot's cached rows, e.g. after the price step changed.
    pub fn invalidate_rows(&mut self) {
        for slot in &mut self.slots {
            slot.clear_rows();
        }
        log::debug!("dropped cached rows for {} slots", self.slots.len());
    }

    /// Largest trade size on either side among the visible slots.
    pub fn max_visible_trade_size(&self, origin_x: f64) -> f64 {
        self.columns(origin_x)
            .map(|col| {
                let slot = &self.slots[col.index];
                slot.trade_size(Side::Ask).max(slot.trade_size(Side::Bid))
            })
            .fold(0.0, f64::max)
    }
}
