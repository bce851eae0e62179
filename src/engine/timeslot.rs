//! Timeslots: one fixed time interval of book and trade activity, plus the
//! lazily built price-row histogram the heatmap is drawn from.

use std::collections::BTreeMap;
use std::sync::Arc;

use jiff::Timestamp;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::error::{AppError, Result};

/// Immutable snapshot of aggregated resting liquidity, keyed by price.
///
/// The collector hands a fresh `Arc` to the newest slot whenever the book
/// changes, so a slot never observes a half-applied update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookStats {
    pub bids: BTreeMap<Decimal, Decimal>,
    pub asks: BTreeMap<Decimal, Decimal>,
}

impl BookStats {
    /// Copy at most `depth` levels per side, nearest the touch.
    pub fn near_touch(
        bids: &BTreeMap<Decimal, Decimal>,
        asks: &BTreeMap<Decimal, Decimal>,
        depth: usize,
    ) -> Self {
        Self {
            bids: bids.iter().rev().take(depth).map(|(p, q)| (*p, *q)).collect(),
            asks: asks.iter().take(depth).map(|(p, q)| (*p, *q)).collect(),
        }
    }

    /// Number of levels on both sides.
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Iterate both sides' levels whose price lies in `[low, high]`.
    fn levels_between(&self, low: Decimal, high: Decimal) -> impl Iterator<Item = (&Decimal, &Decimal)> {
        self.bids.range(low..=high).chain(self.asks.range(low..=high))
    }

    /// All per-level sizes as `f64`, both sides.
    pub fn level_sizes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bids
            .values()
            .chain(self.asks.values())
            .map(|q| q.to_f64().unwrap_or(0.0))
    }
}

/// One price bucket of a slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRow {
    /// Top price of the bucket; the bucket spans `(price - step, price]`.
    pub price: f64,
    /// Aggregated resting size, never negative.
    pub size: f64,
}

/// Which side of the book a quote or trade belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

/// Significant digits kept when moving a chart price onto the decimal grid;
/// drops the binary noise of values like `0.1 + 0.2`.
const GRID_DIGITS: u32 = 12;

/// `f64` chart price as a grid `Decimal`, if representable.
pub(crate) fn grid_decimal(value: f64) -> Option<Decimal> {
    Some(Decimal::from_f64(value)?.round_sf(GRID_DIGITS)?.normalize())
}

/// The price framing a slot's rows were generated with, in book units so
/// levels sitting exactly on a row price land in that row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RowFrame {
    anchor: Decimal,
    step: Decimal,
}

#[derive(Debug, Clone)]
pub struct Timeslot {
    pub from: Timestamp,
    pub to: Timestamp,
    /// Best ask for the interval; `0.0` means no data.
    pub ask_price: f64,
    /// Best bid for the interval; `0.0` means no data.
    pub bid_price: f64,
    pub ask_trade_size: f64,
    pub bid_trade_size: f64,

    rows: Vec<PriceRow>,
    frame: Option<RowFrame>,
    stats: Option<Arc<BookStats>>,
    /// Bumped every time `stats` is replaced.
    revision: u64,
    /// `revision` the rows were last aggregated from.
    filled_revision: Option<u64>,
}

impl Timeslot {
    /// Open a slot for the half-open interval `[from, to)`.
    pub fn new(from: Timestamp, to: Timestamp) -> Result<Self> {
        if from >= to {
            return Err(AppError::InvalidInterval);
        }
        Ok(Self {
            from,
            to,
            ask_price: 0.0,
            bid_price: 0.0,
            ask_trade_size: 0.0,
            bid_trade_size: 0.0,
            rows: Vec::new(),
            frame: None,
            stats: None,
            revision: 0,
            filled_revision: None,
        })
    }

    /// No market data has been observed for this interval.
    pub fn is_empty(&self) -> bool {
        self.ask_price == 0.0 && self.bid_price == 0.0
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.from <= ts && ts < self.to
    }

    pub fn price(&self, side: Side) -> f64 {
        match side {
            Side::Ask => self.ask_price,
            Side::Bid => self.bid_price,
        }
    }

    pub fn trade_size(&self, side: Side) -> f64 {
        match side {
            Side::Ask => self.ask_trade_size,
            Side::Bid => self.bid_trade_size,
        }
    }

    /// Record traded volume at the given side of the book.
    pub fn add_trade(&mut self, side: Side, qty: f64) {
        if !(qty.is_finite() && qty > 0.0) {
            return;
        }
        match side {
            Side::Ask => self.ask_trade_size += qty,
            Side::Bid => self.bid_trade_size += qty,
        }
    }

    /// Replace the book snapshot backing this slot's rows.
    pub fn set_stats(&mut self, stats: Arc<BookStats>) {
        self.stats = Some(stats);
        self.revision += 1;
    }

    /// Shrink the kept snapshot to `depth` levels per side around the touch.
    ///
    /// Rows and revision are untouched; only a later regeneration sees the
    /// narrower book.
    pub fn compact_stats(&mut self, depth: usize) {
        let Some(stats) = self.stats.as_ref() else {
            return;
        };
        if stats.bids.len() <= depth && stats.asks.len() <= depth {
            return;
        }
        let kept = BookStats::near_touch(&stats.bids, &stats.asks, depth);
        self.stats = Some(Arc::new(kept));
    }

    pub fn stats(&self) -> Option<&Arc<BookStats>> {
        self.stats.as_ref()
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    /// Rows were aggregated from an older snapshot than the current one.
    pub fn is_stale(&self) -> bool {
        self.stats.is_some() && self.filled_revision != Some(self.revision)
    }

    /// Allocate `rows_count` zeroed rows at prices `anchor - i * step`.
    ///
    /// The framing is fixed from here on: later anchor drift does not move
    /// this slot's rows.
    pub fn generate_rows(&mut self, rows_count: usize, price_anchor: f64, price_step: f64) {
        let frame = match (grid_decimal(price_anchor), grid_decimal(price_step)) {
            (Some(anchor), Some(step)) if !step.is_zero() => Some(RowFrame { anchor, step }),
            _ => None,
        };
        self.rows = (0..rows_count)
            .map(|i| {
                let exact = frame.and_then(|f| {
                    let offset = Decimal::from_usize(i)?.checked_mul(f.step)?;
                    f.anchor.checked_sub(offset)?.to_f64()
                });
                PriceRow {
                    price: exact.unwrap_or(price_anchor - i as f64 * price_step),
                    size: 0.0,
                }
            })
            .collect();
        self.frame = frame;
        self.filled_revision = None;
    }

    /// Drop the rows so the next visit regenerates them.
    pub fn clear_rows(&mut self) {
        self.rows.clear();
        self.frame = None;
        self.filled_revision = None;
    }

    /// Re-aggregate every row's size from the book snapshot.
    ///
    /// Without a snapshot the rows keep their previous values.
    pub fn refill(&mut self) {
        let (Some(stats), Some(frame)) = (self.stats.as_ref(), self.frame) else {
            return;
        };
        if self.rows.is_empty() {
            return;
        }

        for row in &mut self.rows {
            row.size = 0.0;
        }

        let n = self.rows.len();
        let Some(span) = Decimal::from_usize(n).and_then(|n| n.checked_mul(frame.step)) else {
            return;
        };
        let Some(far) = frame.anchor.checked_sub(span) else {
            return;
        };
        let (low, high) = if frame.step > Decimal::ZERO {
            (far, frame.anchor)
        } else {
            (frame.anchor, far)
        };

        for (price, qty) in stats.levels_between(low, high) {
            let Some(offset) = (frame.anchor - *price)
                .checked_div(frame.step)
                .and_then(|o| o.floor().to_i64())
            else {
                continue;
            };
            if offset < 0 || offset >= n as i64 {
                continue;
            }
            self.rows[offset as usize].size += qty.to_f64().unwrap_or(0.0).max(0.0);
        }
        self.filled_revision = Some(self.revision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::layout::RowLayout;
    use rust_decimal_macros::dec;

    fn slot() -> Timeslot {
        let from = Timestamp::from_second(1_700_000_000).unwrap();
        let to = Timestamp::from_second(1_700_000_001).unwrap();
        Timeslot::new(from, to).unwrap()
    }

    fn stats() -> Arc<BookStats> {
        let mut s = BookStats::default();
        s.bids.insert(dec!(99.5), dec!(3));
        s.bids.insert(dec!(99.25), dec!(2));
        s.bids.insert(dec!(90), dec!(50));
        s.asks.insert(dec!(100), dec!(4));
        s.asks.insert(dec!(100.75), dec!(1));
        s.asks.insert(dec!(250), dec!(70));
        Arc::new(s)
    }

    #[test]
    fn rejects_inverted_interval() {
        let t = Timestamp::from_second(10).unwrap();
        assert!(Timeslot::new(t, t).is_err());
    }

    #[test]
    fn empty_until_a_quote_arrives() {
        let mut s = slot();
        assert!(s.is_empty());
        s.bid_price = 99.0;
        assert!(!s.is_empty());
    }

    #[test]
    fn generate_rows_steps_down_from_anchor() {
        let mut s = slot();
        s.generate_rows(4, 101.0, 0.5);
        let prices: Vec<f64> = s.rows().iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![101.0, 100.5, 100.0, 99.5]);
        assert!(s.rows().iter().all(|r| r.size == 0.0));
    }

    #[test]
    fn refill_buckets_levels_into_rows() {
        let mut s = slot();
        s.set_stats(stats());
        s.generate_rows(4, 101.0, 0.5);
        s.refill();
        let sizes: Vec<f64> = s.rows().iter().map(|r| r.size).collect();
        // (100.5, 101] <- 100.75; (100, 100.5] <- none; (99.5, 100] <- 100;
        // (99, 99.5] <- 99.5 + 99.25
        assert_eq!(sizes, vec![1.0, 0.0, 4.0, 5.0]);
        assert!(!s.is_stale());
    }

    #[test]
    fn levels_on_a_decimal_grid_land_in_their_own_row() {
        let mut s = slot();
        let mut book = BookStats::default();
        book.bids.insert(dec!(0.2), dec!(1));
        s.set_stats(Arc::new(book));
        s.generate_rows(3, 0.3, 0.1);
        s.refill();
        let sizes: Vec<f64> = s.rows().iter().map(|r| r.size).collect();
        assert_eq!(sizes, vec![0.0, 1.0, 0.0]);
        assert_eq!(s.rows()[1].price, 0.2);
    }

    #[test]
    fn every_row_of_a_fine_tick_grid_gets_its_level() {
        let layout = RowLayout::centered_on(0.08123, 40, 4.0, 0.00001).unwrap();
        let top = dec!(0.08143);
        let tick = dec!(0.00001);
        let mut book = BookStats::default();
        for i in 0..40u32 {
            book.bids.insert(top - Decimal::from(i) * tick, dec!(1));
        }

        let mut s = slot();
        s.set_stats(Arc::new(book));
        s.generate_rows(layout.rows_count, layout.price_anchor, layout.price_step);
        s.refill();
        let misplaced = s.rows().iter().filter(|r| r.size != 1.0).count();
        assert_eq!(misplaced, 0, "rows: {:?}", s.rows());
    }

    #[test]
    fn refill_is_idempotent() {
        let mut s = slot();
        s.set_stats(stats());
        s.generate_rows(8, 101.0, 0.5);
        s.refill();
        let first = s.rows().to_vec();
        s.refill();
        assert_eq!(s.rows(), first.as_slice());
        assert!(s.rows().iter().all(|r| r.size >= 0.0));
    }

    #[test]
    fn refill_without_stats_keeps_rows() {
        let mut s = slot();
        s.generate_rows(3, 101.0, 0.5);
        s.refill();
        assert!(s.rows().iter().all(|r| r.size == 0.0));
        assert!(!s.is_stale());
    }

    #[test]
    fn new_stats_mark_rows_stale() {
        let mut s = slot();
        s.set_stats(stats());
        s.generate_rows(3, 101.0, 0.5);
        s.refill();
        s.set_stats(stats());
        assert!(s.is_stale());
    }

    #[test]
    fn compacting_keeps_levels_nearest_the_touch() {
        let mut s = slot();
        s.set_stats(stats());
        s.generate_rows(4, 101.0, 0.5);
        s.refill();
        let rows = s.rows().to_vec();

        s.compact_stats(1);
        let kept = s.stats().unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.bids.contains_key(&dec!(99.5)));
        assert!(kept.asks.contains_key(&dec!(100)));
        assert_eq!(s.rows(), rows.as_slice());
        assert!(!s.is_stale());
    }

    #[test]
    fn trades_accumulate_per_side() {
        let mut s = slot();
        s.add_trade(Side::Ask, 1.5);
        s.add_trade(Side::Ask, 0.5);
        s.add_trade(Side::Bid, -4.0);
        assert_eq!(s.trade_size(Side::Ask), 2.0);
        assert_eq!(s.trade_size(Side::Bid), 0.0);
    }
}
