//! Slot collector: keeps an aggregated L2 book in sync with the depth stream
//! and rolls it, together with trades, into the timeslot series.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::engine::series::SlotSeries;
use crate::engine::timeslot::{BookStats, Side, Timeslot};
use crate::error::{AppError, Result};
use crate::types::{DepthUpdate, OrderBookSnapshot, Trade};
use crate::utils::{align_down, timestamp_from_millis};

/// Missed intervals back-filled with empty slots before jumping ahead.
const MAX_BACKFILL_SLOTS: usize = 600;
/// Levels per side copied into each published book snapshot.
pub const PUBLISHED_DEPTH: usize = 1000;

/// Result of feeding one depth update to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    /// Buffered until a snapshot arrives.
    Buffered,
    /// Older than the last applied update.
    Stale,
    /// Sequence gap; the book must be refetched.
    Gap,
}

pub struct SlotCollector {
    pub bids: BTreeMap<Decimal, Decimal>,
    pub asks: BTreeMap<Decimal, Decimal>,
    pub last_applied_u: u64,
    pub is_synced: bool,
    has_snapshot: bool,
    /// Updates received before the first snapshot.
    update_buffer: VecDeque<DepthUpdate>,
    slot_duration: SignedDuration,
    /// Book changed since the last published snapshot.
    dirty: bool,
}

impl SlotCollector {
    pub fn new(slot_duration: SignedDuration) -> Result<Self> {
        if slot_duration <= SignedDuration::ZERO {
            return Err(AppError::InvalidConfiguration {
                name: "slot_duration",
                reason: "must be greater than zero",
            });
        }
        Ok(Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_applied_u: 0,
            is_synced: false,
            has_snapshot: false,
            update_buffer: VecDeque::new(),
            slot_duration,
            dirty: false,
        })
    }

    pub fn slot_duration(&self) -> SignedDuration {
        self.slot_duration
    }

    /// Clear all book state (called on symbol change).
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.last_applied_u = 0;
        self.is_synced = false;
        self.has_snapshot = false;
        self.update_buffer.clear();
        self.dirty = false;
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Midpoint of the best quotes, or whichever side exists.
    pub fn mid_price(&self) -> Option<f64> {
        let bid = self.best_bid().and_then(|p| p.to_f64());
        let ask = self.best_ask().and_then(|p| p.to_f64());
        match (bid, ask) {
            (Some(b), Some(a)) => Some((a + b) / 2.0),
            (b, a) => b.or(a),
        }
    }

    // ── Snapshot / depth sync ──────────────────────────────────────────────────

    /// Replace book state with a full REST snapshot, then replay any updates
    /// that arrived before it.
    ///
    /// Returns `Gap` if the buffered updates do not line up with the snapshot.
    pub fn apply_snapshot(&mut self, snap: OrderBookSnapshot) -> SyncOutcome {
        self.bids.clear();
        self.asks.clear();
        for level in &snap.bids {
            Self::set_level(&mut self.bids, level);
        }
        for level in &snap.asks {
            Self::set_level(&mut self.asks, level);
        }
        self.last_applied_u = snap.last_update_id;
        self.is_synced = false;
        self.has_snapshot = true;
        self.dirty = true;

        let mut outcome = SyncOutcome::Applied;
        while let Some(update) = self.update_buffer.pop_front() {
            if self.process_update(update) == SyncOutcome::Gap {
                outcome = SyncOutcome::Gap;
            }
        }
        outcome
    }

    /// Apply a depth update, respecting the sequence-number sync protocol.
    pub fn process_update(&mut self, update: DepthUpdate) -> SyncOutcome {
        if !self.has_snapshot {
            self.update_buffer.push_back(update);
            return SyncOutcome::Buffered;
        }
        if update.small_u < self.last_applied_u {
            return SyncOutcome::Stale;
        }

        if self.is_synced {
            if update.pu != self.last_applied_u as i64 {
                log::warn!(
                    "Message gap detected! pu={}, last={}",
                    update.pu,
                    self.last_applied_u
                );
                self.request_refetch();
                return SyncOutcome::Gap;
            }
            self.apply_update(&update);
        } else if update.capital_u <= self.last_applied_u && self.last_applied_u <= update.small_u {
            self.apply_update(&update);
            self.is_synced = true;
        } else {
            log::warn!(
                "Initial gap! U={}, u={}, last={}",
                update.capital_u,
                update.small_u,
                self.last_applied_u
            );
            self.request_refetch();
            return SyncOutcome::Gap;
        }
        SyncOutcome::Applied
    }

    fn request_refetch(&mut self) {
        self.is_synced = false;
        self.has_snapshot = false;
        self.update_buffer.clear();
    }

    fn apply_update(&mut self, update: &DepthUpdate) {
        for level in &update.b {
            Self::set_level(&mut self.bids, level);
        }
        for level in &update.a {
            Self::set_level(&mut self.asks, level);
        }
        self.last_applied_u = update.small_u;
        self.dirty = true;
    }

    fn set_level(side: &mut BTreeMap<Decimal, Decimal>, level: &[Decimal]) {
        let [price, qty, ..] = level else {
            return;
        };
        if *qty <= Decimal::ZERO {
            side.remove(price);
        } else {
            side.insert(*price, *qty);
        }
    }

    // ── Slot rolling ───────────────────────────────────────────────────────────

    /// Make sure the newest slot covers `now`, appending new slots as needed.
    pub fn roll(&self, series: &mut SlotSeries, now: Timestamp) -> Result<()> {
        let Some(last_to) = series.last().map(|s| s.to) else {
            return self.open_slot_at(series, now);
        };
        if now < last_to {
            return Ok(());
        }

        let missed = (now.as_millisecond() - last_to.as_millisecond())
            / self.slot_duration.as_millis().max(1) as i64;
        if missed as usize >= MAX_BACKFILL_SLOTS {
            log::info!("skipping {missed} missed slots, resuming at {now}");
            return self.open_slot_at(series, now);
        }

        let mut from = last_to;
        while from <= now {
            let to = from.checked_add(self.slot_duration)?;
            series.push(Timeslot::new(from, to)?);
            from = to;
        }
        if missed > 0 {
            log::debug!("back-filled {missed} empty slots");
        }
        Ok(())
    }

    fn open_slot_at(&self, series: &mut SlotSeries, now: Timestamp) -> Result<()> {
        let from = align_down(now, self.slot_duration)?;
        let to = from.checked_add(self.slot_duration)?;
        series.push(Timeslot::new(from, to)?);
        Ok(())
    }

    /// Roll the series to `now` and hand the newest slot the current quotes
    /// and, if the book changed, a fresh book snapshot.
    ///
    /// Returns the snapshot when one was published.
    pub fn publish(&mut self, series: &mut SlotSeries, now: Timestamp) -> Result<Option<Arc<BookStats>>> {
        self.roll(series, now)?;
        if !self.has_snapshot {
            return Ok(None);
        }

        let ask = self.best_ask().and_then(|p| p.to_f64()).unwrap_or(0.0);
        let bid = self.best_bid().and_then(|p| p.to_f64()).unwrap_or(0.0);
        let Some(slot) = series.last_mut() else {
            return Ok(None);
        };
        slot.ask_price = ask;
        slot.bid_price = bid;

        // A freshly opened slot needs its own snapshot even if the book is unchanged.
        if !self.dirty && slot.stats().is_some() {
            return Ok(None);
        }
        let stats = Arc::new(BookStats::near_touch(&self.bids, &self.asks, PUBLISHED_DEPTH));
        slot.set_stats(Arc::clone(&stats));
        self.dirty = false;
        Ok(Some(stats))
    }

    /// Add a trade's volume to the slot covering its exchange time, or to
    /// the newest slot if that one is no longer hot.
    ///
    /// A taker sell (buyer is maker) hits the bid; a taker buy lifts the ask.
    pub fn on_trade(&self, series: &mut SlotSeries, trade: &Trade, now: Timestamp) -> Result<()> {
        self.roll(series, now)?;
        let qty = trade.quantity.to_f64().unwrap_or(0.0);
        let side = if trade.is_buyer_maker { Side::Bid } else { Side::Ask };
        let at = timestamp_from_millis(trade.transaction_time).unwrap_or(now);
        if let Some(slot) = series.hot_slot_at_mut(at) {
            slot.add_trade(side, qty);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SymbolStr;
    use rust_decimal_macros::dec;

    const T0: u64 = 1_700_000_000_000;

    fn at(ms: u64) -> Timestamp {
        timestamp_from_millis(ms).unwrap()
    }

    fn collector() -> SlotCollector {
        SlotCollector::new(SignedDuration::from_millis(1000)).unwrap()
    }

    fn snapshot(id: u64) -> OrderBookSnapshot {
        OrderBookSnapshot {
            last_update_id: id,
            bids: vec![vec![dec!(99.5), dec!(3)], vec![dec!(99), dec!(1)]],
            asks: vec![vec![dec!(100), dec!(2)], vec![dec!(100.5), dec!(5)]],
        }
    }

    fn update(capital_u: u64, small_u: u64, pu: i64, b: Vec<Vec<Decimal>>, a: Vec<Vec<Decimal>>) -> DepthUpdate {
        DepthUpdate {
            event_type: "depthUpdate".into(),
            event_time: 0,
            transaction_time: 0,
            symbol: SymbolStr::from("TESTUSDT"),
            capital_u,
            small_u,
            pu,
            b,
            a,
        }
    }

    fn trade(qty: Decimal, is_buyer_maker: bool) -> Trade {
        trade_at(qty, is_buyer_maker, 0)
    }

    fn trade_at(qty: Decimal, is_buyer_maker: bool, transaction_time: u64) -> Trade {
        Trade {
            event_type: "trade".into(),
            event_time: 0,
            symbol: SymbolStr::from("TESTUSDT"),
            trade_id: 1,
            price: dec!(100),
            quantity: qty,
            order_type: "MARKET".into(),
            transaction_time,
            is_buyer_maker,
        }
    }

    #[test]
    fn rejects_zero_duration() {
        assert!(SlotCollector::new(SignedDuration::ZERO).is_err());
    }

    #[test]
    fn snapshot_then_chained_updates() {
        let mut c = collector();
        assert_eq!(c.apply_snapshot(snapshot(10)), SyncOutcome::Applied);
        assert_eq!(c.best_bid(), Some(dec!(99.5)));
        assert_eq!(c.best_ask(), Some(dec!(100)));

        let first = update(9, 11, 8, vec![vec![dec!(99.5), dec!(0)]], vec![]);
        assert_eq!(c.process_update(first), SyncOutcome::Applied);
        assert!(c.is_synced);
        assert_eq!(c.best_bid(), Some(dec!(99)));

        let next = update(12, 13, 11, vec![], vec![vec![dec!(99.75), dec!(4)]]);
        assert_eq!(c.process_update(next), SyncOutcome::Applied);
        assert_eq!(c.best_ask(), Some(dec!(99.75)));
        assert_eq!(c.mid_price(), Some(99.375));
    }

    #[test]
    fn chain_break_requests_refetch() {
        let mut c = collector();
        c.apply_snapshot(snapshot(10));
        c.process_update(update(9, 11, 8, vec![], vec![]));
        assert_eq!(c.process_update(update(15, 16, 14, vec![], vec![])), SyncOutcome::Gap);
        assert!(!c.is_synced);
        assert_eq!(c.process_update(update(17, 18, 16, vec![], vec![])), SyncOutcome::Buffered);
    }

    #[test]
    fn stale_updates_are_ignored() {
        let mut c = collector();
        c.apply_snapshot(snapshot(10));
        assert_eq!(c.process_update(update(3, 5, 2, vec![], vec![])), SyncOutcome::Stale);
    }

    #[test]
    fn updates_before_snapshot_are_replayed() {
        let mut c = collector();
        let early = update(9, 11, 8, vec![vec![dec!(99.75), dec!(7)]], vec![]);
        assert_eq!(c.process_update(early), SyncOutcome::Buffered);
        c.apply_snapshot(snapshot(10));
        assert!(c.is_synced);
        assert_eq!(c.best_bid(), Some(dec!(99.75)));
    }

    #[test]
    fn publish_rolls_aligned_slots_and_sets_quotes() {
        let mut c = collector();
        let mut series = SlotSeries::new(4.0).unwrap();
        c.apply_snapshot(snapshot(10));

        let stats = c.publish(&mut series, at(T0 + 250)).unwrap();
        assert!(stats.is_some());
        assert_eq!(series.len(), 1);
        let slot = series.last().unwrap();
        assert_eq!(slot.from, at(T0));
        assert_eq!(slot.to, at(T0 + 1000));
        assert_eq!((slot.bid_price, slot.ask_price), (99.5, 100.0));

        // Unchanged book within the same slot publishes nothing new.
        assert!(c.publish(&mut series, at(T0 + 500)).unwrap().is_none());

        // Next interval gets its own snapshot.
        assert!(c.publish(&mut series, at(T0 + 1200)).unwrap().is_some());
        assert_eq!(series.len(), 2);
        assert!(series.last().unwrap().stats().is_some());
    }

    #[test]
    fn published_snapshot_depth_is_bounded() {
        let mut c = collector();
        let mut series = SlotSeries::new(4.0).unwrap();
        let levels = |from: i64, dir: i64| -> Vec<Vec<Decimal>> {
            (0..1500).map(|i| vec![Decimal::from(from + dir * i), dec!(1)]).collect()
        };
        c.apply_snapshot(OrderBookSnapshot {
            last_update_id: 1,
            bids: levels(9_999, -1),
            asks: levels(10_001, 1),
        });

        let stats = c.publish(&mut series, at(T0)).unwrap().unwrap();
        assert_eq!(stats.len(), 2 * PUBLISHED_DEPTH);
        assert_eq!(stats.bids.keys().next_back(), Some(&dec!(9999)));
        assert_eq!(stats.asks.keys().next(), Some(&dec!(10001)));
    }

    #[test]
    fn missed_intervals_are_backfilled_empty() {
        let mut c = collector();
        let mut series = SlotSeries::new(4.0).unwrap();
        c.apply_snapshot(snapshot(10));
        c.publish(&mut series, at(T0)).unwrap();
        c.publish(&mut series, at(T0 + 3500)).unwrap();
        assert_eq!(series.len(), 4);
        assert!(series.slots()[1].is_empty());
        assert!(series.slots()[2].is_empty());
        assert!(!series.slots()[3].is_empty());
        assert_eq!(series.slots()[3].from, at(T0 + 3000));
    }

    #[test]
    fn long_outage_jumps_to_current_interval() {
        let c = collector();
        let mut series = SlotSeries::new(4.0).unwrap();
        c.roll(&mut series, at(T0)).unwrap();
        c.roll(&mut series, at(T0 + 1_000_000)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().from, at(T0 + 1_000_000));
    }

    #[test]
    fn trades_land_on_their_side() {
        let c = collector();
        let mut series = SlotSeries::new(4.0).unwrap();
        c.on_trade(&mut series, &trade(dec!(2), false), at(T0)).unwrap();
        c.on_trade(&mut series, &trade(dec!(5), true), at(T0 + 10)).unwrap();
        let slot = series.last().unwrap();
        assert_eq!(slot.ask_trade_size, 2.0);
        assert_eq!(slot.bid_trade_size, 5.0);
    }

    #[test]
    fn late_trade_lands_in_its_own_slot() {
        let c = collector();
        let mut series = SlotSeries::new(4.0).unwrap();
        c.roll(&mut series, at(T0)).unwrap();
        c.on_trade(&mut series, &trade_at(dec!(3), false, T0 + 900), at(T0 + 1100))
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.slots()[0].ask_trade_size, 3.0);
        assert_eq!(series.slots()[1].ask_trade_size, 0.0);
    }
}
