//! Offline demo feed: a seeded random-walk market that emits the same
//! snapshot / depth-update / trade messages as the live client.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender as StdSender;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::mpsc::Receiver;

use crate::network::{AppMessage, Control};
use crate::types::{DepthUpdate, OrderBookSnapshot, Trade};
use crate::utils::{SymbolStr, get_timestamp};

/// Levels quoted on each side of the mid.
const DEPTH_LEVELS: i64 = 120;
/// Levels touched per update besides the top of book.
const CHANGES_PER_UPDATE: usize = 12;
const TICK_INTERVAL: Duration = Duration::from_millis(50);
/// Price increment of the synthetic instrument (0.01).
pub const TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub struct SyntheticMarket {
    symbol: SymbolStr,
    rng: StdRng,
    /// Mid price in ticks; best bid is one tick below, best ask one above.
    mid_ticks: i64,
    bids: BTreeMap<i64, Decimal>,
    asks: BTreeMap<i64, Decimal>,
    last_u: u64,
    trade_id: u64,
}

impl SyntheticMarket {
    pub fn new(symbol: &str, seed: u64) -> Self {
        let mut market = Self {
            symbol: SymbolStr::from(symbol.to_uppercase().as_str()),
            rng: StdRng::seed_from_u64(seed),
            mid_ticks: 10_000,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_u: 1,
            trade_id: 0,
        };
        for k in 1..=DEPTH_LEVELS {
            let bid_qty = market.random_qty();
            let ask_qty = market.random_qty();
            market.bids.insert(market.mid_ticks - k, bid_qty);
            market.asks.insert(market.mid_ticks + k, ask_qty);
        }
        market
    }

    fn price(&self, ticks: i64) -> Decimal {
        Decimal::from(ticks) * TICK
    }

    fn random_qty(&mut self) -> Decimal {
        // Mostly small resting size with the occasional wall.
        let base = self.rng.random_range(1..=50_i64);
        let qty = if self.rng.random_bool(0.03) { base * 40 } else { base };
        Decimal::from(qty)
    }

    fn levels(&self, side: &BTreeMap<i64, Decimal>) -> Vec<Vec<Decimal>> {
        side.iter()
            .map(|(&t, &q)| vec![self.price(t), q])
            .collect()
    }

    pub fn snapshot(&self) -> OrderBookSnapshot {
        OrderBookSnapshot {
            last_update_id: self.last_u,
            bids: self.levels(&self.bids),
            asks: self.levels(&self.asks),
        }
    }

    /// Advance the market by one step, returning the resulting messages.
    pub fn step(&mut self) -> Vec<AppMessage> {
        let mut b: Vec<Vec<Decimal>> = Vec::new();
        let mut a: Vec<Vec<Decimal>> = Vec::new();

        let drift = match self.rng.random_range(0..10) {
            0 => -1,
            9 => 1,
            _ => 0,
        };
        if drift != 0 {
            self.mid_ticks += drift;
            // The level at the new mid must be empty on both sides.
            let (crossed, opened) = if drift > 0 {
                (&mut self.asks, &mut self.bids)
            } else {
                (&mut self.bids, &mut self.asks)
            };
            crossed.remove(&self.mid_ticks);
            let fresh = self.mid_ticks - drift;
            let qty = Decimal::from(self.rng.random_range(1..=50_i64));
            opened.insert(fresh, qty);
            let (removed, added) = if drift > 0 { (&mut a, &mut b) } else { (&mut b, &mut a) };
            removed.push(vec![self.price(self.mid_ticks), Decimal::ZERO]);
            added.push(vec![self.price(fresh), qty]);
        }

        for _ in 0..CHANGES_PER_UPDATE {
            let k = self.rng.random_range(1..=DEPTH_LEVELS);
            let is_bid = self.rng.random_bool(0.5);
            let qty = if self.rng.random_bool(0.1) {
                Decimal::ZERO
            } else {
                self.random_qty()
            };
            let ticks = if is_bid { self.mid_ticks - k } else { self.mid_ticks + k };
            let (side, out) = if is_bid { (&mut self.bids, &mut b) } else { (&mut self.asks, &mut a) };
            if qty.is_zero() {
                side.remove(&ticks);
            } else {
                side.insert(ticks, qty);
            }
            out.push(vec![Decimal::from(ticks) * TICK, qty]);
        }

        let now = get_timestamp();
        let prev = self.last_u;
        self.last_u += 1;
        let mut out = vec![AppMessage::Update(DepthUpdate {
            event_type: "depthUpdate".to_string(),
            event_time: now,
            transaction_time: now,
            symbol: self.symbol.clone(),
            capital_u: prev,
            small_u: self.last_u,
            pu: prev as i64,
            b,
            a,
        })];

        if self.rng.random_bool(0.3) {
            let is_buyer_maker = self.rng.random_bool(0.5);
            let ticks = if is_buyer_maker { self.mid_ticks - 1 } else { self.mid_ticks + 1 };
            self.trade_id += 1;
            out.push(AppMessage::Trade(Trade {
                event_type: "trade".to_string(),
                event_time: now,
                symbol: self.symbol.clone(),
                trade_id: self.trade_id,
                price: self.price(ticks),
                quantity: self.random_qty(),
                order_type: "MARKET".to_string(),
                transaction_time: now,
                is_buyer_maker,
            }));
        }
        out
    }
}

/// Drive a [`SyntheticMarket`] on a fixed tick until the UI goes away.
pub async fn run_synthetic_loop(
    tx: &StdSender<AppMessage>,
    ctx: &egui::Context,
    mut control_rx: Receiver<Control>,
    symbol: String,
) {
    let mut market = SyntheticMarket::new(&symbol, get_timestamp());
    log::info!("Synthetic feed started for {symbol}.");
    if tx.send(AppMessage::Snapshot(market.snapshot())).is_err() {
        return;
    }

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for msg in market.step() {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
                ctx.request_repaint();
            }
            ctrl = control_rx.recv() => {
                match ctrl {
                    Some(Control::Refetch) => log::info!("Refetch triggered, resending snapshot."),
                    Some(Control::ChangeSymbol(new_symbol)) => {
                        log::info!("Changing synthetic symbol to {new_symbol}.");
                        market = SyntheticMarket::new(&new_symbol, get_timestamp());
                    }
                    None => break,
                }
                if tx.send(AppMessage::Snapshot(market.snapshot())).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collector::{SlotCollector, SyncOutcome};
    use jiff::SignedDuration;

    #[test]
    fn feed_stays_in_sync_and_uncrossed() {
        let mut market = SyntheticMarket::new("testusdt", 7);
        let mut collector = SlotCollector::new(SignedDuration::from_millis(1000)).unwrap();
        assert_eq!(collector.apply_snapshot(market.snapshot()), SyncOutcome::Applied);

        for _ in 0..500 {
            for msg in market.step() {
                if let AppMessage::Update(update) = msg {
                    assert_eq!(collector.process_update(update), SyncOutcome::Applied);
                }
            }
            let (bid, ask) = (collector.best_bid().unwrap(), collector.best_ask().unwrap());
            assert!(bid < ask, "crossed book: {bid} >= {ask}");
        }
    }

    #[test]
    fn trades_print_at_the_touch() {
        let mut market = SyntheticMarket::new("testusdt", 11);
        let mut seen = 0;
        for _ in 0..200 {
            for msg in market.step() {
                if let AppMessage::Trade(trade) = msg {
                    let mid = market.mid_ticks;
                    let touch = if trade.is_buyer_maker { mid - 1 } else { mid + 1 };
                    assert_eq!(trade.price, market.price(touch));
                    seen += 1;
                }
            }
        }
        assert!(seen > 0);
    }
}
