//! Wire types for the Binance futures WebSocket streams and REST responses
//! that feed the slot collector.
//!
//! Binance sends prices and quantities as JSON strings (e.g. `"p":"0.00100"`);
//! they are kept as `Decimal` because the collector stores them as
//! `BTreeMap` keys. Symbol names use the stack-allocated `SymbolStr`.

use crate::utils::SymbolStr;
use rust_decimal::Decimal;
use serde::Deserialize;

// ── REST: Exchange Info ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    /// Stack-allocated symbol name (e.g. "BTCUSDT").
    pub symbol: SymbolStr,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Deserialize)]
pub struct Filter {
    #[serde(rename = "filterType")]
    pub filter_type: String,
    #[serde(rename = "tickSize")]
    pub tick_size: Option<String>,
}

// ── REST: Order Book Snapshot ──────────────────────────────────────────────────

/// Full depth snapshot from `GET /fapi/v1/depth`. Each level is `[price, qty]`.
#[derive(Debug, Deserialize, Clone)]
pub struct OrderBookSnapshot {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<Vec<Decimal>>,
    pub asks: Vec<Vec<Decimal>>,
}

// ── WebSocket: Aggregate Trade ─────────────────────────────────────────────────

/// A single trade event from the `@trade` stream.
///
/// `is_buyer_maker` means the taker sold into the bid.
#[allow(dead_code)]
#[derive(Debug, Deserialize, Clone)]
pub struct Trade {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: SymbolStr,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "X")]
    pub order_type: String,
    #[serde(rename = "T")]
    pub transaction_time: u64,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

// ── WebSocket: Depth Update ────────────────────────────────────────────────────

/// An incremental depth update event from the `@depth@0ms` stream.
///
/// `U`/`u` bound the update ids folded into this event; `pu` is the final id
/// of the previous event and must chain onto the last applied one.
#[allow(dead_code)]
#[derive(Debug, Deserialize, Clone)]
pub struct DepthUpdate {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "T")]
    pub transaction_time: u64,
    #[serde(rename = "s")]
    pub symbol: SymbolStr,
    #[serde(rename = "U")]
    pub capital_u: u64,
    #[serde(rename = "u")]
    pub small_u: u64,
    #[serde(rename = "pu")]
    pub pu: i64,
    #[serde(rename = "b")]
    pub b: Vec<Vec<Decimal>>,
    #[serde(rename = "a")]
    pub a: Vec<Vec<Decimal>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_trade_event() {
        let json = r#"{"e":"trade","E":1700000000123,"T":1700000000120,"s":"DOGEUSDT",
            "t":42,"p":"0.08123","q":"1500","X":"MARKET","m":true}"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.price, dec!(0.08123));
        assert_eq!(trade.quantity, dec!(1500));
        assert!(trade.is_buyer_maker);
        assert_eq!(trade.symbol.as_str(), "DOGEUSDT");
    }

    #[test]
    fn parses_depth_update_levels() {
        let json = r#"{"e":"depthUpdate","E":1,"T":2,"s":"DOGEUSDT","U":10,"u":12,"pu":9,
            "b":[["0.0810","100"]],"a":[["0.0812","0"]]}"#;
        let update: DepthUpdate = serde_json::from_str(json).unwrap();
        assert_eq!((update.capital_u, update.small_u, update.pu), (10, 12, 9));
        assert_eq!(update.b[0], vec![dec!(0.0810), dec!(100)]);
        assert_eq!(update.a[0][1], Decimal::ZERO);
    }
}
