//! Background WebSocket + REST client for Binance futures streams.

use crate::error::{AppError, Result};
use crate::network::{AppMessage, Control};
use crate::types::{DepthUpdate, ExchangeInfo, OrderBookSnapshot, Trade};
use futures_util::{SinkExt, StreamExt};
use reqwest::blocking;
use serde::Deserialize;
use std::sync::mpsc::Sender as StdSender;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};

// ── Tick size ──────────────────────────────────────────────────────────────────

/// Fetch the price tick size for a futures symbol from the exchange-info
/// endpoint. Used as the default heatmap price step.
pub fn fetch_tick_size(symbol: &str) -> Result<f64> {
    let url = "https://fapi.binance.com/fapi/v1/exchangeInfo";
    let info: ExchangeInfo = blocking::get(url)?.json()?;

    let sym_info = info
        .symbols
        .into_iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| AppError::SymbolNotFound(symbol.to_string()))?;

    sym_info
        .filters
        .iter()
        .filter(|f| f.filter_type == "PRICE_FILTER")
        .filter_map(|f| f.tick_size.as_deref()?.parse::<f64>().ok())
        .find(|&tick| tick > 0.0)
        .ok_or_else(|| AppError::SymbolNotFound(symbol.to_string()))
}

// ── Streaming Loop ─────────────────────────────────────────────────────────────

/// Combined WebSocket stream message envelope (Binance combined streams format).
#[derive(Deserialize)]
struct CombinedStream {
    stream: String,
    data: serde_json::Value,
}

/// Decode one combined-stream text frame into an [`AppMessage`].
fn decode(text: &str) -> Option<AppMessage> {
    let combined = serde_json::from_str::<CombinedStream>(text).ok()?;
    if combined.stream.ends_with("@depth@0ms") {
        serde_json::from_value::<DepthUpdate>(combined.data)
            .ok()
            .map(AppMessage::Update)
    } else if combined.stream.ends_with("@trade") {
        let trade = serde_json::from_value::<Trade>(combined.data).ok()?;
        // Filter out Binance placeholder messages (X: "NA")
        (trade.order_type != "NA" && trade.price > rust_decimal::Decimal::ZERO)
            .then_some(AppMessage::Trade(trade))
    } else {
        None
    }
}

/// Connect the depth and trade streams, forward them, then fetch the REST
/// snapshot. Returns the forwarding task so the caller can abort it.
async fn connect(tx: &StdSender<AppMessage>, ctx: &egui::Context, symbol: &str) -> Result<JoinHandle<()>> {
    let ws_url = format!("wss://fstream.binance.com/stream?streams={symbol}@depth@0ms/{symbol}@trade");

    let (mut ws_stream, response) = connect_async(&ws_url).await?;
    log::info!("WebSocket connected: {}", response.status());

    let tx_clone = tx.clone();
    let ctx_clone = ctx.clone();
    let ws_handle = tokio::spawn(async move {
        while let Some(result) = ws_stream.next().await {
            match result {
                Ok(WsMessage::Text(text)) => {
                    if let Some(msg) = decode(&text) {
                        if tx_clone.send(msg).is_err() {
                            break;
                        }
                        ctx_clone.request_repaint();
                    }
                }
                Ok(WsMessage::Ping(payload)) => {
                    if let Err(e) = ws_stream.send(WsMessage::Pong(payload)).await {
                        log::warn!("Pong send error: {e}");
                        break;
                    }
                }
                Ok(WsMessage::Close(_)) => {
                    log::info!("Connection closed by server.");
                    break;
                }
                Err(e) => {
                    log::warn!("WebSocket error: {e}");
                    break;
                }
                _ => {}
            }
        }
    });

    // Fetch the REST snapshot concurrently with the live stream.
    let snap_url = format!(
        "https://fapi.binance.com/fapi/v1/depth?symbol={}&limit=1000",
        symbol.to_uppercase()
    );
    let snap = reqwest::Client::new()
        .get(&snap_url)
        .send()
        .await?
        .json::<OrderBookSnapshot>()
        .await?;
    log::info!("Snapshot fetched successfully (lastUpdateId={}).", snap.last_update_id);
    tx.send(AppMessage::Snapshot(snap))
        .map_err(|_| AppError::ChannelClosed)?;
    ctx.request_repaint();

    Ok(ws_handle)
}

/// Long-running async loop: connects to Binance combined WebSocket streams,
/// fetches the REST snapshot, and forwards [`AppMessage`]s to the UI thread.
///
/// Exits cleanly when the `control_rx` channel is closed (UI shut down).
pub async fn run_streaming_loop(
    tx: &StdSender<AppMessage>,
    ctx: &egui::Context,
    mut control_rx: Receiver<Control>,
    mut symbol: String,
) {
    loop {
        let ws_handle = match connect(tx, ctx, &symbol).await {
            Ok(handle) => Some(handle),
            Err(AppError::ChannelClosed) => return,
            Err(e) => {
                log::error!("feed connection for {symbol} failed: {e}");
                None
            }
        };

        // Wait for a control command (Refetch or ChangeSymbol) before looping.
        let ctrl = control_rx.recv().await;
        if let Some(handle) = ws_handle {
            handle.abort();
        }
        match ctrl {
            Some(Control::Refetch) => log::info!("Refetch triggered, restarting connection."),
            Some(Control::ChangeSymbol(new_symbol)) => {
                symbol = new_symbol;
                log::info!("Changing symbol to {symbol}, restarting connection.");
            }
            None => break, // UI shut down
        }
    }
}
