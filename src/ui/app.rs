//! Application orchestrator: owns all engine state and drives the window system.

use std::sync::mpsc::{self as std_mpsc, Receiver as StdReceiver};
use std::thread;

use eframe::egui;
use jiff::Timestamp;
use rust_decimal::prelude::*;
use tokio::sync::mpsc::{self as tokio_mpsc, Sender as TokioSender};

use crate::config::AppConfig;
use crate::engine::{
    collector::{SlotCollector, SyncOutcome},
    scale::SizeScale,
    series::SlotSeries,
};
use crate::error::Result;
use crate::network::{AppMessage, Control, client, synthetic};
use crate::ui::window::{AppState, AppWindow, ViewSettings};
use crate::ui::windows::{bookmap_view::BookmapView, settings_view::SettingsView};

/// Queued control commands before the UI starts dropping them.
const CONTROL_CAPACITY: usize = 8;

/// Queue `ctrl` for the feed task; a full or closed channel is logged and
/// reported as `false`.
fn send_control(tx: &TokioSender<Control>, ctrl: Control) -> bool {
    match tx.try_send(ctrl) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("feed control not delivered: {e}");
            false
        }
    }
}

/// Decimal places needed to print prices on a `tick` grid.
fn price_precision(tick: f64) -> usize {
    if tick > 0.0 && tick.is_finite() {
        (-tick.log10() - 1e-9).ceil().max(0.0) as usize
    } else {
        2
    }
}

/// The top-level application, implementing [`eframe::App`].
///
/// `App` only:
/// 1. Drains the incoming message channel into the collector.
/// 2. Publishes the book into the newest slot once per frame and feeds the
///    size scale.
/// 3. Renders the central panel (symbol bar + window toggles) and delegates
///    the chart and settings to the registered `windows` vec.
pub struct App {
    symbol: String,
    edited_symbol: String,
    demo: bool,
    rx: StdReceiver<AppMessage>,
    control_tx: TokioSender<Control>,

    // ── Engine state ───────────────────────────────────────────────────────
    collector: SlotCollector,
    series: SlotSeries,
    scale: SizeScale,

    // ── Per-window state (UI-only, not engine) ─────────────────────────────
    settings: ViewSettings,
    tick_size: Option<f64>,
    price_prec: usize,

    windows: Vec<Box<dyn AppWindow>>,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self> {
        let collector = SlotCollector::new(config.slot_duration)?;
        let series = SlotSeries::new(config.slot_width)?;

        let (tx, rx) = std_mpsc::channel();
        let (control_tx, control_rx) = tokio_mpsc::channel(CONTROL_CAPACITY);
        let ctx = cc.egui_ctx.clone();
        let symbol = config.symbol.clone();
        let demo = config.demo;

        // Spawn background Tokio runtime + feed loop onto a dedicated OS thread.
        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("failed to build Tokio runtime: {e}");
                    return;
                }
            };
            if demo {
                runtime.block_on(synthetic::run_synthetic_loop(&tx, &ctx, control_rx, symbol));
            } else {
                runtime.block_on(client::run_streaming_loop(&tx, &ctx, control_rx, symbol));
            }
        });

        let tick_size = Self::lookup_tick_size(&config.symbol, demo);

        let windows: Vec<Box<dyn AppWindow>> = vec![
            Box::new(BookmapView::default()),
            Box::new(SettingsView::default()),
        ];

        Ok(Self {
            symbol: config.symbol.clone(),
            edited_symbol: config.symbol,
            demo,
            rx,
            control_tx,
            collector,
            series,
            scale: SizeScale::default(),
            settings: ViewSettings::default(),
            tick_size,
            price_prec: tick_size.map_or(2, price_precision),
            windows,
        })
    }

    fn lookup_tick_size(symbol: &str, demo: bool) -> Option<f64> {
        if demo {
            return synthetic::TICK.to_f64();
        }
        match client::fetch_tick_size(symbol) {
            Ok(tick) => {
                log::info!("{} tick size {tick}", symbol.to_uppercase());
                Some(tick)
            }
            Err(e) => {
                log::warn!("tick size lookup for {symbol} failed, guessing from price: {e}");
                None
            }
        }
    }

    /// Full reset, called only on **symbol change**.
    fn reset_all(&mut self) {
        self.collector.reset();
        self.series.clear();
        self.scale.reset();
    }

    fn request_refetch(&self) {
        send_control(&self.control_tx, Control::Refetch);
    }

    fn change_symbol(&mut self) {
        let symbol = self.edited_symbol.trim().to_ascii_lowercase();
        if symbol.is_empty() || symbol == self.symbol {
            return;
        }
        // The chart only switches once the feed has the request.
        if !send_control(&self.control_tx, Control::ChangeSymbol(symbol.clone())) {
            return;
        }
        log::info!("switching chart to {symbol}");
        self.tick_size = Self::lookup_tick_size(&symbol, self.demo);
        self.price_prec = self.tick_size.map_or(2, price_precision);
        self.edited_symbol = symbol.clone();
        self.symbol = symbol;
        self.reset_all();
    }

    fn drain_messages(&mut self, now: Timestamp) {
        while let Ok(msg) = self.rx.try_recv() {
            let outcome = match msg {
                AppMessage::Snapshot(snap) => self.collector.apply_snapshot(snap),
                AppMessage::Update(update) => self.collector.process_update(update),
                AppMessage::Trade(trade) => {
                    if let Err(e) = self.collector.on_trade(&mut self.series, &trade, now) {
                        log::warn!("trade {} dropped: {e}", trade.trade_id);
                    }
                    continue;
                }
            };
            if outcome == SyncOutcome::Gap {
                self.request_refetch();
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Timestamp::now();

        // ── 1. Drain incoming messages ────────────────────────────────────────
        self.drain_messages(now);

        // ── 2. Publish the book into the newest slot ──────────────────────────
        match self.collector.publish(&mut self.series, now) {
            Ok(Some(stats)) => self.scale.update(&stats),
            Ok(None) => {}
            Err(e) => log::warn!("slot roll failed: {e}"),
        }
        // Keep rolling slots while the feed is quiet.
        if let Ok(wait) = std::time::Duration::try_from(self.collector.slot_duration()) {
            ctx.request_repaint_after(wait);
        }

        // ── 3. Central panel ──────────────────────────────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| {
            let source = if self.demo { "synthetic" } else { "Binance futures" };
            ui.heading(format!("{} Bookmap ({source})", self.symbol.to_uppercase()));

            ui.horizontal_wrapped(|ui| {
                for w in &mut self.windows {
                    if ui.button(format!("Toggle {}", w.name())).clicked() {
                        w.toggle();
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Symbol:");
                ui.text_edit_singleline(&mut self.edited_symbol);
                if ui.button("Change Symbol").clicked() {
                    self.change_symbol();
                }
            });

            let status = if self.collector.is_synced { "in sync" } else { "syncing" };
            ui.label(format!(
                "Book {status}, last update {}, {} slots",
                self.collector.last_applied_u,
                self.series.len()
            ));
        });

        // ── 4. Floating windows ───────────────────────────────────────────────
        let mut state = AppState {
            series: &mut self.series,
            collector: &self.collector,
            scale: &mut self.scale,
            settings: &mut self.settings,
            tick_size: self.tick_size,
            price_prec: self.price_prec,
        };
        for w in &mut self.windows {
            w.show(ctx, &mut state);
        }
    }
}
