mod config;
mod engine;
mod error;
mod network;
mod render;
mod types;
mod ui;
mod utils;

use config::AppConfig;
use ui::app::App;

const USAGE: &str = "usage: bookmap_heatmap [SYMBOL] [--demo] [--slot-ms=N] [--slot-width=PX]";

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };
    log::info!(
        "starting {} with {:?} slots, {}px wide{}",
        config.symbol.to_uppercase(),
        config.slot_duration,
        config.slot_width,
        if config.demo { " (synthetic feed)" } else { "" }
    );

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Bookmap Heatmap",
        options,
        Box::new(move |cc| Ok(Box::new(App::new(cc, config)?))),
    )
}
