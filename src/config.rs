//! Start-up options read from the command line.

use jiff::SignedDuration;

use crate::error::{AppError, Result};

/// `bookmap [SYMBOL] [--demo] [--slot-ms=N] [--slot-width=PX]`
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Lower-case futures symbol, e.g. `dogeusdt`.
    pub symbol: String,
    /// Use the synthetic market instead of the Binance streams.
    pub demo: bool,
    pub slot_duration: SignedDuration,
    /// Horizontal pixels per slot.
    pub slot_width: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "dogeusdt".to_string(),
            demo: false,
            slot_duration: SignedDuration::from_millis(1000),
            slot_width: 6.0,
        }
    }
}

impl AppConfig {
    /// Parse arguments, excluding the program name.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        for arg in args {
            if arg == "--demo" {
                config.demo = true;
            } else if let Some(v) = arg.strip_prefix("--slot-ms=") {
                let ms: u32 = v
                    .parse()
                    .map_err(|_| AppError::InvalidArgument(format!("--slot-ms: {v}")))?;
                if ms == 0 {
                    return Err(AppError::InvalidArgument("--slot-ms must be positive".into()));
                }
                config.slot_duration = SignedDuration::from_millis(i64::from(ms));
            } else if let Some(v) = arg.strip_prefix("--slot-width=") {
                let px: f64 = v
                    .parse()
                    .map_err(|_| AppError::InvalidArgument(format!("--slot-width: {v}")))?;
                if !(px.is_finite() && px > 0.0) {
                    return Err(AppError::InvalidArgument("--slot-width must be positive".into()));
                }
                config.slot_width = px;
            } else if arg.starts_with("--") {
                return Err(AppError::InvalidArgument(format!("unknown flag {arg}")));
            } else {
                config.symbol = arg.to_ascii_lowercase();
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppConfig> {
        AppConfig::from_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn parses_symbol_and_flags() {
        let config = parse(&["BTCUSDT", "--demo", "--slot-ms=250", "--slot-width=3.5"]).unwrap();
        assert_eq!(config.symbol, "btcusdt");
        assert!(config.demo);
        assert_eq!(config.slot_duration, SignedDuration::from_millis(250));
        assert_eq!(config.slot_width, 3.5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["--slot-ms=0"]).is_err());
        assert!(parse(&["--slot-ms=abc"]).is_err());
        assert!(parse(&["--slot-width=-1"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
