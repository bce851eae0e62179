//! Shared helpers and common type aliases.

use jiff::{SignedDuration, Timestamp};

use crate::error::Result;

/// A stack-allocated string for short symbol names (e.g. "BTCUSDT", "DOGEUSDT").
/// Avoids heap allocation for all symbols that fit within 16 bytes.
pub type SymbolStr = smallstr::SmallString<[u8; 16]>;

// ── Timestamp helpers ──────────────────────────────────────────────────────────

/// Return the current Unix time in milliseconds.
pub fn get_timestamp() -> u64 {
    Timestamp::now().as_millisecond() as u64
}

/// Convert exchange milliseconds into a [`Timestamp`].
pub fn timestamp_from_millis(ms: u64) -> Result<Timestamp> {
    Ok(Timestamp::from_millisecond(ms as i64)?)
}

/// Start of the `duration`-aligned interval containing `ts`.
pub fn align_down(ts: Timestamp, duration: SignedDuration) -> Result<Timestamp> {
    let step = duration.as_millis().max(1) as i64;
    let ms = ts.as_millisecond();
    Ok(Timestamp::from_millisecond(ms - ms.rem_euclid(step))?)
}

/// `HH:MM:SS` wall-clock label (UTC).
pub fn format_clock(ts: Timestamp) -> String {
    ts.strftime("%H:%M:%S").to_string()
}
