//! Application-level error types.

use thiserror::Error;

/// Errors that can occur within the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// A render or layout parameter that would produce NaN/Inf geometry.
    #[error("invalid configuration: {name} {reason}")]
    InvalidConfiguration {
        name: &'static str,
        reason: &'static str,
    },

    #[error("invalid timeslot interval: from must be before to")]
    InvalidInterval,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("time error: {0}")]
    Time(#[from] jiff::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("symbol {0} not found in exchange info")]
    SymbolNotFound(String),

    #[error("Channel send error: receiver dropped")]
    ChannelClosed,
}

/// Convenience alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Reject non-finite values and values that are not strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(AppError::InvalidConfiguration {
            name,
            reason: "must be finite",
        });
    }
    if value <= 0.0 {
        return Err(AppError::InvalidConfiguration {
            name,
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

/// Reject non-finite values.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AppError::InvalidConfiguration {
            name,
            reason: "must be finite",
        })
    }
}
