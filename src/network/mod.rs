//! Network layer: inter-thread message types and the market feeds that
//! produce them.

pub mod client;
pub mod synthetic;

use crate::types::{DepthUpdate, OrderBookSnapshot, Trade};

/// Messages sent from the background feed task to the UI thread.
pub enum AppMessage {
    Snapshot(OrderBookSnapshot),
    Update(DepthUpdate),
    Trade(Trade),
}

/// Control commands sent from the UI thread to the background feed task.
pub enum Control {
    Refetch,
    ChangeSymbol(String),
}
