//! Static colours for the heatmap and its overlays.

use eframe::egui::Color32;

/// Chart background behind transparent rows.
pub const BACKGROUND: Color32 = Color32::from_rgb(8, 10, 20);
/// Heatmap colour at full strength.
pub const HEAT_HIGH: Color32 = Color32::from_rgb(254, 230, 206);
/// Heatmap colour at the faintest visible strength.
pub const HEAT_LOW: Color32 = Color32::from_rgb(8, 81, 156);

pub const ASK_LINE: Color32 = Color32::from_rgb(230, 85, 13);
pub const BID_LINE: Color32 = Color32::from_rgb(107, 174, 214);
/// Taker buys, printed at the ask.
pub const BUY_TRADE: Color32 = Color32::from_rgb(60, 200, 90);
/// Taker sells, printed at the bid.
pub const SELL_TRADE: Color32 = Color32::from_rgb(220, 50, 47);

pub const LABEL: Color32 = Color32::from_rgb(204, 227, 245);
