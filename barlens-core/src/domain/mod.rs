//! Domain types: bars and trade records.

pub mod bar;
pub mod trade;

pub use bar::{closes, highs, lows, opens, volumes, Bar, BarSeries};
pub use trade::{ExitReason, OpenPosition, TradeRecord};
