//! Backtest Engine: replays a conservative `SignalFrame` over its bars.
//!
//! Single position, long only, no pyramiding. The whole balance goes in on
//! entry (fractional shares) and comes back out on exit or stop. A position
//! still open at the end stays unrealized.

pub mod engine;
pub mod summary;

pub use engine::{run_backtest, BacktestReport, PositionState};
pub use summary::BacktestSummary;
