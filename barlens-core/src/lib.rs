//! barlens core: technical analysis over OHLCV bars.
//!
//! Data flows strictly forward, and every stage is a pure function of its input:
//! - Indicator Library: aligned numeric series (SMA, EMA, RSI, MACD, Bollinger, ATR,
//!   Stochastic, OBV, VWAP)
//! - Pattern Detector: advisory heuristics (trend, breakouts, reversals, triangles,
//!   levels, crossovers)
//! - Signal Generator: conservative per-bar flags and directional recommendations
//!   with risk sizing
//! - Backtest Engine: single-position replay of a signal frame

pub mod backtest;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod patterns;
pub mod serde_nan;
pub mod signals;

pub use error::{CoreError, CoreResult};
