//! Moving Average Convergence Divergence (MACD).
//!
//! MACD = EMA_fast(close) - EMA_slow(close)
//! Signal = EMA_signal(MACD), seeded at the first defined MACD value
//! Histogram = MACD - Signal
//!
//! With the default 12/26/9 the MACD line is defined from index 25 and the
//! signal line from index 33.

use serde::{Deserialize, Serialize};

use super::check_window;
use super::ema::ema_of_series;
use crate::domain::{closes, Bar};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdParams {
    /// Bars required before MACD may be computed at all.
    pub fn min_bars(&self) -> usize {
        self.fast.max(self.slow).max(self.signal)
    }

    pub fn suffix(&self) -> String {
        format!("{}_{}_{}", self.fast, self.slow, self.signal)
    }
}

/// The three MACD series, each aligned with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd_bars(bars: &[Bar], params: MacdParams) -> CoreResult<MacdOutput> {
    macd(&closes(bars), params)
}

/// MACD of a close series. Fails when `closes.len() < max(fast, slow, signal)`.
pub fn macd(closes: &[f64], params: MacdParams) -> CoreResult<MacdOutput> {
    check_window("macd fast", params.fast)?;
    check_window("macd slow", params.slow)?;
    check_window("macd signal", params.signal)?;
    let required = params.min_bars();
    if closes.len() < required {
        return Err(CoreError::insufficient(
            &format!("macd_{}", params.suffix()),
            required,
            closes.len(),
        ));
    }

    let fast = ema_of_series(closes, params.fast);
    let slow = ema_of_series(closes, params.slow);
    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_of_series(&macd, params.signal);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Ok(MacdOutput {
        macd,
        signal,
        histogram,
    })
}
