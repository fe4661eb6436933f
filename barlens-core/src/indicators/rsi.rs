//! Relative Strength Index (RSI).
//!
//! Simple rolling means of gains and losses (not Wilder smoothing):
//! delta = close[t] - close[t-1], with the undefined first delta counted as 0.
//! RS = avg_gain / avg_loss, where avg_loss == 0 is replaced by `RSI_LOSS_EPSILON`.
//! RSI = 100 - 100 / (1 + RS). Warm-up: window - 1.
//!
//! Edge cases: only gains → RSI just below 100; no movement at all → RS = 0 → RSI = 0.

use super::rolling::{diff, rolling_mean};
use super::{check_history, check_window, Indicator};
use crate::domain::{closes, Bar};
use crate::error::CoreResult;

/// Substitute for a zero average loss.
pub const RSI_LOSS_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    name: String,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            name: format!("rsi_{window}"),
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>> {
        rsi(&closes(bars), self.window).map_err(|e| e.renamed(&self.name))
    }
}

/// RSI of a close series. Fails when `closes.len() < window`.
pub fn rsi(closes: &[f64], window: usize) -> CoreResult<Vec<f64>> {
    check_window("rsi", window)?;
    check_history("rsi", window, closes.len())?;

    let delta = diff(closes);
    // `> 0.0` / `< 0.0` are false for NaN, so undefined deltas count as no movement.
    let gains: Vec<f64> = delta.iter().map(|&d| if d > 0.0 { d } else { 0.0 }).collect();
    let losses: Vec<f64> = delta.iter().map(|&d| if d < 0.0 { -d } else { 0.0 }).collect();

    let avg_gain = rolling_mean(&gains, window);
    let avg_loss = rolling_mean(&losses, window);

    Ok(avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| rsi_value(gain, loss))
        .collect())
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    // Running sums can leave a drained window a hair below zero.
    let gain = avg_gain.max(0.0);
    let loss = if avg_loss <= 0.0 {
        RSI_LOSS_EPSILON
    } else {
        avg_loss
    };
    let rs = gain / loss;
    100.0 - 100.0 / (1.0 + rs)
}
