//! Simple Moving Average (SMA).
//!
//! Trailing arithmetic mean of close over `window` bars.
//! Warm-up: window - 1.

use super::rolling::rolling_mean;
use super::{check_history, check_window, Indicator};
use crate::domain::{closes, Bar};
use crate::error::CoreResult;

#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    name: String,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            name: format!("sma_{window}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>> {
        sma(&closes(bars), self.window).map_err(|e| e.renamed(&self.name))
    }
}

/// SMA of an arbitrary series. Fails when `values.len() < window`.
pub fn sma(values: &[f64], window: usize) -> CoreResult<Vec<f64>> {
    check_window("sma", window)?;
    check_history("sma", window, values.len())?;
    Ok(rolling_mean(values, window))
}
