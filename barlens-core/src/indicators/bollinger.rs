//! Bollinger Bands: moving average +/- a multiple of the standard deviation.
//!
//! - Middle: SMA(close, window)
//! - Upper: middle + num_std * std(close, window)
//! - Lower: middle - num_std * std(close, window)
//!
//! Uses sample stddev (divide by N - 1), so the window must be at least 2.
//! Warm-up: window - 1.

use serde::{Deserialize, Serialize};

use super::rolling::{rolling_mean, rolling_std};
use super::{check_history, check_window};
use crate::domain::{closes, Bar};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub window: usize,
    pub num_std: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            window: 20,
            num_std: 2.0,
        }
    }
}

impl BollingerParams {
    pub fn suffix(&self) -> String {
        format!("{}_{}", self.window, self.num_std)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    /// Band width relative to the middle band, per bar.
    pub fn width(&self) -> Vec<f64> {
        self.upper
            .iter()
            .zip(&self.lower)
            .zip(&self.middle)
            .map(|((u, l), m)| (u - l) / m)
            .collect()
    }
}

pub fn bollinger_bars(bars: &[Bar], params: BollingerParams) -> CoreResult<BollingerBands> {
    bollinger(&closes(bars), params)
}

pub fn bollinger(closes: &[f64], params: BollingerParams) -> CoreResult<BollingerBands> {
    check_window("bollinger", params.window)?;
    if params.window < 2 {
        return Err(CoreError::InvalidParameter(
            "bollinger window must be >= 2 (sample stddev)".into(),
        ));
    }
    if params.num_std.is_nan() || params.num_std < 0.0 {
        return Err(CoreError::InvalidParameter(format!(
            "bollinger num_std must be non-negative, got {}",
            params.num_std
        )));
    }
    check_history(
        &format!("bollinger_{}", params.suffix()),
        params.window,
        closes.len(),
    )?;

    let middle = rolling_mean(closes, params.window);
    let std = rolling_std(closes, params.window);

    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m + params.num_std * s)
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m - params.num_std * s)
        .collect();

    Ok(BollingerBands {
        upper,
        middle,
        lower,
    })
}
