//! Stochastic oscillator.
//!
//! %K = 100 * (close - LL) / (HH - LL), where HH/LL are the rolling High max
//! and Low min over `k_window`. A flat range (HH == LL) leaves %K undefined.
//! %D = SMA(%K, d_window).

use serde::{Deserialize, Serialize};

use super::check_history;
use super::check_window;
use super::rolling::{rolling_max, rolling_mean, rolling_min};
use crate::domain::{closes, highs, lows, Bar};
use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticParams {
    pub k_window: usize,
    pub d_window: usize,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_window: 14,
            d_window: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticOutput {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic(bars: &[Bar], params: StochasticParams) -> CoreResult<StochasticOutput> {
    check_window("stochastic k", params.k_window)?;
    check_window("stochastic d", params.d_window)?;
    check_history(
        &format!("stoch_{}_{}", params.k_window, params.d_window),
        params.k_window,
        bars.len(),
    )?;

    let close = closes(bars);
    let highest = rolling_max(&highs(bars), params.k_window);
    let lowest = rolling_min(&lows(bars), params.k_window);

    let k: Vec<f64> = close
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(&c, (&hh, &ll))| {
            let range = hh - ll;
            if range == 0.0 {
                f64::NAN
            } else {
                100.0 * (c - ll) / range
            }
        })
        .collect();
    let d = rolling_mean(&k, params.d_window);

    Ok(StochasticOutput { k, d })
}
