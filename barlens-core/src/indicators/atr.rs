//! Average True Range (ATR).
//!
//! True Range: max(high - low, |high - prev_close|, |low - prev_close|);
//! the first bar has no previous close and uses high - low alone.
//! ATR is the simple rolling mean of TR over `window` bars. Warm-up: window - 1.

use super::rolling::rolling_mean;
use super::{check_history, check_window, Indicator};
use crate::domain::Bar;
use crate::error::CoreResult;

#[derive(Debug, Clone)]
pub struct Atr {
    window: usize,
    name: String,
}

impl Atr {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            name: format!("atr_{window}"),
        }
    }
}

impl Default for Atr {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>> {
        check_window(&self.name, self.window)?;
        check_history(&self.name, self.window, bars.len())?;
        Ok(rolling_mean(&true_range(bars), self.window))
    }
}

pub fn atr(bars: &[Bar], window: usize) -> CoreResult<Vec<f64>> {
    Atr::new(window).compute(bars)
}

/// True Range series. TR[0] = high[0] - low[0].
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let high_low = bar.high - bar.low;
        if i == 0 {
            tr.push(high_low);
            continue;
        }
        let prev_close = bars[i - 1].close;
        tr.push(
            high_low
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs()),
        );
    }
    tr
}
