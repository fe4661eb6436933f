//! Volume-Weighted Average Price, cumulative over the whole series.
//!
//! VWAP[t] = sum(close * volume) / sum(volume) over bars 0..=t. There is no
//! session reset. Undefined while cumulative volume is zero.

use super::Indicator;
use crate::domain::Bar;
use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct Vwap;

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>> {
        Ok(vwap(bars))
    }
}

pub fn vwap(bars: &[Bar]) -> Vec<f64> {
    let mut price_volume = 0.0;
    let mut volume = 0.0;
    bars.iter()
        .map(|bar| {
            price_volume += bar.close * bar.volume;
            volume += bar.volume;
            if volume == 0.0 {
                f64::NAN
            } else {
                price_volume / volume
            }
        })
        .collect()
}
