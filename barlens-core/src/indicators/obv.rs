//! On-Balance Volume (OBV).
//!
//! Running sum of sign(close[t] - close[t-1]) * volume[t]. The first bar has
//! no prior close and contributes 0.

use super::Indicator;
use crate::domain::Bar;
use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>> {
        Ok(obv(bars))
    }
}

pub fn obv(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut total = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let delta = bar.close - bars[i - 1].close;
            if delta > 0.0 {
                total += bar.volume;
            } else if delta < 0.0 {
                total -= bar.volume;
            }
        }
        out.push(total);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn obv_accumulates_by_direction() {
        // volume is 1000 per bar
        let bars = make_bars(&[10.0, 11.0, 11.0, 9.0, 12.0]);
        assert_eq!(obv(&bars), vec![0.0, 1000.0, 1000.0, 0.0, 1000.0]);
    }

    #[test]
    fn obv_empty() {
        assert!(obv(&[]).is_empty());
    }
}
