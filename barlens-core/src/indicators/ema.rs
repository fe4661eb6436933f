//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (window + 1).
//! Seeded with the first defined value, no bias adjustment. The recursion runs from
//! the seed, but the first `window - 1` outputs after it are reported as NaN (warm-up).

use super::{check_history, check_window, Indicator};
use crate::domain::{closes, Bar};
use crate::error::CoreResult;

#[derive(Debug, Clone)]
pub struct Ema {
    window: usize,
    name: String,
}

impl Ema {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            name: format!("ema_{window}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>> {
        ema(&closes(bars), self.window).map_err(|e| e.renamed(&self.name))
    }
}

/// EMA of an arbitrary series. Fails when `values.len() < window`.
pub fn ema(values: &[f64], window: usize) -> CoreResult<Vec<f64>> {
    check_window("ema", window)?;
    check_history("ema", window, values.len())?;
    Ok(ema_of_series(values, window))
}

/// Unchecked EMA used by composed indicators (MACD signal line).
///
/// Leading NaNs are skipped; the seed is the first defined value. A NaN after
/// the seed taints every later output.
pub fn ema_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 {
        return out;
    }
    let Some(seed_index) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };

    let alpha = 2.0 / (window as f64 + 1.0);
    let first_reported = seed_index + window - 1;
    let mut prev = values[seed_index];

    for (i, &v) in values.iter().enumerate().skip(seed_index) {
        if v.is_nan() {
            break;
        }
        let current = if i == seed_index {
            v
        } else {
            alpha * v + (1.0 - alpha) * prev
        };
        prev = current;
        if i >= first_reported {
            out[i] = current;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_1_equals_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = Ema::new(1).compute(&bars).unwrap();
        assert_eq!(result, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, seeded with 10:
        // 10 → 10.5 → 11.25 → 12.125 → 13.0625
        // first two masked as warm-up
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Ema::new(3).compute(&bars).unwrap();

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.25, DEFAULT_EPSILON);
        assert_approx(result[3], 12.125, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0625, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_skips_leading_nan() {
        let out = ema_of_series(&[f64::NAN, f64::NAN, 4.0, 6.0], 1);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 4.0);
        assert_eq!(out[3], 6.0);
    }

    #[test]
    fn ema_nan_after_seed_propagates() {
        let out = ema_of_series(&[10.0, 11.0, f64::NAN, 13.0], 1);
        assert_eq!(out[1], 11.0);
        assert!(out[2].is_nan());
        assert!(out[3].is_nan());
    }

    #[test]
    fn ema_too_few_bars() {
        let bars = make_bars(&[1.0, 2.0]);
        let err = Ema::new(3).compute(&bars).unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
