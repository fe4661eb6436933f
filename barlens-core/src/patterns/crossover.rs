//! Moving-average crossover between the last two bars.

use super::{trailing, Crossover};
use crate::domain::{closes, Bar};
use crate::indicators::rolling::rolling_mean;

/// Golden cross: fast SMA strictly below slow on the previous bar and strictly
/// above on the last. Death cross is the inverse.
pub fn detect_ma_crossover(bars: &[Bar], fast: usize, slow: usize) -> Option<Crossover> {
    trailing(bars, fast.max(slow))?;
    let n = bars.len();
    if n < 2 {
        return None;
    }
    let close = closes(bars);
    let fast_ma = rolling_mean(&close, fast);
    let slow_ma = rolling_mean(&close, slow);

    let (f_prev, s_prev) = (fast_ma[n - 2], slow_ma[n - 2]);
    let (f_cur, s_cur) = (fast_ma[n - 1], slow_ma[n - 1]);

    if f_prev < s_prev && f_cur > s_cur {
        Some(Crossover::GoldenCross)
    } else if f_prev > s_prev && f_cur < s_cur {
        Some(Crossover::DeathCross)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn golden_cross_on_reversal() {
        // fast(2) dips below slow(4), then the last bar jumps it back above
        let bars = make_bars(&[10.0, 10.0, 10.0, 8.0, 8.0, 14.0]);
        // prev: fast 8 < slow 9; cur: fast 11 > slow 10
        assert_eq!(
            detect_ma_crossover(&bars, 2, 4),
            Some(Crossover::GoldenCross)
        );
    }

    #[test]
    fn death_cross_on_drop() {
        let bars = make_bars(&[10.0, 10.0, 10.0, 12.0, 12.0, 6.0]);
        // prev: fast 12 > slow 11; cur: fast 9 < slow 10
        assert_eq!(
            detect_ma_crossover(&bars, 2, 4),
            Some(Crossover::DeathCross)
        );
    }

    #[test]
    fn no_cross_when_parallel() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert_eq!(detect_ma_crossover(&make_bars(&closes), 20, 50), None);
    }

    #[test]
    fn warm_up_is_none() {
        // exactly `slow` bars: previous slow SMA undefined
        let bars = make_bars(&[10.0, 9.0, 8.0, 20.0]);
        assert_eq!(detect_ma_crossover(&bars, 2, 4), None);
    }
}
