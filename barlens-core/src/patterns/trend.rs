//! Trend, breakout and consolidation over the trailing window.

use super::{trailing, Breakout, Trend};
use crate::domain::{closes, highs, lows, Bar};
use crate::indicators::rolling::{rolling_max, rolling_mean, rolling_min};

/// `Uptrend` iff the last close is above SMA(close, window).
pub fn identify_trend(bars: &[Bar], window: usize) -> Option<Trend> {
    trailing(bars, window)?;
    let sma = rolling_mean(&closes(bars), window);
    let last_close = bars.last()?.close;
    let last_sma = *sma.last()?;

    if last_close > last_sma {
        Some(Trend::Uptrend)
    } else {
        Some(Trend::Downtrend)
    }
}

/// Last close against the rolling High max / Low min of the window ending one
/// bar earlier, so the latest bar is not compared against itself.
pub fn detect_breakout(bars: &[Bar], window: usize) -> Option<Breakout> {
    trailing(bars, window)?;
    let n = bars.len();
    if n < 2 {
        return None;
    }
    let rolling_high = rolling_max(&highs(bars), window);
    let rolling_low = rolling_min(&lows(bars), window);
    let close = bars[n - 1].close;

    if close > rolling_high[n - 2] {
        Some(Breakout::Up)
    } else if close < rolling_low[n - 2] {
        Some(Breakout::Down)
    } else {
        None
    }
}

/// True when `(max - min) / mean` of the trailing closes is below `threshold`.
pub fn detect_consolidation(bars: &[Bar], window: usize, threshold: f64) -> Option<bool> {
    let recent = trailing(bars, window)?;
    let closes = closes(recent);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = closes.iter().sum::<f64>() / closes.len() as f64;

    Some((max - min) / mean < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, make_ohlc_bars};

    #[test]
    fn rising_is_uptrend() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(identify_trend(&make_bars(&closes), 20), Some(Trend::Uptrend));
    }

    #[test]
    fn flat_is_downtrend() {
        // close == SMA is not "above"
        assert_eq!(
            identify_trend(&make_bars(&[100.0; 30]), 20),
            Some(Trend::Downtrend)
        );
    }

    #[test]
    fn short_history_has_no_trend() {
        assert_eq!(identify_trend(&make_bars(&[1.0; 5]), 20), None);
    }

    #[test]
    fn breakout_up_excludes_last_bar() {
        let mut ohlc = vec![(100.0, 101.0, 99.0, 100.0); 10];
        ohlc.push((100.0, 106.0, 100.0, 105.0));
        let bars = make_ohlc_bars(&ohlc);
        // The last bar's own high (106) is not part of the reference range.
        assert_eq!(detect_breakout(&bars, 5), Some(Breakout::Up));
    }

    #[test]
    fn breakout_down() {
        let mut ohlc = vec![(100.0, 101.0, 99.0, 100.0); 10];
        ohlc.push((100.0, 100.0, 94.0, 95.0));
        assert_eq!(
            detect_breakout(&make_ohlc_bars(&ohlc), 5),
            Some(Breakout::Down)
        );
    }

    #[test]
    fn inside_range_is_no_breakout() {
        let ohlc = vec![(100.0, 101.0, 99.0, 100.0); 10];
        assert_eq!(detect_breakout(&make_ohlc_bars(&ohlc), 5), None);
    }

    #[test]
    fn flat_closes_consolidate() {
        assert_eq!(
            detect_consolidation(&make_bars(&[100.0; 25]), 20, 0.02),
            Some(true)
        );
    }

    #[test]
    fn wide_range_does_not_consolidate() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64 * 2.0).collect();
        assert_eq!(
            detect_consolidation(&make_bars(&closes), 20, 0.02),
            Some(false)
        );
    }
}
