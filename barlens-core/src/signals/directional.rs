//! Directional long/short recommendation for the last bar.
//!
//! Entries and exits need volume confirmation (last volume above its rolling
//! mean). Stops sit an ATR multiple from the price on the side opposite the
//! trend; the trailing stop hangs off the rolling High max (uptrend) or Low
//! min (downtrend).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::risk::{position_size, take_profit, RiskParams};
use super::{SignalParams, RSI_OVERBOUGHT, RSI_OVERSOLD};
use crate::domain::{closes, highs, lows, volumes, Bar};
use crate::error::{CoreError, CoreResult};
use crate::indicators::rolling::{rolling_max, rolling_min};
use crate::indicators::{atr, macd, rsi, sma};
use crate::patterns::{identify_trend, Trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySignal {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitSignal {
    ExitLong,
    ExitShort,
}

impl fmt::Display for EntrySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySignal::Long => write!(f, "LONG"),
            EntrySignal::Short => write!(f, "SHORT"),
        }
    }
}

impl fmt::Display for ExitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitSignal::ExitLong => write!(f, "EXIT_LONG"),
            ExitSignal::ExitShort => write!(f, "EXIT_SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLevels {
    pub initial_stop: f64,
    pub trailing_stop: f64,
    /// Distance between the price and the initial stop.
    pub risk_amount: f64,
}

/// What to do as of the last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecommendation {
    pub entry: Option<EntrySignal>,
    pub exit: Option<ExitSignal>,
    pub stop_loss: StopLevels,
    pub take_profit: f64,
    pub position_size: u64,
    pub trend: Trend,
    /// Last close; stop and target are relative to this.
    pub price: f64,
}

pub fn directional_signals(
    bars: &[Bar],
    params: &SignalParams,
    risk: &RiskParams,
) -> CoreResult<TradeRecommendation> {
    risk.validate()?;
    let close = closes(bars);
    let rsi = rsi(&close, params.rsi_window)?;
    let macd = macd(&close, params.macd)?;
    let atr = atr(bars, params.atr_window)?;
    let volume_ma = sma(&volumes(bars), risk.volume_window)?;
    let trend = identify_trend(bars, params.trend_window).ok_or_else(|| {
        CoreError::insufficient(
            &format!("trend_{}", params.trend_window),
            params.trend_window,
            bars.len(),
        )
    })?;

    let last = bars.len() - 1;
    let price = close[last];
    let last_rsi = rsi[last];
    let macd_up = macd.macd[last] > macd.signal[last];
    let macd_down = macd.macd[last] < macd.signal[last];
    let volume_confirmed = bars[last].volume > volume_ma[last];

    let entry = if last_rsi < RSI_OVERSOLD && macd_up && volume_confirmed {
        Some(EntrySignal::Long)
    } else if last_rsi > RSI_OVERBOUGHT && macd_down && volume_confirmed {
        Some(EntrySignal::Short)
    } else {
        None
    };

    let exit = if (last_rsi > RSI_OVERBOUGHT || macd_down) && volume_confirmed {
        Some(ExitSignal::ExitLong)
    } else if (last_rsi < RSI_OVERSOLD || macd_up) && volume_confirmed {
        Some(ExitSignal::ExitShort)
    } else {
        None
    };

    let offset = atr[last] * risk.atr_multiple;
    let initial_stop = match trend {
        Trend::Uptrend => price - offset,
        Trend::Downtrend => price + offset,
    };
    let trailing_stop = trailing_stop(bars, trend, offset, risk.trailing_window);
    let stop_loss = StopLevels {
        initial_stop,
        trailing_stop,
        risk_amount: (price - initial_stop).abs(),
    };

    Ok(TradeRecommendation {
        entry,
        exit,
        stop_loss,
        take_profit: take_profit(price, initial_stop, risk.risk_reward),
        position_size: position_size(
            risk.account_value,
            risk.risk_percent,
            price,
            initial_stop,
        )?,
        trend,
        price,
    })
}

/// NaN when the series is shorter than `window`.
fn trailing_stop(bars: &[Bar], trend: Trend, offset: f64, window: usize) -> f64 {
    let extreme = match trend {
        Trend::Uptrend => rolling_max(&highs(bars), window),
        Trend::Downtrend => rolling_min(&lows(bars), window),
    };
    let anchor = extreme.last().copied().unwrap_or(f64::NAN);
    match trend {
        Trend::Uptrend => anchor - offset,
        Trend::Downtrend => anchor + offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn rising(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_bars(&closes)
    }

    #[test]
    fn uptrend_stop_below_target_above() {
        let bars = rising(40);
        let rec = directional_signals(&bars, &SignalParams::default(), &RiskParams::default())
            .unwrap();

        assert_eq!(rec.trend, Trend::Uptrend);
        assert_eq!(rec.price, 139.0);
        assert!(rec.stop_loss.initial_stop < rec.price);
        assert!(rec.take_profit > rec.price);
        // ATR of make_bars on a one-step ramp is 3.0
        assert!((rec.stop_loss.initial_stop - 133.0).abs() < 1e-9);
        assert!((rec.take_profit - 151.0).abs() < 1e-9);
        // trailing: highest high over 10 bars (140) minus 6
        assert!((rec.stop_loss.trailing_stop - 134.0).abs() < 1e-9);
    }

    #[test]
    fn downtrend_stop_above_target_below() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        let rec = directional_signals(
            &make_bars(&closes),
            &SignalParams::default(),
            &RiskParams::default(),
        )
        .unwrap();

        assert_eq!(rec.trend, Trend::Downtrend);
        assert!(rec.stop_loss.initial_stop > rec.price);
        assert!(rec.take_profit < rec.price);
    }

    #[test]
    fn flat_volume_blocks_entries_and_exits() {
        // make_bars uses a constant volume, never above its own mean
        let rec = directional_signals(&rising(40), &SignalParams::default(), &RiskParams::default())
            .unwrap();
        assert_eq!(rec.entry, None);
        assert_eq!(rec.exit, None);
    }

    #[test]
    fn volume_spike_confirms_exit_long() {
        let mut bars = rising(40);
        bars[39].volume = 10_000.0;
        let rec = directional_signals(&bars, &SignalParams::default(), &RiskParams::default())
            .unwrap();
        // RSI is pinned near 100 on a ramp
        assert_eq!(rec.exit, Some(ExitSignal::ExitLong));
    }

    /// Rally to 150, steep slide to 90, then a grind lower of 0.5 per bar
    /// ending at 80.5. The last bar carries a volume spike.
    fn decelerating_slide() -> Vec<f64> {
        let mut closes = vec![50.0; 10];
        closes.extend((1..=20).map(|i| 50.0 + 5.0 * i as f64));
        closes.extend((1..=15).map(|j| 150.0 - 4.0 * j as f64));
        closes.extend((1..=19).map(|j| 90.0 - 0.5 * j as f64));
        closes
    }

    fn with_last_volume_spike(closes: &[f64]) -> Vec<Bar> {
        let mut bars = make_bars(closes);
        if let Some(last) = bars.last_mut() {
            last.volume = 100_000.0;
        }
        bars
    }

    #[test]
    fn oversold_turn_goes_long() {
        let bars = with_last_volume_spike(&decelerating_slide());
        let rec = directional_signals(&bars, &SignalParams::default(), &RiskParams::default())
            .unwrap();

        // RSI 0, MACD just above its signal, volume 100k against a 5950 mean
        assert_eq!(rec.entry, Some(EntrySignal::Long));
        assert_eq!(rec.exit, Some(ExitSignal::ExitShort));
        assert_eq!(rec.trend, Trend::Downtrend);
        assert_eq!(rec.price, 80.5);
        // ATR is 2.5 on the grind, so stops sit 5 away
        assert!((rec.stop_loss.initial_stop - 85.5).abs() < 1e-9);
        assert!((rec.take_profit - 70.5).abs() < 1e-9);
        // lowest low of the last 10 bars (79.5) plus 5
        assert!((rec.stop_loss.trailing_stop - 84.5).abs() < 1e-9);
        assert_eq!(rec.position_size, 200);
    }

    #[test]
    fn overbought_stall_goes_short() {
        let mirrored: Vec<f64> = decelerating_slide().iter().map(|c| 200.0 - c).collect();
        let bars = with_last_volume_spike(&mirrored);
        let rec = directional_signals(&bars, &SignalParams::default(), &RiskParams::default())
            .unwrap();

        assert_eq!(rec.entry, Some(EntrySignal::Short));
        assert_eq!(rec.exit, Some(ExitSignal::ExitLong));
        assert_eq!(rec.trend, Trend::Uptrend);
        assert_eq!(rec.price, 119.5);
        assert!((rec.stop_loss.initial_stop - 114.5).abs() < 1e-9);
        assert!((rec.take_profit - 129.5).abs() < 1e-9);
        assert!((rec.stop_loss.trailing_stop - 115.5).abs() < 1e-9);
        assert_eq!(rec.position_size, 200);
    }

    #[test]
    fn oversold_without_volume_stays_out() {
        let bars = make_bars(&decelerating_slide());
        let rec = directional_signals(&bars, &SignalParams::default(), &RiskParams::default())
            .unwrap();
        assert_eq!(rec.entry, None);
        assert_eq!(rec.exit, None);
    }

    #[test]
    fn position_size_within_account() {
        let risk = RiskParams::default();
        let rec = directional_signals(&rising(40), &SignalParams::default(), &risk).unwrap();
        // 1000 risk / 6 per share = 166
        assert_eq!(rec.position_size, 166);
        assert!(rec.position_size as f64 <= risk.account_value / rec.price);
    }

    #[test]
    fn short_history_is_insufficient() {
        let err = directional_signals(&rising(10), &SignalParams::default(), &RiskParams::default())
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
