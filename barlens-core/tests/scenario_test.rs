//! End-to-end scenarios over hand-built series.

use barlens_core::backtest::run_backtest;
use barlens_core::domain::{Bar, ExitReason};
use barlens_core::indicators::{
    bollinger, compute_all, macd, rsi, BollingerParams, IndicatorKind, MacdParams,
};
use barlens_core::patterns::{identify_trend, PatternParams, PatternReport, Trend};
use barlens_core::signals::{
    conservative_signals, generate, RiskParams, SignalFrame, SignalParams, StrategyKind,
};
use barlens_core::CoreError;
use chrono::{Duration, NaiveDate};

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                start + Duration::days(i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
                1_000_000.0,
            )
        })
        .collect()
}

fn rising_100_to_129() -> Vec<f64> {
    (0..30).map(|i| 100.0 + i as f64).collect()
}

#[test]
fn rising_series_rsi_approaches_100() {
    let closes = rising_100_to_129();
    let out = rsi(&closes, 14).unwrap();

    assert_eq!(out.len(), 30);
    assert!(out[..13].iter().all(|v| v.is_nan()));
    for v in &out[14..] {
        assert!(*v > 99.99, "rsi {v}");
        assert!(*v <= 100.0);
    }
}

#[test]
fn rising_series_macd_positive_and_rising() {
    let closes = rising_100_to_129();
    let out = macd(&closes, MacdParams::default()).unwrap();

    // slow EMA warm-up masks everything before index 25
    assert!(out.macd[..25].iter().all(|v| v.is_nan()));
    let defined = &out.macd[25..];
    assert!(defined.iter().all(|&v| v > 0.0));
    assert!(defined.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn rising_series_never_flags_stop_loss() {
    let bars = bars_from_closes(&rising_100_to_129());
    let frame = conservative_signals(&bars, &SignalParams::default()).unwrap();
    assert!(frame.stop_loss.iter().all(|&s| !s));
    assert_eq!(identify_trend(&bars, 20), Some(Trend::Uptrend));
}

#[test]
fn flat_series_collapses_bands() {
    let closes = vec![100.0; 30];
    let bands = bollinger(&closes, BollingerParams::default()).unwrap();
    for i in 19..30 {
        assert_eq!(bands.upper[i], 100.0);
        assert_eq!(bands.middle[i], 100.0);
        assert_eq!(bands.lower[i], 100.0);
    }
}

#[test]
fn flat_series_rsi_is_defined() {
    // No gains and no losses: avg_loss is replaced by the epsilon, RS = 0.
    let out = rsi(&[100.0; 30], 14).unwrap();
    for v in &out[13..] {
        assert!(!v.is_nan());
        assert_eq!(*v, 0.0);
    }
}

#[test]
fn single_trade_from_100_to_110() {
    let closes = [95.0, 97.0, 100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 109.0, 111.0];
    let bars = bars_from_closes(&closes);
    let mut frame = SignalFrame::flat(10);
    frame.entry[2] = true;
    frame.exit[7] = true;

    let initial = 25_000.0;
    let report = run_backtest(&bars, &frame, initial).unwrap();

    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!(trade.entry_price, 100.0);
    assert_eq!(trade.exit_price, 110.0);
    assert!((trade.returns_pct - 10.0).abs() < 1e-12);
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert!((report.summary.final_balance - initial * 1.10).abs() < 1e-6);
    assert!((report.summary.total_return - 10.0).abs() < 1e-9);
    assert_eq!(report.summary.winning_trades, 1);
    assert!(report.open_position.is_none());
}

#[test]
fn rsi_on_five_bars_is_an_error() {
    let err = rsi(&[1.0, 2.0, 3.0, 4.0, 5.0], 14).unwrap_err();
    assert_eq!(
        err,
        CoreError::InsufficientData {
            indicator: "rsi".into(),
            required: 14,
            available: 5,
        }
    );
}

#[test]
fn generator_and_backtest_compose() {
    let closes: Vec<f64> = (0..120)
        .map(|i| 100.0 + 10.0 * (i as f64 / 7.0).sin() + i as f64 * 0.05)
        .collect();
    let bars = bars_from_closes(&closes);

    let bundle = generate(
        StrategyKind::Conservative,
        &bars,
        &SignalParams::default(),
        &RiskParams::default(),
    )
    .unwrap();
    let frame = bundle.frame().expect("conservative bundle carries a frame");
    let report = run_backtest(&bars, frame, 10_000.0).unwrap();

    assert!(report.summary.winning_trades <= report.summary.total_trades);
    assert_eq!(report.equity_curve.len(), bars.len());

    let values = compute_all(&bars, &IndicatorKind::default_set()).unwrap();
    assert!(values.iter().all(|(_, s)| s.len() == bars.len()));

    let patterns = PatternReport::scan(&bars, &PatternParams::default());
    assert!(patterns.trend.is_some());
}

/// Flat base at 50, rally to 150, steep slide to 90, a grind down to 79 and a
/// rebound of +2 per bar to 91.
fn slide_and_rebound() -> Vec<f64> {
    let mut closes = vec![50.0; 10];
    closes.extend((1..=20).map(|i| 50.0 + 5.0 * i as f64));
    closes.extend((1..=15).map(|j| 150.0 - 4.0 * j as f64));
    closes.extend((1..=22).map(|j| 90.0 - 0.5 * j as f64));
    closes.extend((1..=6).map(|j| 79.0 + 2.0 * j as f64));
    closes
}

#[test]
fn generated_entry_is_traded_until_overbought_stochastic() {
    let mut bars = bars_from_closes(&slide_and_rebound());
    for bar in &mut bars[..10] {
        bar.volume = 1_000_000_000.0;
    }
    let frame = conservative_signals(&bars, &SignalParams::default()).unwrap();
    assert_eq!(frame.entry_count(), 4);
    assert!(frame.entry[63]);

    let initial = 100_000.0;
    let report = run_backtest(&bars, &frame, initial).unwrap();

    // first entry at 80.5 is held through the rest of the grind; %K jumps
    // above 80 on the third rebound bar
    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!((trade.entry_index, trade.exit_index), (63, 69));
    assert_eq!(trade.entry_price, 80.5);
    assert_eq!(trade.exit_price, 85.0);
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert!((trade.returns_pct - 4.5 / 80.5 * 100.0).abs() < 1e-9);
    assert!((report.summary.final_balance - initial * 85.0 / 80.5).abs() < 1e-6);
    assert!(report.open_position.is_none());

    // marked to market while long: down with the grind, up with the rebound
    assert!(report.equity_curve[66] < initial);
    assert!(report.equity_curve[69] > initial);
}
