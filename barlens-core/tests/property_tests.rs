//! Property tests for indicator alignment and ledger invariants.

use barlens_core::backtest::run_backtest;
use barlens_core::domain::Bar;
use barlens_core::indicators::{
    atr, bollinger, ema, rsi, sma, BollingerParams,
};
use barlens_core::signals::{position_size, take_profit, SignalFrame};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────

fn arb_closes(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, min..max)
}

fn to_bars(closes: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            Bar::new(
                start + Duration::days(i as i64),
                open,
                open.max(c) * 1.01,
                open.min(c) * 0.99,
                c,
                10_000.0,
            )
        })
        .collect()
}

fn arb_frame(n: usize) -> impl Strategy<Value = SignalFrame> {
    (
        prop::collection::vec(any::<bool>(), n),
        prop::collection::vec(any::<bool>(), n),
        prop::collection::vec(any::<bool>(), n),
    )
        .prop_map(|(entry, exit, stop_loss)| SignalFrame {
            entry,
            exit,
            stop_loss,
        })
}

// ── Alignment ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn windowed_outputs_are_aligned(closes in arb_closes(20, 200), window in 2usize..20) {
        let bars = to_bars(&closes);
        let n = closes.len();

        let outputs = [
            sma(&closes, window).unwrap(),
            ema(&closes, window).unwrap(),
            rsi(&closes, window).unwrap(),
            atr(&bars, window).unwrap(),
        ];
        for out in &outputs {
            prop_assert_eq!(out.len(), n);
            prop_assert!(out[..window - 1].iter().all(|v| v.is_nan()));
            prop_assert!(out[window - 1..].iter().all(|v| !v.is_nan()));
        }
    }

    #[test]
    fn rsi_is_bounded(closes in arb_closes(15, 200)) {
        let out = rsi(&closes, 14).unwrap();
        for v in out.iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(v), "rsi {}", v);
        }
    }

    #[test]
    fn bollinger_is_ordered(closes in arb_closes(20, 200), k in 0.0..4.0_f64) {
        let bands = bollinger(&closes, BollingerParams { window: 20, num_std: k }).unwrap();
        for i in 19..closes.len() {
            prop_assert!(bands.upper[i] >= bands.middle[i]);
            prop_assert!(bands.middle[i] >= bands.lower[i]);
        }
    }

    #[test]
    fn recomputation_is_bit_identical(closes in arb_closes(30, 120)) {
        let a = rsi(&closes, 14).unwrap();
        let b = rsi(&closes, 14).unwrap();
        prop_assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}

// ── Ledger ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ledger_invariants(
        (closes, frame) in arb_closes(2, 80)
            .prop_flat_map(|c| { let n = c.len(); (Just(c), arb_frame(n)) }),
        capital in 100.0..1_000_000.0_f64,
    ) {
        let bars = to_bars(&closes);
        let report = run_backtest(&bars, &frame, capital).unwrap();
        let s = &report.summary;

        prop_assert!(s.winning_trades <= s.total_trades);
        prop_assert_eq!(s.total_trades, report.trades.len());
        if s.total_trades > 0 {
            prop_assert_eq!(
                s.total_return,
                (s.final_balance - capital) / capital * 100.0
            );
        } else {
            prop_assert_eq!(s.total_return, 0.0);
        }
        // trades never overlap
        for pair in report.trades.windows(2) {
            prop_assert!(pair[0].exit_index < pair[1].entry_index);
        }
        prop_assert_eq!(report.equity_curve.len(), bars.len());
    }

    #[test]
    fn position_size_bounded(
        account in 1_000.0..1_000_000.0_f64,
        risk in 0.1..5.0_f64,
        entry in 1.0..1000.0_f64,
        offset in 0.01..50.0_f64,
        below in any::<bool>(),
    ) {
        let stop = if below { entry - offset } else { entry + offset };
        let size = position_size(account, risk, entry, stop).unwrap();
        prop_assert!(size as f64 <= account / entry);

        let target = take_profit(entry, stop, 2.0);
        // target and stop straddle the entry
        prop_assert!((target - entry) * (stop - entry) < 0.0);
    }
}
