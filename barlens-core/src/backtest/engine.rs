//! Flat/Long state machine over a signal frame.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::summary::BacktestSummary;
use crate::domain::{Bar, ExitReason, OpenPosition, TradeRecord};
use crate::error::{CoreError, CoreResult};
use crate::signals::SignalFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Long {
        shares: f64,
        entry_price: f64,
        entry_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub initial_capital: f64,
    pub trades: Vec<TradeRecord>,
    pub summary: BacktestSummary,
    /// Set when the series ended with a position still open.
    pub open_position: Option<OpenPosition>,
    /// Mark-to-market equity per bar: balance when flat, shares * close when long.
    pub equity_curve: Vec<f64>,
}

/// Replay `signals` over `bars` starting from `initial_capital`.
///
/// On a flat bar, `entry` opens a position and nothing else is considered for
/// that bar. On a long bar, `exit` or `stop_loss` closes it at the close.
///
/// # Errors
/// - `InvalidParameter` if the frame does not line up with the bars or the
///   capital is not positive.
/// - `DataIntegrity` on the first NaN or non-positive close.
pub fn run_backtest(
    bars: &[Bar],
    signals: &SignalFrame,
    initial_capital: f64,
) -> CoreResult<BacktestReport> {
    if !signals.is_aligned() || signals.len() != bars.len() {
        return Err(CoreError::InvalidParameter(format!(
            "signal frame ({} entry, {} exit, {} stop) does not match {} bars",
            signals.entry.len(),
            signals.exit.len(),
            signals.stop_loss.len(),
            bars.len()
        )));
    }
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(CoreError::InvalidParameter(format!(
            "initial capital must be positive, got {initial_capital}"
        )));
    }
    if let Some((index, bar)) = bars
        .iter()
        .enumerate()
        .find(|(_, b)| !(b.close.is_finite() && b.close > 0.0))
    {
        return Err(CoreError::DataIntegrity {
            index,
            reason: format!("close must be a positive number, got {}", bar.close),
        });
    }

    let mut state = PositionState::Flat;
    let mut balance = initial_capital;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let close = bar.close;
        match state {
            PositionState::Flat if signals.entry[i] => {
                let shares = balance / close;
                debug!(index = i, price = close, shares, "enter long");
                state = PositionState::Long {
                    shares,
                    entry_price: close,
                    entry_index: i,
                };
            }
            PositionState::Long {
                shares,
                entry_price,
                entry_index,
            } if signals.exit[i] || signals.stop_loss[i] => {
                balance = shares * close;
                let exit_reason = if signals.exit[i] {
                    ExitReason::Signal
                } else {
                    ExitReason::StopLoss
                };
                let returns_pct = (close - entry_price) / entry_price * 100.0;
                debug!(
                    index = i,
                    price = close,
                    returns_pct,
                    reason = ?exit_reason,
                    "exit long"
                );
                trades.push(TradeRecord {
                    entry_index,
                    entry_date: bars[entry_index].timestamp,
                    entry_price,
                    exit_index: i,
                    exit_date: bar.timestamp,
                    exit_price: close,
                    shares,
                    returns_pct,
                    exit_reason,
                });
                state = PositionState::Flat;
            }
            _ => {}
        }

        equity_curve.push(match state {
            PositionState::Flat => balance,
            PositionState::Long { shares, .. } => shares * close,
        });
    }

    let open_position = match state {
        PositionState::Flat => None,
        PositionState::Long {
            shares,
            entry_price,
            entry_index,
        } => Some(OpenPosition {
            entry_index,
            entry_date: bars[entry_index].timestamp,
            entry_price,
            shares,
            mark_price: bars[bars.len() - 1].close,
        }),
    };

    let summary = BacktestSummary::from_trades(&trades, initial_capital, balance);
    debug!(
        trades = summary.total_trades,
        final_balance = summary.final_balance,
        open = open_position.is_some(),
        "backtest complete"
    );

    Ok(BacktestReport {
        initial_capital,
        trades,
        summary,
        open_position,
        equity_curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn frame(n: usize, entries: &[usize], exits: &[usize], stops: &[usize]) -> SignalFrame {
        let mut f = SignalFrame::flat(n);
        for &i in entries {
            f.entry[i] = true;
        }
        for &i in exits {
            f.exit[i] = true;
        }
        for &i in stops {
            f.stop_loss[i] = true;
        }
        f
    }

    #[test]
    fn single_round_trip() {
        let bars = make_bars(&[100.0, 105.0, 110.0, 108.0]);
        let report = run_backtest(&bars, &frame(4, &[0], &[2], &[]), 10_000.0).unwrap();

        assert_eq!(report.trades.len(), 1);
        let t = &report.trades[0];
        assert_eq!(t.entry_index, 0);
        assert_eq!(t.exit_index, 2);
        assert_eq!(t.shares, 100.0);
        assert!((t.returns_pct - 10.0).abs() < 1e-12);
        assert_eq!(t.exit_reason, ExitReason::Signal);
        assert!((report.summary.final_balance - 11_000.0).abs() < 1e-9);
        assert_eq!(report.equity_curve, vec![10_000.0, 10_500.0, 11_000.0, 11_000.0]);
    }

    #[test]
    fn entry_wins_over_exit_on_flat_bar() {
        let bars = make_bars(&[100.0, 110.0, 120.0]);
        let report = run_backtest(&bars, &frame(3, &[0], &[0, 2], &[]), 1000.0).unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_index, 2);
    }

    #[test]
    fn exit_still_fires_when_entry_repeats_while_long() {
        let bars = make_bars(&[100.0, 110.0, 120.0]);
        let report = run_backtest(&bars, &frame(3, &[0, 1], &[1], &[]), 1000.0).unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_index, 1);
    }

    #[test]
    fn stop_only_exit_reason() {
        let bars = make_bars(&[100.0, 90.0]);
        let report = run_backtest(&bars, &frame(2, &[0], &[], &[1]), 1000.0).unwrap();
        assert_eq!(report.trades[0].exit_reason, ExitReason::StopLoss);
        assert!((report.summary.total_return + 10.0).abs() < 1e-9);
        assert_eq!(report.summary.winning_trades, 0);
    }

    #[test]
    fn open_position_left_unrealized() {
        let bars = make_bars(&[100.0, 120.0, 130.0]);
        let report = run_backtest(&bars, &frame(3, &[1], &[], &[]), 1000.0).unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(report.summary.total_trades, 0);
        assert_eq!(report.summary.final_balance, 1000.0);
        let open = report.open_position.unwrap();
        assert_eq!(open.entry_index, 1);
        assert_eq!(open.mark_price, 130.0);
        assert!((report.equity_curve[2] - 1000.0 / 120.0 * 130.0).abs() < 1e-9);
    }

    #[test]
    fn no_signals_no_trades() {
        let bars = make_bars(&[100.0; 5]);
        let report = run_backtest(&bars, &SignalFrame::flat(5), 500.0).unwrap();
        assert_eq!(report.summary.total_trades, 0);
        assert_eq!(report.summary.final_balance, 500.0);
        assert_eq!(report.summary.total_return, 0.0);
        assert_eq!(report.equity_curve, vec![500.0; 5]);
    }

    #[test]
    fn misaligned_frame_rejected() {
        let bars = make_bars(&[100.0; 5]);
        let err = run_backtest(&bars, &SignalFrame::flat(4), 1000.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter(_)));
    }

    #[test]
    fn non_positive_capital_rejected() {
        let bars = make_bars(&[100.0; 2]);
        assert!(matches!(
            run_backtest(&bars, &SignalFrame::flat(2), 0.0),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn bad_close_is_fatal() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars[2].close = f64::NAN;
        let err = run_backtest(&bars, &SignalFrame::flat(3), 1000.0).unwrap_err();
        assert_eq!(
            err,
            CoreError::DataIntegrity {
                index: 2,
                reason: "close must be a positive number, got NaN".into(),
            }
        );
    }
}
