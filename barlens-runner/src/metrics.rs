//! Performance metrics: pure functions over an equity curve and a trade ledger.
//!
//! Ratios are annualized with `periods_per_year`, which the pipeline derives
//! from the bar interval (252 for daily bars).

use barlens_core::domain::TradeRecord;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Fraction, mark-to-market: (last equity - first) / first.
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Negative fraction (-0.15 = 15% drawdown).
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_bars_held: f64,
    /// Fraction of bars spent in a position.
    pub exposure: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord], periods_per_year: f64) -> Self {
        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve, periods_per_year),
            sharpe: sharpe_ratio(equity_curve, periods_per_year),
            sortino: sortino_ratio(equity_curve, periods_per_year),
            calmar: calmar_ratio(equity_curve, periods_per_year),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_bars_held: avg_bars_held(trades),
            exposure: exposure(trades, equity_curve.len()),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
        }
    }
}

pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&first), Some(&last)) if equity_curve.len() >= 2 && first > 0.0 => {
            (last - first) / first
        }
        _ => 0.0,
    }
}

/// Compound growth rate per year. 0.0 for short, constant, or wiped-out curves.
pub fn cagr(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&first), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || first <= 0.0 || last <= 0.0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let years = equity_curve.len() as f64 / periods_per_year;
    (last / first).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio (zero risk-free rate).
/// 0.0 when variance is zero or there are fewer than two returns.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / std * periods_per_year.sqrt()
}

/// Sortino ratio: downside deviation only. 0.0 with no losing periods.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / downside_std * periods_per_year.sqrt()
}

/// CAGR / |max drawdown|. 0.0 without a drawdown or with non-positive CAGR.
pub fn calmar_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let c = cagr(equity_curve, periods_per_year);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit / gross loss, capped at 100.0 when nothing was lost.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let (gross_profit, gross_loss) = trades.iter().map(TradeRecord::pnl).fold(
        (0.0, 0.0),
        |(profit, loss), pnl| {
            if pnl > 0.0 {
                (profit + pnl, loss)
            } else {
                (profit, loss - pnl)
            }
        },
    );
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn avg_bars_held(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held() as f64).sum::<f64>() / trades.len() as f64
}

/// Closed trades only; an open position at the end is not counted.
pub fn exposure(trades: &[TradeRecord], bar_count: usize) -> f64 {
    if bar_count == 0 {
        return 0.0;
    }
    let held: usize = trades.iter().map(TradeRecord::bars_held).sum();
    (held as f64 / bar_count as f64).min(1.0)
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[TradeRecord], winners: bool) -> usize {
    let mut best = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}
