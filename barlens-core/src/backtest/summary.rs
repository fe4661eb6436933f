//! Closed-trade statistics.

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_trades: usize,
    /// Trades with a strictly positive return.
    pub winning_trades: usize,
    pub avg_return: f64,
    pub max_return: f64,
    pub min_return: f64,
    pub final_balance: f64,
    /// `(final_balance - initial_capital) / initial_capital * 100`.
    pub total_return: f64,
}

impl BacktestSummary {
    /// Statistics over closed trades. With none, every field is zero except
    /// `final_balance`, which is the untouched balance.
    pub fn from_trades(trades: &[TradeRecord], initial_capital: f64, final_balance: f64) -> Self {
        if trades.is_empty() {
            return Self {
                total_trades: 0,
                winning_trades: 0,
                avg_return: 0.0,
                max_return: 0.0,
                min_return: 0.0,
                final_balance,
                total_return: 0.0,
            };
        }

        let returns: Vec<f64> = trades.iter().map(|t| t.returns_pct).collect();
        let total_trades = trades.len();
        Self {
            total_trades,
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            avg_return: returns.iter().sum::<f64>() / total_trades as f64,
            max_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_return: returns.iter().copied().fold(f64::INFINITY, f64::min),
            final_balance,
            total_return: (final_balance - initial_capital) / initial_capital * 100.0,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.total_trades as f64
        }
    }
}
