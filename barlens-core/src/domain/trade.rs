//! TradeRecord: a closed round trip in the backtest ledger.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// What closed the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The exit flag fired (stop flag may also have fired on the same bar).
    Signal,
    /// Only the stop-loss flag fired.
    StopLoss,
}

/// A completed long trade: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_index: usize,
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,

    pub exit_index: usize,
    pub exit_date: NaiveDateTime,
    pub exit_price: f64,

    /// Fractional share count bought with the full balance.
    pub shares: f64,

    /// `(exit - entry) / entry * 100`.
    pub returns_pct: f64,

    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.returns_pct > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }

    /// Realized profit in account currency.
    pub fn pnl(&self) -> f64 {
        (self.exit_price - self.entry_price) * self.shares
    }
}

/// A position still open when the series ended. Left unrealized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_index: usize,
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,
    pub shares: f64,
    /// Close of the last bar, for display only.
    pub mark_price: f64,
}

impl OpenPosition {
    pub fn unrealized_pct(&self) -> f64 {
        (self.mark_price - self.entry_price) / self.entry_price * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            entry_index: 2,
            entry_date: ts(4),
            entry_price: 100.0,
            exit_index: 6,
            exit_date: ts(8),
            exit_price: 110.0,
            shares: 50.0,
            returns_pct: 10.0,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn winner_and_pnl() {
        let trade = sample_trade();
        assert!(trade.is_winner());
        assert_eq!(trade.bars_held(), 4);
        assert!((trade.pnl() - 500.0).abs() < 1e-10);
    }

    #[test]
    fn exit_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::StopLoss).unwrap();
        assert_eq!(json, "\"stop_loss\"");
    }

    #[test]
    fn unrealized_pct() {
        let open = OpenPosition {
            entry_index: 0,
            entry_date: ts(2),
            entry_price: 200.0,
            shares: 5.0,
            mark_price: 190.0,
        };
        assert!((open.unrealized_pct() + 5.0).abs() < 1e-10);
    }
}
