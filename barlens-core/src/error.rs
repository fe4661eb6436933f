//! Error taxonomy for the core pipeline.

use thiserror::Error;

/// Errors raised by indicators, signal generation, sizing and backtesting.
///
/// Pattern detectors never return these: they are advisory and answer `None`
/// when history is short.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A windowed computation needs more bars than were supplied.
    #[error("insufficient data for {indicator}: need {required} bars, got {available}")]
    InsufficientData {
        indicator: String,
        required: usize,
        available: usize,
    },

    /// Malformed indicator identifier, bad window, or mismatched inputs.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Stop-loss equals the entry price, so no position size exists.
    #[error("zero risk: stop-loss equals entry price {entry_price}")]
    ZeroRisk { entry_price: f64 },

    /// A bar used for P&L arithmetic is NaN or non-positive.
    #[error("data integrity violation at bar {index}: {reason}")]
    DataIntegrity { index: usize, reason: String },
}

impl CoreError {
    pub(crate) fn insufficient(indicator: &str, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            indicator: indicator.to_string(),
            required,
            available,
        }
    }

    /// Re-label an `InsufficientData` error with the caller's indicator name.
    pub(crate) fn renamed(self, indicator: &str) -> Self {
        match self {
            Self::InsufficientData {
                required,
                available,
                ..
            } => Self::InsufficientData {
                indicator: indicator.to_string(),
                required,
                available,
            },
            other => other,
        }
    }

    /// True for the "not enough history" case, which callers treat as "no signal yet".
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = CoreError::insufficient("rsi_14", 14, 5);
        assert_eq!(
            err.to_string(),
            "insufficient data for rsi_14: need 14 bars, got 5"
        );
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn zero_risk_is_not_insufficient() {
        let err = CoreError::ZeroRisk { entry_price: 100.0 };
        assert!(!err.is_insufficient_data());
    }
}
