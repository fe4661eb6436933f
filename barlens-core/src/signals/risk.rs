//! Risk sizing: stop-distance position sizing and risk/reward targets.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Account and stop parameters for the directional generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    pub account_value: f64,
    /// Percent of the account risked per trade (1.0 = 1%).
    pub risk_percent: f64,
    pub atr_multiple: f64,
    pub risk_reward: f64,
    pub trailing_window: usize,
    pub volume_window: usize,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            account_value: 100_000.0,
            risk_percent: 1.0,
            atr_multiple: 2.0,
            risk_reward: 2.0,
            trailing_window: 10,
            volume_window: 20,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.account_value.is_finite() && self.account_value > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "account_value must be positive, got {}",
                self.account_value
            )));
        }
        if !(self.risk_percent > 0.0 && self.risk_percent <= 100.0) {
            return Err(CoreError::InvalidParameter(format!(
                "risk_percent must be in (0, 100], got {}",
                self.risk_percent
            )));
        }
        if !(self.atr_multiple.is_finite() && self.atr_multiple > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "atr_multiple must be positive, got {}",
                self.atr_multiple
            )));
        }
        if !(self.risk_reward.is_finite() && self.risk_reward > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "risk_reward must be positive, got {}",
                self.risk_reward
            )));
        }
        if self.trailing_window == 0 || self.volume_window == 0 {
            return Err(CoreError::InvalidParameter(
                "trailing_window and volume_window must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Whole shares such that hitting `stop_loss` loses at most `risk_percent` of
/// the account, capped at what the account can buy outright.
///
/// Fails with `ZeroRisk` when the stop sits on the entry price.
pub fn position_size(
    account_value: f64,
    risk_percent: f64,
    entry_price: f64,
    stop_loss: f64,
) -> CoreResult<u64> {
    if !(entry_price.is_finite() && entry_price > 0.0) {
        return Err(CoreError::InvalidParameter(format!(
            "entry price must be positive, got {entry_price}"
        )));
    }
    if !stop_loss.is_finite() {
        return Err(CoreError::InvalidParameter(format!(
            "stop-loss must be finite, got {stop_loss}"
        )));
    }
    if !(account_value.is_finite() && account_value >= 0.0) || !(risk_percent >= 0.0) {
        return Err(CoreError::InvalidParameter(
            "account value and risk percent must be non-negative".into(),
        ));
    }

    let price_risk = (entry_price - stop_loss).abs();
    if price_risk == 0.0 {
        return Err(CoreError::ZeroRisk { entry_price });
    }

    let risk_amount = account_value * risk_percent / 100.0;
    let by_risk = (risk_amount / price_risk).floor();
    let affordable = (account_value / entry_price).floor();
    Ok(by_risk.min(affordable) as u64)
}

/// Target `risk_reward` times the stop distance away, on the side opposite the stop.
pub fn take_profit(entry_price: f64, stop_loss: f64, risk_reward: f64) -> f64 {
    let risk = (entry_price - stop_loss).abs();
    if entry_price > stop_loss {
        entry_price + risk * risk_reward
    } else {
        entry_price - risk * risk_reward
    }
}
