//! Signal Generator.
//!
//! Two named rule sets turn indicator state into trading decisions:
//! - [`StrategyKind::Conservative`]: long-only, per-bar entry/exit/stop flags
//!   that feed the backtest engine.
//! - [`StrategyKind::Directional`]: long/short recommendation for the last bar
//!   with ATR stops, risk/reward target and position size.
//!
//! Signals are derived fresh from the bars on every call. An indicator that
//! lacks history fails the whole generation; no partial bundle is returned.

pub mod conservative;
pub mod directional;
pub mod risk;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::{CoreError, CoreResult};
use crate::indicators::{BollingerParams, MacdParams, StochasticParams};

pub use conservative::{conservative_signals, SignalFrame};
pub use directional::{
    directional_signals, EntrySignal, ExitSignal, StopLevels, TradeRecommendation,
};
pub use risk::{position_size, take_profit, RiskParams};

pub(crate) const RSI_OVERSOLD: f64 = 30.0;
pub(crate) const RSI_OVERBOUGHT: f64 = 70.0;

/// Indicator windows shared by both rule sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    pub rsi_window: usize,
    pub macd: MacdParams,
    pub bollinger: BollingerParams,
    pub atr_window: usize,
    pub stochastic: StochasticParams,
    pub trend_window: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            rsi_window: 14,
            macd: MacdParams::default(),
            bollinger: BollingerParams::default(),
            atr_window: 14,
            stochastic: StochasticParams::default(),
            trend_window: 20,
        }
    }
}

impl SignalParams {
    /// Fewest bars on which every indicator used by the rule sets can run.
    pub fn min_bars(&self) -> usize {
        [
            self.rsi_window,
            self.macd.min_bars(),
            self.bollinger.window,
            self.atr_window,
            self.stochastic.k_window,
            self.trend_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Conservative,
    Directional,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Conservative => write!(f, "conservative"),
            StrategyKind::Directional => write!(f, "directional"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(StrategyKind::Conservative),
            "directional" => Ok(StrategyKind::Directional),
            other => Err(CoreError::InvalidParameter(format!(
                "unknown strategy '{other}' (expected conservative or directional)"
            ))),
        }
    }
}

/// Output of one generator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "signals", rename_all = "lowercase")]
pub enum SignalBundle {
    Conservative(SignalFrame),
    Directional(TradeRecommendation),
}

impl SignalBundle {
    pub fn kind(&self) -> StrategyKind {
        match self {
            SignalBundle::Conservative(_) => StrategyKind::Conservative,
            SignalBundle::Directional(_) => StrategyKind::Directional,
        }
    }

    pub fn frame(&self) -> Option<&SignalFrame> {
        match self {
            SignalBundle::Conservative(frame) => Some(frame),
            SignalBundle::Directional(_) => None,
        }
    }

    pub fn recommendation(&self) -> Option<&TradeRecommendation> {
        match self {
            SignalBundle::Directional(rec) => Some(rec),
            SignalBundle::Conservative(_) => None,
        }
    }
}

pub fn generate(
    kind: StrategyKind,
    bars: &[Bar],
    params: &SignalParams,
    risk: &RiskParams,
) -> CoreResult<SignalBundle> {
    match kind {
        StrategyKind::Conservative => {
            conservative_signals(bars, params).map(SignalBundle::Conservative)
        }
        StrategyKind::Directional => {
            directional_signals(bars, params, risk).map(SignalBundle::Directional)
        }
    }
}
