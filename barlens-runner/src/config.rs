//! TOML analysis configuration.
//!
//! Every section and key is optional; anything omitted takes its default.

use std::fs;
use std::path::{Path, PathBuf};

use barlens_core::indicators::IndicatorKind;
use barlens_core::patterns::PatternParams;
use barlens_core::signals::{RiskParams, SignalParams, StrategyKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::cache::DEFAULT_MAX_AGE_HOURS;
use crate::data::{Interval, Period};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where bars come from when the CLI is not told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source: SourceKind,
    pub period: Period,
    pub interval: Interval,
    /// Directory holding `{SYMBOL}.csv` files.
    pub csv_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_cache_age_hours: u64,
    pub synthetic_seed: u64,
    pub synthetic_bars: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            period: Period::default(),
            interval: Interval::default(),
            csv_dir: PathBuf::from("data/csv"),
            cache_dir: PathBuf::from("data/cache"),
            max_cache_age_hours: DEFAULT_MAX_AGE_HOURS,
            synthetic_seed: 42,
            synthetic_bars: 252,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
}

/// The whole analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    /// `[[indicators]]` tables, e.g. `type = "sma"`, `window = 20`.
    pub indicators: Vec<IndicatorKind>,
    pub patterns: PatternParams,
    pub signals: SignalParams,
    pub risk: RiskParams,
    pub backtest: BacktestConfig,
    pub strategy: StrategyConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            indicators: IndicatorKind::default_set(),
            patterns: PatternParams::default(),
            signals: SignalParams::default(),
            risk: RiskParams::default(),
            backtest: BacktestConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signals;
        let windows = [
            ("signals.rsi_window", s.rsi_window),
            ("signals.macd.fast", s.macd.fast),
            ("signals.macd.slow", s.macd.slow),
            ("signals.macd.signal", s.macd.signal),
            ("signals.bollinger.window", s.bollinger.window),
            ("signals.atr_window", s.atr_window),
            ("signals.stochastic.k_window", s.stochastic.k_window),
            ("signals.stochastic.d_window", s.stochastic.d_window),
            ("signals.trend_window", s.trend_window),
            ("patterns.trend_window", self.patterns.trend_window),
            ("patterns.breakout_window", self.patterns.breakout_window),
            ("patterns.levels_bins", self.patterns.levels_bins),
            ("data.synthetic_bars", self.data.synthetic_bars),
        ];
        for (key, value) in windows {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be positive")));
            }
        }
        if s.macd.fast >= s.macd.slow {
            return Err(ConfigError::Invalid(format!(
                "signals.macd.fast ({}) must be below signals.macd.slow ({})",
                s.macd.fast, s.macd.slow
            )));
        }
        if s.bollinger.window < 2 || !(s.bollinger.num_std >= 0.0) {
            return Err(ConfigError::Invalid(
                "signals.bollinger needs window >= 2 and num_std >= 0".into(),
            ));
        }
        if !(self.backtest.initial_capital.is_finite() && self.backtest.initial_capital > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.initial_capital must be positive, got {}",
                self.backtest.initial_capital
            )));
        }
        for kind in &self.indicators {
            if kind.min_bars() == 0 {
                return Err(ConfigError::Invalid(format!(
                    "indicator {kind} needs a positive window"
                )));
            }
        }
        self.risk
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("risk: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [data]
            period = "6mo"
            interval = "1h"
            max_cache_age_hours = 4

            [signals]
            rsi_window = 10

            [risk]
            risk_percent = 2.5

            [backtest]
            initial_capital = 25000.0

            [strategy]
            kind = "directional"
            "#,
        )
        .unwrap();
        assert_eq!(config.data.period, Period::SixMonths);
        assert_eq!(config.data.interval, Interval::OneHour);
        assert_eq!(config.data.max_cache_age_hours, 4);
        assert_eq!(config.data.cache_dir, PathBuf::from("data/cache"));
        assert_eq!(config.signals.rsi_window, 10);
        assert_eq!(config.signals.atr_window, 14);
        assert_eq!(config.risk.risk_percent, 2.5);
        assert_eq!(config.risk.account_value, 100_000.0);
        assert_eq!(config.backtest.initial_capital, 25_000.0);
        assert_eq!(config.strategy.kind, StrategyKind::Directional);
    }

    #[test]
    fn indicator_tables() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [[indicators]]
            type = "sma"
            window = 50

            [[indicators]]
            type = "obv"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.indicators,
            vec![IndicatorKind::Sma { window: 50 }, IndicatorKind::Obv]
        );
    }

    #[test]
    fn rejects_bad_period() {
        let err = AnalysisConfig::from_toml_str("[data]\nperiod = \"7y\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_window() {
        let err = AnalysisConfig::from_toml_str("[signals]\nrsi_window = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("rsi_window")));
    }

    #[test]
    fn rejects_risk_percent_out_of_range() {
        let err = AnalysisConfig::from_toml_str("[risk]\nrisk_percent = 150.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_capital() {
        let err = AnalysisConfig::from_toml_str("[backtest]\ninitial_capital = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("initial_capital")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AnalysisConfig::load(Path::new("/nonexistent/barlens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn toml_round_trip() {
        let config = AnalysisConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(AnalysisConfig::from_toml_str(&text).unwrap(), config);
    }
}
