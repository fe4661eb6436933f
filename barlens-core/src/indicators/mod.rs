//! Indicator Library.
//!
//! Every indicator returns series aligned 1:1 with the input bars, NaN marking
//! warm-up entries. Windowed indicators refuse to run on fewer bars than their
//! window and report `CoreError::InsufficientData` instead of an all-NaN series.
//!
//! Single-series indicators implement [`Indicator`]. Multi-series indicators
//! (MACD, Bollinger, Stochastic) are plain functions returning a struct of
//! series. [`IndicatorKind`] ties both together as the closed dispatch table
//! used by the runner and the CLI.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod vwap;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{closes, Bar};
use crate::error::{CoreError, CoreResult};

pub use atr::{atr, true_range, Atr};
pub use bollinger::{bollinger, bollinger_bars, BollingerBands, BollingerParams};
pub use ema::{ema, Ema};
pub use macd::{macd, macd_bars, MacdOutput, MacdParams};
pub use obv::{obv, Obv};
pub use rolling::{rolling_max, rolling_mean, rolling_min, rolling_std};
pub use rsi::{rsi, Rsi};
pub use sma::{sma, Sma};
pub use stochastic::{stochastic, StochasticOutput, StochasticParams};
pub use vwap::{vwap, Vwap};

/// A single-series indicator over a bar slice.
pub trait Indicator: Send + Sync {
    /// Series name, e.g. `"rsi_14"`.
    fn name(&self) -> &str;

    /// Bars needed before `compute` succeeds.
    fn min_bars(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> CoreResult<Vec<f64>>;
}

pub(crate) fn check_window(name: &str, window: usize) -> CoreResult<()> {
    if window == 0 {
        return Err(CoreError::InvalidParameter(format!(
            "{name} window must be positive"
        )));
    }
    Ok(())
}

pub(crate) fn check_history(name: &str, required: usize, available: usize) -> CoreResult<()> {
    if available < required {
        return Err(CoreError::insufficient(name, required, available));
    }
    Ok(())
}

/// Named indicator series, ordered by name. Warm-up NaNs serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorValues {
    #[serde(with = "crate::serde_nan::map")]
    series: BTreeMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Value of `name` at the last bar, if defined.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(rolling::last_defined)
    }
}

/// Closed set of indicators the pipeline knows how to compute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma { window: usize },
    Ema { window: usize },
    Rsi { window: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { window: usize, num_std: f64 },
    Atr { window: usize },
    Stochastic { k_window: usize, d_window: usize },
    Obv,
    Vwap,
}

impl IndicatorKind {
    /// The set computed when the caller asks for nothing specific.
    pub fn default_set() -> Vec<IndicatorKind> {
        let macd = MacdParams::default();
        let bb = BollingerParams::default();
        let stoch = StochasticParams::default();
        vec![
            IndicatorKind::Sma { window: 20 },
            IndicatorKind::Sma { window: 50 },
            IndicatorKind::Ema { window: 20 },
            IndicatorKind::Rsi { window: 14 },
            IndicatorKind::Macd {
                fast: macd.fast,
                slow: macd.slow,
                signal: macd.signal,
            },
            IndicatorKind::Bollinger {
                window: bb.window,
                num_std: bb.num_std,
            },
            IndicatorKind::Atr { window: 14 },
            IndicatorKind::Stochastic {
                k_window: stoch.k_window,
                d_window: stoch.d_window,
            },
            IndicatorKind::Obv,
            IndicatorKind::Vwap,
        ]
    }

    /// Bars needed before `compute` succeeds.
    pub fn min_bars(&self) -> usize {
        match *self {
            IndicatorKind::Sma { window }
            | IndicatorKind::Ema { window }
            | IndicatorKind::Rsi { window }
            | IndicatorKind::Atr { window }
            | IndicatorKind::Bollinger { window, .. } => window,
            IndicatorKind::Macd { fast, slow, signal } => fast.max(slow).max(signal),
            IndicatorKind::Stochastic { k_window, .. } => k_window,
            IndicatorKind::Obv | IndicatorKind::Vwap => 1,
        }
    }

    /// Compute this indicator and write its series into `out`.
    ///
    /// Multi-series indicators write several entries (`macd_*`, `bb_*`, `stoch_*`).
    pub fn compute_into(&self, bars: &[Bar], out: &mut IndicatorValues) -> CoreResult<()> {
        match *self {
            IndicatorKind::Sma { window } => {
                let ind = Sma::new(window);
                out.insert(ind.name(), ind.compute(bars)?);
            }
            IndicatorKind::Ema { window } => {
                let ind = Ema::new(window);
                out.insert(ind.name(), ind.compute(bars)?);
            }
            IndicatorKind::Rsi { window } => {
                let ind = Rsi::new(window);
                out.insert(ind.name(), ind.compute(bars)?);
            }
            IndicatorKind::Atr { window } => {
                let ind = Atr::new(window);
                out.insert(ind.name(), ind.compute(bars)?);
            }
            IndicatorKind::Macd { fast, slow, signal } => {
                let params = MacdParams { fast, slow, signal };
                let sfx = params.suffix();
                let m = macd(&closes(bars), params)?;
                out.insert(format!("macd_{sfx}"), m.macd);
                out.insert(format!("macd_signal_{sfx}"), m.signal);
                out.insert(format!("macd_hist_{sfx}"), m.histogram);
            }
            IndicatorKind::Bollinger { window, num_std } => {
                let params = BollingerParams { window, num_std };
                let sfx = params.suffix();
                let bb = bollinger(&closes(bars), params)?;
                out.insert(format!("bb_upper_{sfx}"), bb.upper);
                out.insert(format!("bb_middle_{sfx}"), bb.middle);
                out.insert(format!("bb_lower_{sfx}"), bb.lower);
            }
            IndicatorKind::Stochastic { k_window, d_window } => {
                let s = stochastic(bars, StochasticParams { k_window, d_window })?;
                out.insert(format!("stoch_k_{k_window}_{d_window}"), s.k);
                out.insert(format!("stoch_d_{k_window}_{d_window}"), s.d);
            }
            IndicatorKind::Obv => out.insert("obv", obv(bars)),
            IndicatorKind::Vwap => out.insert("vwap", vwap(bars)),
        }
        Ok(())
    }

    /// Compute this indicator alone.
    pub fn compute(&self, bars: &[Bar]) -> CoreResult<IndicatorValues> {
        let mut out = IndicatorValues::new();
        self.compute_into(bars, &mut out)?;
        Ok(out)
    }
}

/// Compute every kind in `kinds`, stopping at the first failure.
pub fn compute_all(bars: &[Bar], kinds: &[IndicatorKind]) -> CoreResult<IndicatorValues> {
    let mut out = IndicatorValues::new();
    for kind in kinds {
        kind.compute_into(bars, &mut out)?;
    }
    Ok(out)
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma { window } => write!(f, "sma:{window}"),
            IndicatorKind::Ema { window } => write!(f, "ema:{window}"),
            IndicatorKind::Rsi { window } => write!(f, "rsi:{window}"),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "macd:{fast}:{slow}:{signal}")
            }
            IndicatorKind::Bollinger { window, num_std } => {
                write!(f, "bollinger:{window}:{num_std}")
            }
            IndicatorKind::Atr { window } => write!(f, "atr:{window}"),
            IndicatorKind::Stochastic { k_window, d_window } => {
                write!(f, "stochastic:{k_window}:{d_window}")
            }
            IndicatorKind::Obv => f.write_str("obv"),
            IndicatorKind::Vwap => f.write_str("vwap"),
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = CoreError;

    /// Parses `name[:param[:param...]]`. Omitted parameters take their defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let usize_arg = |i: usize, default: usize| -> CoreResult<usize> {
            match args.get(i) {
                None => Ok(default),
                Some(raw) => raw.parse().map_err(|_| {
                    CoreError::InvalidParameter(format!("bad parameter '{raw}' in '{s}'"))
                }),
            }
        };
        let arity = |max: usize| -> CoreResult<()> {
            if args.len() > max {
                return Err(CoreError::InvalidParameter(format!(
                    "too many parameters in '{s}'"
                )));
            }
            Ok(())
        };

        let kind = match name.as_str() {
            "sma" => {
                arity(1)?;
                IndicatorKind::Sma {
                    window: usize_arg(0, 20)?,
                }
            }
            "ema" => {
                arity(1)?;
                IndicatorKind::Ema {
                    window: usize_arg(0, 20)?,
                }
            }
            "rsi" => {
                arity(1)?;
                IndicatorKind::Rsi {
                    window: usize_arg(0, 14)?,
                }
            }
            "atr" => {
                arity(1)?;
                IndicatorKind::Atr {
                    window: usize_arg(0, 14)?,
                }
            }
            "macd" => {
                arity(3)?;
                IndicatorKind::Macd {
                    fast: usize_arg(0, 12)?,
                    slow: usize_arg(1, 26)?,
                    signal: usize_arg(2, 9)?,
                }
            }
            "bollinger" | "bb" => {
                arity(2)?;
                let num_std = match args.get(1) {
                    None => 2.0,
                    Some(raw) => raw.parse().map_err(|_| {
                        CoreError::InvalidParameter(format!("bad parameter '{raw}' in '{s}'"))
                    })?,
                };
                IndicatorKind::Bollinger {
                    window: usize_arg(0, 20)?,
                    num_std,
                }
            }
            "stochastic" | "stoch" => {
                arity(2)?;
                IndicatorKind::Stochastic {
                    k_window: usize_arg(0, 14)?,
                    d_window: usize_arg(1, 3)?,
                }
            }
            "obv" => {
                arity(0)?;
                IndicatorKind::Obv
            }
            "vwap" => {
                arity(0)?;
                IndicatorKind::Vwap
            }
            _ => {
                return Err(CoreError::InvalidParameter(format!(
                    "unknown indicator '{s}'"
                )))
            }
        };
        Ok(kind)
    }
}

/// Moving-average flavour selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverage {
    Sma,
    Ema,
}

impl MovingAverage {
    pub fn compute(self, values: &[f64], window: usize) -> CoreResult<Vec<f64>> {
        match self {
            MovingAverage::Sma => sma(values, window),
            MovingAverage::Ema => ema(values, window),
        }
    }
}

impl FromStr for MovingAverage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sma" => Ok(MovingAverage::Sma),
            "ema" => Ok(MovingAverage::Ema),
            other => Err(CoreError::InvalidParameter(format!(
                "unknown moving average type '{other}'"
            ))),
        }
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                test_timestamp(i),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Bars from explicit `(open, high, low, close)` tuples, volume = 1000.
#[cfg(test)]
pub fn make_ohlc_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    ohlc.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar::new(test_timestamp(i), o, h, l, c, 1000.0))
        .collect()
}

#[cfg(test)]
fn test_timestamp(i: usize) -> chrono::NaiveDateTime {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    base + chrono::Duration::days(i as i64)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_identifiers() {
        assert_eq!(
            "sma:20".parse::<IndicatorKind>().unwrap(),
            IndicatorKind::Sma { window: 20 }
        );
        assert_eq!(
            "rsi".parse::<IndicatorKind>().unwrap(),
            IndicatorKind::Rsi { window: 14 }
        );
        assert_eq!(
            "MACD:5:10:3".parse::<IndicatorKind>().unwrap(),
            IndicatorKind::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
        assert_eq!(
            "bb:10:1.5".parse::<IndicatorKind>().unwrap(),
            IndicatorKind::Bollinger {
                window: 10,
                num_std: 1.5
            }
        );
    }

    #[test]
    fn unknown_identifier_is_invalid() {
        for bad in ["wma:10", "", "sma:abc", "obv:3", "sma:1:2"] {
            let err = bad.parse::<IndicatorKind>().unwrap_err();
            assert!(matches!(err, CoreError::InvalidParameter(_)), "{bad}");
        }
    }

    #[test]
    fn display_parses_back() {
        for kind in IndicatorKind::default_set() {
            assert_eq!(kind.to_string().parse::<IndicatorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn default_set_on_long_series() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let bars = make_bars(&closes);
        let values = compute_all(&bars, &IndicatorKind::default_set()).unwrap();

        for name in [
            "sma_20",
            "sma_50",
            "ema_20",
            "rsi_14",
            "macd_12_26_9",
            "macd_signal_12_26_9",
            "macd_hist_12_26_9",
            "bb_upper_20_2",
            "bb_middle_20_2",
            "bb_lower_20_2",
            "atr_14",
            "stoch_k_14_3",
            "stoch_d_14_3",
            "obv",
            "vwap",
        ] {
            let series = values.get(name).unwrap_or_else(|| panic!("missing {name}"));
            assert_eq!(series.len(), bars.len(), "{name}");
        }
        assert!(values.latest("rsi_14").is_some());
    }

    #[test]
    fn compute_all_propagates_insufficient_data() {
        let bars = make_bars(&[1.0; 10]);
        let err = compute_all(&bars, &IndicatorKind::default_set()).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn moving_average_by_name() {
        let ma: MovingAverage = "EMA".parse().unwrap();
        assert_eq!(ma, MovingAverage::Ema);
        assert!("wma".parse::<MovingAverage>().is_err());
        let out = MovingAverage::Sma.compute(&[1.0, 2.0, 3.0], 3).unwrap();
        assert_eq!(out[2], 2.0);
    }

    #[test]
    fn values_serialize_as_map() {
        let mut values = IndicatorValues::new();
        values.insert("obv", vec![0.0, 1.0]);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"obv":[0.0,1.0]}"#);
    }

    #[test]
    fn warm_up_survives_json() {
        let mut values = IndicatorValues::new();
        values.insert("sma_2", vec![f64::NAN, 1.5]);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"sma_2":[null,1.5]}"#);
        let back: IndicatorValues = serde_json::from_str(&json).unwrap();
        assert!(back.get("sma_2").unwrap()[0].is_nan());
        assert_eq!(back.latest("sma_2"), Some(1.5));
    }
}
