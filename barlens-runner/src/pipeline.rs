//! Analysis pipeline: bars → indicators → patterns → signals → backtest.
//!
//! Entry points:
//! - `load_series()`: fetch from a `BarSource` and canonicalize.
//! - `analyze()`: run every stage over one series. No I/O.
//! - `analyze_many()`: `analyze` fanned out across symbols on the rayon pool.

use barlens_core::backtest::{run_backtest, BacktestReport};
use barlens_core::domain::{Bar, BarSeries};
use barlens_core::indicators::IndicatorValues;
use barlens_core::patterns::PatternReport;
use barlens_core::signals::{conservative_signals, generate, SignalBundle, StrategyKind};
use barlens_core::CoreError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, ConfigError};
use crate::data::{canonicalize, BarSource, DataError, DataOrigin, FetchRequest};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("analysis error: {0}")]
    Core(#[from] CoreError),
    #[error("unsupported report schema version {found} (max supported: {supported})")]
    SchemaVersion { found: u32, supported: u32 },
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Everything computed for one symbol. This is what the chart/dashboard
/// layer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    /// BLAKE3 over the canonical bars.
    pub dataset_hash: String,
    pub origin: Option<DataOrigin>,
    pub strategy: StrategyKind,
    pub bars: Vec<Bar>,
    /// NaN warm-up entries serialize as `null`.
    pub indicators: IndicatorValues,
    /// Indicators left out because the series was too short for them.
    pub skipped_indicators: Vec<String>,
    pub patterns: PatternReport,
    /// `None` while there is not enough history for the rule set.
    pub signals: Option<SignalBundle>,
    /// Replay of the conservative frame, whatever strategy was requested.
    pub backtest: Option<BacktestReport>,
    pub metrics: Option<PerformanceMetrics>,
    /// Externally computed forecast series, passed through untouched.
    #[serde(default, with = "barlens_core::serde_nan::option")]
    pub predictions: Option<Vec<f64>>,
}

impl AnalysisReport {
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

/// Deterministic BLAKE3 hash over symbol and every bar field.
pub fn dataset_hash(series: &BarSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    for bar in series.bars() {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Fetch `request` from `source` and canonicalize the result.
pub fn load_series(
    source: &dyn BarSource,
    request: &FetchRequest,
) -> Result<(BarSeries, DataOrigin), RunError> {
    let (raw, origin) = source.fetch_with_origin(request)?;
    let (series, _stats) = canonicalize(&request.symbol.to_ascii_uppercase(), raw)?;
    info!(
        symbol = series.symbol(),
        source = source.name(),
        ?origin,
        bars = series.len(),
        "series loaded"
    );
    Ok((series, origin))
}

/// Run every stage over one series.
///
/// Short history is not an error: indicators that cannot run are listed in
/// `skipped_indicators`, and signals/backtest come back as `None`. Anything
/// else the core rejects (bad parameters, zero risk, corrupt closes) fails
/// the analysis.
pub fn analyze(
    series: &BarSeries,
    config: &AnalysisConfig,
    origin: Option<DataOrigin>,
    predictions: Option<Vec<f64>>,
) -> Result<AnalysisReport, RunError> {
    if series.is_empty() {
        return Err(DataError::NoData {
            symbol: series.symbol().to_string(),
        }
        .into());
    }
    let bars = series.bars();
    let symbol = series.symbol();

    let mut indicators = IndicatorValues::new();
    let mut skipped_indicators = Vec::new();
    for kind in &config.indicators {
        match kind.compute_into(bars, &mut indicators) {
            Ok(()) => {}
            Err(e) if e.is_insufficient_data() => {
                debug!(symbol, indicator = %kind, error = %e, "indicator skipped");
                skipped_indicators.push(kind.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let patterns = PatternReport::scan(bars, &config.patterns);

    let kind = config.strategy.kind;
    let signals = none_if_short(generate(kind, bars, &config.signals, &config.risk))?;

    let frame = match &signals {
        Some(SignalBundle::Conservative(frame)) => Some(frame.clone()),
        _ => none_if_short(conservative_signals(bars, &config.signals))?,
    };
    let backtest = frame
        .map(|frame| run_backtest(bars, &frame, config.backtest.initial_capital))
        .transpose()?;
    let metrics = backtest.as_ref().map(|bt| {
        PerformanceMetrics::compute(
            &bt.equity_curve,
            &bt.trades,
            config.data.interval.periods_per_year(),
        )
    });

    info!(
        symbol,
        bars = bars.len(),
        indicators = indicators.len(),
        strategy = %kind,
        trades = backtest.as_ref().map_or(0, |bt| bt.trades.len()),
        "analysis complete"
    );

    Ok(AnalysisReport {
        schema_version: SCHEMA_VERSION,
        symbol: symbol.to_string(),
        dataset_hash: dataset_hash(series),
        origin,
        strategy: kind,
        bars: bars.to_vec(),
        indicators,
        skipped_indicators,
        patterns,
        signals,
        backtest,
        metrics,
        predictions,
    })
}

/// `analyze` for many independent series in parallel. Output order matches
/// input order; one symbol failing does not stop the others.
pub fn analyze_many(
    inputs: &[(BarSeries, Option<DataOrigin>)],
    config: &AnalysisConfig,
) -> Vec<Result<AnalysisReport, RunError>> {
    inputs
        .par_iter()
        .map(|(series, origin)| analyze(series, config, *origin, None))
        .collect()
}

fn none_if_short<T>(result: Result<T, CoreError>) -> Result<Option<T>, CoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_insufficient_data() => Ok(None),
        Err(e) => Err(e),
    }
}
