//! Bar source trait, request vocabulary and structured error types.
//!
//! A `BarSource` abstracts over where bars come from (CSV files, a market data
//! vendor, generated data) so the cache and pipeline can be tested offline.

use std::fmt;
use std::str::FromStr;

use barlens_core::domain::Bar;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// The upstream source failed. Surfaced to the caller unchanged, never retried.
    #[error("upstream fetch failed for '{symbol}': {reason}")]
    UpstreamFetchFailure { symbol: String, reason: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("missing column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("no data for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet I/O error: {0}")]
    Parquet(String),
}

/// Where a series came from. Synthetic data is tagged so reports can say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Csv,
    Cache,
    Synthetic,
    Upstream,
}

/// Trait for bar sources.
///
/// Implementations handle the specifics of one source. The cache layer sits
/// above this trait; sources don't know about the cache.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// What to tag bars from this source with.
    fn origin(&self) -> DataOrigin {
        DataOrigin::Upstream
    }

    /// Fetch bars for the request. Order and uniqueness are not guaranteed;
    /// run the result through `canonicalize` before analysis.
    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, DataError>;

    /// `fetch`, plus where the bars actually came from. Layers that can
    /// answer from somewhere else (the cache) override this.
    fn fetch_with_origin(
        &self,
        request: &FetchRequest,
    ) -> Result<(Vec<Bar>, DataOrigin), DataError> {
        self.fetch(request).map(|bars| (bars, self.origin()))
    }
}

/// One symbol over one lookback at one bar size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

impl FetchRequest {
    pub fn new(symbol: impl Into<String>, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            interval,
        }
    }

    /// Reject requests no source could answer.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.symbol.trim().is_empty() {
            return Err(DataError::InvalidParameter("symbol cannot be empty".into()));
        }
        Ok(())
    }
}

// ── Period ──────────────────────────────────────────────────────────

/// Lookback window ending at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// First timestamp covered by the period when it ends at `end`.
    /// `None` means unbounded (`max`).
    pub fn start_from(self, end: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Period::OneDay => Some(end - Duration::days(1)),
            Period::FiveDays => Some(end - Duration::days(5)),
            Period::OneMonth => end.checked_sub_months(Months::new(1)),
            Period::ThreeMonths => end.checked_sub_months(Months::new(3)),
            Period::SixMonths => end.checked_sub_months(Months::new(6)),
            Period::OneYear => end.checked_sub_months(Months::new(12)),
            Period::TwoYears => end.checked_sub_months(Months::new(24)),
            Period::FiveYears => end.checked_sub_months(Months::new(60)),
            Period::TenYears => end.checked_sub_months(Months::new(120)),
            Period::YearToDate => {
                NaiveDate::from_ymd_opt(end.year(), 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
            }
            Period::Max => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                DataError::InvalidParameter(format!(
                    "invalid period '{s}' (expected one of: {})",
                    Period::ALL.map(Period::as_str).join(", ")
                ))
            })
    }
}

// ── Interval ────────────────────────────────────────────────────────

/// Bar size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

/// Regular-session minutes per trading day, for annualizing intraday bars.
const SESSION_MINUTES: f64 = 390.0;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::SixtyMinutes,
        Interval::NinetyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneWeek,
        Interval::OneMonth,
        Interval::ThreeMonths,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    /// Intraday bar length in minutes; `None` for daily and longer.
    pub fn minutes(self) -> Option<i64> {
        match self {
            Interval::OneMinute => Some(1),
            Interval::TwoMinutes => Some(2),
            Interval::FiveMinutes => Some(5),
            Interval::FifteenMinutes => Some(15),
            Interval::ThirtyMinutes => Some(30),
            Interval::SixtyMinutes | Interval::OneHour => Some(60),
            Interval::NinetyMinutes => Some(90),
            _ => None,
        }
    }

    /// Calendar spacing between consecutive bars. Months are approximated.
    pub fn step(self) -> Duration {
        match self {
            Interval::OneDay => Duration::days(1),
            Interval::FiveDays => Duration::days(5),
            Interval::OneWeek => Duration::weeks(1),
            Interval::OneMonth => Duration::days(30),
            Interval::ThreeMonths => Duration::days(91),
            intraday => Duration::minutes(intraday.minutes().unwrap_or(1)),
        }
    }

    /// Bars per trading year, used to annualize returns.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Interval::OneDay => TRADING_DAYS_PER_YEAR,
            Interval::FiveDays => TRADING_DAYS_PER_YEAR / 5.0,
            Interval::OneWeek => 52.0,
            Interval::OneMonth => 12.0,
            Interval::ThreeMonths => 4.0,
            intraday => {
                let minutes = intraday.minutes().unwrap_or(1) as f64;
                TRADING_DAYS_PER_YEAR * (SESSION_MINUTES / minutes)
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                DataError::InvalidParameter(format!(
                    "invalid interval '{s}' (expected one of: {})",
                    Interval::ALL.map(Interval::as_str).join(", ")
                ))
            })
    }
}

/// Keep only bars inside `period`, measured back from the newest bar.
pub fn filter_period(bars: Vec<Bar>, period: Period) -> Vec<Bar> {
    let Some(end) = bars.iter().map(|b| b.timestamp).max() else {
        return bars;
    };
    match period.start_from(end) {
        Some(start) => bars.into_iter().filter(|b| b.timestamp >= start).collect(),
        None => bars,
    }
}
