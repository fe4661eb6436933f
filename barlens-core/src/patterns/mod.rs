//! Pattern Detector: advisory heuristics over raw OHLCV.
//!
//! Detectors never fail. With fewer bars than their window they answer `None`,
//! and the same is true when the pattern simply isn't there.

pub mod crossover;
pub mod levels;
pub mod reversal;
pub mod triangle;
pub mod trend;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

pub use crossover::detect_ma_crossover;
pub use levels::{find_support_resistance, rolling_levels, volume_profile, VolumeBin};
pub use reversal::{detect_double_top, detect_head_shoulders, local_peaks, local_troughs};
pub use triangle::{detect_triangle, linear_slope};
pub use trend::{detect_breakout, detect_consolidation, identify_trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Uptrend,
    Downtrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Breakout {
    #[serde(rename = "BREAKOUT_UP")]
    Up,
    #[serde(rename = "BREAKOUT_DOWN")]
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartPattern {
    DoubleTop,
    HeadShouldersTop,
    HeadShouldersBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Triangle {
    #[serde(rename = "ASCENDING_TRIANGLE")]
    Ascending,
    #[serde(rename = "DESCENDING_TRIANGLE")]
    Descending,
    #[serde(rename = "SYMMETRIC_TRIANGLE")]
    Symmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Crossover {
    GoldenCross,
    DeathCross,
}

/// A support/resistance pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub support: f64,
    pub resistance: f64,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "UPTREND"),
            Trend::Downtrend => write!(f, "DOWNTREND"),
        }
    }
}

impl fmt::Display for Breakout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breakout::Up => write!(f, "BREAKOUT_UP"),
            Breakout::Down => write!(f, "BREAKOUT_DOWN"),
        }
    }
}

impl fmt::Display for ChartPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartPattern::DoubleTop => write!(f, "DOUBLE_TOP"),
            ChartPattern::HeadShouldersTop => write!(f, "HEAD_SHOULDERS_TOP"),
            ChartPattern::HeadShouldersBottom => write!(f, "HEAD_SHOULDERS_BOTTOM"),
        }
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Triangle::Ascending => write!(f, "ASCENDING_TRIANGLE"),
            Triangle::Descending => write!(f, "DESCENDING_TRIANGLE"),
            Triangle::Symmetric => write!(f, "SYMMETRIC_TRIANGLE"),
        }
    }
}

impl fmt::Display for Crossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crossover::GoldenCross => write!(f, "GOLDEN_CROSS"),
            Crossover::DeathCross => write!(f, "DEATH_CROSS"),
        }
    }
}

/// Lookbacks and thresholds for a full pattern scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub trend_window: usize,
    pub breakout_window: usize,
    pub consolidation_window: usize,
    pub consolidation_threshold: f64,
    pub reversal_window: usize,
    pub reversal_threshold: f64,
    pub triangle_window: usize,
    pub levels_window: usize,
    pub levels_bins: usize,
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub volume_bins: usize,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            trend_window: 20,
            breakout_window: 20,
            consolidation_window: 20,
            consolidation_threshold: 0.02,
            reversal_window: 20,
            reversal_threshold: 0.02,
            triangle_window: 20,
            levels_window: 20,
            levels_bins: 50,
            ma_fast: 20,
            ma_slow: 50,
            volume_bins: 20,
        }
    }
}

/// Every detector's answer for one series, as of the last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub trend: Option<Trend>,
    pub breakout: Option<Breakout>,
    pub consolidating: Option<bool>,
    pub chart_patterns: Vec<ChartPattern>,
    pub triangle: Option<Triangle>,
    pub support_resistance: Option<Levels>,
    pub range: Option<Levels>,
    pub crossover: Option<Crossover>,
    pub volume_profile: Vec<VolumeBin>,
}

impl PatternReport {
    pub fn scan(bars: &[Bar], params: &PatternParams) -> Self {
        let chart_patterns = [
            detect_double_top(bars, params.reversal_window, params.reversal_threshold),
            detect_head_shoulders(bars, params.reversal_window, params.reversal_threshold),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            trend: identify_trend(bars, params.trend_window),
            breakout: detect_breakout(bars, params.breakout_window),
            consolidating: detect_consolidation(
                bars,
                params.consolidation_window,
                params.consolidation_threshold,
            ),
            chart_patterns,
            triangle: detect_triangle(bars, params.triangle_window),
            support_resistance: find_support_resistance(
                bars,
                params.levels_window,
                params.levels_bins,
            ),
            range: rolling_levels(bars, params.levels_window),
            crossover: detect_ma_crossover(bars, params.ma_fast, params.ma_slow),
            volume_profile: volume_profile(bars, params.volume_bins),
        }
    }
}

/// The trailing `window` bars, or `None` when history is short or `window` is 0.
pub(crate) fn trailing(bars: &[Bar], window: usize) -> Option<&[Bar]> {
    if window == 0 || bars.len() < window {
        return None;
    }
    Some(&bars[bars.len() - window..])
}
