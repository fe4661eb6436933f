//! Bar and BarSeries: the input every stage of the pipeline consumes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One OHLCV record. Intraday intervals are supported, so the key is a full timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price or volume field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// High/low envelope check.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }
}

/// Time-ordered bars for one symbol.
///
/// Timestamps must be strictly increasing. Deduplication is the caller's job;
/// `new` only refuses input that would break index alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> CoreResult<Self> {
        if let Some(i) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(CoreError::InvalidParameter(format!(
                "timestamps must be strictly increasing (bar {} at {} follows {})",
                i + 1,
                bars[i + 1].timestamp,
                bars[i].timestamp
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        opens(&self.bars)
    }

    pub fn highs(&self) -> Vec<f64> {
        highs(&self.bars)
    }

    pub fn lows(&self) -> Vec<f64> {
        lows(&self.bars)
    }

    pub fn closes(&self) -> Vec<f64> {
        closes(&self.bars)
    }

    pub fn volumes(&self) -> Vec<f64> {
        volumes(&self.bars)
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

impl AsRef<[Bar]> for BarSeries {
    fn as_ref(&self) -> &[Bar] {
        &self.bars
    }
}

// ── Column extraction ───────────────────────────────────────────────
//
// The indicator math runs on contiguous f64 buffers; these pull one column out.

pub fn opens(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.open).collect()
}

pub fn highs(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.high).collect()
}

pub fn lows(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.low).collect()
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
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

    fn sample_bar(day: u32) -> Bar {
        Bar::new(ts(day), 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar(2).is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar(2);
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        let err = BarSeries::new("SPY", vec![sample_bar(2), sample_bar(2)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter(_)));
    }

    #[test]
    fn series_rejects_descending_timestamps() {
        assert!(BarSeries::new("SPY", vec![sample_bar(3), sample_bar(2)]).is_err());
    }

    #[test]
    fn series_columns_are_aligned() {
        let series = BarSeries::new("SPY", vec![sample_bar(2), sample_bar(3)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![103.0, 103.0]);
        assert_eq!(series.highs(), vec![105.0, 105.0]);
        assert_eq!(series.timestamps(), vec![ts(2), ts(3)]);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar(2);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
