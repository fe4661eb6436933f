//! Canonical bar order: sorted, one bar per timestamp, no gaps in prices.

use barlens_core::domain::{Bar, BarSeries};
use polars::prelude::*;
use tracing::{debug, warn};

use super::frame::{bars_to_frame, frame_to_bars, TIMESTAMP_COL};
use super::provider::DataError;

/// What canonicalization changed, for logs and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalStats {
    pub input_rows: usize,
    pub duplicates_dropped: usize,
    pub prices_filled: usize,
    pub leading_rows_dropped: usize,
    /// Bars whose high/low envelope does not contain open and close, or with negative volume.
    pub invalid_dropped: usize,
}

/// Sort by timestamp and drop duplicate timestamps, keeping the first.
pub fn sort_dedupe(df: LazyFrame) -> LazyFrame {
    df.sort(
        [TIMESTAMP_COL],
        SortMultipleOptions::default()
            .with_order_descending(false)
            .with_maintain_order(true),
    )
    .unique_stable(
        Some(vec![TIMESTAMP_COL.into()]),
        UniqueKeepStrategy::First,
    )
}

/// Turn raw source rows into a `BarSeries`.
///
/// 1. sort ascending by timestamp (stable, so source order breaks ties)
/// 2. drop duplicate timestamps, keeping the first occurrence
/// 3. forward-fill NaN prices from the previous bar
/// 4. drop leading bars whose prices cannot be filled
/// 5. drop bars that fail the high/low envelope check
///
/// # Errors
/// `NoData` when nothing is left.
pub fn canonicalize(symbol: &str, bars: Vec<Bar>) -> Result<(BarSeries, CanonicalStats), DataError> {
    let mut stats = CanonicalStats {
        input_rows: bars.len(),
        ..Default::default()
    };
    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
        });
    }

    let df = sort_dedupe(bars_to_frame(&bars)?.lazy())
        .collect()
        .map_err(|e| DataError::Parquet(format!("canonicalize: {e}")))?;
    let sorted = frame_to_bars(&df)?;
    stats.duplicates_dropped = bars.len() - sorted.len();
    if stats.duplicates_dropped > 0 {
        warn!(
            symbol,
            dropped = stats.duplicates_dropped,
            "dropped bars with duplicate timestamps"
        );
    }

    let mut filled = forward_fill(sorted, &mut stats);
    let before = filled.len();
    filled.retain(Bar::is_sane);
    stats.invalid_dropped = before - filled.len();
    if stats.invalid_dropped > 0 {
        warn!(
            symbol,
            dropped = stats.invalid_dropped,
            "dropped bars failing the high/low envelope check"
        );
    }
    if filled.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
        });
    }
    debug!(symbol, bars = filled.len(), ?stats, "canonicalized");

    let series = BarSeries::new(symbol, filled)
        .map_err(|e| DataError::InvalidParameter(e.to_string()))?;
    Ok((series, stats))
}

fn forward_fill(bars: Vec<Bar>, stats: &mut CanonicalStats) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for mut bar in bars {
        if let Some(prev) = out.last() {
            for (field, prev_value) in [
                (&mut bar.open, prev.open),
                (&mut bar.high, prev.high),
                (&mut bar.low, prev.low),
                (&mut bar.close, prev.close),
            ] {
                if field.is_nan() {
                    *field = prev_value;
                    stats.prices_filled += 1;
                }
            }
        } else if [bar.open, bar.high, bar.low, bar.close]
            .iter()
            .any(|v| v.is_nan())
        {
            stats.leading_rows_dropped += 1;
            continue;
        }
        if bar.volume.is_nan() {
            bar.volume = 0.0;
        }
        out.push(bar);
    }
    out
}
