//! Conversions between bars and Polars frames.
//!
//! Timestamps travel as `timestamp_ms` (i64 milliseconds since the epoch) so
//! the layout does not depend on Polars' temporal logical types.

use barlens_core::domain::Bar;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use super::provider::DataError;

pub(crate) const TIMESTAMP_COL: &str = "timestamp_ms";
pub(crate) const BAR_COLUMNS: [&str; 6] = [TIMESTAMP_COL, "open", "high", "low", "close", "volume"];

fn parquet_err(context: &str) -> impl Fn(PolarsError) -> DataError + '_ {
    move |e| DataError::Parquet(format!("{context}: {e}"))
}

pub(crate) fn to_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

pub(crate) fn bars_to_frame(bars: &[Bar]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = bars.iter().map(|b| to_millis(b.timestamp)).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new(TIMESTAMP_COL.into(), timestamps),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(parquet_err("dataframe creation"))
}

pub(crate) fn frame_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    for name in BAR_COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::MissingColumn {
                column: name.to_string(),
                source_name: "parquet frame".to_string(),
            });
        }
    }

    let ts_ca = df
        .column(TIMESTAMP_COL)
        .and_then(|c| c.i64())
        .map_err(parquet_err("timestamp column type"))?;
    let f64_col = |name: &str| -> Result<Vec<f64>, DataError> {
        let ca = df
            .column(name)
            .and_then(|c| c.f64())
            .map_err(|e| DataError::Parquet(format!("{name} column type: {e}")))?;
        Ok(ca.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    };
    let opens = f64_col("open")?;
    let highs = f64_col("high")?;
    let lows = f64_col("low")?;
    let closes = f64_col("close")?;
    let volumes = f64_col("volume")?;

    let mut bars = Vec::with_capacity(df.height());
    for (i, ms) in ts_ca.iter().enumerate() {
        let timestamp = ms
            .and_then(from_millis)
            .ok_or_else(|| DataError::Parquet(format!("null or out-of-range timestamp at row {i}")))?;
        bars.push(Bar {
            timestamp,
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: volumes[i],
        });
    }
    Ok(bars)
}
