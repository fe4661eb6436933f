//! Triangle classification from the least-squares slopes of High and Low.

use super::{trailing, Triangle};
use crate::domain::{highs, lows, Bar};

/// Slopes inside `±SLOPE_THRESHOLD` (price units per bar) count as flat.
pub const SLOPE_THRESHOLD: f64 = 0.001;

/// Ordinary least-squares slope of `values` against `0..len`.
///
/// `None` for fewer than two points or when any value is NaN.
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    Some(num / den)
}

/// Ascending (flat highs, rising lows), then descending (falling highs, flat
/// lows), then symmetric (slopes cancel). First match wins.
pub fn detect_triangle(bars: &[Bar], window: usize) -> Option<Triangle> {
    let recent = trailing(bars, window)?;
    let high_slope = linear_slope(&highs(recent))?;
    let low_slope = linear_slope(&lows(recent))?;

    if high_slope.abs() < SLOPE_THRESHOLD && low_slope > SLOPE_THRESHOLD {
        Some(Triangle::Ascending)
    } else if high_slope < -SLOPE_THRESHOLD && low_slope.abs() < SLOPE_THRESHOLD {
        Some(Triangle::Descending)
    } else if (high_slope + low_slope).abs() < SLOPE_THRESHOLD {
        Some(Triangle::Symmetric)
    } else {
        None
    }
}
