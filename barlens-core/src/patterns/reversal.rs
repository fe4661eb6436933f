//! Reversal patterns built on local extrema: double top and head-and-shoulders.
//!
//! A peak is a bar whose High is strictly greater than the two bars on either
//! side (centered 5-bar test); troughs mirror this on Low. The first two and
//! last two bars can never qualify. Extrema are located on the full series and
//! then restricted to the trailing `window`.

use super::{trailing, ChartPattern};
use crate::domain::{highs, lows, Bar};

const HALF_SPAN: usize = 2;

/// Indices of centered 5-bar strict local maxima.
pub fn local_peaks(values: &[f64]) -> Vec<usize> {
    local_extrema(values, |center, neighbour| center > neighbour)
}

/// Indices of centered 5-bar strict local minima.
pub fn local_troughs(values: &[f64]) -> Vec<usize> {
    local_extrema(values, |center, neighbour| center < neighbour)
}

fn local_extrema(values: &[f64], beats: fn(f64, f64) -> bool) -> Vec<usize> {
    if values.len() < 2 * HALF_SPAN + 1 {
        return Vec::new();
    }
    (HALF_SPAN..values.len() - HALF_SPAN)
        .filter(|&i| {
            let center = values[i];
            (i - HALF_SPAN..=i + HALF_SPAN)
                .filter(|&j| j != i)
                .all(|j| beats(center, values[j]))
        })
        .collect()
}

/// Prices at the extrema that fall inside the last `window` bars.
fn in_window(values: &[f64], indices: Vec<usize>, window: usize) -> Vec<f64> {
    let start = values.len() - window;
    indices
        .into_iter()
        .filter(|&i| i >= start)
        .map(|i| values[i])
        .collect()
}

/// Last two peaks within `threshold` of each other, relative to their mean.
pub fn detect_double_top(bars: &[Bar], window: usize, threshold: f64) -> Option<ChartPattern> {
    trailing(bars, window)?;
    let high = highs(bars);
    let peaks = in_window(&high, local_peaks(&high), window);
    let [.., first, second] = peaks.as_slice() else {
        return None;
    };

    let mean = (first + second) / 2.0;
    if (second - first).abs() / mean < threshold {
        Some(ChartPattern::DoubleTop)
    } else {
        None
    }
}

/// Head-and-shoulders from the last three peaks and last two troughs.
///
/// Top: the middle peak is the highest and the outer peaks lie within
/// `threshold` of the three-peak mean. Bottom mirrors this on troughs.
pub fn detect_head_shoulders(
    bars: &[Bar],
    window: usize,
    threshold: f64,
) -> Option<ChartPattern> {
    trailing(bars, window)?;
    let high = highs(bars);
    let low = lows(bars);
    let peaks = in_window(&high, local_peaks(&high), window);
    let troughs = in_window(&low, local_troughs(&low), window);

    if let (Some(p), Some(_)) = (last_n::<3>(&peaks), last_n::<2>(&troughs)) {
        if p[1] > p[0] && p[1] > p[2] && shoulders_match(p, threshold) {
            return Some(ChartPattern::HeadShouldersTop);
        }
    }
    if let (Some(t), Some(_)) = (last_n::<3>(&troughs), last_n::<2>(&peaks)) {
        if t[1] < t[0] && t[1] < t[2] && shoulders_match(t, threshold) {
            return Some(ChartPattern::HeadShouldersBottom);
        }
    }
    None
}

fn last_n<const N: usize>(values: &[f64]) -> Option<[f64; N]> {
    let tail = values.get(values.len().checked_sub(N)?..)?;
    tail.try_into().ok()
}

fn shoulders_match(points: [f64; 3], threshold: f64) -> bool {
    let mean = points.iter().sum::<f64>() / 3.0;
    (points[0] - points[2]).abs() / mean < threshold
}
