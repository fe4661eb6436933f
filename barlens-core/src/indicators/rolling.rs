//! Rolling-window building blocks over contiguous `f64` buffers.
//!
//! Semantics follow the usual dataframe convention: an output is defined only
//! once `window` observations are available, and any NaN inside the window
//! makes that output NaN.

use std::collections::VecDeque;

/// Trailing arithmetic mean. Running sum, O(n).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }

        if i >= window {
            let leaving = values[i - window];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= window && nan_count == 0 {
            out[i] = sum / window as f64;
        }
    }
    out
}

/// Trailing sample standard deviation (ddof = 1). Running sums, O(n).
///
/// Sums are taken of `value - shift`, where `shift` is the first defined
/// value, to limit cancellation. A window whose values are all equal yields
/// exactly 0.0.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window {
        return out;
    }
    let Some(shift) = values.iter().copied().find(|v| !v.is_nan()) else {
        return out;
    };

    let count = window as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut nan_count = 0usize;
    // length of the run of identical values ending at i
    let mut equal_run = 0usize;

    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nan_count += 1;
            equal_run = 0;
        } else {
            let d = entering - shift;
            sum += d;
            sum_sq += d * d;
            equal_run = if i > 0 && values[i - 1] == entering {
                equal_run + 1
            } else {
                1
            };
        }

        if i >= window {
            let leaving = values[i - window];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                let d = leaving - shift;
                sum -= d;
                sum_sq -= d * d;
            }
        }

        if i + 1 >= window && nan_count == 0 {
            out[i] = if equal_run >= window {
                0.0
            } else {
                let variance = (sum_sq - sum * sum / count) / (count - 1.0);
                variance.max(0.0).sqrt()
            };
        }
    }
    out
}

/// Trailing maximum (monotonic deque, O(n)).
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, |kept, incoming| kept > incoming)
}

/// Trailing minimum (monotonic deque, O(n)).
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, |kept, incoming| kept < incoming)
}

/// `dominates(a, b)` is true when `a` should stay ahead of a newer `b` in the deque.
fn rolling_extreme(values: &[f64], window: usize, dominates: fn(f64, f64) -> bool) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }

    let mut deque: VecDeque<usize> = VecDeque::with_capacity(window);
    let mut nan_count = 0usize;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            nan_count += 1;
        } else {
            while let Some(&back) = deque.back() {
                if dominates(values[back], v) {
                    break;
                }
                deque.pop_back();
            }
            deque.push_back(i);
        }

        if i >= window && values[i - window].is_nan() {
            nan_count -= 1;
        }
        while let Some(&front) = deque.front() {
            if front + window <= i {
                deque.pop_front();
            } else {
                break;
            }
        }

        if i + 1 >= window && nan_count == 0 {
            if let Some(&front) = deque.front() {
                out[i] = values[front];
            }
        }
    }
    out
}

/// First difference; index 0 is NaN.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = values[i] - values[i - 1];
    }
    out
}

/// Last element of a series, if it is defined.
pub fn last_defined(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| !v.is_nan())
}
