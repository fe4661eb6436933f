//! Deterministic synthetic bars for offline demos and tests.
//!
//! Bars are a geometric random walk seeded from BLAKE3(seed, symbol), so the
//! same inputs always produce the same series regardless of thread order.
//! Anything built on them is tagged `DataOrigin::Synthetic`.

use barlens_core::domain::Bar;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use super::provider::{BarSource, DataError, DataOrigin, FetchRequest, Interval};

const START_PRICE: f64 = 100.0;
const MAX_STEP_RETURN: f64 = 0.03;
const MAX_WICK: f64 = 0.01;

/// Derive a per-symbol RNG from a master seed.
fn rng_for(seed: u64, symbol: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

fn anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// `n` daily bars (weekdays only) for `symbol`.
pub fn synthetic_bars(symbol: &str, n: usize, seed: u64) -> Vec<Bar> {
    synthetic_bars_at(symbol, n, seed, Interval::OneDay)
}

/// `n` bars spaced by `interval`. Daily and intraday series skip weekends.
pub fn synthetic_bars_at(symbol: &str, n: usize, seed: u64, interval: Interval) -> Vec<Bar> {
    let mut rng = rng_for(seed, symbol);
    let step = interval.step();
    let skip_weekends = step <= chrono::Duration::days(1);

    let mut bars = Vec::with_capacity(n);
    let mut price = START_PRICE;
    let mut current = anchor();
    while bars.len() < n {
        if skip_weekends && matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += step;
            continue;
        }

        let step_return: f64 = rng.gen_range(-MAX_STEP_RETURN..MAX_STEP_RETURN);
        let open = price;
        let close = price * (1.0 + step_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..MAX_WICK));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..MAX_WICK));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        bars.push(Bar::new(current, open, high, low, close, volume));
        price = close;
        current += step;
    }
    bars
}

/// A `BarSource` that makes bars up. Every fetch logs a warning.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    len: usize,
}

impl SyntheticSource {
    pub fn new(seed: u64, len: usize) -> Self {
        Self { seed, len }
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn origin(&self) -> DataOrigin {
        DataOrigin::Synthetic
    }

    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        request.validate()?;
        warn!(
            symbol = %request.symbol,
            bars = self.len,
            "generating synthetic data; results are not market data"
        );
        Ok(synthetic_bars_at(
            &request.symbol,
            self.len,
            self.seed,
            request.interval,
        ))
    }
}
