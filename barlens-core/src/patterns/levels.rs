//! Price levels: histogram support/resistance, rolling range, volume profile.

use serde::{Deserialize, Serialize};

use super::{trailing, Levels};
use crate::domain::Bar;

/// Volume traded at closes falling in `[price_low, price_high)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBin {
    pub price_low: f64,
    pub price_high: f64,
    pub volume: f64,
}

/// Equal-width bins over `[min, max]`, the last bin closed on the right.
/// A degenerate range widens to `[v - 0.5, v + 0.5]`.
struct Bins {
    lo: f64,
    width: f64,
    count: usize,
}

impl Bins {
    fn over(values: &[f64], count: usize) -> Option<Self> {
        if count == 0 || values.is_empty() {
            return None;
        }
        let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        Some(Self {
            lo,
            width: (hi - lo) / count as f64,
            count,
        })
    }

    fn index(&self, v: f64) -> usize {
        let raw = ((v - self.lo) / self.width).floor();
        (raw.max(0.0) as usize).min(self.count - 1)
    }

    fn edge(&self, i: usize) -> f64 {
        self.lo + self.width * i as f64
    }

    fn center(&self, i: usize) -> f64 {
        self.edge(i) + self.width / 2.0
    }
}

/// First index of the maximum count.
fn argmax(counts: &[u32]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

/// Histogram of the window's Highs and Lows: support is the center of the
/// fullest bin in the lower half, resistance of the fullest in the upper half.
pub fn find_support_resistance(bars: &[Bar], window: usize, bins: usize) -> Option<Levels> {
    if bins < 2 {
        return None;
    }
    let recent = trailing(bars, window)?;
    let prices: Vec<f64> = recent
        .iter()
        .flat_map(|b| [b.high, b.low])
        .filter(|v| !v.is_nan())
        .collect();
    let grid = Bins::over(&prices, bins)?;

    let mut counts = vec![0u32; bins];
    for &p in &prices {
        counts[grid.index(p)] += 1;
    }

    let half = bins / 2;
    let support_bin = argmax(&counts[..half]);
    let resistance_bin = half + argmax(&counts[half..]);

    Some(Levels {
        support: grid.center(support_bin),
        resistance: grid.center(resistance_bin),
    })
}

/// Lowest Low and highest High of the trailing window.
pub fn rolling_levels(bars: &[Bar], window: usize) -> Option<Levels> {
    let recent = trailing(bars, window)?;
    if recent.iter().any(|b| b.high.is_nan() || b.low.is_nan()) {
        return None;
    }
    let support = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let resistance = recent
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    Some(Levels {
        support,
        resistance,
    })
}

/// Volume summed per close-price bin over the whole series.
pub fn volume_profile(bars: &[Bar], bins: usize) -> Vec<VolumeBin> {
    let closes: Vec<f64> = bars
        .iter()
        .map(|b| b.close)
        .filter(|v| !v.is_nan())
        .collect();
    let Some(grid) = Bins::over(&closes, bins) else {
        return Vec::new();
    };

    let mut volume = vec![0.0; bins];
    for bar in bars.iter().filter(|b| !b.close.is_nan() && !b.volume.is_nan()) {
        volume[grid.index(bar.close)] += bar.volume;
    }

    volume
        .into_iter()
        .enumerate()
        .map(|(i, v)| VolumeBin {
            price_low: grid.edge(i),
            price_high: grid.edge(i + 1),
            volume: v,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, make_ohlc_bars};

    #[test]
    fn levels_pick_modal_bins() {
        // Lows cluster at 90, highs cluster at 110; a single excursion to 80 / 120.
        let mut ohlc = vec![(100.0, 110.0, 90.0, 100.0); 9];
        ohlc.push((100.0, 120.0, 80.0, 100.0));
        let bars = make_ohlc_bars(&ohlc);
        let levels = find_support_resistance(&bars, 10, 4).unwrap();
        // range [80, 120], width 10: bins [80,90) [90,100) [100,110) [110,120]
        assert_eq!(levels.support, 95.0);
        assert_eq!(levels.resistance, 115.0);
    }

    #[test]
    fn levels_need_window() {
        let bars = make_bars(&[1.0, 2.0]);
        assert_eq!(find_support_resistance(&bars, 20, 50), None);
    }

    #[test]
    fn levels_on_constant_prices() {
        let bars = make_ohlc_bars(&[(100.0, 100.0, 100.0, 100.0); 20]);
        let levels = find_support_resistance(&bars, 20, 50).unwrap();
        assert!(levels.support <= 100.0 && levels.resistance >= 100.0);
    }

    #[test]
    fn rolling_range() {
        let bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.5, 8.0, 9.0),
        ]);
        assert_eq!(
            rolling_levels(&bars, 2),
            Some(Levels {
                support: 8.0,
                resistance: 15.0
            })
        );
        assert_eq!(rolling_levels(&bars, 5), None);
    }

    #[test]
    fn profile_sums_volume() {
        let bars = make_bars(&[10.0, 10.0, 20.0, 20.0, 20.0]);
        let profile = volume_profile(&bars, 2);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].volume, 2000.0);
        assert_eq!(profile[1].volume, 3000.0);
        assert_eq!(profile[0].price_low, 10.0);
        assert_eq!(profile[1].price_high, 20.0);
    }

    #[test]
    fn profile_of_nothing() {
        assert!(volume_profile(&[], 10).is_empty());
        assert!(volume_profile(&make_bars(&[1.0]), 0).is_empty());
    }
}
