//! Conservative long-only rules, evaluated independently on every bar.
//!
//! - entry: RSI < 30, MACD above signal, %K < 20, close above VWAP
//! - exit:  RSI > 70, close above the upper band, %K > 80, or MACD below signal
//! - stop:  close below the lower band, or a one-bar drop of more than 2 ATR
//!
//! Any comparison involving an undefined (NaN) value is false.

use serde::{Deserialize, Serialize};

use super::{SignalParams, RSI_OVERBOUGHT, RSI_OVERSOLD};
use crate::domain::{closes, Bar};
use crate::error::CoreResult;
use crate::indicators::{atr, bollinger, macd, rsi, stochastic, vwap};

const STOCH_OVERSOLD: f64 = 20.0;
const STOCH_OVERBOUGHT: f64 = 80.0;
/// One-bar drop, in ATRs, that trips the stop flag.
const GAP_STOP_ATR: f64 = 2.0;

/// Per-bar flags, aligned with the bars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub entry: Vec<bool>,
    pub exit: Vec<bool>,
    pub stop_loss: Vec<bool>,
}

impl SignalFrame {
    /// All-false frame of length `n`.
    pub fn flat(n: usize) -> Self {
        Self {
            entry: vec![false; n],
            exit: vec![false; n],
            stop_loss: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    /// True when all three flag vectors have the same length.
    pub fn is_aligned(&self) -> bool {
        self.exit.len() == self.entry.len() && self.stop_loss.len() == self.entry.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entry.iter().filter(|&&f| f).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exit.iter().filter(|&&f| f).count()
    }

    pub fn stop_count(&self) -> usize {
        self.stop_loss.iter().filter(|&&f| f).count()
    }
}

pub fn conservative_signals(bars: &[Bar], params: &SignalParams) -> CoreResult<SignalFrame> {
    let close = closes(bars);
    let rsi = rsi(&close, params.rsi_window)?;
    let macd = macd(&close, params.macd)?;
    let stoch = stochastic(bars, params.stochastic)?;
    let bands = bollinger(&close, params.bollinger)?;
    let atr = atr(bars, params.atr_window)?;
    let vwap = vwap(bars);

    let n = bars.len();
    let mut frame = SignalFrame::flat(n);
    for i in 0..n {
        let c = close[i];
        let macd_up = macd.macd[i] > macd.signal[i];
        let macd_down = macd.macd[i] < macd.signal[i];

        frame.entry[i] =
            rsi[i] < RSI_OVERSOLD && macd_up && stoch.k[i] < STOCH_OVERSOLD && c > vwap[i];

        frame.exit[i] = rsi[i] > RSI_OVERBOUGHT
            || c > bands.upper[i]
            || stoch.k[i] > STOCH_OVERBOUGHT
            || macd_down;

        let gap_down = i > 0 && c < close[i - 1] - GAP_STOP_ATR * atr[i];
        frame.stop_loss[i] = c < bands.lower[i] || gap_down;
    }
    Ok(frame)
}
