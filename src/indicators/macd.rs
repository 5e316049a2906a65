// =============================================================================
// MACD (Moving Average Convergence Divergence) — sub-window approximation
// =============================================================================
//
//   MACD line = EMA(12) - EMA(26) over the full series
//   Signal    = EMA(9) of a short synthetic MACD-line history
//   Histogram = MACD line - Signal
//
// The synthetic history is NOT the textbook running MACD series. It is built
// by recomputing EMA(12) - EMA(26) over up to 9 trailing sub-windows, each one
// ending one point earlier than the previous:
//
//   window_i = prices[max(0, n - 26 - i) .. n - i]     for i in 0..min(9, n)
//
// The resulting values are ordered newest-first (i = 0 first) before the
// EMA(9) is taken. Signals produced by earlier releases depend on this exact
// construction, so it must not be "fixed" to the textbook form.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::ema::calculate_ema;

const FAST_PERIOD: usize = 12;
const SLOW_PERIOD: usize = 26;
const SIGNAL_PERIOD: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Calculate the MACD triple for `prices`. Total over every input length.
pub fn calculate_macd(prices: &[f64]) -> Macd {
    let value = macd_line(prices);

    let n = prices.len();
    let history: Vec<f64> = (0..SIGNAL_PERIOD.min(n))
        .map(|i| {
            let start = n.saturating_sub(SLOW_PERIOD + i);
            macd_line(&prices[start..n - i])
        })
        .collect();

    let signal = calculate_ema(&history, SIGNAL_PERIOD);

    Macd {
        value,
        signal,
        histogram: value - signal,
    }
}

fn macd_line(prices: &[f64]) -> f64 {
    calculate_ema(prices, FAST_PERIOD) - calculate_ema(prices, SLOW_PERIOD)
}
