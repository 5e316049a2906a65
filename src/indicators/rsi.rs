// =============================================================================
// Relative Strength Index (RSI) — simple trailing-window average
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an instrument is overbought or oversold.
//
// Step 1 — Take the trailing `period` deltas between consecutive prices.
// Step 2 — Sum positive deltas as gains and |negative deltas| as losses, then
//          divide each sum by `period`.
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// This is the plain-average form, not Wilder's smoothing: only the last
// `period` deltas contribute.
//
// Thresholds:  RSI > 70 => overbought,  RSI < 30 => oversold.
// =============================================================================

/// Neutral reading returned when there is not enough history.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Default look-back.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute the RSI of the most recent `period` deltas of `prices`.
///
/// # Edge cases
/// - `prices.len() < period + 1` => [`NEUTRAL_RSI`].
/// - `period == 0` => [`NEUTRAL_RSI`].
/// - Average loss of exactly zero => `100.0`, including a perfectly flat
///   window where the average gain is zero as well.
pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &prices[prices.len() - period - 1..];
    let (gains, losses) = window.windows(2).fold((0.0_f64, 0.0_f64), |(g, l), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l + change.abs())
        }
    });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
