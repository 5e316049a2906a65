// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = (close_t - EMA_{t-1}) * multiplier + EMA_{t-1}
//
// The seed is the SMA of the first `period` prices; the recurrence then runs
// over every remaining price in order. Only the final value is returned.
// =============================================================================

/// Compute the EMA of `prices` for the look-back `period`.
///
/// # Edge cases
/// - `prices.len() < period` => the last price unchanged (no EMA is formed).
/// - Empty input => `0.0`.
/// - `period == 0` is treated as "not enough data" and also yields the last
///   price.
pub fn calculate_ema(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return prices.last().copied().unwrap_or(0.0);
    }

    let multiplier = 2.0 / (period + 1) as f64;
    let seed = prices[..period].iter().sum::<f64>() / period as f64;

    prices[period..]
        .iter()
        .fold(seed, |ema, &price| (price - ema) * multiplier + ema)
}
