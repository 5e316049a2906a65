// =============================================================================
// Trend Strength — directional consistency of the last 10 prices
// =============================================================================
//
// Counts strictly rising and strictly falling steps across the trailing 10
// prices (9 steps) and scales |up - down| onto a 0..=10 integer score.
// Unchanged steps count for neither side.
// =============================================================================

/// Score returned when fewer than [`TREND_WINDOW`] prices are available.
pub const NEUTRAL_TREND_STRENGTH: u8 = 5;

const TREND_WINDOW: usize = 10;

/// Compute the trend strength of `prices` as an integer in `0..=10`.
pub fn calculate_trend_strength(prices: &[f64]) -> u8 {
    if prices.len() < TREND_WINDOW {
        return NEUTRAL_TREND_STRENGTH;
    }

    let recent = &prices[prices.len() - TREND_WINDOW..];
    let (up_moves, down_moves) = recent.windows(2).fold((0_i32, 0_i32), |(up, down), w| {
        if w[1] > w[0] {
            (up + 1, down)
        } else if w[1] < w[0] {
            (up, down + 1)
        } else {
            (up, down)
        }
    });

    let strength = (up_moves - down_moves).abs() as f64;
    let steps = (TREND_WINDOW - 1) as f64;
    (strength / steps * 10.0).round().min(10.0) as u8
}
