// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + 2σ)
// and a lower band (SMA - 2σ), all taken over the trailing `period` prices.
// σ is the population standard deviation of the same window.

use serde::{Deserialize, Serialize};

/// Default look-back.
pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;

/// Band width in standard deviations.
const NUM_STD: f64 = 2.0;

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    fn collapsed(value: f64) -> Self {
        Self {
            upper: value,
            middle: value,
            lower: value,
        }
    }
}

/// Calculate Bollinger Bands for `prices`.
///
/// When fewer than `period` prices are available all three bands collapse to
/// the simple average of whatever is there (`0.0` for an empty slice).
pub fn calculate_bollinger_bands(prices: &[f64], period: usize) -> BollingerBands {
    if period == 0 || prices.len() < period {
        if prices.is_empty() {
            return BollingerBands::collapsed(0.0);
        }
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;
        return BollingerBands::collapsed(avg);
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    BollingerBands {
        upper: middle + NUM_STD * std_dev,
        middle,
        lower: middle - NUM_STD * std_dev,
    }
}
