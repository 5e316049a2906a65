// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the signal
// classifier. Every function is total: short or empty inputs fall back to a
// documented neutral value instead of failing, and identical input always
// yields bit-identical output.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod support_resistance;
pub mod trend_strength;

use serde::{Deserialize, Serialize};

pub use bollinger::{calculate_bollinger_bands, BollingerBands, DEFAULT_BOLLINGER_PERIOD};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, Macd};
pub use rsi::{calculate_rsi, DEFAULT_RSI_PERIOD};
pub use support_resistance::{find_support_resistance, SupportResistance};
pub use trend_strength::calculate_trend_strength;

/// Minimum series length for a full indicator snapshot.
pub const MIN_HISTORY: usize = 20;

/// Snapshot of every indicator computed from one price series at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub rsi: f64,
    pub macd: Macd,
    pub bollinger_bands: BollingerBands,
    pub ema20: f64,
    pub ema50: f64,
    pub ema200: f64,
    /// Integer score in `0..=10`.
    pub trend_strength: u8,
    pub support_level: f64,
    pub resistance_level: f64,
}

/// Compute the full indicator snapshot, or `None` when `prices` holds fewer
/// than [`MIN_HISTORY`] points.
///
/// The 200-period EMA is taken over `min(200, len)` so that a short synthetic
/// window still produces a long-horizon average.
pub fn calculate_indicators(prices: &[f64]) -> Option<Indicators> {
    if prices.len() < MIN_HISTORY {
        return None;
    }

    let SupportResistance {
        support,
        resistance,
    } = find_support_resistance(prices);

    Some(Indicators {
        rsi: calculate_rsi(prices, DEFAULT_RSI_PERIOD),
        macd: calculate_macd(prices),
        bollinger_bands: calculate_bollinger_bands(prices, DEFAULT_BOLLINGER_PERIOD),
        ema20: calculate_ema(prices, 20),
        ema50: calculate_ema(prices, 50),
        ema200: calculate_ema(prices, prices.len().min(200)),
        trend_strength: calculate_trend_strength(prices),
        support_level: support,
        resistance_level: resistance,
    })
}
