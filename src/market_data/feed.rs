// =============================================================================
// Synthetic market feed
// =============================================================================
//
// Stand-in price source for the desk: every refresh draws a fresh quote and a
// short random-walk history per instrument from its catalog profile. The RNG
// is injected so tests can seed it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalog::{price_decimals, profile_for};
use crate::display::round_to;

pub const DEFAULT_TREND_LENGTH: usize = 50;

/// Upward drift of the random walk: steps are drawn from `u - TREND_BIAS`.
const TREND_BIAS: f64 = 0.48;

/// One instrument's latest quote plus its recent price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub percent_change: f64,
    pub timestamp: DateTime<Utc>,
    /// Oldest first.
    pub trend: Vec<f64>,
    pub volume: u64,
}

pub struct SyntheticFeed<R: Rng> {
    rng: R,
    trend_length: usize,
}

impl<R: Rng> SyntheticFeed<R> {
    pub fn new(rng: R, trend_length: usize) -> Self {
        Self { rng, trend_length }
    }

    /// Points of history drawn for quotes from now on.
    pub fn set_trend_length(&mut self, trend_length: usize) {
        self.trend_length = trend_length;
    }

    /// Draw a fresh quote for `symbol` stamped at `now`.
    pub fn quote(&mut self, symbol: &str, now: DateTime<Utc>) -> MarketQuote {
        let profile = profile_for(symbol);
        let decimals = price_decimals(symbol);

        let change = (self.rng.gen::<f64>() - 0.5) * profile.volatility;
        let price = profile.base_price + change;
        let percent_change = change / profile.base_price * 100.0;

        let mut level = profile.base_price;
        let trend = (0..self.trend_length)
            .map(|_| {
                level += (self.rng.gen::<f64>() - TREND_BIAS) * profile.volatility * 0.5;
                level
            })
            .collect();

        MarketQuote {
            symbol: symbol.to_string(),
            price: round_to(price, decimals),
            change: round_to(change, decimals),
            percent_change: round_to(percent_change, 2),
            timestamp: now,
            trend,
            volume: self.rng.gen_range(500_000..1_500_000),
        }
    }

    /// One quote per symbol, in the order given.
    pub fn snapshot<S: AsRef<str>>(&mut self, symbols: &[S], now: DateTime<Utc>) -> Vec<MarketQuote> {
        symbols
            .iter()
            .map(|symbol| self.quote(symbol.as_ref(), now))
            .collect()
    }
}
