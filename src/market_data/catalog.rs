// =============================================================================
// Instrument catalog
// =============================================================================
//
// The fixed universe the desk analyses, plus the per-instrument price profile
// the synthetic feed draws from.

use serde::{Deserialize, Serialize};

/// Every instrument offered by the desk, in display order.
pub const MARKETS: &[&str] = &[
    // Major forex
    "EUR/USD", "USD/JPY", "GBP/USD", "USD/CHF", "AUD/USD", "NZD/USD", "USD/CAD",
    "EUR/USD OTC", "USD/JPY OTC", "GBP/USD OTC", "USD/CHF OTC", "AUD/USD OTC", "NZD/USD OTC",
    "USD/CAD OTC",
    // Minor forex
    "EUR/GBP", "EUR/JPY", "EUR/CHF", "EUR/AUD", "EUR/CAD", "EUR/NZD",
    "GBP/JPY", "GBP/CHF", "GBP/AUD", "GBP/CAD", "GBP/NZD",
    "AUD/JPY", "AUD/NZD", "AUD/CAD", "AUD/CHF",
    "CAD/JPY", "CAD/CHF", "CHF/JPY", "NZD/JPY", "NZD/CAD", "NZD/CHF",
    "EUR/GBP OTC", "EUR/JPY OTC", "EUR/CHF OTC", "EUR/AUD OTC", "EUR/CAD OTC", "EUR/NZD OTC",
    "GBP/JPY OTC", "GBP/CHF OTC", "GBP/AUD OTC", "GBP/CAD OTC", "GBP/NZD OTC",
    "AUD/JPY OTC", "AUD/NZD OTC", "AUD/CAD OTC", "AUD/CHF OTC",
    "CAD/JPY OTC", "CAD/CHF OTC", "CHF/JPY OTC", "NZD/JPY OTC", "NZD/CAD OTC", "NZD/CHF OTC",
    // Exotic forex
    "USD/TRY", "USD/MXN", "USD/ZAR", "USD/BRL", "USD/RUB", "USD/INR", "USD/NGN",
    "USD/PLN", "USD/CZK", "USD/HUF", "USD/SGD", "USD/HKD", "USD/THB", "USD/IDR", "USD/PHP",
    "USD/NOK", "USD/SEK", "USD/DKK",
    "EUR/TRY", "EUR/NOK", "EUR/SEK", "EUR/PLN", "EUR/CZK", "EUR/HUF", "EUR/RUB", "EUR/ZAR",
    "GBP/TRY", "GBP/NOK", "GBP/SEK", "GBP/PLN", "GBP/ZAR",
    "USD/TRY OTC", "USD/MXN OTC", "USD/ZAR OTC", "USD/BRL OTC", "USD/RUB OTC", "USD/INR OTC",
    "USD/NGN OTC", "USD/PLN OTC", "USD/CZK OTC", "USD/HUF OTC", "USD/SGD OTC", "USD/HKD OTC",
    "USD/THB OTC", "USD/IDR OTC", "USD/PHP OTC", "USD/NOK OTC", "USD/SEK OTC", "USD/DKK OTC",
    "EUR/TRY OTC", "EUR/NOK OTC", "EUR/SEK OTC", "EUR/PLN OTC", "EUR/CZK OTC", "EUR/HUF OTC",
    "EUR/RUB OTC", "EUR/ZAR OTC",
    "GBP/TRY OTC", "GBP/NOK OTC", "GBP/SEK OTC", "GBP/PLN OTC", "GBP/ZAR OTC",
    // Crypto
    "BTC/USD", "ETH/USD", "XRP/USD", "LTC/USD", "BCH/USD", "ADA/USD", "DOT/USD", "LINK/USD",
    "BNB/USD", "SOL/USD", "MATIC/USD", "AVAX/USD", "UNI/USD", "ATOM/USD", "XLM/USD", "DOGE/USD",
    "SHIB/USD",
    "BTC/USD OTC", "ETH/USD OTC", "XRP/USD OTC", "LTC/USD OTC", "BCH/USD OTC", "ADA/USD OTC",
    "DOT/USD OTC", "LINK/USD OTC", "BNB/USD OTC", "SOL/USD OTC", "MATIC/USD OTC",
    "AVAX/USD OTC", "DOGE/USD OTC",
    // Commodities
    "XAU/USD", "XAG/USD", "XPT/USD", "XPD/USD", "WTI/USD", "BRT/USD", "GAS/USD", "COP/USD",
    "XAU/USD OTC", "XAG/USD OTC", "WTI/USD OTC",
    // Indices
    "SPX500", "NAS100", "DJI30", "UK100", "GER40", "FRA40", "ESP35", "ITA40", "JPN225",
    "HKG50", "AUS200",
    "SPX500 OTC", "NAS100 OTC", "DJI30 OTC", "UK100 OTC", "GER40 OTC", "FRA40 OTC",
    "JPN225 OTC",
];

/// Reference price and per-tick volatility for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketProfile {
    pub base_price: f64,
    pub volatility: f64,
}

impl MarketProfile {
    const fn new(base_price: f64, volatility: f64) -> Self {
        Self {
            base_price,
            volatility,
        }
    }
}

const DEFAULT_PROFILE: MarketProfile = MarketProfile::new(1.0, 0.01);

/// Substring rules, first match wins.
const PROFILE_RULES: &[(&[&str], MarketProfile)] = &[
    (&["BTC"], MarketProfile::new(65_000.0, 500.0)),
    (&["ETH"], MarketProfile::new(3_200.0, 100.0)),
    (&["XRP", "ADA", "DOGE"], MarketProfile::new(0.5, 0.02)),
    (&["LTC", "BCH"], MarketProfile::new(200.0, 10.0)),
    (&["SOL", "AVAX", "MATIC"], MarketProfile::new(100.0, 5.0)),
    (&["BNB", "DOT", "LINK"], MarketProfile::new(300.0, 15.0)),
    (&["SHIB"], MarketProfile::new(0.000_01, 0.000_001)),
    (&["XAU"], MarketProfile::new(2_000.0, 20.0)),
    (&["XAG"], MarketProfile::new(25.0, 1.0)),
    (&["XPT"], MarketProfile::new(950.0, 10.0)),
    (&["XPD"], MarketProfile::new(1_050.0, 15.0)),
    (&["WTI", "BRT"], MarketProfile::new(80.0, 2.0)),
    (&["GAS"], MarketProfile::new(3.5, 0.2)),
    (&["COP"], MarketProfile::new(4.2, 0.15)),
    (&["SPX"], MarketProfile::new(5_000.0, 50.0)),
    (&["NAS"], MarketProfile::new(16_000.0, 150.0)),
    (&["DJI"], MarketProfile::new(38_000.0, 300.0)),
    (&["UK100"], MarketProfile::new(7_500.0, 70.0)),
    (&["GER"], MarketProfile::new(17_000.0, 150.0)),
    (&["FRA"], MarketProfile::new(7_300.0, 60.0)),
    (&["JPN"], MarketProfile::new(33_000.0, 300.0)),
    (&["JPY"], MarketProfile::new(150.0, 1.0)),
    (&["TRY"], MarketProfile::new(32.0, 0.5)),
    (&["MXN"], MarketProfile::new(17.0, 0.3)),
    (&["BRL"], MarketProfile::new(5.0, 0.1)),
    (&["RUB"], MarketProfile::new(92.0, 1.5)),
    (&["INR"], MarketProfile::new(83.0, 0.8)),
    (&["NGN"], MarketProfile::new(1_500.0, 15.0)),
    (&["PLN"], MarketProfile::new(4.0, 0.08)),
    (&["CZK"], MarketProfile::new(23.0, 0.4)),
    (&["HUF"], MarketProfile::new(360.0, 5.0)),
    (&["THB"], MarketProfile::new(35.0, 0.5)),
    (&["IDR"], MarketProfile::new(15_700.0, 150.0)),
    (&["PHP"], MarketProfile::new(56.0, 0.8)),
    (&["ZAR"], MarketProfile::new(18.0, 0.3)),
    (&["NOK", "SEK", "DKK"], MarketProfile::new(10.0, 0.2)),
    (&["SGD"], MarketProfile::new(1.35, 0.02)),
    (&["HKD"], MarketProfile::new(7.8, 0.1)),
];

/// Price profile for `symbol`. Unknown symbols get the `1.0 / 0.01` default.
pub fn profile_for(symbol: &str) -> MarketProfile {
    PROFILE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| symbol.contains(n)))
        .map(|(_, profile)| *profile)
        .unwrap_or(DEFAULT_PROFILE)
}

/// Decimal places used when quoting `symbol`.
pub fn price_decimals(symbol: &str) -> u32 {
    if symbol.contains("BTC") || symbol.contains("ETH") {
        2
    } else {
        5
    }
}

pub fn is_known_market(symbol: &str) -> bool {
    MARKETS.contains(&symbol)
}
