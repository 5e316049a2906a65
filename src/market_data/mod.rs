pub mod catalog;
pub mod feed;

pub use catalog::{is_known_market, price_decimals, MARKETS};
pub use feed::{MarketQuote, SyntheticFeed, DEFAULT_TREND_LENGTH};
