// =============================================================================
// Display boundary: rounding and timezone-aware rendering
// =============================================================================
//
// The engine keeps full precision and UTC timestamps. Everything user-facing
// is rounded and localised here, at the edge.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::indicators::Indicators;
use crate::market_data::price_decimals;
use crate::signal_desk::TradeSignal;
use crate::types::{Direction, TimeFrame};

/// The offsets a user may pick in the desk settings, west to east.
pub const TIMEZONES: [&str; 25] = [
    "UTC-12:00", "UTC-11:00", "UTC-10:00", "UTC-09:00", "UTC-08:00", "UTC-07:00",
    "UTC-06:00", "UTC-05:00", "UTC-04:00", "UTC-03:00", "UTC-02:00", "UTC-01:00",
    "UTC+00:00", "UTC+01:00", "UTC+02:00", "UTC+03:00", "UTC+04:00", "UTC+05:00",
    "UTC+06:00", "UTC+07:00", "UTC+08:00", "UTC+09:00", "UTC+10:00", "UTC+11:00",
    "UTC+12:00",
];

/// Round half away from zero to `decimals` places. Non-finite input is
/// returned unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn round_confidence(confidence: f64) -> f64 {
    round_to(confidence, 1)
}

/// Render `price` with the instrument's quote precision.
pub fn format_price(symbol: &str, price: f64) -> String {
    format!("{:.*}", price_decimals(symbol) as usize, price)
}

/// Parse `"UTC"`, `"UTC+03:00"`, `"UTC-5"` or `"UTC+05:30"` into a fixed offset.
pub fn parse_utc_offset(timezone: &str) -> Result<FixedOffset> {
    let trimmed = timezone.trim();
    let rest = trimmed
        .strip_prefix("UTC")
        .with_context(|| format!("timezone '{timezone}' must start with UTC"))?;
    if rest.is_empty() {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    let (sign, body) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => bail!("timezone '{timezone}' is missing a +/- sign"),
    };

    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None => (body, "0"),
    };
    let hours: i32 = hours
        .parse()
        .with_context(|| format!("invalid hours in timezone '{timezone}'"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("invalid minutes in timezone '{timezone}'"))?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        bail!("timezone '{timezone}' is out of range");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("timezone '{timezone}' is out of range"))
}

/// Wall-clock `HH:MM:SS` of `at` in `offset`.
pub fn format_time_in(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M:%S").to_string()
}

// =============================================================================
// SignalView
// =============================================================================

/// User-facing projection of a [`TradeSignal`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalView {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub time_frame: TimeFrame,
    pub confidence: f64,
    /// `HH:MM:SS` in the configured timezone.
    pub entry_time: String,
    pub entry_timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub target_price: f64,
    pub reason: String,
    pub confirmations: Vec<String>,
    pub indicators: Indicators,
    pub created_at: DateTime<Utc>,
}

impl SignalView {
    pub fn new(trade: &TradeSignal, offset: FixedOffset) -> Self {
        let decimals = price_decimals(&trade.symbol);
        let signal = &trade.signal;
        Self {
            id: trade.id.clone(),
            symbol: trade.symbol.clone(),
            direction: signal.direction,
            time_frame: signal.time_frame,
            confidence: round_confidence(signal.confidence),
            entry_time: format_time_in(signal.entry_time, offset),
            entry_timestamp: signal.entry_time,
            current_price: round_to(signal.current_price, decimals),
            target_price: round_to(signal.target_price, decimals),
            reason: signal.reason.clone(),
            confirmations: signal.confirmations.clone(),
            indicators: signal.indicators.clone(),
            created_at: trade.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalClassifier;
    use chrono::TimeZone;

    #[test]
    fn rounding() {
        assert_eq!(round_to(1.234_567, 2), 1.23);
        assert_eq!(round_to(1.235, 1), 1.2);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(65_123.456, 2), 65_123.46);
        assert_eq!(round_confidence(86.66), 86.7);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn prices_render_with_instrument_precision() {
        assert_eq!(format_price("BTC/USD", 65_000.5), "65000.50");
        assert_eq!(format_price("EUR/USD", 1.1), "1.10000");
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("UTC+03:00").unwrap().local_minus_utc(), 3 * 3600);
        assert_eq!(parse_utc_offset("UTC-12:00").unwrap().local_minus_utc(), -12 * 3600);
        assert_eq!(parse_utc_offset("UTC+05:30").unwrap().local_minus_utc(), 5 * 3600 + 1800);
        assert_eq!(parse_utc_offset("UTC-5").unwrap().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn every_settings_zone_parses() {
        for (i, tz) in TIMEZONES.iter().enumerate() {
            let offset = parse_utc_offset(tz).unwrap();
            assert_eq!(offset.local_minus_utc(), (i as i32 - 12) * 3600);
        }
    }

    #[test]
    fn bad_offsets_are_rejected() {
        for tz in ["GMT+1", "UTC3", "UTC+", "UTC+25:00", "UTC+01:75", "UTC+ab:00"] {
            assert!(parse_utc_offset(tz).is_err(), "{tz} should be rejected");
        }
    }

    #[test]
    fn entry_time_is_localised() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 22, 15, 9).unwrap();
        let local = |tz: &str| format_time_in(at, parse_utc_offset(tz).unwrap());
        assert_eq!(local("UTC+00:00"), "22:15:09");
        assert_eq!(local("UTC+03:00"), "01:15:09");
        assert_eq!(local("UTC-05:00"), "17:15:09");
    }

    #[test]
    fn signal_view_rounds_at_the_edge() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 2, 0).unwrap();
        let signal = SignalClassifier::default()
            .classify(&vec![1.0; 50], 1.0, at)
            .unwrap();
        let trade = TradeSignal {
            id: "EUR/USD-1704110400000".to_string(),
            symbol: "EUR/USD".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            signal,
        };
        let view = SignalView::new(&trade, parse_utc_offset("UTC+02:00").unwrap());
        assert_eq!(view.entry_time, "14:02:00");
        assert_eq!(view.confidence, 70.0);
        assert_eq!(view.target_price, 1.002);
        assert_eq!(view.direction, Direction::Up);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["direction"], "up");
        assert_eq!(json["time_frame"], "1");
    }
}
