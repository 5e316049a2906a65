// =============================================================================
// Signal Classifier — multi-indicator confirmation voting
// =============================================================================
//
// Turns one price series into at most one directional signal.
//
// Pipeline:
//   1. Compute the indicator snapshot (needs >= 20 prices)
//   2. Run five independent voting rules; each adds at most one vote and one
//      confirmation label
//        - RSI < 30 bullish            / RSI > 70 bearish
//        - MACD hist > 0 && value > signal / hist < 0 && value < signal
//        - price <= lower band          / price >= upper band
//        - EMA20 > EMA50 > EMA200       / EMA20 < EMA50 < EMA200
//        - price <= support * 1.01      / price >= resistance * 0.99
//   3. Add a non-voting "Strong Trend (n/10)" label when trend >= 7
//   4. Suppress the signal when fewer than 3 labels were collected
//   5. Direction = side with more votes (ties resolved by `TiePolicy`)
//   6. Confidence = min(95, 50 + 10 * winning votes + 2 * trend)
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indicators::{calculate_indicators, Indicators};
use crate::types::{Direction, TiePolicy, TimeFrame};

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const SUPPORT_PROXIMITY: f64 = 1.01;
const RESISTANCE_PROXIMITY: f64 = 0.99;
const STRONG_TREND: u8 = 7;
const MIN_CONFIRMATIONS: usize = 3;
const BASE_CONFIDENCE: f64 = 50.0;
const MAX_CONFIDENCE: f64 = 95.0;
const UP_TARGET_MULTIPLIER: f64 = 1.002;
const DOWN_TARGET_MULTIPLIER: f64 = 0.998;

// =============================================================================
// Signal
// =============================================================================

/// A directional recommendation derived from one indicator snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Raw confidence in `[50, 95]`. Rounded only at the display boundary.
    pub confidence: f64,
    pub time_frame: TimeFrame,
    /// Triggered rule labels in rule order.
    pub confirmations: Vec<String>,
    pub reason: String,
    pub entry_time: DateTime<Utc>,
    pub current_price: f64,
    pub target_price: f64,
    pub indicators: Indicators,
}

impl AsRef<Signal> for Signal {
    fn as_ref(&self) -> &Signal {
        self
    }
}

// =============================================================================
// Voting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
    Bullish,
    Bearish,
}

/// Bullish / bearish vote counts for one snapshot and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VoteTally {
    pub bullish: u32,
    pub bearish: u32,
}

impl VoteTally {
    /// Majority side, or `None` on an exact tie.
    pub fn majority(&self) -> Option<Direction> {
        if self.bullish > self.bearish {
            Some(Direction::Up)
        } else if self.bearish > self.bullish {
            Some(Direction::Down)
        } else {
            None
        }
    }

    /// Majority side with ties settled by `tie_policy`.
    pub fn resolve(&self, tie_policy: TiePolicy) -> Option<Direction> {
        match self.majority() {
            Some(direction) => Some(direction),
            None => match tie_policy {
                TiePolicy::Bearish => Some(Direction::Down),
                TiePolicy::Bullish => Some(Direction::Up),
                TiePolicy::Abstain => None,
            },
        }
    }
}

fn rsi_rule(ind: &Indicators) -> Option<(Vote, &'static str)> {
    if ind.rsi < RSI_OVERSOLD {
        Some((Vote::Bullish, "RSI Oversold (Bullish)"))
    } else if ind.rsi > RSI_OVERBOUGHT {
        Some((Vote::Bearish, "RSI Overbought (Bearish)"))
    } else {
        None
    }
}

fn macd_rule(ind: &Indicators) -> Option<(Vote, &'static str)> {
    let macd = &ind.macd;
    if macd.histogram > 0.0 && macd.value > macd.signal {
        Some((Vote::Bullish, "MACD Bullish Crossover"))
    } else if macd.histogram < 0.0 && macd.value < macd.signal {
        Some((Vote::Bearish, "MACD Bearish Crossover"))
    } else {
        None
    }
}

fn bollinger_rule(ind: &Indicators, price: f64) -> Option<(Vote, &'static str)> {
    if price <= ind.bollinger_bands.lower {
        Some((Vote::Bullish, "Price at Lower Bollinger Band"))
    } else if price >= ind.bollinger_bands.upper {
        Some((Vote::Bearish, "Price at Upper Bollinger Band"))
    } else {
        None
    }
}

fn ema_rule(ind: &Indicators) -> Option<(Vote, &'static str)> {
    if ind.ema20 > ind.ema50 && ind.ema50 > ind.ema200 {
        Some((Vote::Bullish, "Golden Cross Pattern"))
    } else if ind.ema20 < ind.ema50 && ind.ema50 < ind.ema200 {
        Some((Vote::Bearish, "Death Cross Pattern"))
    } else {
        None
    }
}

fn level_rule(ind: &Indicators, price: f64) -> Option<(Vote, &'static str)> {
    if price <= ind.support_level * SUPPORT_PROXIMITY {
        Some((Vote::Bullish, "Price Near Support Level"))
    } else if price >= ind.resistance_level * RESISTANCE_PROXIMITY {
        Some((Vote::Bearish, "Price Near Resistance Level"))
    } else {
        None
    }
}

fn run_rules(ind: &Indicators, price: f64) -> Vec<(Vote, &'static str)> {
    [
        rsi_rule(ind),
        macd_rule(ind),
        bollinger_rule(ind, price),
        ema_rule(ind),
        level_rule(ind, price),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Count the votes the five rules cast for `ind` at `price`.
pub fn tally_votes(ind: &Indicators, price: f64) -> VoteTally {
    run_rules(ind, price)
        .into_iter()
        .fold(VoteTally::default(), |mut tally, (vote, _)| {
            match vote {
                Vote::Bullish => tally.bullish += 1,
                Vote::Bearish => tally.bearish += 1,
            }
            tally
        })
}

// =============================================================================
// Classifier
// =============================================================================

/// Rule-based classifier with an explicit tie policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalClassifier {
    tie_policy: TiePolicy,
}

impl SignalClassifier {
    pub fn new(tie_policy: TiePolicy) -> Self {
        Self { tie_policy }
    }

    pub fn tie_policy(&self) -> TiePolicy {
        self.tie_policy
    }

    /// Classify `prices` at `current_price`.
    ///
    /// Returns `None` when the series is too short for an indicator snapshot,
    /// when fewer than three confirmations fire, or on a vote tie under
    /// [`TiePolicy::Abstain`]. A `None` is a normal "no trade" answer, not a
    /// failure.
    pub fn classify(
        &self,
        prices: &[f64],
        current_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Option<Signal> {
        let indicators = calculate_indicators(prices)?;

        let votes = run_rules(&indicators, current_price);
        let mut tally = VoteTally::default();
        let mut confirmations: Vec<String> = Vec::with_capacity(votes.len() + 1);
        for (vote, label) in votes {
            match vote {
                Vote::Bullish => tally.bullish += 1,
                Vote::Bearish => tally.bearish += 1,
            }
            confirmations.push(label.to_string());
        }

        let trend = indicators.trend_strength;
        if trend >= STRONG_TREND {
            confirmations.push(format!("Strong Trend ({trend}/10)"));
        }

        if confirmations.len() < MIN_CONFIRMATIONS {
            return None;
        }

        let direction = tally.resolve(self.tie_policy)?;

        let winning_votes = match direction {
            Direction::Up => tally.bullish,
            Direction::Down => tally.bearish,
        };
        let confidence = (BASE_CONFIDENCE + 10.0 * winning_votes as f64 + 2.0 * trend as f64)
            .min(MAX_CONFIDENCE);

        let target_price = match direction {
            Direction::Up => current_price * UP_TARGET_MULTIPLIER,
            Direction::Down => current_price * DOWN_TARGET_MULTIPLIER,
        };

        let reason = compose_reason(direction, confirmations.len(), &indicators);

        Some(Signal {
            direction,
            confidence,
            time_frame: TimeFrame::from_trend_strength(trend),
            confirmations,
            reason,
            entry_time,
            current_price,
            target_price,
            indicators,
        })
    }
}

fn compose_reason(direction: Direction, confirmation_count: usize, ind: &Indicators) -> String {
    let (bias, momentum) = match direction {
        Direction::Up => ("Bullish", "upward"),
        Direction::Down => ("Bearish", "downward"),
    };

    let mut reason = format!(
        "{bias} reversal pattern detected with {confirmation_count} technical confirmations. "
    );
    if ind.trend_strength >= STRONG_TREND {
        reason.push_str(&format!("Strong {momentum} momentum. "));
    }

    let rsi_state = if ind.rsi < RSI_OVERSOLD {
        "(oversold)"
    } else if ind.rsi > RSI_OVERBOUGHT {
        "(overbought)"
    } else {
        "(neutral)"
    };
    reason.push_str(&format!("RSI at {:.1} {rsi_state}. ", ind.rsi));

    if ind.macd.histogram > 0.0 {
        reason.push_str("MACD showing bullish momentum.");
    } else {
        reason.push_str("MACD showing bearish momentum.");
    }

    reason
}
