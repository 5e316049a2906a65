// =============================================================================
// Shared types used across the signal desk
// =============================================================================

use serde::{Deserialize, Serialize};

/// Recommended direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Holding period attached to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "1")]
    OneMinute,
    #[serde(rename = "3")]
    ThreeMinutes,
    #[serde(rename = "5")]
    FiveMinutes,
}

impl TimeFrame {
    /// Pick the time frame for a trend strength score.
    pub fn from_trend_strength(trend_strength: u8) -> Self {
        if trend_strength >= 8 {
            Self::FiveMinutes
        } else if trend_strength >= 5 {
            Self::ThreeMinutes
        } else {
            Self::OneMinute
        }
    }

    pub fn minutes(self) -> u32 {
        match self {
            Self::OneMinute => 1,
            Self::ThreeMinutes => 3,
            Self::FiveMinutes => 5,
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// What the classifier does when bullish and bearish votes are equal.
///
/// `Bearish` reproduces the behaviour of earlier releases, which only
/// recognised `bullish > bearish` as "up" and fell through to "down"
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiePolicy {
    Bearish,
    Bullish,
    /// Produce no signal on a tie.
    Abstain,
}

impl Default for TiePolicy {
    fn default() -> Self {
        Self::Bearish
    }
}

impl std::fmt::Display for TiePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearish => write!(f, "Bearish"),
            Self::Bullish => write!(f, "Bullish"),
            Self::Abstain => write!(f, "Abstain"),
        }
    }
}
