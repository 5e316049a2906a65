// =============================================================================
// Signal Desk: scan a quote book, pick the best signal, keep a short history
// =============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::market_data::MarketQuote;
use crate::scheduler::Clock;
use crate::signals::{select_best_signal, Signal, SignalClassifier};
use crate::types::TiePolicy;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 70.0;
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Progress messages emitted while a paced analysis runs.
pub const ANALYSIS_STEPS: [&str; 5] = [
    "Initializing analysis engine",
    "Calculating technical indicators",
    "Analyzing RSI, MACD, Bollinger Bands and EMA",
    "Identifying support/resistance levels",
    "Applying multi-indicator confirmation strategy",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Candidates below this confidence are discarded before selection.
    pub min_confidence: f64,
    pub max_history: usize,
    pub tie_policy: TiePolicy,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_history: DEFAULT_MAX_HISTORY,
            tie_policy: TiePolicy::default(),
        }
    }
}

/// A classified signal bound to the instrument it was generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// `"{symbol}-{created_at millis}"`.
    pub id: String,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub signal: Signal,
}

impl AsRef<Signal> for TradeSignal {
    fn as_ref(&self) -> &Signal {
        &self.signal
    }
}

// =============================================================================
// SignalDesk
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDesk {
    classifier: SignalClassifier,
    config: DeskConfig,
}

impl SignalDesk {
    pub fn new(config: DeskConfig) -> Self {
        Self {
            classifier: SignalClassifier::new(config.tie_policy),
            config,
        }
    }

    /// Classify a single quote's history at its current price.
    pub fn evaluate(
        &self,
        quote: &MarketQuote,
        entry_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Option<TradeSignal> {
        let signal = self
            .classifier
            .classify(&quote.trend, quote.price, entry_time)?;
        Some(TradeSignal {
            id: format!("{}-{}", quote.symbol, created_at.timestamp_millis()),
            symbol: quote.symbol.clone(),
            created_at,
            signal,
        })
    }

    /// Classify every quote in `quotes`, stamping each candidate with an
    /// entry time of `now` plus a random one to three minutes. Quotes that do
    /// not produce a signal are skipped, so the result may be shorter than
    /// the book.
    pub fn scan<R: Rng>(
        &self,
        quotes: &[MarketQuote],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<TradeSignal> {
        quotes
            .iter()
            .filter_map(|quote| {
                let entry_time = now + chrono::Duration::minutes(rng.gen_range(1..=3));
                let candidate = self.evaluate(quote, entry_time, now)?;
                debug!(
                    symbol = %candidate.symbol,
                    direction = %candidate.signal.direction,
                    confidence = candidate.signal.confidence,
                    "Candidate signal"
                );
                Some(candidate)
            })
            .collect()
    }

    /// Scan `quotes` and return the strongest qualifying signal.
    ///
    /// Candidates under `min_confidence` are dropped; `None` means nothing
    /// qualified.
    pub fn generate<C, R>(&self, quotes: &[MarketQuote], clock: &C, rng: &mut R) -> Option<TradeSignal>
    where
        C: Clock + ?Sized,
        R: Rng,
    {
        let candidates = self.scan(quotes, clock.now(), rng);
        let signalled = candidates.len();

        let qualified: Vec<TradeSignal> = candidates
            .into_iter()
            .filter(|c| c.signal.confidence >= self.config.min_confidence)
            .collect();
        let qualified_count = qualified.len();
        let best = select_best_signal(qualified);

        match &best {
            Some(trade) => info!(
                symbol = %trade.symbol,
                direction = %trade.signal.direction,
                confidence = trade.signal.confidence,
                confirmations = trade.signal.confirmations.len(),
                markets = quotes.len(),
                signalled,
                qualified = qualified_count,
                tie_policy = %self.classifier.tie_policy(),
                "Signal generated"
            ),
            None => info!(
                markets = quotes.len(),
                signalled,
                min_confidence = self.config.min_confidence,
                "No signal met the confidence threshold"
            ),
        }

        best
    }
}

/// Walk the analysis steps, logging each and pausing `pacing` between them.
/// A zero pacing logs the steps without sleeping.
pub async fn pace_analysis(pacing: Duration) {
    for (i, step) in ANALYSIS_STEPS.iter().enumerate() {
        info!(step = i + 1, total = ANALYSIS_STEPS.len(), "{step}");
        if !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }
}

// =============================================================================
// SignalHistory
// =============================================================================

/// Most-recent-first list of generated signals, bounded in length.
#[derive(Debug, Clone, Serialize)]
pub struct SignalHistory {
    entries: VecDeque<TradeSignal>,
    #[serde(skip)]
    capacity: usize,
}

impl SignalHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend `signal`, dropping the oldest entries beyond capacity.
    pub fn push(&mut self, signal: TradeSignal) {
        self.entries.push_front(signal);
        self.entries.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&TradeSignal> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeSignal> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.entries.truncate(capacity);
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }
}

impl Default for SignalHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
