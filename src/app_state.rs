// =============================================================================
// Central Application State — Signal Desk
// =============================================================================
//
// The single source of truth for the desk. The refresh loop writes quotes,
// the API reads them and appends generated signals to the history.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - parking_lot::Mutex around the RNG-owning feed; never held across await.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::display::{parse_utc_offset, SignalView};
use crate::market_data::{MarketQuote, SyntheticFeed};
use crate::runtime_config::{ConfigUpdate, RuntimeConfig};
use crate::scheduler::{Clock, SystemClock, Ticker};
use crate::signal_desk::{SignalDesk, SignalHistory, TradeSignal};
use crate::types::TiePolicy;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Where settings changes are written, and the file contents they apply to.
///
/// The baseline is the config as read from disk, before any environment
/// override, so saving it never persists a one-off override.
struct ConfigStore {
    path: PathBuf,
    baseline: RuntimeConfig,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// refresh and every generated signal.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    config_store: Mutex<Option<ConfigStore>>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub quotes: RwLock<Vec<MarketQuote>>,
    pub last_refresh: RwLock<Option<DateTime<Utc>>>,
    feed: Mutex<SyntheticFeed<StdRng>>,

    // ── Signals ─────────────────────────────────────────────────────────
    pub signal_history: RwLock<SignalHistory>,
    entry_rng: Mutex<StdRng>,
    generating: AtomicBool,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    clock: Arc<dyn Clock>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` on the system clock with entropy-seeded
    /// randomness. The returned value is typically wrapped in `Arc`
    /// immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(SystemClock),
            StdRng::from_entropy(),
            StdRng::from_entropy(),
        )
    }

    /// Deterministic construction: every random draw comes from `seed`.
    #[cfg(test)]
    pub fn seeded(config: RuntimeConfig, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::from_parts(
            config,
            clock,
            StdRng::seed_from_u64(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn from_parts(
        config: RuntimeConfig,
        clock: Arc<dyn Clock>,
        feed_rng: StdRng,
        entry_rng: StdRng,
    ) -> Self {
        let feed = SyntheticFeed::new(feed_rng, config.trend_length);
        let history = SignalHistory::new(config.max_history);

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            config_store: Mutex::new(None),
            quotes: RwLock::new(Vec::new()),
            last_refresh: RwLock::new(None),
            feed: Mutex::new(feed),
            signal_history: RwLock::new(history),
            entry_rng: Mutex::new(entry_rng),
            generating: AtomicBool::new(false),
            recent_errors: RwLock::new(Vec::new()),
            clock,
            start_time: std::time::Instant::now(),
        }
    }

    /// Persist settings changes to `path`. `baseline` is the config as it
    /// stands in that file.
    pub fn with_config_store(self, path: impl Into<PathBuf>, baseline: RuntimeConfig) -> Self {
        *self.config_store.lock() = Some(ConfigStore {
            path: path.into(),
            baseline,
        });
        self
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: self.clock.now().to_rfc3339(),
        };
        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        self.increment_version();
    }

    // ── Market Data ─────────────────────────────────────────────────────

    /// Draw a fresh quote for every configured symbol and replace the book.
    /// Returns the number of quotes written.
    pub fn refresh_quotes(&self) -> usize {
        let (symbols, trend_length) = {
            let config = self.runtime_config.read();
            (config.symbols.clone(), config.trend_length)
        };
        let now = self.clock.now();
        let quotes = {
            let mut feed = self.feed.lock();
            feed.set_trend_length(trend_length);
            feed.snapshot(&symbols, now)
        };
        let count = quotes.len();

        *self.quotes.write() = quotes;
        *self.last_refresh.write() = Some(now);
        self.increment_version();

        info!(markets = count, at = %now, "Market data refreshed");
        count
    }

    pub fn quote(&self, symbol: &str) -> Option<MarketQuote> {
        self.quotes.read().iter().find(|q| q.symbol == symbol).cloned()
    }

    /// Refresh on every tick until the ticker is exhausted.
    pub async fn run_refresh_loop<T: Ticker>(self: Arc<Self>, mut ticker: T) {
        while ticker.tick().await {
            self.refresh_quotes();
        }
        warn!("Refresh ticker stopped");
    }

    // ── Signals ─────────────────────────────────────────────────────────

    /// Claim the generation slot. `None` if another generation is running.
    pub fn try_begin_generation(&self) -> Option<GenerationGuard<'_>> {
        self.generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GenerationGuard {
                flag: &self.generating,
            })
    }

    /// Scan the current quote book and record the best signal, if any.
    pub fn generate_signal(&self) -> Option<TradeSignal> {
        let desk_config = self.runtime_config.read().desk_config();
        let desk = SignalDesk::new(desk_config);

        let best = {
            let quotes = self.quotes.read();
            let mut rng = self.entry_rng.lock();
            desk.generate(&quotes, self.clock.as_ref(), &mut *rng)
        }?;

        {
            let mut history = self.signal_history.write();
            history.set_capacity(desk_config.max_history);
            history.push(best.clone());
        }
        self.increment_version();
        Some(best)
    }

    /// Empty the signal history. Returns how many signals were removed.
    pub fn clear_signals(&self) -> usize {
        let removed = {
            let mut history = self.signal_history.write();
            if history.is_empty() {
                return 0;
            }
            history.clear()
        };
        self.increment_version();
        info!(removed, "Signal history cleared");
        removed
    }

    /// The history rendered in the configured timezone, newest first.
    pub fn signal_views(&self) -> Result<Vec<SignalView>> {
        let offset = parse_utc_offset(&self.runtime_config.read().timezone)?;
        Ok(self
            .signal_history
            .read()
            .iter()
            .map(|trade| SignalView::new(trade, offset))
            .collect())
    }

    pub fn signal_view(&self, trade: &TradeSignal) -> Result<SignalView> {
        let offset = parse_utc_offset(&self.runtime_config.read().timezone)?;
        Ok(SignalView::new(trade, offset))
    }

    // ── Settings ────────────────────────────────────────────────────────

    /// Apply `update` to the live config. An update that would leave the
    /// config invalid is rejected and changes nothing. A new symbol list or
    /// trend length refreshes the quote book at once.
    ///
    /// Accepted changes are written to the config file, if one is attached,
    /// on top of its on-disk contents. A failed write is logged and recorded
    /// but does not undo the live change.
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<Vec<String>> {
        let (changes, next, reshaped) = {
            let mut config = self.runtime_config.write();
            let mut next = config.clone();
            let changes = update.apply(&mut next);
            if changes.is_empty() {
                return Ok(changes);
            }
            next.validate()?;
            let reshaped =
                config.symbols != next.symbols || config.trend_length != next.trend_length;
            *config = next.clone();
            (changes, next, reshaped)
        };

        self.signal_history.write().set_capacity(next.max_history);
        self.increment_version();
        info!(changes = ?changes, "Runtime config updated");

        // The quote book follows the symbol list and history length.
        if reshaped {
            self.refresh_quotes();
        }

        let mut store = self.config_store.lock();
        if let Some(store) = store.as_mut() {
            update.apply(&mut store.baseline);
            if let Err(e) = store.baseline.save(&store.path) {
                warn!(error = %e, "Failed to save runtime config");
                self.push_error(format!("Failed to save runtime config: {e:#}"));
            }
        }
        drop(store);

        Ok(changes)
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Compact status summary served by the health endpoint.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read();
        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: self.clock.now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            last_refresh: *self.last_refresh.read(),
            market_count: self.quotes.read().len(),
            signal_count: self.signal_history.read().len(),
            last_signal_at: self.signal_history.read().latest().map(|t| t.created_at),
            tie_policy: config.tie_policy,
            timezone: config.timezone.clone(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

/// Releases the generation slot on drop.
pub struct GenerationGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// =============================================================================
// Snapshot types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub last_refresh: Option<DateTime<Utc>>,
    pub market_count: usize,
    pub signal_count: usize,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub tie_policy: TiePolicy,
    pub timezone: String,
    pub recent_errors: Vec<ErrorRecord>,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{FixedClock, ManualTicker};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn state_with(symbols: &[&str]) -> (Arc<AppState>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(t0()));
        let config = RuntimeConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..RuntimeConfig::default()
        };
        (Arc::new(AppState::seeded(config, clock.clone(), 17)), clock)
    }

    /// Install a hand-made quote so signal generation is predictable.
    fn install_flat_quote(state: &AppState, symbol: &str) {
        *state.quotes.write() = vec![MarketQuote {
            symbol: symbol.to_string(),
            price: 1.0,
            change: 0.0,
            percent_change: 0.0,
            timestamp: t0(),
            trend: vec![1.0; 50],
            volume: 1_000_000,
        }];
    }

    #[test]
    fn refresh_fills_the_book_in_config_order() {
        let (state, _) = state_with(&["BTC/USD", "EUR/USD", "XAU/USD"]);
        let v0 = state.current_state_version();
        assert_eq!(state.refresh_quotes(), 3);

        let symbols: Vec<_> = state.quotes.read().iter().map(|q| q.symbol.clone()).collect();
        assert_eq!(symbols, vec!["BTC/USD", "EUR/USD", "XAU/USD"]);
        assert_eq!(*state.last_refresh.read(), Some(t0()));
        assert!(state.current_state_version() > v0);
        assert_eq!(state.quote("EUR/USD").unwrap().trend.len(), 50);
        assert!(state.quote("ETH/USD").is_none());
    }

    #[test]
    fn seeded_states_agree() {
        let (a, _) = state_with(&["EUR/USD", "GBP/JPY"]);
        let (b, _) = state_with(&["EUR/USD", "GBP/JPY"]);
        a.refresh_quotes();
        b.refresh_quotes();
        assert_eq!(*a.quotes.read(), *b.quotes.read());
    }

    #[test]
    fn generate_records_history() {
        let (state, _) = state_with(&["EUR/USD"]);
        install_flat_quote(&state, "EUR/USD");

        let trade = state.generate_signal().unwrap();
        assert_eq!(trade.symbol, "EUR/USD");
        assert_eq!(state.signal_history.read().len(), 1);
        assert_eq!(state.signal_history.read().latest().unwrap().id, trade.id);

        let views = state.signal_views().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].confidence, 70.0);
    }

    #[test]
    fn generate_without_quotes_records_nothing() {
        let (state, _) = state_with(&["EUR/USD"]);
        assert!(state.generate_signal().is_none());
        assert!(state.signal_history.read().is_empty());
    }

    #[test]
    fn history_honours_max_history() {
        let (state, clock) = state_with(&["EUR/USD"]);
        state.runtime_config.write().max_history = 2;
        install_flat_quote(&state, "EUR/USD");
        for _ in 0..4 {
            clock.advance(chrono::Duration::seconds(1));
            state.generate_signal().unwrap();
        }
        let history = state.signal_history.read();
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().created_at, t0() + chrono::Duration::seconds(4));
    }

    #[test]
    fn generation_slot_is_exclusive() {
        let (state, _) = state_with(&["EUR/USD"]);
        let guard = state.try_begin_generation();
        assert!(guard.is_some());
        assert!(state.try_begin_generation().is_none());
        drop(guard);
        assert!(state.try_begin_generation().is_some());
    }

    #[test]
    fn error_log_is_bounded() {
        let (state, _) = state_with(&["EUR/USD"]);
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "error 5");
    }

    #[tokio::test]
    async fn refresh_loop_runs_once_per_tick() {
        let (state, clock) = state_with(&["EUR/USD"]);
        let (ticker, trigger) = ManualTicker::channel();
        trigger.fire();
        trigger.fire();
        drop(trigger);

        clock.set(t0() + chrono::Duration::minutes(5));
        let v0 = state.current_state_version();
        state.clone().run_refresh_loop(ticker).await;

        assert_eq!(state.current_state_version(), v0 + 2);
        assert_eq!(*state.last_refresh.read(), Some(t0() + chrono::Duration::minutes(5)));
    }

    #[test]
    fn config_update_swaps_live_settings() {
        let (state, _) = state_with(&["EUR/USD"]);
        state.refresh_quotes();
        let v0 = state.current_state_version();

        let update = ConfigUpdate {
            timezone: Some("UTC+02:00".into()),
            max_history: Some(3),
            ..ConfigUpdate::default()
        };
        let changes = state.update_config(&update).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(state.runtime_config.read().timezone, "UTC+02:00");
        assert_eq!(state.runtime_config.read().max_history, 3);
        assert_eq!(state.current_state_version(), v0 + 1);

        // Repeating it is a no-op.
        assert!(state.update_config(&update).unwrap().is_empty());
        assert_eq!(state.current_state_version(), v0 + 1);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let (state, _) = state_with(&["EUR/USD"]);
        let before = state.runtime_config.read().clone();
        let v0 = state.current_state_version();

        for update in [
            ConfigUpdate { timezone: Some("UTC+05:30".into()), ..ConfigUpdate::default() },
            ConfigUpdate { symbols: Some(vec!["FOO/BAR".into()]), ..ConfigUpdate::default() },
            ConfigUpdate { min_confidence: Some(101.0), ..ConfigUpdate::default() },
        ] {
            assert!(state.update_config(&update).is_err());
        }
        assert_eq!(*state.runtime_config.read(), before);
        assert_eq!(state.current_state_version(), v0);
    }

    #[test]
    fn new_symbol_list_refreshes_the_book() {
        let (state, _) = state_with(&["EUR/USD"]);
        state.refresh_quotes();

        let update = ConfigUpdate {
            symbols: Some(vec!["BTC/USD".into(), "XAU/USD".into()]),
            trend_length: Some(30),
            ..ConfigUpdate::default()
        };
        state.update_config(&update).unwrap();

        let quotes = state.quotes.read();
        let symbols: Vec<_> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC/USD", "XAU/USD"]);
        assert!(quotes.iter().all(|q| q.trend.len() == 30));
    }

    #[test]
    fn settings_persist_over_the_file_contents() {
        let dir = std::env::temp_dir().join(format!("signal-desk-state-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("runtime_config.json");

        // The live config carries a symbol override the file never had.
        let live = RuntimeConfig {
            symbols: vec!["EUR/USD".into()],
            ..RuntimeConfig::default()
        };
        let clock = Arc::new(FixedClock::new(t0()));
        let state = AppState::seeded(live, clock, 3)
            .with_config_store(path.clone(), RuntimeConfig::default());

        state
            .update_config(&ConfigUpdate {
                tie_policy: Some(TiePolicy::Abstain),
                ..ConfigUpdate::default()
            })
            .unwrap();

        let saved = RuntimeConfig::load(&path).unwrap();
        assert_eq!(saved.tie_policy, TiePolicy::Abstain);
        assert_eq!(saved.symbols, RuntimeConfig::default().symbols);
        assert_eq!(state.runtime_config.read().symbols, vec!["EUR/USD"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn clearing_history() {
        let (state, _) = state_with(&["EUR/USD"]);
        assert_eq!(state.clear_signals(), 0);

        install_flat_quote(&state, "EUR/USD");
        state.generate_signal().unwrap();
        state.generate_signal().unwrap();
        let v0 = state.current_state_version();

        assert_eq!(state.clear_signals(), 2);
        assert!(state.signal_history.read().is_empty());
        assert_eq!(state.current_state_version(), v0 + 1);
        assert!(state.build_snapshot().last_signal_at.is_none());
    }

    #[test]
    fn snapshot_reports_counts() {
        let (state, _) = state_with(&["EUR/USD", "BTC/USD"]);
        state.refresh_quotes();
        let snap = state.build_snapshot();
        assert_eq!(snap.market_count, 2);
        assert_eq!(snap.signal_count, 0);
        assert_eq!(snap.server_time, t0().timestamp_millis());
        assert_eq!(snap.tie_policy, TiePolicy::Bearish);
        assert!(snap.last_signal_at.is_none());

        install_flat_quote(&state, "EUR/USD");
        state.generate_signal().unwrap();
        assert_eq!(state.build_snapshot().last_signal_at, Some(t0()));
    }
}
