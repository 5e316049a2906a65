// =============================================================================
// Runtime Configuration — Desk settings with atomic save
// =============================================================================
//
// Every tunable of the signal desk lives here: the instrument universe, the
// refresh cadence, the classifier's tie policy and the display timezone.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::display::TIMEZONES;
use crate::market_data::{is_known_market, DEFAULT_TREND_LENGTH, MARKETS};
use crate::signal_desk::{DeskConfig, DEFAULT_MAX_HISTORY, DEFAULT_MIN_CONFIDENCE};
use crate::types::TiePolicy;

pub const DEFAULT_CONFIG_PATH: &str = "runtime_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    MARKETS.iter().map(|s| s.to_string()).collect()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_trend_length() -> usize {
    DEFAULT_TREND_LENGTH
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_timezone() -> String {
    "UTC+00:00".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the signal desk.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe & feed -----------------------------------------------------

    /// Instruments the desk quotes and scans, in scan order.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Seconds between automatic quote refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Points of history generated per instrument.
    #[serde(default = "default_trend_length")]
    pub trend_length: usize,

    // --- Signal generation ---------------------------------------------------

    /// Candidates below this confidence never reach selection.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Signals retained in the history, newest first.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Direction chosen when bullish and bearish votes are equal.
    #[serde(default)]
    pub tie_policy: TiePolicy,

    /// Pause between analysis steps on a manual generate. Zero disables it.
    #[serde(default)]
    pub analysis_pacing_ms: u64,

    // --- Display -------------------------------------------------------------

    /// `UTC±HH:MM` offset used to render entry times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            refresh_interval_secs: default_refresh_interval_secs(),
            trend_length: default_trend_length(),
            min_confidence: default_min_confidence(),
            max_history: default_max_history(),
            tie_policy: TiePolicy::default(),
            analysis_pacing_ms: 0,
            timezone: default_timezone(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = config.symbols.len(),
            tie_policy = %config.tie_policy,
            timezone = %config.timezone,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Replace the symbol list from a comma-separated override such as the
    /// `SIGNAL_DESK_SYMBOLS` environment variable. Unknown names are dropped
    /// with a warning; an override with no known names leaves the list as is.
    pub fn apply_symbol_override(&mut self, raw: &str) {
        let mut symbols: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if is_known_market(name) {
                if !symbols.iter().any(|s| s == name) {
                    symbols.push(name.to_string());
                }
            } else {
                warn!(symbol = %name, "Ignoring unknown symbol in override");
            }
        }
        if symbols.is_empty() {
            warn!("Symbol override contained no known instruments, keeping configured list");
            return;
        }
        self.symbols = symbols;
    }

    /// Reject settings the desk cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("symbols must not be empty");
        }
        if let Some(unknown) = self.symbols.iter().find(|s| !is_known_market(s)) {
            bail!("unknown symbol '{unknown}'");
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be positive");
        }
        if self.trend_length < crate::indicators::MIN_HISTORY {
            bail!(
                "trend_length must be at least {} (got {})",
                crate::indicators::MIN_HISTORY,
                self.trend_length
            );
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            bail!("min_confidence must be within 0..=100 (got {})", self.min_confidence);
        }
        if self.max_history == 0 {
            bail!("max_history must be positive");
        }
        if !TIMEZONES.contains(&self.timezone.as_str()) {
            bail!("timezone '{}' is not one of the offered UTC offsets", self.timezone);
        }
        Ok(())
    }

    pub fn desk_config(&self) -> DeskConfig {
        DeskConfig {
            min_confidence: self.min_confidence,
            max_history: self.max_history,
            tie_policy: self.tie_policy,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn analysis_pacing(&self) -> Duration {
        Duration::from_millis(self.analysis_pacing_ms)
    }
}

// =============================================================================
// ConfigUpdate
// =============================================================================

/// Partial settings update posted to the config endpoint. Absent fields are
/// left untouched. The refresh interval is fixed for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub trend_length: Option<usize>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub max_history: Option<usize>,
    #[serde(default)]
    pub tie_policy: Option<TiePolicy>,
    #[serde(default)]
    pub analysis_pacing_ms: Option<u64>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl ConfigUpdate {
    /// Write every present field into `config` and describe what changed.
    /// Does not validate; callers check the result with
    /// [`RuntimeConfig::validate`].
    pub fn apply(&self, config: &mut RuntimeConfig) -> Vec<String> {
        let mut changes = Vec::new();

        macro_rules! apply_field {
            ($field:ident) => {
                if let Some(val) = &self.$field {
                    if config.$field != *val {
                        changes.push(format!(
                            "{}: {:?} -> {:?}",
                            stringify!($field),
                            config.$field,
                            val
                        ));
                        config.$field = val.clone();
                    }
                }
            };
        }

        apply_field!(symbols);
        apply_field!(trend_length);
        apply_field!(min_confidence);
        apply_field!(max_history);
        apply_field!(tie_policy);
        apply_field!(analysis_pacing_ms);
        apply_field!(timezone);

        changes
    }
}
