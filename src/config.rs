// =============================================================================
// Session Configuration — immutable per-run settings with atomic save
// =============================================================================
//
// Every tunable parameter of the session loop lives here. The config is
// constructed once at startup (file + env overrides) and passed by
// reference into every component — no ambient or global state.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry serde defaults so that adding new fields never
// breaks loading an older config file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::retry::RetryPolicy;
use crate::risk::RiskBudget;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "EURUSD".to_string(),
        "GBPUSD".to_string(),
        "USDJPY".to_string(),
        "AUDUSD".to_string(),
        "USDCAD".to_string(),
    ]
}

fn default_trade_amount() -> f64 {
    1.0
}

fn default_initial_balance() -> f64 {
    1000.0
}

fn default_profit_target_pct() -> f64 {
    5.0
}

fn default_loss_limit_pct() -> f64 {
    2.0
}

fn default_trade_duration_secs() -> u64 {
    300
}

fn default_max_consecutive_no_trade() -> u32 {
    5
}

fn default_blacklist_duration_secs() -> u64 {
    300
}

fn default_max_consecutive_switches() -> u32 {
    3
}

fn default_cooldown_duration_secs() -> u64 {
    60
}

fn default_cycle_delay_secs() -> u64 {
    5
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_secs() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

// =============================================================================
// SessionConfig
// =============================================================================

/// Top-level configuration for one trading session.
///
/// Every field has a serde default so that older JSON files missing new
/// fields still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    // --- Symbol universe ----------------------------------------------------

    /// Symbols the session rotates through.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    // --- Risk budget --------------------------------------------------------

    /// Fixed stake per trade.
    #[serde(default = "default_trade_amount")]
    pub trade_amount: f64,

    /// Account balance at session start, for PnL percentage calculations.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,

    /// Stop once realized PnL reaches this percentage of the balance.
    #[serde(default = "default_profit_target_pct")]
    pub profit_target_pct: f64,

    /// Stop once realized PnL falls to minus this percentage.
    #[serde(default = "default_loss_limit_pct")]
    pub loss_limit_pct: f64,

    // --- Timing -------------------------------------------------------------

    /// Binary option expiry: how long a placed trade runs before settling.
    #[serde(default = "default_trade_duration_secs")]
    pub trade_duration_secs: u64,

    /// Pause between loop iterations.
    #[serde(default = "default_cycle_delay_secs")]
    pub cycle_delay_secs: u64,

    // --- Inactivity handling ------------------------------------------------

    /// Consecutive NO TRADE decisions before the symbol is blacklisted.
    #[serde(default = "default_max_consecutive_no_trade")]
    pub max_consecutive_no_trade: u32,

    /// How long a blacklisted symbol stays excluded.
    #[serde(default = "default_blacklist_duration_secs")]
    pub blacklist_duration_secs: u64,

    /// Consecutive inactivity-driven switches before a system cooldown.
    #[serde(default = "default_max_consecutive_switches")]
    pub max_consecutive_switches: u32,

    /// Length of the full-loop cooldown pause.
    #[serde(default = "default_cooldown_duration_secs")]
    pub cooldown_duration_secs: u64,

    // --- Retry policy -------------------------------------------------------

    /// Attempts per external call before falling back.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Initial backoff delay; doubles per failed attempt.
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,

    // --- Oracle context -----------------------------------------------------

    /// How many recent trades the oracle sees. `None` = full history.
    #[serde(default)]
    pub history_window: Option<usize>,

    // --- Run mode -----------------------------------------------------------

    /// Iteration cap for bounded runs (tests, dry runs). `None` = unbounded.
    #[serde(default)]
    pub max_iterations: Option<u64>,

    /// Demo mode routes trades to the local simulator instead of the broker.
    #[serde(default = "default_true")]
    pub demo_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            trade_amount: default_trade_amount(),
            initial_balance: default_initial_balance(),
            profit_target_pct: default_profit_target_pct(),
            loss_limit_pct: default_loss_limit_pct(),
            trade_duration_secs: default_trade_duration_secs(),
            cycle_delay_secs: default_cycle_delay_secs(),
            max_consecutive_no_trade: default_max_consecutive_no_trade(),
            blacklist_duration_secs: default_blacklist_duration_secs(),
            max_consecutive_switches: default_max_consecutive_switches(),
            cooldown_duration_secs: default_cooldown_duration_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            history_window: None,
            max_iterations: None,
            demo_mode: true,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse session config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            demo_mode = config.demo_mode,
            "session config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise session config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "session config saved (atomic)");
        Ok(())
    }

    /// Apply environment overrides on top of the file-loaded values.
    ///
    /// `symbols` is a comma-separated list; entries are trimmed and
    /// uppercased, and an override that yields no symbols is ignored.
    /// `max_iterations` must parse as an integer; anything else leaves the
    /// configured cap untouched.
    pub fn apply_overrides(&mut self, symbols: Option<&str>, max_iterations: Option<&str>) {
        if let Some(raw) = symbols {
            let parsed: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if parsed.is_empty() {
                warn!(value = raw, "symbol override is empty — keeping configured symbols");
            } else {
                self.symbols = parsed;
            }
        }

        if let Some(raw) = max_iterations {
            match raw.parse() {
                Ok(cap) => self.max_iterations = Some(cap),
                Err(e) => warn!(
                    value = raw,
                    error = %e,
                    "iteration cap override is not a number — keeping configured cap"
                ),
            }
        }
    }

    // --- Derived views ------------------------------------------------------

    pub fn risk_budget(&self) -> RiskBudget {
        RiskBudget {
            initial_balance: self.initial_balance,
            trade_amount: self.trade_amount,
            profit_target_pct: self.profit_target_pct,
            loss_limit_pct: self.loss_limit_pct,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_secs(self.retry_base_delay_secs),
        )
    }

    pub fn trade_duration(&self) -> Duration {
        Duration::from_secs(self.trade_duration_secs)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_secs)
    }

    pub fn blacklist_duration(&self) -> Duration {
        Duration::from_secs(self.blacklist_duration_secs)
    }

    pub fn cooldown_duration(&self) -> Duration {
        Duration::from_secs(self.cooldown_duration_secs)
    }
}
