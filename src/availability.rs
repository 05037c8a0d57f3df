// =============================================================================
// Availability Tracker — time-boxed blacklist of inactive symbols
// =============================================================================
//
// A symbol that keeps producing NO TRADE gets blacklisted for a fixed
// duration so the loop stops burning oracle calls on it. Expiry is lazy:
// entries are purged when a lookup touches them, never by a background
// sweep. At most one entry per symbol; a later blacklist call overwrites
// the expiry (last write wins).
//
// All methods take `now` explicitly so tests run on arbitrary instants
// without sleeping.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

/// Tracks which symbols are temporarily excluded from selection.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    /// symbol -> instant at which it becomes usable again.
    entries: HashMap<String, Instant>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the symbol has no blacklist entry or its entry has expired.
    /// An expired entry is removed as a side effect.
    pub fn is_available(&mut self, symbol: &str, now: Instant) -> bool {
        match self.entries.get(symbol) {
            None => true,
            Some(&unblacklist_at) if unblacklist_at <= now => {
                self.entries.remove(symbol);
                debug!(symbol, "blacklist entry expired — symbol available again");
                true
            }
            Some(_) => false,
        }
    }

    /// Exclude `symbol` until `now + duration`, overwriting any prior entry.
    pub fn blacklist(&mut self, symbol: &str, now: Instant, duration: Duration) {
        self.entries.insert(symbol.to_string(), now + duration);
        info!(
            symbol,
            duration_secs = duration.as_secs(),
            "symbol blacklisted"
        );
    }

    /// Scan `symbols` in round-robin order starting just after `start_index`
    /// and return the first available candidate, purging expired entries
    /// along the way. `None` when every symbol is currently blacklisted.
    pub fn next_available(
        &mut self,
        symbols: &[String],
        start_index: usize,
        now: Instant,
    ) -> Option<(usize, String)> {
        if symbols.is_empty() {
            return None;
        }
        for offset in 1..=symbols.len() {
            let idx = (start_index + offset) % symbols.len();
            if self.is_available(&symbols[idx], now) {
                return Some((idx, symbols[idx].clone()));
            }
        }
        None
    }

    /// The blacklisted symbol that frees up soonest, so the caller can sleep
    /// exactly that long rather than busy-polling. `None` when the blacklist
    /// is empty.
    pub fn earliest_expiry(&self) -> Option<(String, Instant)> {
        self.entries
            .iter()
            .min_by_key(|(_, &at)| at)
            .map(|(symbol, &at)| (symbol.clone(), at))
    }

    /// Number of currently tracked blacklist entries (expired or not).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
