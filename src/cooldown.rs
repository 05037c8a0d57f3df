// =============================================================================
// Cooldown Manager — full-session pause after too many symbol switches
// =============================================================================
//
// Distinct from the per-symbol blacklist: when inactivity forces the loop
// to hop symbols too many times in a row, the whole session pauses for a
// fixed duration before evaluating anything again. Any actionable decision
// clears the streak.
// =============================================================================

use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug)]
pub struct CooldownManager {
    consecutive_switches: u32,
    max_switches: u32,
    cooldown_duration: Duration,
}

impl CooldownManager {
    pub fn new(max_switches: u32, cooldown_duration: Duration) -> Self {
        Self {
            consecutive_switches: 0,
            max_switches: max_switches.max(1),
            cooldown_duration,
        }
    }

    /// Record an inactivity-driven symbol switch. Returns true when the
    /// streak reaches the threshold, resetting the counter in the same call;
    /// the caller must then pause the whole loop for `cooldown_duration`.
    pub fn record_switch(&mut self) -> bool {
        self.consecutive_switches += 1;
        debug!(
            consecutive_switches = self.consecutive_switches,
            max = self.max_switches,
            "symbol switch recorded"
        );
        if self.consecutive_switches >= self.max_switches {
            warn!(
                switches = self.consecutive_switches,
                cooldown_secs = self.cooldown_duration.as_secs(),
                "switch threshold reached — system cooldown triggered"
            );
            self.consecutive_switches = 0;
            return true;
        }
        false
    }

    /// An actionable (CALL/PUT) decision clears the inactivity streak.
    pub fn record_successful_action(&mut self) {
        self.consecutive_switches = 0;
    }

    pub fn cooldown_duration(&self) -> Duration {
        self.cooldown_duration
    }

    #[cfg(test)]
    fn streak(&self) -> u32 {
        self.consecutive_switches
    }
}
