// =============================================================================
// Event Sink — optional observability hook for session lifecycle events
// =============================================================================
//
// Blacklist, cooldown, rotation, and wait events are surfaced here for
// dashboards or audit logs. The sink is optional: the session loop emits
// through `emit()` and control flow is identical whether or not a sink is
// attached.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    RiskBoundary,
    IterationCap,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RiskBoundary => write!(f, "risk boundary"),
            Self::IterationCap => write!(f, "iteration cap"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lifecycle events emitted by the session controller.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    SymbolBlacklisted {
        symbol: String,
        duration_secs: u64,
    },
    CooldownStarted {
        duration_secs: u64,
    },
    WaitingForAvailability {
        symbol: String,
        wait_secs: u64,
    },
    SymbolRotated {
        from: String,
        to: String,
    },
    SessionStopped {
        reason: StopReason,
        trades: usize,
    },
}

/// Observability collaborator. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn record_event(&self, event: &SessionEvent);
}

/// Default sink: structured log lines via tracing.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SymbolBlacklisted {
                symbol,
                duration_secs,
            } => warn!(symbol = %symbol, duration_secs, "event: symbol blacklisted"),
            SessionEvent::CooldownStarted { duration_secs } => {
                warn!(duration_secs, "event: system cooldown started")
            }
            SessionEvent::WaitingForAvailability { symbol, wait_secs } => {
                info!(symbol = %symbol, wait_secs, "event: waiting for first symbol to free up")
            }
            SessionEvent::SymbolRotated { from, to } => {
                info!(from = %from, to = %to, "event: rotated active symbol")
            }
            SessionEvent::SessionStopped { reason, trades } => {
                info!(reason = %reason, trades, "event: session stopped")
            }
        }
    }
}

/// Emit to an optional sink. Absence of a sink never affects control flow.
pub fn emit(sink: &Option<Arc<dyn EventSink>>, event: SessionEvent) {
    if let Some(sink) = sink {
        sink.record_event(&event);
    }
}

impl SessionEvent {
    pub fn cooldown(duration: Duration) -> Self {
        Self::CooldownStarted {
            duration_secs: duration.as_secs(),
        }
    }

    pub fn blacklisted(symbol: &str, duration: Duration) -> Self {
        Self::SymbolBlacklisted {
            symbol: symbol.to_string(),
            duration_secs: duration.as_secs(),
        }
    }
}
