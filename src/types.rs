// =============================================================================
// Shared types used across the Vega session engine
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directional decision returned by the oracle for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Call,
    Put,
    NoTrade,
}

impl Decision {
    /// Normalize a raw oracle reply into a decision.
    ///
    /// Matching is case-insensitive on the trimmed text, substring-based, and
    /// checked in priority order NO TRADE > CALL > PUT so that a hedged reply
    /// like "no clear signal, NO TRADE" never becomes a trade. Anything that
    /// matches none of the three defaults to NO TRADE.
    pub fn parse(raw: &str) -> Self {
        let cleaned = raw.trim().to_uppercase();
        if cleaned.contains("NO TRADE") {
            Self::NoTrade
        } else if cleaned.contains("CALL") {
            Self::Call
        } else if cleaned.contains("PUT") {
            Self::Put
        } else {
            Self::NoTrade
        }
    }

    /// Whether this decision should result in a trade attempt.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Call | Self::Put)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
            Self::NoTrade => write!(f, "NO TRADE"),
        }
    }
}

/// Result of a settled binary trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl std::fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Win => write!(f, "win"),
            Self::Loss => write!(f, "loss"),
        }
    }
}

/// One settled trade, append-only for the life of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub decision: Decision,
    pub outcome: TradeOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Spot quote for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Running win/loss tally, recomputed after every recorded trade.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
}

impl PerformanceMetrics {
    pub fn total_trades(&self) -> u32 {
        self.wins + self.losses
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_keywords() {
        assert_eq!(Decision::parse("CALL"), Decision::Call);
        assert_eq!(Decision::parse("PUT"), Decision::Put);
        assert_eq!(Decision::parse("NO TRADE"), Decision::NoTrade);
    }

    #[test]
    fn parse_embedded_and_mixed_case() {
        assert_eq!(Decision::parse("Predicted action: CALL"), Decision::Call);
        assert_eq!(Decision::parse("i suggest a put"), Decision::Put);
        assert_eq!(
            Decision::parse("no clear signal, NO TRADE"),
            Decision::NoTrade
        );
    }

    #[test]
    fn parse_unrecognized_defaults_to_no_trade() {
        assert_eq!(Decision::parse("uncertain"), Decision::NoTrade);
        assert_eq!(Decision::parse(""), Decision::NoTrade);
    }

    #[test]
    fn parse_no_trade_wins_over_call_and_put() {
        // NO TRADE takes priority even when the reply also mentions CALL/PUT.
        assert_eq!(
            Decision::parse("Leaning CALL but conflicting signals. NO TRADE"),
            Decision::NoTrade
        );
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(Decision::parse("  put \n"), Decision::Put);
    }

    #[test]
    fn actionable_flags() {
        assert!(Decision::Call.is_actionable());
        assert!(Decision::Put.is_actionable());
        assert!(!Decision::NoTrade.is_actionable());
    }
}
