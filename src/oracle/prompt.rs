// =============================================================================
// Prompt assembly for the chat-completion oracle
// =============================================================================

use crate::types::{Quote, TradeRecord};

/// System and user prompt text for the decision and pair-selection calls.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub decision_system_prompt: String,
    pub selection_system_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            decision_system_prompt: "You are an expert binary options analyst. You receive the \
                current quote for a forex pair and the session's recent trade outcomes. \
                Determine if the next 5-minute move is likely Up (CALL) or Down (PUT). Only \
                suggest a trade if there is a clear statistical edge; if the signals are \
                conflicting or weak, respond with NO TRADE."
                .to_string(),
            selection_system_prompt: "You are a professional trading expert selecting the best \
                forex pair for a 5-minute binary options trade. Pick the pair with the \
                strongest directional signal. IMPORTANT: respond with ONLY the exact symbol \
                name, e.g. 'EURUSD', and nothing else."
                .to_string(),
        }
    }
}

impl PromptConfig {
    /// Build the user message for a decision call.
    pub fn decision_user_prompt(&self, symbol: &str, quote: &Quote, history: &[TradeRecord]) -> String {
        let mut out = format!(
            "Symbol: {symbol}\nCurrent price: {}\nQuote time: {}\n",
            quote.price,
            quote.timestamp.to_rfc3339()
        );
        if history.is_empty() {
            out.push_str("Recent trades: none\n");
        } else {
            out.push_str("Recent trades:\n");
            for record in history {
                out.push_str(&format!(
                    "  {} {} -> {}\n",
                    record.symbol, record.decision, record.outcome
                ));
            }
        }
        out.push_str("Respond with CALL, PUT, or NO TRADE.");
        out
    }

    /// Build the user message for a pair-selection call.
    pub fn selection_user_prompt(&self, symbols: &[String]) -> String {
        format!("Available symbols: {}", symbols.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, TradeOutcome};
    use chrono::Utc;

    #[test]
    fn decision_prompt_includes_quote_and_history() {
        let cfg = PromptConfig::default();
        let quote = Quote {
            symbol: "EURUSD".into(),
            price: 1.0834,
            timestamp: Utc::now(),
        };
        let history = vec![TradeRecord {
            symbol: "EURUSD".into(),
            decision: Decision::Call,
            outcome: TradeOutcome::Win,
            timestamp: Utc::now(),
        }];
        let prompt = cfg.decision_user_prompt("EURUSD", &quote, &history);
        assert!(prompt.contains("1.0834"));
        assert!(prompt.contains("CALL -> win"));
    }

    #[test]
    fn decision_prompt_handles_empty_history() {
        let cfg = PromptConfig::default();
        let quote = Quote {
            symbol: "EURUSD".into(),
            price: 1.0,
            timestamp: Utc::now(),
        };
        let prompt = cfg.decision_user_prompt("EURUSD", &quote, &[]);
        assert!(prompt.contains("Recent trades: none"));
    }
}
