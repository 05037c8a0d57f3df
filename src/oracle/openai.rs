// =============================================================================
// Chat-Completion Oracle — REST client for an OpenAI-compatible endpoint
// =============================================================================
//
// SECURITY: the API key is sent only as a bearer header and never logged.
// A 30 s request timeout bounds every call; 429 maps to RateLimited and an
// empty `choices` array to InvalidResponse so the retry layer can make the
// right call.
// =============================================================================

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::CallFailure;
use crate::oracle::prompt::PromptConfig;
use crate::oracle::DecisionOracle;
use crate::types::{Quote, TradeRecord};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4-turbo";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Decision oracle backed by a chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiOracle {
    api_key: String,
    base_url: String,
    model: String,
    prompts: PromptConfig,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            prompts: PromptConfig::default(),
            client,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// POST one system+user exchange and return the first choice's content.
    async fn complete(&self, system_msg: &str, user_msg: &str) -> Result<String, CallFailure> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user", "content": user_msg },
            ],
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(CallFailure::from_reqwest)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CallFailure::rate_limited("chat completions returned 429"));
        }
        if !status.is_success() {
            return Err(CallFailure::other(format!(
                "chat completions returned {status}"
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(CallFailure::from_reqwest)?;

        let content = body
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                CallFailure::invalid_response("completion had no choices or empty content")
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl DecisionOracle for OpenAiOracle {
    async fn get_decision(
        &self,
        symbol: &str,
        quote: &Quote,
        history: &[TradeRecord],
    ) -> Result<String, CallFailure> {
        let user_msg = self.prompts.decision_user_prompt(symbol, quote, history);
        let reply = self
            .complete(&self.prompts.decision_system_prompt, &user_msg)
            .await?;
        debug!(symbol, reply = %reply.trim(), "oracle decision reply");
        Ok(reply)
    }

    async fn select_pair(&self, symbols: &[String]) -> Result<String, CallFailure> {
        if symbols.is_empty() {
            return Err(CallFailure::validation("no symbols to select from"));
        }

        let user_msg = self.prompts.selection_user_prompt(symbols);
        let reply = self
            .complete(&self.prompts.selection_system_prompt, &user_msg)
            .await?;
        if let Some(symbol) = match_symbol(&reply, symbols) {
            debug!(selected = %symbol, "oracle selected pair");
            return Ok(symbol);
        }

        warn!(
            reply = %reply.trim(),
            fallback = %symbols[0],
            "oracle reply named no known symbol — falling back to first"
        );
        Ok(symbols[0].clone())
    }
}

/// Find the first candidate symbol mentioned in the reply. Accepts both
/// compact ("EURUSD") and slash ("EUR/USD") notation, case-insensitively;
/// a chatty reply that mentions one of the candidates still resolves.
fn match_symbol(reply: &str, symbols: &[String]) -> Option<String> {
    let cleaned = reply.trim().to_uppercase();
    for symbol in symbols {
        let compact = symbol.to_uppercase();
        if cleaned.contains(&compact) {
            return Some(symbol.clone());
        }
        if compact.len() == 6 && compact.is_ascii() {
            let slashed = format!("{}/{}", &compact[..3], &compact[3..]);
            if cleaned.contains(&slashed) {
                return Some(symbol.clone());
            }
        }
    }
    None
}

impl std::fmt::Debug for OpenAiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiOracle")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Vec<String> {
        vec!["EURUSD".to_string(), "GBPUSD".to_string()]
    }

    #[test]
    fn matches_compact_notation() {
        assert_eq!(
            match_symbol("GBPUSD", &universe()),
            Some("GBPUSD".to_string())
        );
    }

    #[test]
    fn matches_slash_notation() {
        assert_eq!(
            match_symbol("I would pick EUR/USD today.", &universe()),
            Some("EURUSD".to_string())
        );
    }

    #[test]
    fn matches_case_insensitively_inside_chatty_reply() {
        assert_eq!(
            match_symbol("the best pair is gbpusd right now", &universe()),
            Some("GBPUSD".to_string())
        );
    }

    #[test]
    fn unknown_reply_matches_nothing() {
        assert_eq!(match_symbol("USDJPY looks strong", &universe()), None);
        assert_eq!(match_symbol("", &universe()), None);
    }
}
