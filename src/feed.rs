// =============================================================================
// Quote Feed — spot quote source abstraction + REST implementation
// =============================================================================
//
// The session loop only needs one thing from a feed: the latest price for a
// symbol. The REST implementation targets an Alpha-Vantage-style currency
// exchange rate endpoint; anything structurally missing from the body is an
// InvalidResponse, and malformed symbols are rejected before any request
// goes out.
// =============================================================================

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::errors::CallFailure;
use crate::types::Quote;

/// Source of spot quotes for the session loop.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CallFailure>;
}

/// A forex pair symbol is two concatenated 3-letter currency codes.
pub fn validate_symbol(symbol: &str) -> Result<(), CallFailure> {
    if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CallFailure::validation(format!(
            "symbol '{symbol}' is not a 6-letter forex pair"
        )))
    }
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// REST quote source backed by a currency exchange rate endpoint.
#[derive(Clone)]
pub struct HttpQuoteSource {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpQuoteSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CallFailure> {
        validate_symbol(symbol)?;
        let (from, to) = symbol.split_at(3);

        let url = format!(
            "{}/query?function=CURRENCY_EXCHANGE_RATE&from_currency={}&to_currency={}&apikey={}",
            self.base_url, from, to, self.api_key
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(CallFailure::from_reqwest)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CallFailure::rate_limited(format!(
                "quote endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(CallFailure::other(format!(
                "quote endpoint returned {status}"
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(CallFailure::from_reqwest)?;

        // Alpha Vantage signals throttling with a "Note" field and 200 OK.
        if body.get("Note").is_some() {
            return Err(CallFailure::rate_limited(
                "quote endpoint returned a throttling note",
            ));
        }

        let price = body
            .get("Realtime Currency Exchange Rate")
            .and_then(|v| v.get("5. Exchange Rate"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| {
                CallFailure::invalid_response(format!("no exchange rate in body for {symbol}"))
            })?;

        debug!(symbol, price, "quote fetched");

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            timestamp: Utc::now(),
        })
    }
}

impl std::fmt::Debug for HttpQuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpQuoteSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;

    #[test]
    fn valid_forex_pairs_pass() {
        assert!(validate_symbol("EURUSD").is_ok());
        assert!(validate_symbol("GBPJPY").is_ok());
    }

    #[test]
    fn malformed_symbols_rejected() {
        for bad in ["eurusd", "EUR/USD", "EURUSD1", "EUR", "", "BTC-USD"] {
            let err = validate_symbol(bad).unwrap_err();
            assert_eq!(err.kind, FailureKind::Validation, "symbol {bad:?}");
        }
    }

    #[tokio::test]
    async fn invalid_symbol_fails_before_any_request() {
        // Unroutable base URL: a request would error differently than
        // validation, so this proves we reject first.
        let feed = HttpQuoteSource::with_base_url("key", "http://127.0.0.1:1");
        let err = feed.get_quote("not-a-pair").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);
    }
}
