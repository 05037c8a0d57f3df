// =============================================================================
// Broker REST Client — HMAC-SHA256 signed requests
// =============================================================================
//
// SECURITY: the secret key is used exclusively for request signing and is
// never logged or serialized. Every signed request carries the API key as a
// header plus a millisecond timestamp inside the signed query, so replayed
// requests are rejected upstream.
// =============================================================================

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::broker::TradeExecutor;
use crate::errors::CallFailure;
use crate::types::Decision;

type HmacSha256 = Hmac<Sha256>;

/// Signed REST client for a binary options broker.
#[derive(Clone)]
pub struct RestBrokerClient {
    secret: String,
    base_url: String,
    client: reqwest::Client,
}

impl RestBrokerClient {
    /// # Arguments
    /// * `api_key` — broker API key (sent as a header, never in query params).
    /// * `secret`  — broker secret used exclusively for HMAC signing.
    /// * `base_url` — broker REST endpoint root.
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();

        let mut default_headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(&api_key) {
            default_headers.insert("X-API-KEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            secret: secret.into(),
            base_url: base_url.into(),
            client,
        }
    }

    /// HMAC-SHA256 hex signature of `query`.
    fn sign(&self, query: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_millis() as u64
    }

    /// Append timestamp and signature to a query string.
    fn signed_query(&self, params: &str) -> String {
        let ts = Self::timestamp_ms();
        let base = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let sig = self.sign(&base);
        format!("{base}&signature={sig}")
    }

    async fn check_status(resp: reqwest::Response) -> Result<serde_json::Value, CallFailure> {
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CallFailure::rate_limited(format!(
                "broker returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(CallFailure::other(format!("broker returned {status}")));
        }
        resp.json().await.map_err(CallFailure::from_reqwest)
    }
}

#[async_trait]
impl TradeExecutor for RestBrokerClient {
    async fn place_trade(
        &self,
        symbol: &str,
        amount: f64,
        direction: Decision,
        duration: Duration,
    ) -> Result<String, CallFailure> {
        let params = format!(
            "symbol={symbol}&amount={amount}&direction={direction}&duration={}",
            duration.as_secs()
        );
        let qs = self.signed_query(&params);
        let url = format!("{}/api/v1/trades?{}", self.base_url, qs);

        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(CallFailure::from_reqwest)?;

        let body = Self::check_status(resp).await?;

        let trade_id = body
            .get("trade_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                warn!(symbol, "broker accepted order but returned no trade id");
                CallFailure::invalid_response("placement response carried no trade id")
            })?;

        debug!(symbol, trade_id, amount, direction = %direction, "trade placed");
        Ok(trade_id.to_string())
    }

    async fn check_trade_result(&self, trade_id: &str) -> Result<bool, CallFailure> {
        let qs = self.signed_query(&format!("trade_id={trade_id}"));
        let url = format!("{}/api/v1/trades/result?{}", self.base_url, qs);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(CallFailure::from_reqwest)?;

        let body = Self::check_status(resp).await?;

        match body.get("status").and_then(|v| v.as_str()) {
            Some("win") => Ok(true),
            Some("loss") => Ok(false),
            Some(other) => Err(CallFailure::invalid_response(format!(
                "unexpected trade status '{other}'"
            ))),
            None => Err(CallFailure::invalid_response(
                "result response carried no status",
            )),
        }
    }
}

impl std::fmt::Debug for RestBrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBrokerClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
