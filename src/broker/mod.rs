// =============================================================================
// Trade Executor — broker abstraction for binary option placement
// =============================================================================

pub mod client;
pub mod sim;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CallFailure;
use crate::types::Decision;

/// Places binary option trades and reports their settled outcome.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Place a trade; returns the broker-assigned trade id. A broker reply
    /// that carries no id is an `InvalidResponse` failure.
    async fn place_trade(
        &self,
        symbol: &str,
        amount: f64,
        direction: Decision,
        duration: Duration,
    ) -> Result<String, CallFailure>;

    /// Query a settled trade. True = win. Only valid after the trade's
    /// duration has fully elapsed.
    async fn check_trade_result(&self, trade_id: &str) -> Result<bool, CallFailure>;
}
