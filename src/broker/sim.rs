// =============================================================================
// Simulated Broker — demo-mode executor with synthetic fills
// =============================================================================
//
// No request leaves the process: placements get a UUID trade id, and
// outcomes are drawn from a configurable win probability when the settled
// trade is queried. Used whenever the session runs in demo mode.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::broker::TradeExecutor;
use crate::errors::CallFailure;
use crate::types::Decision;

pub struct SimBroker {
    /// Probability that a settled trade is a win.
    win_probability: f64,
    open_trades: Mutex<HashMap<String, Decision>>,
}

impl SimBroker {
    pub fn new(win_probability: f64) -> Self {
        Self {
            win_probability: win_probability.clamp(0.0, 1.0),
            open_trades: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for SimBroker {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl TradeExecutor for SimBroker {
    async fn place_trade(
        &self,
        symbol: &str,
        amount: f64,
        direction: Decision,
        duration: Duration,
    ) -> Result<String, CallFailure> {
        let trade_id = Uuid::new_v4().to_string();
        self.open_trades.lock().insert(trade_id.clone(), direction);
        info!(
            symbol,
            amount,
            direction = %direction,
            duration_secs = duration.as_secs(),
            trade_id = %trade_id,
            "demo fill created"
        );
        Ok(trade_id)
    }

    async fn check_trade_result(&self, trade_id: &str) -> Result<bool, CallFailure> {
        let known = self.open_trades.lock().remove(trade_id).is_some();
        if !known {
            return Err(CallFailure::invalid_response(format!(
                "unknown trade id '{trade_id}'"
            )));
        }
        let win = rand::thread_rng().gen_bool(self.win_probability);
        info!(trade_id, win, "demo trade settled");
        Ok(win)
    }
}

impl std::fmt::Debug for SimBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBroker")
            .field("win_probability", &self.win_probability)
            .field("open_trades", &self.open_trades.lock().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placement_returns_unique_ids() {
        let broker = SimBroker::default();
        let a = broker
            .place_trade("EURUSD", 1.0, Decision::Call, Duration::from_secs(60))
            .await
            .unwrap();
        let b = broker
            .place_trade("EURUSD", 1.0, Decision::Put, Duration::from_secs(60))
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn certain_win_probability_always_wins() {
        let broker = SimBroker::new(1.0);
        let id = broker
            .place_trade("EURUSD", 1.0, Decision::Call, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(broker.check_trade_result(&id).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_trade_id_is_invalid_response() {
        let broker = SimBroker::default();
        let err = broker.check_trade_result("nope").await.unwrap_err();
        assert_eq!(err.kind, crate::errors::FailureKind::InvalidResponse);
    }

    #[tokio::test]
    async fn result_can_only_be_checked_once() {
        let broker = SimBroker::new(0.0);
        let id = broker
            .place_trade("EURUSD", 1.0, Decision::Put, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!broker.check_trade_result(&id).await.unwrap());
        assert!(broker.check_trade_result(&id).await.is_err());
    }
}
