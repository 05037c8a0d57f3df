// =============================================================================
// Decision Oracle — directional signal abstraction
// =============================================================================

pub mod openai;
pub mod prompt;

use async_trait::async_trait;

use crate::errors::CallFailure;
use crate::types::{Quote, TradeRecord};

/// Produces a directional signal for the active symbol.
///
/// `get_decision` returns the raw oracle reply; the session controller owns
/// normalization into CALL / PUT / NO TRADE so that every implementation
/// (live or test double) goes through the same parsing path.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn get_decision(
        &self,
        symbol: &str,
        quote: &Quote,
        history: &[TradeRecord],
    ) -> Result<String, CallFailure>;

    /// Pick the most promising symbol from the universe for the session
    /// start. Implementations must return one of the provided symbols.
    async fn select_pair(&self, symbols: &[String]) -> Result<String, CallFailure>;
}
