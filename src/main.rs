// =============================================================================
// Vega Binary Nexus — Main Entry Point
// =============================================================================
//
// The session starts in demo mode for safety. Live execution requires
// `demo_mode: false` in the config file plus broker credentials in the
// environment.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod availability;
mod broker;
mod config;
mod cooldown;
mod errors;
mod events;
mod feed;
mod journal;
mod oracle;
mod retry;
mod risk;
mod session;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::broker::client::RestBrokerClient;
use crate::broker::sim::SimBroker;
use crate::broker::TradeExecutor;
use crate::config::SessionConfig;
use crate::events::{EventSink, TracingEventSink};
use crate::feed::HttpQuoteSource;
use crate::oracle::openai::OpenAiOracle;
use crate::oracle::DecisionOracle;
use crate::session::{run_session, select_initial_symbol, SessionCollaborators};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Vega Binary Nexus — Starting Up                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = SessionConfig::load("session_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        SessionConfig::default()
    });

    // Env overrides sit on top of the file-loaded values; bad values are
    // warned about and ignored rather than clobbering the file.
    let env_symbols = std::env::var("VEGA_SYMBOLS").ok();
    let env_cap = std::env::var("VEGA_MAX_ITERATIONS").ok();
    config.apply_overrides(env_symbols.as_deref(), env_cap.as_deref());
    if config.symbols.is_empty() {
        config.symbols = SessionConfig::default().symbols;
    }

    info!(symbols = ?config.symbols, "Configured trading pairs");
    info!(
        demo_mode = config.demo_mode,
        trade_amount = config.trade_amount,
        profit_target_pct = config.profit_target_pct,
        loss_limit_pct = config.loss_limit_pct,
        "Session risk budget"
    );

    // ── 2. Build collaborators ───────────────────────────────────────────
    let quote_api_key = std::env::var("QUOTE_API_KEY").unwrap_or_default();
    let llm_api_key = std::env::var("LLM_API_KEY").unwrap_or_default();

    let quotes = Arc::new(HttpQuoteSource::new(quote_api_key));
    let oracle: Arc<dyn DecisionOracle> = Arc::new(OpenAiOracle::new(llm_api_key));

    let broker: Arc<dyn TradeExecutor> = if config.demo_mode {
        info!("Demo mode — trades routed to the local simulator");
        Arc::new(SimBroker::default())
    } else {
        let api_key = std::env::var("BROKER_API_KEY").unwrap_or_default();
        let api_secret = std::env::var("BROKER_API_SECRET").unwrap_or_default();
        let base_url = std::env::var("BROKER_BASE_URL")
            .unwrap_or_else(|_| "https://api.broker.example".into());
        Arc::new(RestBrokerClient::new(api_key, api_secret, base_url))
    };

    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

    let collaborators = SessionCollaborators {
        quotes,
        oracle: oracle.clone(),
        broker,
        events: Some(events),
    };

    // ── 3. Initial pair selection ────────────────────────────────────────
    let initial_symbol =
        select_initial_symbol(&config.retry_policy(), &oracle, &config.symbols).await;
    info!(symbol = %initial_symbol, "Starting symbol selected");

    // ── 4. Stop signal (Ctrl+C) ──────────────────────────────────────────
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received — stopping after current transition");
            let _ = stop_tx.send(true);
        }
    });

    // ── 5. Run the session ───────────────────────────────────────────────
    let trades =
        run_session(&config, collaborators, Some(initial_symbol.as_str()), stop_rx).await;

    // ── 6. Summary ───────────────────────────────────────────────────────
    let wins = trades
        .iter()
        .filter(|t| t.outcome == types::TradeOutcome::Win)
        .count();
    let losses = trades.len() - wins;
    info!(
        trades = trades.len(),
        wins, losses, "Session complete"
    );
    if trades.is_empty() {
        info!("No trades executed this session");
    }

    if let Err(e) = config.save("session_config.json") {
        error!(error = %e, "Failed to save session config on shutdown");
    }

    info!("Vega Binary Nexus shut down complete.");
    Ok(())
}
