// =============================================================================
// Session Controller — the trading loop state machine
// =============================================================================
//
// One iteration per cycle, strictly sequential:
//
//   SELECT_SYMBOL -> FETCH_CONTEXT -> DECIDE -> (ACT | SKIP)
//                 -> UPDATE_STATE -> (CONTINUE | ROTATE | COOLDOWN | STOP)
//
// The controller owns all mutable session state (symbol index, counters,
// blacklist, journal); nothing is shared across iterations. Every external
// call goes through the retry policy and has an explicit fallback, so no
// collaborator failure can crash the loop. The only termination paths are
// the risk gate, the optional iteration cap, and the external stop signal,
// which is honored at the top of each state transition and during every
// long wait except the trade-expiry wait: a placed trade always settles
// before the session reacts to anything else.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::availability::AvailabilityTracker;
use crate::broker::TradeExecutor;
use crate::config::SessionConfig;
use crate::cooldown::CooldownManager;
use crate::events::{emit, EventSink, SessionEvent, StopReason};
use crate::feed::QuoteSource;
use crate::journal::TradeJournal;
use crate::oracle::DecisionOracle;
use crate::retry::RetryPolicy;
use crate::risk::RiskGate;
use crate::types::{Decision, Quote, TradeOutcome, TradeRecord};

/// The external collaborators a session drives.
#[derive(Clone)]
pub struct SessionCollaborators {
    pub quotes: Arc<dyn QuoteSource>,
    pub oracle: Arc<dyn DecisionOracle>,
    pub broker: Arc<dyn TradeExecutor>,
    pub events: Option<Arc<dyn EventSink>>,
}

/// Run one trading session to completion.
///
/// `initial_symbol` overrides the starting symbol when it names a member of
/// the configured universe. Returns the full trade history accumulated when
/// the session stops.
pub async fn run_session(
    config: &SessionConfig,
    collaborators: SessionCollaborators,
    initial_symbol: Option<&str>,
    stop: watch::Receiver<bool>,
) -> Vec<TradeRecord> {
    let start_index = initial_symbol
        .and_then(|wanted| config.symbols.iter().position(|s| s == wanted))
        .unwrap_or(0);

    SessionController::new(config.clone(), collaborators, start_index)
        .run(stop)
        .await
}

/// Ask the oracle for the starting symbol, falling back to the first
/// configured symbol when the call fails after retries. `symbols` must be
/// non-empty.
pub async fn select_initial_symbol(
    policy: &RetryPolicy,
    oracle: &Arc<dyn DecisionOracle>,
    symbols: &[String],
) -> String {
    match policy
        .run("pair_selection", || oracle.select_pair(symbols))
        .await
    {
        Ok(symbol) => symbol,
        Err(e) => {
            warn!(
                error = %e,
                fallback = %symbols[0],
                "pair selection failed — using first symbol"
            );
            symbols[0].clone()
        }
    }
}

struct SessionController {
    cfg: SessionConfig,
    collab: SessionCollaborators,
    retry: RetryPolicy,
    gate: RiskGate,
    tracker: AvailabilityTracker,
    cooldown: CooldownManager,
    journal: TradeJournal,
    symbol_index: usize,
    no_trade_streak: u32,
}

impl SessionController {
    fn new(cfg: SessionConfig, collab: SessionCollaborators, start_index: usize) -> Self {
        let retry = cfg.retry_policy();
        let gate = RiskGate::new(cfg.risk_budget());
        let cooldown = CooldownManager::new(cfg.max_consecutive_switches, cfg.cooldown_duration());
        Self {
            cfg,
            collab,
            retry,
            gate,
            tracker: AvailabilityTracker::new(),
            cooldown,
            journal: TradeJournal::new(),
            symbol_index: start_index,
            no_trade_streak: 0,
        }
    }

    async fn run(mut self, mut stop: watch::Receiver<bool>) -> Vec<TradeRecord> {
        if self.cfg.symbols.is_empty() {
            error!("session started with an empty symbol universe — nothing to do");
            return Vec::new();
        }

        info!(
            symbols = ?self.cfg.symbols,
            start_symbol = %self.cfg.symbols[self.symbol_index % self.cfg.symbols.len()],
            max_iterations = ?self.cfg.max_iterations,
            "session starting"
        );

        let mut iterations: u64 = 0;

        loop {
            if *stop.borrow() {
                self.stopped(StopReason::Cancelled);
                break;
            }

            // --- SELECT_SYMBOL -------------------------------------------
            let symbol = match self.select_symbol(&mut stop).await {
                Some(symbol) => symbol,
                None => {
                    self.stopped(StopReason::Cancelled);
                    break;
                }
            };

            // --- FETCH_CONTEXT / DECIDE / ACT-or-SKIP --------------------
            match self.fetch_quote(&symbol).await {
                Some(quote) => {
                    let decision = self.decide(&symbol, &quote).await;
                    if decision.is_actionable() {
                        self.act(&symbol, decision).await;
                    } else {
                        self.skip(&symbol, &mut stop).await;
                    }
                }
                // Failed context fetch is a no-op for this iteration.
                None => {}
            }

            // --- UPDATE_STATE --------------------------------------------
            if self.gate.should_stop(&self.journal.metrics()) {
                self.stopped(StopReason::RiskBoundary);
                break;
            }

            iterations += 1;
            if let Some(cap) = self.cfg.max_iterations {
                if iterations >= cap {
                    info!(iterations, "iteration cap reached");
                    self.stopped(StopReason::IterationCap);
                    break;
                }
            }

            if interruptible_sleep(&mut stop, self.cfg.cycle_delay()).await {
                self.stopped(StopReason::Cancelled);
                break;
            }
        }

        self.journal.into_records()
    }

    /// Resolve the active symbol, rotating past blacklisted entries and
    /// waiting for the earliest expiry when every symbol is excluded.
    /// Returns `None` only when the stop signal fires during a wait.
    async fn select_symbol(&mut self, stop: &mut watch::Receiver<bool>) -> Option<String> {
        loop {
            if *stop.borrow() {
                return None;
            }

            let now = Instant::now();
            let current = self.cfg.symbols[self.symbol_index].clone();
            if self.tracker.is_available(&current, now) {
                return Some(current);
            }

            if let Some((idx, symbol)) =
                self.tracker
                    .next_available(&self.cfg.symbols, self.symbol_index, now)
            {
                emit(
                    &self.collab.events,
                    SessionEvent::SymbolRotated {
                        from: current,
                        to: symbol.clone(),
                    },
                );
                info!(symbol = %symbol, "rotated to next available symbol");
                self.symbol_index = idx;
                return Some(symbol);
            }

            // Everything is blacklisted: sleep precisely until the first
            // entry frees up, then re-run selection.
            let Some((symbol, expiry)) = self.tracker.earliest_expiry() else {
                // No symbols and no blacklist entries cannot happen with a
                // non-empty universe; bail out rather than spin.
                error!("no available symbol and no pending expiry — stopping selection");
                return None;
            };
            let wait = expiry.saturating_duration_since(now);
            emit(
                &self.collab.events,
                SessionEvent::WaitingForAvailability {
                    symbol: symbol.clone(),
                    wait_secs: wait.as_secs(),
                },
            );
            warn!(
                symbol = %symbol,
                wait_secs = wait.as_secs(),
                "all symbols blacklisted — waiting for earliest expiry"
            );
            if interruptible_sleep(stop, wait).await {
                return None;
            }
        }
    }

    /// FETCH_CONTEXT: the current quote, or `None` after retries exhaust.
    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        let quotes = self.collab.quotes.clone();
        match self
            .retry
            .run("quote_fetch", || quotes.get_quote(symbol))
            .await
        {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(symbol, error = %e, "quote fetch failed — skipping iteration");
                None
            }
        }
    }

    /// DECIDE: ask the oracle and normalize; any failure falls back to
    /// NO TRADE.
    async fn decide(&self, symbol: &str, quote: &Quote) -> Decision {
        let oracle = self.collab.oracle.clone();
        let history = self.journal.context(self.cfg.history_window);
        let raw = self
            .retry
            .run("decision", || oracle.get_decision(symbol, quote, history))
            .await;

        match raw {
            Ok(text) => {
                let decision = Decision::parse(&text);
                info!(symbol, decision = %decision, "oracle decision");
                decision
            }
            Err(e) => {
                warn!(symbol, error = %e, "decision call failed — defaulting to NO TRADE");
                Decision::NoTrade
            }
        }
    }

    /// ACT: place the trade, block for its full duration, settle the
    /// outcome, and record it.
    async fn act(&mut self, symbol: &str, decision: Decision) {
        let broker = self.collab.broker.clone();
        let amount = self.cfg.trade_amount;
        let duration = self.cfg.trade_duration();

        let trade_id = match self
            .retry
            .run("trade_placement", || {
                broker.place_trade(symbol, amount, decision, duration)
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Placement failure records nothing for this iteration.
                warn!(symbol, decision = %decision, error = %e, "trade placement failed");
                return;
            }
        };

        info!(
            symbol,
            decision = %decision,
            trade_id = %trade_id,
            duration_secs = duration.as_secs(),
            "trade placed — waiting for expiry"
        );

        // The outcome is undefined until the option expires; no early polling,
        // and deliberately not stop-interruptible: the in-flight trade must
        // settle and be recorded before the session can end.
        tokio::time::sleep(duration).await;

        let outcome = match self
            .retry
            .run("trade_result", || broker.check_trade_result(&trade_id))
            .await
        {
            Ok(true) => TradeOutcome::Win,
            Ok(false) => TradeOutcome::Loss,
            Err(e) => {
                // Conservative accounting: an unverifiable outcome is a loss.
                warn!(trade_id = %trade_id, error = %e, "outcome check failed — recording loss");
                TradeOutcome::Loss
            }
        };

        info!(symbol, trade_id = %trade_id, outcome = %outcome, "trade settled");
        self.journal.record(symbol, decision, outcome);
        self.cooldown.record_successful_action();
        self.no_trade_streak = 0;
    }

    /// SKIP: track the inactivity streak; at the threshold, blacklist the
    /// symbol and possibly pause the whole loop. Rotation itself happens on
    /// the next SELECT_SYMBOL, since the current symbol is now excluded.
    async fn skip(&mut self, symbol: &str, stop: &mut watch::Receiver<bool>) {
        self.no_trade_streak += 1;
        info!(
            symbol,
            streak = self.no_trade_streak,
            max = self.cfg.max_consecutive_no_trade,
            "no-trade decision"
        );

        if self.no_trade_streak < self.cfg.max_consecutive_no_trade {
            return;
        }

        let duration = self.cfg.blacklist_duration();
        self.tracker.blacklist(symbol, Instant::now(), duration);
        emit(
            &self.collab.events,
            SessionEvent::blacklisted(symbol, duration),
        );
        self.no_trade_streak = 0;

        if self.cooldown.record_switch() {
            let pause = self.cooldown.cooldown_duration();
            emit(&self.collab.events, SessionEvent::cooldown(pause));
            warn!(
                pause_secs = pause.as_secs(),
                "too many consecutive switches — full-loop cooldown"
            );
            // Cancellation is re-checked at the top of the loop.
            interruptible_sleep(stop, pause).await;
        }
    }

    fn stopped(&self, reason: StopReason) {
        info!(reason = %reason, trades = self.journal.len(), "session stopped");
        emit(
            &self.collab.events,
            SessionEvent::SessionStopped {
                reason,
                trades: self.journal.len(),
            },
        );
    }
}

/// Sleep for `duration`, returning early (true) if the stop signal fires.
async fn interruptible_sleep(stop: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if *stop.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = wait_for_stop(stop) => true,
    }
}

async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            return;
        }
        if stop.changed().await.is_err() {
            // Sender dropped: no stop can ever arrive.
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CallFailure;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    // --- Test doubles -----------------------------------------------------

    struct StaticQuotes;

    #[async_trait]
    impl QuoteSource for StaticQuotes {
        async fn get_quote(&self, symbol: &str) -> Result<Quote, CallFailure> {
            Ok(Quote {
                symbol: symbol.to_string(),
                price: 100.0,
                timestamp: chrono::Utc::now(),
            })
        }
    }

    struct FailingQuotes;

    #[async_trait]
    impl QuoteSource for FailingQuotes {
        async fn get_quote(&self, _symbol: &str) -> Result<Quote, CallFailure> {
            Err(CallFailure::other("upstream unreachable"))
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl DecisionOracle for FailingOracle {
        async fn get_decision(
            &self,
            _symbol: &str,
            _quote: &Quote,
            _history: &[TradeRecord],
        ) -> Result<String, CallFailure> {
            Err(CallFailure::timeout("oracle unreachable"))
        }

        async fn select_pair(&self, _symbols: &[String]) -> Result<String, CallFailure> {
            Err(CallFailure::timeout("oracle unreachable"))
        }
    }

    struct ScriptedOracle {
        decisions: Mutex<VecDeque<String>>,
        calls: AtomicU32,
    }

    impl ScriptedOracle {
        fn new(decisions: &[&str]) -> Self {
            Self {
                decisions: Mutex::new(decisions.iter().map(|s| s.to_string()).collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DecisionOracle for ScriptedOracle {
        async fn get_decision(
            &self,
            _symbol: &str,
            _quote: &Quote,
            _history: &[TradeRecord],
        ) -> Result<String, CallFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .decisions
                .lock()
                .pop_front()
                .unwrap_or_else(|| "NO TRADE".to_string()))
        }

        async fn select_pair(&self, symbols: &[String]) -> Result<String, CallFailure> {
            Ok(symbols[0].clone())
        }
    }

    struct ScriptedBroker {
        outcomes: Mutex<VecDeque<bool>>,
        placements: AtomicU32,
        broken_results: bool,
    }

    impl ScriptedBroker {
        fn new(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                placements: AtomicU32::new(0),
                broken_results: false,
            }
        }

        fn with_broken_results() -> Self {
            Self {
                outcomes: Mutex::new(VecDeque::new()),
                placements: AtomicU32::new(0),
                broken_results: true,
            }
        }
    }

    #[async_trait]
    impl TradeExecutor for ScriptedBroker {
        async fn place_trade(
            &self,
            _symbol: &str,
            _amount: f64,
            _direction: Decision,
            _duration: Duration,
        ) -> Result<String, CallFailure> {
            let n = self.placements.fetch_add(1, Ordering::SeqCst);
            Ok(format!("trade-{n}"))
        }

        async fn check_trade_result(&self, _trade_id: &str) -> Result<bool, CallFailure> {
            if self.broken_results {
                return Err(CallFailure::timeout("result endpoint down"));
            }
            Ok(self.outcomes.lock().pop_front().unwrap_or(false))
        }
    }

    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl EventSink for CapturingSink {
        fn record_event(&self, event: &SessionEvent) {
            self.events.lock().push(event.clone());
        }
    }

    // --- Helpers ----------------------------------------------------------

    fn test_config(symbols: &[&str]) -> SessionConfig {
        SessionConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            trade_amount: 10.0,
            initial_balance: 100.0,
            profit_target_pct: 5.0,
            loss_limit_pct: 2.0,
            trade_duration_secs: 60,
            cycle_delay_secs: 1,
            max_consecutive_no_trade: 5,
            blacklist_duration_secs: 300,
            max_consecutive_switches: 3,
            cooldown_duration_secs: 60,
            retry_max_attempts: 3,
            retry_base_delay_secs: 1,
            history_window: None,
            max_iterations: Some(3),
            demo_mode: true,
        }
    }

    fn collaborators(
        quotes: Arc<dyn QuoteSource>,
        oracle: Arc<dyn DecisionOracle>,
        broker: Arc<dyn TradeExecutor>,
        events: Option<Arc<dyn EventSink>>,
    ) -> SessionCollaborators {
        SessionCollaborators {
            quotes,
            oracle,
            broker,
            events,
        }
    }

    fn no_stop() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        // Keep the sender alive for the whole test.
        std::mem::forget(tx);
        rx
    }

    // --- Tests ------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn single_win_stops_at_profit_target() {
        // +10 on 100 = +10% >= 5% target: exactly one trade.
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["CALL"]));
        let broker = Arc::new(ScriptedBroker::new(&[true]));
        let collab =
            collaborators(Arc::new(StaticQuotes), oracle.clone(), broker.clone(), None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].decision, Decision::Call);
        assert_eq!(trades[0].outcome, TradeOutcome::Win);
    }

    #[tokio::test(start_paused = true)]
    async fn single_loss_stops_at_loss_limit() {
        // -10 on 100 = -10% <= -2% limit: the second scripted PUT never runs.
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["PUT", "PUT"]));
        let broker = Arc::new(ScriptedBroker::new(&[false, false]));
        let collab =
            collaborators(Arc::new(StaticQuotes), oracle.clone(), broker, None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert_eq!(trades.len(), 1);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_script_still_stops_after_first_win() {
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["CALL", "PUT", "CALL"]));
        let broker = Arc::new(ScriptedBroker::new(&[true, false, true]));
        let collab = collaborators(Arc::new(StaticQuotes), oracle, broker, None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert_eq!(trades.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_trades_runs_to_iteration_cap() {
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["NO TRADE", "NO TRADE", "NO TRADE"]));
        let broker = Arc::new(ScriptedBroker::new(&[]));
        let collab = collaborators(Arc::new(StaticQuotes), oracle.clone(), broker, None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert!(trades.is_empty());
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn quote_failure_skips_decision_and_continues() {
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["CALL"]));
        let broker = Arc::new(ScriptedBroker::new(&[true]));
        let collab =
            collaborators(Arc::new(FailingQuotes), oracle.clone(), broker, None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert!(trades.is_empty());
        // Oracle never consulted without market context.
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn oracle_failure_defaults_to_no_trade_and_advances_streak() {
        // Two failed decision calls in a row count as two NO TRADEs, so the
        // inactivity streak reaches the threshold and the symbol is
        // blacklisted without a single placement.
        let mut cfg = test_config(&["EURUSD"]);
        cfg.max_consecutive_no_trade = 2;
        cfg.max_iterations = Some(2);

        let broker = Arc::new(ScriptedBroker::new(&[true]));
        let sink = Arc::new(CapturingSink::default());
        let collab = collaborators(
            Arc::new(StaticQuotes),
            Arc::new(FailingOracle),
            broker.clone(),
            Some(sink.clone() as Arc<dyn EventSink>),
        );

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert!(trades.is_empty());
        assert_eq!(broker.placements.load(Ordering::SeqCst), 0);
        assert!(sink.events.lock().iter().any(|e| matches!(
            e,
            SessionEvent::SymbolBlacklisted { symbol, .. } if symbol == "EURUSD"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pair_selection_falls_back_to_first_symbol() {
        let symbols = vec!["EURUSD".to_string(), "GBPUSD".to_string()];
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let oracle: Arc<dyn DecisionOracle> = Arc::new(FailingOracle);

        let chosen = select_initial_symbol(&policy, &oracle, &symbols).await;
        assert_eq!(chosen, "EURUSD");
    }

    #[tokio::test(start_paused = true)]
    async fn pair_selection_uses_oracle_choice_when_it_succeeds() {
        let symbols = vec!["EURUSD".to_string(), "GBPUSD".to_string()];
        let policy = RetryPolicy::default();

        struct SecondPicker;

        #[async_trait]
        impl DecisionOracle for SecondPicker {
            async fn get_decision(
                &self,
                _symbol: &str,
                _quote: &Quote,
                _history: &[TradeRecord],
            ) -> Result<String, CallFailure> {
                Ok("NO TRADE".to_string())
            }

            async fn select_pair(&self, symbols: &[String]) -> Result<String, CallFailure> {
                Ok(symbols[1].clone())
            }
        }

        let oracle: Arc<dyn DecisionOracle> = Arc::new(SecondPicker);
        let chosen = select_initial_symbol(&policy, &oracle, &symbols).await;
        assert_eq!(chosen, "GBPUSD");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_outcome_check_records_conservative_loss() {
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["CALL"]));
        let broker = Arc::new(ScriptedBroker::with_broken_results());
        let collab = collaborators(Arc::new(StaticQuotes), oracle, broker, None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        // Loss recorded, and -10% breaches the 2% loss limit immediately.
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].outcome, TradeOutcome::Loss);
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_blacklists_and_rotates_symbols() {
        let mut cfg = test_config(&["EURUSD", "GBPUSD"]);
        cfg.max_consecutive_no_trade = 2;
        cfg.max_iterations = Some(5);

        let oracle = Arc::new(ScriptedOracle::new(&[]));
        let broker = Arc::new(ScriptedBroker::new(&[]));
        let sink = Arc::new(CapturingSink::default());
        let collab = collaborators(
            Arc::new(StaticQuotes),
            oracle,
            broker,
            Some(sink.clone() as Arc<dyn EventSink>),
        );

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert!(trades.is_empty());

        let events = sink.events.lock();
        let blacklisted: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::SymbolBlacklisted { symbol, .. } => Some(symbol.clone()),
                _ => None,
            })
            .collect();
        // Two no-trades blacklist EURUSD, rotation lands on GBPUSD, and two
        // more blacklist it as well.
        assert_eq!(blacklisted, vec!["EURUSD", "GBPUSD"]);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::SymbolRotated { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_fires_after_repeated_switches() {
        // One symbol, switch threshold 1: the first blacklist triggers a
        // cooldown, then selection waits out the blacklist expiry.
        let mut cfg = test_config(&["EURUSD"]);
        cfg.max_consecutive_no_trade = 1;
        cfg.max_consecutive_switches = 1;
        cfg.max_iterations = Some(2);

        let oracle = Arc::new(ScriptedOracle::new(&[]));
        let broker = Arc::new(ScriptedBroker::new(&[]));
        let sink = Arc::new(CapturingSink::default());
        let collab = collaborators(
            Arc::new(StaticQuotes),
            oracle,
            broker,
            Some(sink.clone() as Arc<dyn EventSink>),
        );

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        assert!(trades.is_empty());

        let events = sink.events.lock();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::CooldownStarted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::WaitingForAvailability { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn pre_set_stop_signal_ends_session_immediately() {
        let cfg = test_config(&["EURUSD"]);
        let oracle = Arc::new(ScriptedOracle::new(&["CALL"]));
        let broker = Arc::new(ScriptedBroker::new(&[true]));
        let collab = collaborators(Arc::new(StaticQuotes), oracle.clone(), broker, None);

        let (tx, rx) = watch::channel(true);
        let trades = run_session(&cfg, collab, None, rx).await;
        drop(tx);
        assert!(trades.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_symbol_selects_starting_index() {
        let mut cfg = test_config(&["EURUSD", "GBPUSD", "USDJPY"]);
        cfg.max_iterations = Some(1);
        let oracle = Arc::new(ScriptedOracle::new(&["CALL"]));
        let broker = Arc::new(ScriptedBroker::new(&[true]));
        let collab = collaborators(Arc::new(StaticQuotes), oracle, broker, None);

        let trades = run_session(&cfg, collab, Some("USDJPY"), no_stop()).await;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "USDJPY");
    }

    #[tokio::test(start_paused = true)]
    async fn oracle_sees_windowed_history() {
        // Three wins needed to cross a 25% target on a 400 balance; the
        // windowed context never exceeds one record.
        let mut cfg = test_config(&["EURUSD"]);
        cfg.initial_balance = 400.0;
        cfg.profit_target_pct = 7.0;
        cfg.history_window = Some(1);
        cfg.max_iterations = Some(10);

        struct WindowAssertingOracle {
            calls: AtomicU32,
        }

        #[async_trait]
        impl DecisionOracle for WindowAssertingOracle {
            async fn get_decision(
                &self,
                _symbol: &str,
                _quote: &Quote,
                history: &[TradeRecord],
            ) -> Result<String, CallFailure> {
                assert!(history.len() <= 1);
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok("CALL".to_string())
            }

            async fn select_pair(&self, symbols: &[String]) -> Result<String, CallFailure> {
                Ok(symbols[0].clone())
            }
        }

        let oracle = Arc::new(WindowAssertingOracle {
            calls: AtomicU32::new(0),
        });
        let broker = Arc::new(ScriptedBroker::new(&[true, true, true]));
        let collab = collaborators(Arc::new(StaticQuotes), oracle, broker, None);

        let trades = run_session(&cfg, collab, None, no_stop()).await;
        // 3 wins * 10 = +30 on 400 = 7.5% >= 7%.
        assert_eq!(trades.len(), 3);
    }
}
