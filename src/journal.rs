// =============================================================================
// Trade Journal — append-only session trade history + running metrics
// =============================================================================
//
// The journal owns every settled TradeRecord for the life of the session.
// Metrics are recomputed on each append. The slice handed to the decision
// oracle as context is bounded by an explicit, configurable window rather
// than growing without limit.
// =============================================================================

use chrono::Utc;

use crate::types::{Decision, PerformanceMetrics, TradeOutcome, TradeRecord};

#[derive(Debug, Default)]
pub struct TradeJournal {
    records: Vec<TradeRecord>,
    metrics: PerformanceMetrics,
}

impl TradeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a settled trade and update the running tally.
    pub fn record(&mut self, symbol: &str, decision: Decision, outcome: TradeOutcome) {
        self.records.push(TradeRecord {
            symbol: symbol.to_string(),
            decision,
            outcome,
            timestamp: Utc::now(),
        });

        match outcome {
            TradeOutcome::Win => self.metrics.wins += 1,
            TradeOutcome::Loss => self.metrics.losses += 1,
        }
        let total = self.metrics.total_trades();
        self.metrics.win_rate = if total > 0 {
            self.metrics.wins as f64 / total as f64
        } else {
            0.0
        };
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    /// The most recent trades for oracle context. `None` means the full
    /// unpruned history.
    pub fn context(&self, window: Option<usize>) -> &[TradeRecord] {
        match window {
            Some(n) if n < self.records.len() => &self.records[self.records.len() - n..],
            _ => &self.records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand the full history back to the caller when the session ends.
    pub fn into_records(self) -> Vec<TradeRecord> {
        self.records
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_track_wins_and_losses() {
        let mut j = TradeJournal::new();
        j.record("EURUSD", Decision::Call, TradeOutcome::Win);
        j.record("EURUSD", Decision::Put, TradeOutcome::Loss);
        j.record("GBPUSD", Decision::Call, TradeOutcome::Win);

        let m = j.metrics();
        assert_eq!(m.wins, 2);
        assert_eq!(m.losses, 1);
        assert!((m.win_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_journal_has_zero_win_rate() {
        let j = TradeJournal::new();
        assert_eq!(j.metrics().win_rate, 0.0);
        assert!(j.is_empty());
    }

    #[test]
    fn context_window_bounds_history() {
        let mut j = TradeJournal::new();
        for _ in 0..5 {
            j.record("EURUSD", Decision::Call, TradeOutcome::Win);
        }
        assert_eq!(j.context(Some(2)).len(), 2);
        assert_eq!(j.context(Some(10)).len(), 5);
        assert_eq!(j.context(None).len(), 5);
    }

    #[test]
    fn into_records_returns_everything_in_order() {
        let mut j = TradeJournal::new();
        j.record("EURUSD", Decision::Call, TradeOutcome::Win);
        j.record("GBPUSD", Decision::Put, TradeOutcome::Loss);
        let records = j.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "EURUSD");
        assert_eq!(records[1].decision, Decision::Put);
    }
}
