// =============================================================================
// Risk Gate — profit-target / loss-limit session termination
// =============================================================================
//
// PnL is realized only: (wins - losses) * trade_amount, expressed as a
// percentage of the starting balance. The session stops the moment that
// percentage reaches the profit target or breaches the loss limit. The
// check is a pure function of accumulated metrics and the immutable
// budget — it carries no state of its own and is independent of which
// symbol is active.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::PerformanceMetrics;

/// Immutable per-session risk configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskBudget {
    /// Account balance at session start, for percentage calculations.
    pub initial_balance: f64,
    /// Fixed stake per trade.
    pub trade_amount: f64,
    /// Stop once realized PnL reaches this percentage of the balance.
    pub profit_target_pct: f64,
    /// Stop once realized PnL falls to minus this percentage.
    pub loss_limit_pct: f64,
}

/// Evaluates the session termination boundary.
#[derive(Debug, Clone, Copy)]
pub struct RiskGate {
    budget: RiskBudget,
}

impl RiskGate {
    pub fn new(budget: RiskBudget) -> Self {
        Self { budget }
    }

    /// Realized PnL in account currency.
    pub fn pnl(&self, metrics: &PerformanceMetrics) -> f64 {
        (metrics.wins as f64 - metrics.losses as f64) * self.budget.trade_amount
    }

    /// Realized PnL as a percentage of the starting balance. A zero starting
    /// balance yields 0 rather than a division failure.
    pub fn pnl_pct(&self, metrics: &PerformanceMetrics) -> f64 {
        if self.budget.initial_balance > 0.0 {
            self.pnl(metrics) / self.budget.initial_balance * 100.0
        } else {
            0.0
        }
    }

    /// True iff the session must terminate: profit target reached or loss
    /// limit breached.
    pub fn should_stop(&self, metrics: &PerformanceMetrics) -> bool {
        let pnl_pct = self.pnl_pct(metrics);
        let stop = pnl_pct >= self.budget.profit_target_pct
            || pnl_pct <= -self.budget.loss_limit_pct;
        if stop {
            info!(
                pnl_pct = format!("{pnl_pct:.2}"),
                profit_target_pct = self.budget.profit_target_pct,
                loss_limit_pct = self.budget.loss_limit_pct,
                wins = metrics.wins,
                losses = metrics.losses,
                "risk boundary crossed — session must stop"
            );
        }
        stop
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> RiskBudget {
        RiskBudget {
            initial_balance: 100.0,
            trade_amount: 10.0,
            profit_target_pct: 5.0,
            loss_limit_pct: 2.0,
        }
    }

    fn metrics(wins: u32, losses: u32) -> PerformanceMetrics {
        PerformanceMetrics {
            wins,
            losses,
            win_rate: 0.0,
        }
    }

    #[test]
    fn single_win_hits_profit_target() {
        // +10 on a 100 balance = +10% >= 5% target.
        let gate = RiskGate::new(budget());
        assert!(gate.should_stop(&metrics(1, 0)));
    }

    #[test]
    fn single_loss_hits_loss_limit() {
        // -10 on a 100 balance = -10% <= -2% limit.
        let gate = RiskGate::new(budget());
        assert!(gate.should_stop(&metrics(0, 1)));
    }

    #[test]
    fn zero_trades_never_stops() {
        let gate = RiskGate::new(budget());
        assert!(!gate.should_stop(&metrics(0, 0)));
    }

    #[test]
    fn balanced_record_inside_the_band_continues() {
        let gate = RiskGate::new(RiskBudget {
            initial_balance: 1000.0,
            trade_amount: 10.0,
            profit_target_pct: 5.0,
            loss_limit_pct: 5.0,
        });
        // +10 on 1000 = +1%: inside (-5%, 5%).
        assert!(!gate.should_stop(&metrics(2, 1)));
    }

    #[test]
    fn exact_target_boundary_stops() {
        let gate = RiskGate::new(RiskBudget {
            initial_balance: 200.0,
            trade_amount: 10.0,
            profit_target_pct: 5.0,
            loss_limit_pct: 5.0,
        });
        // +10 on 200 = exactly 5%.
        assert!(gate.should_stop(&metrics(1, 0)));
    }

    #[test]
    fn zero_balance_treated_as_flat() {
        let gate = RiskGate::new(RiskBudget {
            initial_balance: 0.0,
            trade_amount: 10.0,
            profit_target_pct: 5.0,
            loss_limit_pct: 2.0,
        });
        assert_eq!(gate.pnl_pct(&metrics(3, 0)), 0.0);
        assert!(!gate.should_stop(&metrics(3, 0)));
    }
}
