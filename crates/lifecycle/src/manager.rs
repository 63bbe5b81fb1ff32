//! Per-cycle lifecycle evaluation in fixed priority order.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::ladder::check_profit_ladder;
use crate::stops::{check_dte_forced_exit, check_hard_stop};
use crate::trailing::{check_trailing_stop, maybe_arm};
use crate::types::{ExitAction, ExitReason, LifecycleConfig, PositionState, PositionStatus};

/// Evaluates and applies exit rules for open positions.
///
/// Priority per cycle: flatten-at-close, DTE forced exit, hard stop, profit
/// ladder, trailing stop. At most one rule fires per position per cycle.
#[derive(Debug, Clone, Default)]
pub struct PositionLifecycleManager {
    config: LifecycleConfig,
}

impl PositionLifecycleManager {
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self { config }
    }

    /// Marks the position at `price` and returns the first rule that fires.
    ///
    /// `flatten` is the hard market-close deadline: it overrides every other
    /// rule and exits unconditionally.
    pub fn evaluate(
        &self,
        pos: &mut PositionState,
        price: Decimal,
        today: NaiveDate,
        flatten: bool,
    ) -> Option<ExitAction> {
        if pos.is_closed() {
            return None;
        }
        pos.mark(price);
        maybe_arm(pos, &self.config);

        if flatten {
            return Some(ExitAction::FullExit {
                reason: ExitReason::FlattenAtClose,
            });
        }
        if let Some(action) = check_dte_forced_exit(pos, &self.config, today) {
            return Some(action);
        }
        if let Some(action) = check_hard_stop(pos, &self.config) {
            return Some(action);
        }
        if let Some(action) = check_profit_ladder(pos, &self.config) {
            return Some(action);
        }
        check_trailing_stop(pos, &self.config)
    }

    /// Applies an exit action to the position state.
    pub fn apply(&self, pos: &mut PositionState, action: &ExitAction) {
        if let ExitReason::ProfitTier(tier) = action.reason() {
            if !pos.tier_fired(tier) {
                pos.fired_tiers.push(tier);
            }
        }
        match action {
            ExitAction::FullExit { reason } => {
                tracing::info!(
                    contract = pos.contract.display_name(),
                    reason = %reason,
                    contracts = pos.contracts,
                    "Position closed"
                );
                pos.contracts = 0;
                pos.status = PositionStatus::Closed;
            }
            ExitAction::PartialExit { contracts, reason } => {
                pos.contracts = (pos.contracts - contracts).max(0);
                tracing::info!(
                    contract = pos.contract.display_name(),
                    reason = %reason,
                    sold = contracts,
                    remaining = pos.contracts,
                    "Partial exit"
                );
                if pos.contracts == 0 {
                    pos.status = PositionStatus::Closed;
                }
            }
        }
    }

    /// Convenience wrapper: evaluate and immediately apply.
    pub fn run(
        &self,
        pos: &mut PositionState,
        price: Decimal,
        today: NaiveDate,
        flatten: bool,
    ) -> Option<ExitAction> {
        let action = self.evaluate(pos, price, today, flatten)?;
        self.apply(pos, &action);
        Some(action)
    }
}
