//! DTE forced-exit and hard stop rules.

use chrono::NaiveDate;
use odte_core::RejectReason;

use crate::types::{ExitAction, ExitReason, LifecycleConfig, PositionState};

/// Forces a full exit when the position is too close to expiry without
/// enough profit to justify holding through gamma risk.
pub fn check_dte_forced_exit(
    pos: &PositionState,
    config: &LifecycleConfig,
    today: NaiveDate,
) -> Option<ExitAction> {
    let dte = pos.days_to_expiry(today);
    let profit_pct = pos.profit_pct();

    for tier in &config.dte_exit_tiers {
        if dte < tier.below_dte {
            if profit_pct < tier.required_profit_pct {
                tracing::warn!(
                    contract = pos.contract.display_name(),
                    dte,
                    profit_pct = format!("{profit_pct:.1}"),
                    required = format!("{:.1}", tier.required_profit_pct),
                    "DTE forced exit"
                );
                return Some(ExitAction::FullExit {
                    reason: ExitReason::DteForcedExit,
                });
            }
            // Inside the tightest applicable tier with enough profit: the
            // looser tiers cannot apply either.
            let held = RejectReason::DteForcedExitNotMet {
                dte,
                required_profit_pct: tier.required_profit_pct,
            };
            tracing::debug!(
                contract = pos.contract.display_name(),
                profit_pct = format!("{profit_pct:.1}"),
                reason = held.code(),
                "Holding through expiry window"
            );
            return None;
        }
    }
    None
}

/// Full exit once the loss reaches the hard stop.
pub fn check_hard_stop(pos: &PositionState, config: &LifecycleConfig) -> Option<ExitAction> {
    let profit_pct = pos.profit_pct();
    if profit_pct <= config.hard_stop_pct {
        tracing::warn!(
            contract = pos.contract.display_name(),
            profit_pct = format!("{profit_pct:.1}"),
            threshold = format!("{:.1}", config.hard_stop_pct),
            "Hard stop triggered"
        );
        return Some(ExitAction::FullExit {
            reason: ExitReason::HardStop,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::open_position;
    use rust_decimal_macros::dec;

    fn today_with_dte(pos: &PositionState, dte: i64) -> NaiveDate {
        pos.contract.expiry - chrono::Duration::days(dte)
    }

    #[test]
    fn dte_zero_with_small_profit_forces_exit() {
        let config = LifecycleConfig::default();
        // +10% at 0 DTE, below the +50% required floor.
        let pos = open_position(dec!(4.00), dec!(4.40), 2);
        let today = today_with_dte(&pos, 0);

        let action = check_dte_forced_exit(&pos, &config, today);

        assert!(matches!(
            action,
            Some(ExitAction::FullExit {
                reason: ExitReason::DteForcedExit
            })
        ));
    }

    #[test]
    fn dte_zero_with_large_profit_holds() {
        let config = LifecycleConfig::default();
        let pos = open_position(dec!(4.00), dec!(6.80), 2); // +70%
        let today = today_with_dte(&pos, 0);

        assert!(check_dte_forced_exit(&pos, &config, today).is_none());
    }

    #[test]
    fn dte_four_uses_the_ten_percent_tier() {
        let config = LifecycleConfig::default();
        let pos = open_position(dec!(4.00), dec!(4.20), 2); // +5%
        let today = today_with_dte(&pos, 4);

        assert!(check_dte_forced_exit(&pos, &config, today).is_some());

        let pos = open_position(dec!(4.00), dec!(4.60), 2); // +15%
        assert!(check_dte_forced_exit(&pos, &config, today).is_none());
    }

    #[test]
    fn far_expiry_never_forces() {
        let config = LifecycleConfig::default();
        let pos = open_position(dec!(4.00), dec!(3.60), 2); // −10%
        let today = today_with_dte(&pos, 12);

        assert!(check_dte_forced_exit(&pos, &config, today).is_none());
    }

    #[test]
    fn hard_stop_fires_at_threshold() {
        let config = LifecycleConfig::default();
        let pos = open_position(dec!(4.00), dec!(3.20), 2); // −20%

        let action = check_hard_stop(&pos, &config);

        assert!(matches!(
            action,
            Some(ExitAction::FullExit {
                reason: ExitReason::HardStop
            })
        ));
    }

    #[test]
    fn small_loss_does_not_stop_out() {
        let config = LifecycleConfig::default();
        let pos = open_position(dec!(4.00), dec!(3.60), 2); // −10%
        assert!(check_hard_stop(&pos, &config).is_none());
    }
}
