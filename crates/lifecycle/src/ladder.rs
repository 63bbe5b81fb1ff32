//! Mechanical profit-taking ladder.
//!
//! Each tier fires exactly once, selling a fraction of the contracts still
//! held at that moment. Fractions are relative to remaining size, so the
//! cumulative exits can never exceed the original position.

use crate::types::{ExitAction, ExitReason, LifecycleConfig, PositionState};

/// Fires the lowest unfired tier the current profit has crossed, if any.
pub fn check_profit_ladder(pos: &PositionState, config: &LifecycleConfig) -> Option<ExitAction> {
    let profit_pct = pos.profit_pct();

    for (tier_idx, tier) in config.ladder.iter().enumerate() {
        if pos.tier_fired(tier_idx) {
            continue;
        }
        if profit_pct < tier.trigger_pct {
            // Ladder is ascending; nothing higher can have crossed either.
            return None;
        }

        let reason = ExitReason::ProfitTier(tier_idx);
        let to_exit = exit_quantity(pos.contracts, tier.exit_fraction);
        tracing::info!(
            contract = pos.contract.display_name(),
            profit_pct = format!("{profit_pct:.1}"),
            tier = tier_idx + 1,
            to_exit,
            remaining = pos.contracts,
            "Profit tier crossed"
        );
        if to_exit >= pos.contracts {
            return Some(ExitAction::FullExit { reason });
        }
        return Some(ExitAction::PartialExit {
            contracts: to_exit,
            reason,
        });
    }
    None
}

/// Whole contracts for a fraction of the remaining size, at least one.
fn exit_quantity(remaining: i32, fraction: f64) -> i32 {
    let exact = f64::from(remaining) * fraction;
    (exact.round() as i32).clamp(1, remaining)
}
