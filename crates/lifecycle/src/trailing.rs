//! Trailing stop over the profit peak.
//!
//! Armed when the configured ladder tier is crossed; from then on the stop
//! ratchets with `highest_profit_pct` using a tiered allowed-pullback
//! schedule (larger peaks get a tighter leash) and locks a minimum floor.

use crate::types::{ExitAction, ExitReason, LifecycleConfig, PositionState};

/// Arms the trailing stop once the arming tier's trigger has been crossed.
pub fn maybe_arm(pos: &mut PositionState, config: &LifecycleConfig) {
    if pos.trailing_armed {
        return;
    }
    let Some(arm_tier) = config.ladder.get(config.trailing_arm_tier) else {
        return;
    };
    if pos.highest_profit_pct >= arm_tier.trigger_pct {
        tracing::info!(
            contract = pos.contract.display_name(),
            peak = format!("{:.1}", pos.highest_profit_pct),
            "Trailing stop armed"
        );
        pos.trailing_armed = true;
    }
}

/// Fires when the armed stop's floor is breached.
pub fn check_trailing_stop(pos: &PositionState, config: &LifecycleConfig) -> Option<ExitAction> {
    if !pos.trailing_armed {
        return None;
    }

    let allowed = allowed_pullback(pos.highest_profit_pct, config);
    let floor = (pos.highest_profit_pct - allowed).max(config.trailing_floor_pct);
    let profit_pct = pos.profit_pct();

    if profit_pct < floor {
        tracing::info!(
            contract = pos.contract.display_name(),
            peak = format!("{:.1}", pos.highest_profit_pct),
            profit_pct = format!("{profit_pct:.1}"),
            floor = format!("{floor:.1}"),
            "Trailing stop fired"
        );
        return Some(ExitAction::FullExit {
            reason: ExitReason::TrailingStop,
        });
    }
    None
}

fn allowed_pullback(peak_pct: f64, config: &LifecycleConfig) -> f64 {
    for tier in &config.pullback_tiers {
        if peak_pct < tier.below_peak_pct {
            return tier.allowed_pullback_pts;
        }
    }
    config.fallback_pullback_pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::open_position;
    use rust_decimal_macros::dec;

    #[test]
    fn arms_at_the_configured_tier() {
        let config = LifecycleConfig::default();
        let mut pos = open_position(dec!(4.00), dec!(8.00), 4); // peak +100%

        maybe_arm(&mut pos, &config);
        assert!(pos.trailing_armed);

        let mut early = open_position(dec!(4.00), dec!(7.00), 4); // peak +75%
        maybe_arm(&mut early, &config);
        assert!(!early.trailing_armed);
    }

    #[test]
    fn pullback_beyond_allowance_fires() {
        let config = LifecycleConfig::default();
        // Peak +160%, now +140%: 20-point pullback against 10 allowed.
        let mut pos = open_position(dec!(4.00), dec!(10.40), 4);
        pos.trailing_armed = true;
        pos.mark(dec!(9.60));

        let action = check_trailing_stop(&pos, &config);

        assert!(matches!(
            action,
            Some(ExitAction::FullExit {
                reason: ExitReason::TrailingStop
            })
        ));
    }

    #[test]
    fn pullback_within_allowance_holds() {
        let config = LifecycleConfig::default();
        // Peak +160%, now +155%: 5-point pullback, 10 allowed.
        let mut pos = open_position(dec!(4.00), dec!(10.40), 4);
        pos.trailing_armed = true;
        pos.mark(dec!(10.20));

        assert!(check_trailing_stop(&pos, &config).is_none());
    }

    #[test]
    fn big_peaks_get_a_tighter_leash() {
        let config = LifecycleConfig::default();
        // Peak +220%: allowed pullback drops to 8 points.
        let mut pos = open_position(dec!(4.00), dec!(12.80), 4);
        pos.trailing_armed = true;
        pos.mark(dec!(12.40)); // +210%, 10-point pullback

        assert!(check_trailing_stop(&pos, &config).is_some());
    }

    #[test]
    fn floor_locks_minimum_profit() {
        let config = LifecycleConfig::default();
        // Peak +108%: ratcheted floor is max(108 − 15, 100) = +100%.
        let mut pos = open_position(dec!(4.00), dec!(8.32), 4);
        pos.trailing_armed = true;
        pos.mark(dec!(7.80)); // +95%, below the locked floor

        assert!(check_trailing_stop(&pos, &config).is_some());
    }

    #[test]
    fn unarmed_stop_never_fires() {
        let config = LifecycleConfig::default();
        let mut pos = open_position(dec!(4.00), dec!(10.40), 4);
        pos.mark(dec!(8.00));

        assert!(check_trailing_stop(&pos, &config).is_none());
    }
}
