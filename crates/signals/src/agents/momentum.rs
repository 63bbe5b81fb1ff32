//! Momentum/crossover baseline agent.
//!
//! Always in the pool regardless of regime clarity. Goes with the moving
//! average crossover when momentum agrees, with bonuses for VWAP and
//! trend-strength confirmation.

use odte_core::TradeIntent;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentContext};
use odte_core::Direction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumAgentConfig {
    /// Minimum |momentum| percent to consider a move underway.
    pub min_momentum_pct: f64,
    /// Minimum |trend_strength| for the crossover to count.
    pub min_crossover_strength: f64,
    /// VWAP deviation percent that earns the confirmation bonus.
    pub vwap_confirm_pct: f64,
    /// Trend strength that earns the confirmation bonus.
    pub strong_trend: f64,
}

impl Default for MomentumAgentConfig {
    fn default() -> Self {
        Self {
            min_momentum_pct: 0.5,
            min_crossover_strength: 0.2,
            vwap_confirm_pct: 0.5,
            strong_trend: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MomentumAgent {
    config: MomentumAgentConfig,
}

impl MomentumAgent {
    #[must_use]
    pub fn new(config: MomentumAgentConfig) -> Self {
        Self { config }
    }
}

impl Agent for MomentumAgent {
    fn id(&self) -> &str {
        "momentum_crossover"
    }

    fn should_activate(&self, _ctx: &AgentContext<'_>) -> bool {
        true
    }

    fn regime_gated(&self) -> bool {
        false
    }

    fn evaluate(&self, ctx: &AgentContext<'_>) -> Option<TradeIntent> {
        let f = ctx.features;

        if f.momentum.abs() < self.config.min_momentum_pct {
            return None;
        }
        // The fast/slow stack must lean the same way as the move.
        if f.trend_strength.abs() < self.config.min_crossover_strength
            || f.trend_strength.signum() != f.momentum.signum()
        {
            return None;
        }

        let direction = if f.momentum > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };

        let mut confidence: f64 = 0.50;
        let mut rationale = format!(
            "ma crossover with momentum {:+.2}% (trend {:+.2})",
            f.momentum, f.trend_strength
        );

        let vwap_confirms = f.vwap_deviation_pct.abs() >= self.config.vwap_confirm_pct
            && f.vwap_deviation_pct.signum() == f.momentum.signum();
        if vwap_confirms {
            confidence += 0.20;
            rationale.push_str(&format!(", vwap deviation {:+.2}%", f.vwap_deviation_pct));
        }

        if f.trend_strength.abs() >= self.config.strong_trend {
            confidence += 0.15;
            rationale.push_str(", strong trend confirmation");
        }

        TradeIntent::new(ctx.symbol, direction, confidence.min(1.0), self.id(), rationale).ok()
    }
}
