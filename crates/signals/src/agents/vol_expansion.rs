//! Volatility-expansion breakout agent. Active only when range is expanding.

use odte_core::{Direction, TradeIntent};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentContext};
use crate::regime::RegimeType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolExpansionConfig {
    /// Minimum regime confidence to activate.
    pub activation_floor: f64,
    /// Minimum |momentum| percent to call the breakout direction.
    pub min_momentum_pct: f64,
    /// Volatility percent that earns the hot-tape bonus.
    pub hot_volatility_pct: f64,
    /// |Momentum| percent that earns the thrust bonus.
    pub thrust_momentum_pct: f64,
    /// Volume ratio that earns the participation bonus.
    pub volume_confirm_ratio: f64,
}

impl Default for VolExpansionConfig {
    fn default() -> Self {
        Self {
            activation_floor: 0.45,
            min_momentum_pct: 0.8,
            hot_volatility_pct: 2.5,
            thrust_momentum_pct: 1.5,
            volume_confirm_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolExpansionAgent {
    config: VolExpansionConfig,
}

impl VolExpansionAgent {
    #[must_use]
    pub fn new(config: VolExpansionConfig) -> Self {
        Self { config }
    }
}

impl Agent for VolExpansionAgent {
    fn id(&self) -> &str {
        "vol_expansion"
    }

    fn should_activate(&self, ctx: &AgentContext<'_>) -> bool {
        ctx.regime.regime_type == RegimeType::Expansion
            && ctx.regime.confidence >= self.config.activation_floor
    }

    fn evaluate(&self, ctx: &AgentContext<'_>) -> Option<TradeIntent> {
        let f = ctx.features;
        let cfg = &self.config;

        // Direction comes from the thrust itself, not the regime bias.
        if f.momentum.abs() < cfg.min_momentum_pct {
            return None;
        }
        let direction = if f.momentum > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };

        let mut confidence: f64 = 0.50;
        let mut rationale = format!(
            "range expansion, momentum {:+.2}% at {:.1}% vol",
            f.momentum, f.volatility_pct
        );

        if f.volatility_pct >= cfg.hot_volatility_pct {
            confidence += 0.25;
            rationale.push_str(", hot tape");
        }

        if f.momentum.abs() >= cfg.thrust_momentum_pct {
            confidence += 0.15;
            rationale.push_str(", strong thrust");
        }

        // A gap in the direction of the move is continuation fuel.
        let gap_continues = f.has_unfilled_gap && f.gap_pct.signum() == direction.sign();
        if gap_continues || f.volume_ratio >= cfg.volume_confirm_ratio {
            confidence += 0.10;
            rationale.push_str(", participation");
        }

        TradeIntent::new(ctx.symbol, direction, confidence.min(1.0), self.id(), rationale).ok()
    }
}
