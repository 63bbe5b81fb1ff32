//! Options-aware agent. The only pool member that reads the options
//! surface: it abstains entirely when IV rank or the ATM delta is missing
//! or unattractive, rather than guessing from price action alone.

use odte_core::{Direction, TradeIntent};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentContext};
use crate::regime::Bias;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsAwareConfig {
    /// IV rank above this means premium is too rich to buy.
    pub max_iv_rank: f64,
    /// IV rank band considered cheap-but-alive premium.
    pub sweet_iv_low: f64,
    pub sweet_iv_high: f64,
    /// Minimum |ATM delta| for the contract to track the underlying.
    pub min_atm_delta: f64,
    /// |ATM delta| that earns the responsiveness bonus.
    pub responsive_delta: f64,
}

impl Default for OptionsAwareConfig {
    fn default() -> Self {
        Self {
            max_iv_rank: 80.0,
            sweet_iv_low: 30.0,
            sweet_iv_high: 60.0,
            min_atm_delta: 0.25,
            responsive_delta: 0.40,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptionsAwareAgent {
    config: OptionsAwareConfig,
}

impl OptionsAwareAgent {
    #[must_use]
    pub fn new(config: OptionsAwareConfig) -> Self {
        Self { config }
    }
}

impl Agent for OptionsAwareAgent {
    fn id(&self) -> &str {
        "options_aware"
    }

    fn should_activate(&self, ctx: &AgentContext<'_>) -> bool {
        ctx.regime.bias != Bias::Neutral
    }

    fn evaluate(&self, ctx: &AgentContext<'_>) -> Option<TradeIntent> {
        let cfg = &self.config;

        // No IV data means no opinion, never a fallback to price heuristics.
        let iv_rank = ctx.iv_rank?;
        if iv_rank > cfg.max_iv_rank {
            tracing::debug!(
                symbol = ctx.symbol,
                iv_rank = format!("{iv_rank:.0}"),
                "Premium too rich, options agent abstains"
            );
            return None;
        }

        let atm_delta = ctx.atm_delta?;
        if atm_delta.abs() < cfg.min_atm_delta {
            return None;
        }

        let direction = match ctx.regime.bias {
            Bias::Bullish => Direction::Long,
            Bias::Bearish => Direction::Short,
            Bias::Neutral => return None,
        };

        let mut confidence: f64 = 0.50;
        let mut rationale = format!("iv rank {iv_rank:.0}, atm delta {:.2}", atm_delta.abs());

        if (cfg.sweet_iv_low..=cfg.sweet_iv_high).contains(&iv_rank) {
            confidence += 0.20;
            rationale.push_str(", premium in sweet band");
        }

        let trend_confirms = ctx.features.trend_strength.signum() == direction.sign()
            && ctx.features.trend_strength.abs() >= 0.15;
        if trend_confirms {
            confidence += 0.15;
            rationale.push_str(", trend confirms bias");
        }

        if atm_delta.abs() >= cfg.responsive_delta {
            confidence += 0.15;
            rationale.push_str(", responsive contract");
        }

        TradeIntent::new(ctx.symbol, direction, confidence.min(1.0), self.id(), rationale).ok()
    }
}
