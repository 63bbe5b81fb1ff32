//! Mean-reversion agent: fades oscillator extremes, with VWAP stretch and
//! unfilled-gap bonuses.

use odte_core::{Direction, TradeIntent};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentContext};
use crate::regime::RegimeType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    /// Minimum regime confidence to activate.
    pub activation_floor: f64,
    /// RSI at or below this is oversold (long setup).
    pub rsi_oversold: f64,
    /// RSI at or above this is overbought (short setup).
    pub rsi_overbought: f64,
    /// RSI at or beyond this earns the deep-extreme bonus.
    pub rsi_deep_margin: f64,
    /// |VWAP deviation| percent that earns the stretch bonus.
    pub vwap_stretch_pct: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            activation_floor: 0.45,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_deep_margin: 5.0,
            vwap_stretch_pct: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeanReversionAgent {
    config: MeanReversionConfig,
}

impl MeanReversionAgent {
    #[must_use]
    pub fn new(config: MeanReversionConfig) -> Self {
        Self { config }
    }
}

impl Agent for MeanReversionAgent {
    fn id(&self) -> &str {
        "mean_reversion"
    }

    fn should_activate(&self, ctx: &AgentContext<'_>) -> bool {
        ctx.regime.regime_type == RegimeType::MeanReversion
            && ctx.regime.confidence >= self.config.activation_floor
    }

    fn evaluate(&self, ctx: &AgentContext<'_>) -> Option<TradeIntent> {
        let f = ctx.features;
        let cfg = &self.config;

        let (direction, deep) = if f.rsi <= cfg.rsi_oversold {
            (Direction::Long, f.rsi <= cfg.rsi_oversold - cfg.rsi_deep_margin)
        } else if f.rsi >= cfg.rsi_overbought {
            (Direction::Short, f.rsi >= cfg.rsi_overbought + cfg.rsi_deep_margin)
        } else {
            return None;
        };

        let mut confidence: f64 = 0.50;
        let mut rationale = format!("rsi {:.0} extreme", f.rsi);

        // Stretch away from VWAP on the reverting side: price below VWAP for
        // longs, above for shorts.
        let stretched = f.vwap_deviation_pct.abs() >= cfg.vwap_stretch_pct
            && f.vwap_deviation_pct.signum() == -direction.sign();
        if stretched {
            confidence += 0.25;
            rationale.push_str(&format!(", {:.1}% from vwap", f.vwap_deviation_pct.abs()));
        }

        if deep {
            confidence += 0.15;
            rationale.push_str(", deep extreme");
        }

        // An unfilled gap against the move offers a fill target.
        let gap_favors = f.has_unfilled_gap && f.gap_pct.signum() == -direction.sign();
        if gap_favors {
            confidence += 0.10;
            rationale.push_str(&format!(", unfilled {:+.1}% gap", f.gap_pct));
        }

        TradeIntent::new(ctx.symbol, direction, confidence.min(1.0), self.id(), rationale).ok()
    }
}
