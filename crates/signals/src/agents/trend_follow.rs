//! Trend-following agent. Active only in a clear trend regime.

use odte_core::{Direction, TradeIntent};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentContext};
use crate::regime::{RegimeType, TrendDirection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendFollowConfig {
    /// Minimum regime confidence to activate.
    pub activation_floor: f64,
    /// Minimum |trend_strength| required to emit at all.
    pub min_trend_strength: f64,
    /// Momentum percent that earns the confirmation bonus.
    pub momentum_confirm_pct: f64,
    /// Regime confidence that earns the regime bonus.
    pub strong_regime: f64,
    /// Volume ratio that earns the participation bonus.
    pub volume_confirm_ratio: f64,
}

impl Default for TrendFollowConfig {
    fn default() -> Self {
        Self {
            activation_floor: 0.45,
            min_trend_strength: 0.4,
            momentum_confirm_pct: 0.5,
            strong_regime: 0.6,
            volume_confirm_ratio: 1.2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendFollowAgent {
    config: TrendFollowConfig,
}

impl TrendFollowAgent {
    #[must_use]
    pub fn new(config: TrendFollowConfig) -> Self {
        Self { config }
    }
}

impl Agent for TrendFollowAgent {
    fn id(&self) -> &str {
        "trend_follow"
    }

    fn should_activate(&self, ctx: &AgentContext<'_>) -> bool {
        ctx.regime.regime_type == RegimeType::Trend
            && ctx.regime.confidence >= self.config.activation_floor
    }

    fn evaluate(&self, ctx: &AgentContext<'_>) -> Option<TradeIntent> {
        let f = ctx.features;

        let direction = match ctx.regime.trend_direction {
            TrendDirection::Up => Direction::Long,
            TrendDirection::Down => Direction::Short,
            TrendDirection::Sideways => return None,
        };

        if f.trend_strength.abs() < self.config.min_trend_strength {
            return None;
        }

        let mut confidence: f64 = 0.50;
        let mut rationale = format!("trend regime, strength {:+.2}", f.trend_strength);

        let momentum_confirms = f.momentum.abs() >= self.config.momentum_confirm_pct
            && f.momentum.signum() == direction.sign();
        if momentum_confirms {
            confidence += 0.25;
            rationale.push_str(&format!(", momentum {:+.2}% confirms", f.momentum));
        }

        if ctx.regime.confidence >= self.config.strong_regime {
            confidence += 0.15;
            rationale.push_str(", strong regime");
        }

        if f.volume_ratio >= self.config.volume_confirm_ratio {
            confidence += 0.10;
            rationale.push_str(", volume participation");
        }

        TradeIntent::new(ctx.symbol, direction, confidence.min(1.0), self.id(), rationale).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::regime::{Bias, RegimeSignal, VolatilityLevel};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn features() -> FeatureVector {
        FeatureVector {
            symbol: "QQQ".to_string(),
            timestamp: Utc::now(),
            last_close: dec!(400),
            trend_strength: 0.0,
            momentum: 0.0,
            rsi: 50.0,
            volatility_pct: 1.5,
            zscore: 0.0,
            vwap_deviation_pct: 0.0,
            volume_ratio: 1.0,
            gap_pct: 0.0,
            has_unfilled_gap: false,
        }
    }

    fn trend_regime(direction: TrendDirection, confidence: f64) -> RegimeSignal {
        RegimeSignal {
            regime_type: RegimeType::Trend,
            trend_direction: direction,
            volatility_level: VolatilityLevel::Medium,
            bias: Bias::Bullish,
            confidence,
        }
    }

    #[test]
    fn activates_only_in_trend_regime() {
        let agent = TrendFollowAgent::default();
        let f = features();

        let trend = trend_regime(TrendDirection::Up, 0.7);
        let ctx = AgentContext::new("QQQ", &f, &trend);
        assert!(agent.should_activate(&ctx));

        let mut other = trend_regime(TrendDirection::Up, 0.7);
        other.regime_type = RegimeType::Compression;
        let ctx = AgentContext::new("QQQ", &f, &other);
        assert!(!agent.should_activate(&ctx));

        let weak = trend_regime(TrendDirection::Up, 0.2);
        let ctx = AgentContext::new("QQQ", &f, &weak);
        assert!(!agent.should_activate(&ctx));
    }

    #[test]
    fn fully_confirmed_uptrend_reaches_full_confidence() {
        let agent = TrendFollowAgent::default();
        let f = FeatureVector {
            trend_strength: 0.8,
            momentum: 1.4,
            volume_ratio: 1.5,
            ..features()
        };
        let r = trend_regime(TrendDirection::Up, 0.75);
        let ctx = AgentContext::new("QQQ", &f, &r);

        let intent = agent.evaluate(&ctx).unwrap();

        assert_eq!(intent.direction, Direction::Long);
        // 0.50 + 0.25 + 0.15 + 0.10
        assert!((intent.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn downtrend_emits_short() {
        let agent = TrendFollowAgent::default();
        let f = FeatureVector {
            trend_strength: -0.6,
            momentum: -0.8,
            ..features()
        };
        let r = trend_regime(TrendDirection::Down, 0.5);
        let ctx = AgentContext::new("QQQ", &f, &r);

        let intent = agent.evaluate(&ctx).unwrap();

        assert_eq!(intent.direction, Direction::Short);
        assert!((intent.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn sideways_trend_returns_none() {
        let agent = TrendFollowAgent::default();
        let f = FeatureVector {
            trend_strength: 0.5,
            ..features()
        };
        let r = trend_regime(TrendDirection::Sideways, 0.6);
        let ctx = AgentContext::new("QQQ", &f, &r);

        assert!(agent.evaluate(&ctx).is_none());
    }

    #[test]
    fn weak_trend_strength_returns_none() {
        let agent = TrendFollowAgent::default();
        let f = FeatureVector {
            trend_strength: 0.2,
            ..features()
        };
        let r = trend_regime(TrendDirection::Up, 0.6);
        let ctx = AgentContext::new("QQQ", &f, &r);

        assert!(agent.evaluate(&ctx).is_none());
    }
}
