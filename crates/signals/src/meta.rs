//! Meta-policy arbitration over same-cycle agent intents.
//!
//! The controller is pure given a fixed [`WeightTable`]: filtering, conflict
//! resolution, and scoring never mutate state, so the same inputs always
//! produce the same selection. Weight updates happen separately, after a
//! position's outcome is realized.

use std::collections::HashMap;

use odte_core::{Direction, TradeIntent};
use serde::{Deserialize, Serialize};

use crate::regime::{RegimeSignal, VolatilityLevel};

/// Adaptive per-agent weights, updated from realized outcomes.
///
/// Passed explicitly into the controller rather than living as process
/// globals, so tests and multiple portfolios each own their table.
#[derive(Debug, Clone)]
pub struct WeightTable {
    weights: HashMap<String, f64>,
    win_factor: f64,
    loss_factor: f64,
    min_weight: f64,
    max_weight: f64,
}

// Deriving Default would zero the factors and clamp bounds, pinning every
// weight to 0.0 after the first recorded outcome.
impl Default for WeightTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            weights: HashMap::new(),
            win_factor: 1.05,
            loss_factor: 0.95,
            min_weight: 0.2,
            max_weight: 3.0,
        }
    }

    /// Current weight for an agent; unseen agents start at 1.0.
    #[must_use]
    pub fn weight(&self, agent_id: &str) -> f64 {
        self.weights.get(agent_id).copied().unwrap_or(1.0)
    }

    /// Applies a realized outcome to the agent's weight, multiplicatively,
    /// clamped so one agent can never dominate or vanish.
    pub fn record_outcome(&mut self, agent_id: &str, won: bool) {
        let factor = if won { self.win_factor } else { self.loss_factor };
        let current = self.weight(agent_id);
        let updated = (current * factor).clamp(self.min_weight, self.max_weight);
        tracing::debug!(
            agent = agent_id,
            won,
            weight = format!("{updated:.3}"),
            "Agent weight updated"
        );
        self.weights.insert(agent_id.to_string(), updated);
    }

    #[must_use]
    pub fn snapshot(&self) -> &HashMap<String, f64> {
        &self.weights
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPolicyConfig {
    /// Intents below this confidence are dropped before scoring.
    pub confidence_floor: f64,
    /// Relative score gap under which the top two intents are blended.
    pub blend_tolerance: f64,
    /// Score multiplier when the intent direction matches the regime bias.
    pub regime_fit_bonus: f64,
    /// Score multiplier under high volatility.
    pub high_vol_adjustment: f64,
    /// Score multiplier under low volatility.
    pub low_vol_adjustment: f64,
}

impl Default for MetaPolicyConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.60,
            blend_tolerance: 0.05,
            regime_fit_bonus: 1.25,
            high_vol_adjustment: 0.85,
            low_vol_adjustment: 0.95,
        }
    }
}

/// Arbitrates among same-cycle agent intents.
#[derive(Debug, Clone, Default)]
pub struct MetaPolicyController {
    config: MetaPolicyConfig,
}

impl MetaPolicyController {
    #[must_use]
    pub fn new(config: MetaPolicyConfig) -> Self {
        Self { config }
    }

    /// Selects at most one intent from the cycle's proposals.
    ///
    /// Opposite directions never average out: when both sides survive the
    /// confidence floor, only the higher-confidence side is scored.
    #[must_use]
    pub fn select(
        &self,
        intents: &[TradeIntent],
        regime: &RegimeSignal,
        weights: &WeightTable,
    ) -> Option<TradeIntent> {
        let mut survivors: Vec<&TradeIntent> = intents
            .iter()
            .filter(|i| i.confidence >= self.config.confidence_floor && i.direction.is_directional())
            .collect();
        if survivors.is_empty() {
            return None;
        }

        let winning_side = self.resolve_conflict(&survivors);
        survivors.retain(|i| i.direction == winning_side);

        let mut scored: Vec<(f64, &TradeIntent)> = survivors
            .iter()
            .map(|i| (self.score(i, regime, weights), *i))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let (top_score, top) = scored[0];
        if let Some(&(second_score, second)) = scored.get(1) {
            // Near-tied proposals get blended instead of arbitrarily picked.
            if top_score > 0.0 && (top_score - second_score) / top_score <= self.config.blend_tolerance
            {
                return Some(Self::blend(top, top_score, second, second_score));
            }
        }

        tracing::debug!(
            symbol = top.symbol,
            source = top.source,
            score = format!("{top_score:.3}"),
            "Meta policy selected intent"
        );
        Some(top.clone())
    }

    fn resolve_conflict(&self, survivors: &[&TradeIntent]) -> Direction {
        let best_long = survivors
            .iter()
            .filter(|i| i.direction == Direction::Long)
            .map(|i| i.confidence)
            .fold(f64::NEG_INFINITY, f64::max);
        let best_short = survivors
            .iter()
            .filter(|i| i.direction == Direction::Short)
            .map(|i| i.confidence)
            .fold(f64::NEG_INFINITY, f64::max);
        if best_long >= best_short {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    fn score(&self, intent: &TradeIntent, regime: &RegimeSignal, weights: &WeightTable) -> f64 {
        let regime_fit = if regime.bias.agrees_with(intent.direction) {
            self.config.regime_fit_bonus
        } else {
            1.0
        };
        let vol_adjustment = match regime.volatility_level {
            VolatilityLevel::High => self.config.high_vol_adjustment,
            VolatilityLevel::Medium => 1.0,
            VolatilityLevel::Low => self.config.low_vol_adjustment,
        };
        weights.weight(&intent.source) * regime_fit * vol_adjustment * intent.confidence
    }

    fn blend(a: &TradeIntent, score_a: f64, b: &TradeIntent, score_b: f64) -> TradeIntent {
        let total = score_a + score_b;
        let confidence = (a.confidence * score_a + b.confidence * score_b) / total;
        let rationale = format!("blend: [{}] {} | [{}] {}", a.source, a.rationale, b.source, b.rationale);
        let source = format!("{}+{}", a.source, b.source);
        // Confidence is a convex combination of two valid confidences.
        TradeIntent::new(&a.symbol, a.direction, confidence, source, rationale)
            .unwrap_or_else(|_| a.clone())
    }
}
