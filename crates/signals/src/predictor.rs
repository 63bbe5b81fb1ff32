//! Learned directional predictor.
//!
//! Wraps an externally supplied model that maps the feature/regime context to
//! a continuous action in [-1, 1]. The predictor owns per-symbol smoothing
//! state and its own supervisory health: a missing model or a degraded
//! rolling accuracy is reported as an error, never disguised as a flat
//! signal.

use std::collections::{HashMap, VecDeque};

use odte_core::{Direction, EngineError, TradeIntent};
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::regime::{RegimeSignal, VolatilityLevel};

/// An externally trained directional model.
///
/// Returns a scalar action in [-1, 1]: positive leans long, negative short.
pub trait DirectionalModel: Send + Sync {
    fn predict(&self, features: &FeatureVector, regime: &RegimeSignal) -> anyhow::Result<f64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// EMA smoothing factor applied to the raw model action per symbol.
    pub smoothing_alpha: f64,
    /// |smoothed action| at or below this maps to flat.
    pub dead_zone: f64,
    /// Confidence at the dead-zone boundary.
    pub base_confidence: f64,
    /// Confidence span from the boundary to |action| = 1.
    pub confidence_span: f64,
    /// Regime confidence that earns the regime boost.
    pub strong_regime: f64,
    pub regime_boost: f64,
    /// Penalty multiplier under high volatility.
    pub high_vol_penalty: f64,
    /// |trend_strength| that counts as confirmation.
    pub trend_confirm_strength: f64,
    pub trend_boost: f64,
    /// Rolling accuracy window size.
    pub accuracy_window: usize,
    /// Minimum outcomes before the accuracy check applies.
    pub min_outcomes: usize,
    /// Accuracy below this trips the degraded state.
    pub degraded_accuracy: f64,
    /// Cycles the predictor stays disabled after tripping.
    pub recovery_cycles: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.3,
            dead_zone: 0.2,
            base_confidence: 0.3,
            confidence_span: 0.6,
            strong_regime: 0.6,
            regime_boost: 1.1,
            high_vol_penalty: 0.85,
            trend_confirm_strength: 0.3,
            trend_boost: 1.1,
            accuracy_window: 50,
            min_outcomes: 20,
            degraded_accuracy: 0.35,
            recovery_cycles: 50,
        }
    }
}

pub struct LearnedPredictor {
    config: PredictorConfig,
    model: Option<Box<dyn DirectionalModel>>,
    /// Per-symbol smoothed action. Reset only on construction.
    smoothed: HashMap<String, f64>,
    outcomes: VecDeque<bool>,
    cycle: u64,
    disabled_until: Option<u64>,
}

impl LearnedPredictor {
    #[must_use]
    pub fn new(config: PredictorConfig, model: Option<Box<dyn DirectionalModel>>) -> Self {
        Self {
            config,
            model,
            smoothed: HashMap::new(),
            outcomes: VecDeque::new(),
            cycle: 0,
            disabled_until: None,
        }
    }

    /// Advances the supervisory clock; call once per evaluation cycle.
    pub fn advance_cycle(&mut self) {
        self.cycle += 1;
        if let Some(until) = self.disabled_until {
            if self.cycle >= until {
                tracing::info!(cycle = self.cycle, "Predictor recovered from degraded state");
                self.disabled_until = None;
            }
        }
    }

    /// Records a realized win/loss for a position the predictor contributed
    /// to. Trips the degraded state when rolling accuracy falls too low.
    pub fn record_outcome(&mut self, won: bool) {
        self.outcomes.push_back(won);
        while self.outcomes.len() > self.config.accuracy_window {
            self.outcomes.pop_front();
        }

        if self.outcomes.len() >= self.config.min_outcomes {
            let accuracy = self.accuracy();
            if accuracy < self.config.degraded_accuracy && self.disabled_until.is_none() {
                let until = self.cycle + self.config.recovery_cycles;
                tracing::warn!(
                    accuracy = format!("{accuracy:.2}"),
                    until_cycle = until,
                    "Predictor accuracy degraded, disabling"
                );
                self.disabled_until = Some(until);
                // Fresh window after recovery, so stale losses cannot
                // immediately re-trip the state.
                self.outcomes.clear();
            }
        }
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let wins = self.outcomes.iter().filter(|w| **w).count();
        wins as f64 / self.outcomes.len() as f64
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled_until.is_some()
    }

    /// Produces a directional intent for the symbol, `Ok(None)` when the
    /// smoothed action sits inside the dead zone.
    pub fn predict(
        &mut self,
        symbol: &str,
        features: &FeatureVector,
        regime: &RegimeSignal,
    ) -> Result<Option<TradeIntent>, EngineError> {
        if let Some(until) = self.disabled_until {
            return Err(EngineError::ModelDegraded {
                accuracy: self.accuracy(),
                until_cycle: until,
            });
        }
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EngineError::ModelUnavailable("no directional model loaded".into()))?;

        let raw = model
            .predict(features, regime)
            .map_err(|e| EngineError::ModelUnavailable(e.to_string()))?
            .clamp(-1.0, 1.0);

        let alpha = self.config.smoothing_alpha;
        let smoothed = match self.smoothed.get(symbol) {
            Some(prev) => alpha * raw + (1.0 - alpha) * prev,
            None => raw,
        };
        self.smoothed.insert(symbol.to_string(), smoothed);

        if smoothed.abs() <= self.config.dead_zone {
            tracing::debug!(
                symbol,
                action = format!("{smoothed:+.3}"),
                "Predictor action inside dead zone"
            );
            return Ok(None);
        }

        let direction = if smoothed > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };
        let confidence = self.confidence_for(smoothed, direction, features, regime);

        let intent = TradeIntent::new(
            symbol,
            direction,
            confidence,
            "predictor",
            format!("model action {smoothed:+.3} (raw {raw:+.3})"),
        )
        .map_err(|e| EngineError::MalformedData(e.to_string()))?;
        Ok(Some(intent))
    }

    fn confidence_for(
        &self,
        smoothed: f64,
        direction: Direction,
        features: &FeatureVector,
        regime: &RegimeSignal,
    ) -> f64 {
        let cfg = &self.config;
        // Linear rescale of the distance past the dead-zone boundary.
        let distance = (smoothed.abs() - cfg.dead_zone) / (1.0 - cfg.dead_zone);
        let mut confidence = cfg.base_confidence + cfg.confidence_span * distance;

        if regime.confidence >= cfg.strong_regime {
            confidence *= cfg.regime_boost;
        }
        if regime.volatility_level == VolatilityLevel::High {
            confidence *= cfg.high_vol_penalty;
        }
        let trend_confirms = features.trend_strength.abs() >= cfg.trend_confirm_strength
            && features.trend_strength.signum() == direction.sign();
        if trend_confirms {
            confidence *= cfg.trend_boost;
        }

        confidence.clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for LearnedPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedPredictor")
            .field("has_model", &self.model.is_some())
            .field("cycle", &self.cycle)
            .field("disabled_until", &self.disabled_until)
            .field("tracked_symbols", &self.smoothed.len())
            .finish()
    }
}
