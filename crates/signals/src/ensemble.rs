//! Weighted-vote ensemble over the meta policy's pick, the learned
//! predictor, and any other signal sources.

use odte_core::Direction;
use serde::{Deserialize, Serialize};

/// One source's vote, tagged for attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePrediction {
    pub source: String,
    pub direction: Direction,
    pub confidence: f64,
    pub weight: f64,
}

impl SourcePrediction {
    #[must_use]
    pub fn new(source: impl Into<String>, direction: Direction, confidence: f64, weight: f64) -> Self {
        Self {
            source: source.into(),
            direction,
            confidence,
            weight,
        }
    }

    fn signed(&self) -> f64 {
        self.direction.sign() * self.confidence
    }
}

/// Combined vote with an agreement score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleOutput {
    pub direction: Direction,
    pub confidence: f64,
    /// Fraction of sources whose sign matches the combined direction.
    pub agreement: f64,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// |combined scalar| at or below this maps to flat.
    pub dead_zone: f64,
    /// Agreement above this earns the consensus boost.
    pub high_agreement: f64,
    pub agreement_boost: f64,
    pub disagreement_decay: f64,
    /// Fixed weight for the learned predictor source.
    pub predictor_weight: f64,
    /// Fixed weight for any heuristic (meta policy) source.
    pub heuristic_weight: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.1,
            high_agreement: 0.7,
            agreement_boost: 1.2,
            disagreement_decay: 0.9,
            predictor_weight: 1.5,
            heuristic_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    config: EnsembleConfig,
}

impl EnsembleCombiner {
    #[must_use]
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Combines the cycle's votes. `None` with no sources; a single source
    /// passes through unchanged.
    #[must_use]
    pub fn combine(&self, predictions: &[SourcePrediction]) -> Option<EnsembleOutput> {
        if predictions.is_empty() {
            return None;
        }
        if predictions.len() == 1 {
            let p = &predictions[0];
            return Some(EnsembleOutput {
                direction: p.direction,
                confidence: p.confidence,
                agreement: 1.0,
                sources: vec![p.source.clone()],
            });
        }

        let total_weight: f64 = predictions.iter().map(|p| p.weight).sum();
        let combined: f64 =
            predictions.iter().map(|p| p.weight * p.signed()).sum::<f64>() / total_weight;

        let direction = if combined > self.config.dead_zone {
            Direction::Long
        } else if combined < -self.config.dead_zone {
            Direction::Short
        } else {
            Direction::Flat
        };

        let sources: Vec<String> = predictions.iter().map(|p| p.source.clone()).collect();
        if direction == Direction::Flat {
            return Some(EnsembleOutput {
                direction,
                confidence: 0.0,
                agreement: 0.0,
                sources,
            });
        }

        let agreeing: Vec<&SourcePrediction> = predictions
            .iter()
            .filter(|p| p.direction == direction)
            .collect();
        let agreement = agreeing.len() as f64 / predictions.len() as f64;

        // Confidence starts from the consensus side only; the dissenters
        // already pulled the combined scalar (and the agreement ratio) down.
        let agreeing_weight: f64 = agreeing.iter().map(|p| p.weight).sum();
        let base: f64 = agreeing.iter().map(|p| p.weight * p.confidence).sum::<f64>() / agreeing_weight;

        let confidence = if agreement > self.config.high_agreement {
            (base * self.config.agreement_boost).min(1.0)
        } else {
            base * self.config.disagreement_decay
        };

        tracing::debug!(
            direction = %direction,
            confidence = format!("{confidence:.2}"),
            agreement = format!("{agreement:.2}"),
            sources = sources.len(),
            "Ensemble combined"
        );

        Some(EnsembleOutput {
            direction,
            confidence,
            agreement,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(source: &str, direction: Direction, confidence: f64) -> SourcePrediction {
        SourcePrediction::new(source, direction, confidence, 1.0)
    }

    #[test]
    fn empty_input_yields_none() {
        let combiner = EnsembleCombiner::default();
        assert!(combiner.combine(&[]).is_none());
    }

    #[test]
    fn single_source_passes_through() {
        let combiner = EnsembleCombiner::default();
        let out = combiner
            .combine(&[vote("meta", Direction::Short, 0.72)])
            .unwrap();

        assert_eq!(out.direction, Direction::Short);
        assert!((out.confidence - 0.72).abs() < 1e-12);
        assert!((out.agreement - 1.0).abs() < 1e-12);
    }

    #[test]
    fn three_longs_one_short_boosts_consensus() {
        let combiner = EnsembleCombiner::default();
        let out = combiner
            .combine(&[
                vote("a", Direction::Long, 0.7),
                vote("b", Direction::Long, 0.6),
                vote("c", Direction::Long, 0.8),
                vote("d", Direction::Short, 0.5),
            ])
            .unwrap();

        assert_eq!(out.direction, Direction::Long);
        assert!((out.agreement - 0.75).abs() < 1e-9);
        // Consensus mean 0.7 × 1.2 = 0.84, above the 0.65 unweighted mean
        // of all four sources.
        assert!((out.confidence - 0.84).abs() < 1e-9);
        assert!(out.confidence > 0.65);
    }

    #[test]
    fn balanced_votes_land_in_dead_zone() {
        let combiner = EnsembleCombiner::default();
        let out = combiner
            .combine(&[
                vote("a", Direction::Long, 0.6),
                vote("b", Direction::Short, 0.6),
            ])
            .unwrap();

        assert_eq!(out.direction, Direction::Flat);
        assert!((out.confidence - 0.0).abs() < 1e-12);
    }

    #[test]
    fn predictor_weight_outvotes_single_heuristic() {
        let combiner = EnsembleCombiner::default();
        let cfg = combiner.config().clone();
        let out = combiner
            .combine(&[
                SourcePrediction::new("meta", Direction::Long, 0.65, cfg.heuristic_weight),
                SourcePrediction::new("predictor", Direction::Short, 0.70, cfg.predictor_weight),
            ])
            .unwrap();

        // (1.0 × 0.65 − 1.5 × 0.70) / 2.5 = −0.16, outside the dead zone.
        assert_eq!(out.direction, Direction::Short);
        // Split vote: 0.5 agreement decays the consensus confidence.
        assert!((out.agreement - 0.5).abs() < 1e-12);
        assert!((out.confidence - 0.70 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn confidence_caps_at_one() {
        let combiner = EnsembleCombiner::default();
        let out = combiner
            .combine(&[
                vote("a", Direction::Long, 0.95),
                vote("b", Direction::Long, 0.92),
            ])
            .unwrap();

        assert!(out.confidence <= 1.0);
    }
}
