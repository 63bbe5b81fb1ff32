//! Market regime classification.
//!
//! Scores four regime hypotheses independently and returns the winner. Ties
//! break by fixed priority: trend > mean-reversion > expansion > compression
//! (the trend hypothesis rests on the strongest external evidence; volatility
//! compression is the weakest claim).

use odte_core::Direction;
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// The four mutually exclusive regime hypotheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeType {
    Trend,
    MeanReversion,
    Expansion,
    Compression,
}

impl std::fmt::Display for RegimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trend => write!(f, "trend"),
            Self::MeanReversion => write!(f, "mean_reversion"),
            Self::Expansion => write!(f, "expansion"),
            Self::Compression => write!(f, "compression"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    /// Whether a directional intent goes with this bias.
    #[must_use]
    pub fn agrees_with(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Bias::Bullish, Direction::Long) | (Bias::Bearish, Direction::Short)
        )
    }
}

/// Classified regime with confidence.
///
/// `confidence` is the score of the winning regime among the four candidate
/// scores; it is always returned, and callers treat sub-floor confidence as
/// "no clear regime".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeSignal {
    pub regime_type: RegimeType,
    pub trend_direction: TrendDirection,
    pub volatility_level: VolatilityLevel,
    pub bias: Bias,
    /// Score of the winning regime, in [0.0, 1.0].
    pub confidence: f64,
}

impl RegimeSignal {
    /// True when the regime is clear enough to gate agents on.
    #[must_use]
    pub fn is_actionable(&self, floor: f64) -> bool {
        self.confidence >= floor
    }
}

/// Thresholds for regime scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Volatility percent below which the market reads as low-vol.
    pub vol_low_pct: f64,
    /// Volatility percent above which the market reads as high-vol.
    pub vol_high_pct: f64,
    /// Minimum |trend_strength| for a directional trend read.
    pub trend_direction_min: f64,
    /// |zscore| treated as a full statistical extreme.
    pub zscore_extreme: f64,
    /// Momentum percent considered confirming.
    pub momentum_min_pct: f64,
    /// Below this confidence, callers treat the signal as "no clear regime".
    pub confidence_floor: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            vol_low_pct: 1.0,
            vol_high_pct: 3.0,
            trend_direction_min: 0.15,
            zscore_extreme: 1.5,
            momentum_min_pct: 0.5,
            confidence_floor: 0.30,
        }
    }
}

/// Maps a [`FeatureVector`] to a [`RegimeSignal`].
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

impl RegimeClassifier {
    #[must_use]
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn confidence_floor(&self) -> f64 {
        self.config.confidence_floor
    }

    /// Scores all four hypotheses and returns the winner. Never returns
    /// "no regime": low-confidence signals are the caller's problem.
    #[must_use]
    pub fn classify(&self, features: &FeatureVector) -> RegimeSignal {
        // Priority order doubles as the tie-break: earlier entries win ties.
        let scored = [
            (RegimeType::Trend, self.score_trend(features)),
            (RegimeType::MeanReversion, self.score_mean_reversion(features)),
            (RegimeType::Expansion, self.score_expansion(features)),
            (RegimeType::Compression, self.score_compression(features)),
        ];

        let mut winner = scored[0];
        for candidate in &scored[1..] {
            if candidate.1 > winner.1 {
                winner = *candidate;
            }
        }
        let (regime_type, confidence) = winner;

        let trend_direction = self.trend_direction(features);
        let volatility_level = self.volatility_level(features);
        let bias = self.bias(regime_type, trend_direction, features);

        tracing::debug!(
            symbol = %features.symbol,
            regime = %regime_type,
            confidence = format!("{confidence:.2}"),
            ?trend_direction,
            ?volatility_level,
            "Regime classified"
        );

        RegimeSignal {
            regime_type,
            trend_direction,
            volatility_level,
            bias,
            confidence,
        }
    }

    fn score_trend(&self, f: &FeatureVector) -> f64 {
        let mut score = 0.6 * f.trend_strength.abs();
        let momentum_confirms = f.momentum.abs() >= self.config.momentum_min_pct
            && f.momentum.signum() == f.trend_strength.signum();
        if momentum_confirms {
            score += 0.25;
        }
        if f.volume_ratio >= 1.2 {
            score += 0.15;
        }
        score.clamp(0.0, 1.0)
    }

    fn score_mean_reversion(&self, f: &FeatureVector) -> f64 {
        let mut score = 0.45 * (f.zscore.abs() / self.config.zscore_extreme).min(1.0);
        if f.rsi <= 30.0 || f.rsi >= 70.0 {
            score += 0.35;
        }
        if f.vwap_deviation_pct.abs() >= 2.0 {
            score += 0.20;
        }
        score.clamp(0.0, 1.0)
    }

    fn score_expansion(&self, f: &FeatureVector) -> f64 {
        let mut score = 0.6 * (f.volatility_pct / self.config.vol_high_pct).min(1.0);
        if f.volume_ratio >= 1.5 {
            score += 0.25;
        }
        if f.gap_pct.abs() >= 1.0 {
            score += 0.15;
        }
        score.clamp(0.0, 1.0)
    }

    fn score_compression(&self, f: &FeatureVector) -> f64 {
        let mut score = 0.6 * (1.0 - (f.volatility_pct / self.config.vol_high_pct).min(1.0));
        if f.volume_ratio <= 0.8 {
            score += 0.25;
        }
        if f.trend_strength.abs() < self.config.trend_direction_min {
            score += 0.15;
        }
        score.clamp(0.0, 1.0)
    }

    fn trend_direction(&self, f: &FeatureVector) -> TrendDirection {
        if f.trend_strength >= self.config.trend_direction_min {
            TrendDirection::Up
        } else if f.trend_strength <= -self.config.trend_direction_min {
            TrendDirection::Down
        } else {
            TrendDirection::Sideways
        }
    }

    fn volatility_level(&self, f: &FeatureVector) -> VolatilityLevel {
        if f.volatility_pct < self.config.vol_low_pct {
            VolatilityLevel::Low
        } else if f.volatility_pct > self.config.vol_high_pct {
            VolatilityLevel::High
        } else {
            VolatilityLevel::Medium
        }
    }

    fn bias(
        &self,
        regime: RegimeType,
        trend_direction: TrendDirection,
        f: &FeatureVector,
    ) -> Bias {
        match regime {
            RegimeType::Trend => match trend_direction {
                TrendDirection::Up => Bias::Bullish,
                TrendDirection::Down => Bias::Bearish,
                TrendDirection::Sideways => Bias::Neutral,
            },
            // Stretched prices revert toward the mean.
            RegimeType::MeanReversion => {
                if f.zscore >= 1.0 {
                    Bias::Bearish
                } else if f.zscore <= -1.0 {
                    Bias::Bullish
                } else {
                    Bias::Neutral
                }
            }
            RegimeType::Expansion => {
                if f.momentum >= self.config.momentum_min_pct {
                    Bias::Bullish
                } else if f.momentum <= -self.config.momentum_min_pct {
                    Bias::Bearish
                } else {
                    Bias::Neutral
                }
            }
            RegimeType::Compression => Bias::Neutral,
        }
    }
}
