//! Signal generation and arbitration for the options decision engine.
//!
//! Per-cycle flow: bars → [`FeatureEngine`] → [`RegimeClassifier`] →
//! agent pool → [`MetaPolicyController`], alongside the [`LearnedPredictor`];
//! both feed the [`EnsembleCombiner`] which emits the final direction.

pub mod agent;
pub mod agents;
pub mod ensemble;
pub mod features;
pub mod meta;
pub mod predictor;
pub mod regime;

pub use agent::{Agent, AgentContext, AgentRegistry};
pub use ensemble::{EnsembleCombiner, EnsembleConfig, EnsembleOutput, SourcePrediction};
pub use features::{FeatureConfig, FeatureEngine, FeatureVector};
pub use meta::{MetaPolicyConfig, MetaPolicyController, WeightTable};
pub use predictor::{DirectionalModel, LearnedPredictor, PredictorConfig};
pub use regime::{
    Bias, RegimeClassifier, RegimeConfig, RegimeSignal, RegimeType, TrendDirection,
    VolatilityLevel,
};
