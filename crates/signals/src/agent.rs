//! Agent abstraction and registry.
//!
//! Each agent is a pure heuristic strategy: `should_activate` gates on the
//! classified regime, `evaluate` emits a directional [`TradeIntent`] or
//! nothing. Agents never mutate shared state.

use odte_core::TradeIntent;

use crate::features::FeatureVector;
use crate::regime::RegimeSignal;

/// Read-only evaluation context handed to every agent for one symbol/cycle.
#[derive(Debug, Clone)]
pub struct AgentContext<'a> {
    pub symbol: &'a str,
    pub features: &'a FeatureVector,
    pub regime: &'a RegimeSignal,
    /// IV rank in [0, 100] when the auxiliary service had one.
    pub iv_rank: Option<f64>,
    /// |delta| of the nearest at-the-money contract, when a chain was fetched.
    pub atm_delta: Option<f64>,
}

impl<'a> AgentContext<'a> {
    #[must_use]
    pub fn new(symbol: &'a str, features: &'a FeatureVector, regime: &'a RegimeSignal) -> Self {
        Self {
            symbol,
            features,
            regime,
            iv_rank: None,
            atm_delta: None,
        }
    }

    #[must_use]
    pub fn with_iv_rank(mut self, iv_rank: Option<f64>) -> Self {
        self.iv_rank = iv_rank;
        self
    }

    #[must_use]
    pub fn with_atm_delta(mut self, delta: Option<f64>) -> Self {
        self.atm_delta = delta;
        self
    }
}

/// A heuristic trading strategy in the agent pool.
pub trait Agent: Send + Sync {
    /// Stable identifier used for weighting and outcome attribution.
    fn id(&self) -> &str;

    /// Pure activation predicate for this cycle's regime.
    fn should_activate(&self, ctx: &AgentContext<'_>) -> bool;

    /// Produces a directional intent, or None when no indicator conditions
    /// are met. Never returns a flat-confidence placeholder.
    fn evaluate(&self, ctx: &AgentContext<'_>) -> Option<TradeIntent>;

    /// Whether activation depends on a clear regime. The momentum baseline
    /// overrides this to stay active under an unclear regime.
    fn regime_gated(&self) -> bool {
        true
    }
}

/// Registry of agents evaluated each cycle.
pub struct AgentRegistry {
    agents: Vec<Box<dyn Agent>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Registry with the full default pool.
    #[must_use]
    pub fn default_pool() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::agents::MomentumAgent::default()));
        registry.register(Box::new(crate::agents::TrendFollowAgent::default()));
        registry.register(Box::new(crate::agents::MeanReversionAgent::default()));
        registry.register(Box::new(crate::agents::VolExpansionAgent::default()));
        registry.register(Box::new(crate::agents::OptionsAwareAgent::default()));
        registry
    }

    pub fn register(&mut self, agent: Box<dyn Agent>) {
        self.agents.push(agent);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id()).collect()
    }

    /// Runs activation and evaluation across the pool.
    ///
    /// When regime confidence is below `regime_floor`, regime-gated agents
    /// are skipped entirely ("no clear regime"); the baseline still runs.
    #[must_use]
    pub fn collect_intents(&self, ctx: &AgentContext<'_>, regime_floor: f64) -> Vec<TradeIntent> {
        let regime_unclear = ctx.regime.confidence < regime_floor;
        let mut intents = Vec::new();

        for agent in &self.agents {
            if regime_unclear && agent.regime_gated() {
                continue;
            }
            if !agent.should_activate(ctx) {
                continue;
            }
            if let Some(intent) = agent.evaluate(ctx) {
                tracing::debug!(
                    symbol = ctx.symbol,
                    agent = agent.id(),
                    direction = %intent.direction,
                    confidence = format!("{:.2}", intent.confidence),
                    "Agent emitted intent"
                );
                intents.push(intent);
            }
        }

        intents
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry").field("agents", &self.ids()).finish()
    }
}
