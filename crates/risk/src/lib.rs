//! Pre-trade risk gating and portfolio Greek aggregation.

pub mod governor;
pub mod portfolio;
pub mod sizing;

pub use governor::{GovernorConfig, GovernorDecision, OptionsRiskGovernor};
pub use portfolio::{OpenExposure, PortfolioGreeks, PortfolioRiskAggregator};
pub use sizing::{contracts_for_budget, SizingConfig};
