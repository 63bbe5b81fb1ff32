//! Portfolio-level Greek aggregation.
//!
//! The aggregator is recomputed in full from the open position set each
//! cycle. Nothing updates it incrementally, so it can never drift from the
//! positions it describes.

use odte_core::Greeks;
use serde::{Deserialize, Serialize};

/// One open position's contribution, with per-contract greeks as priced at
/// entry (or re-priced by the governor's chain fetch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenExposure {
    pub symbol: String,
    pub contracts: i32,
    pub greeks: Greeks,
    /// Premium paid, in dollars, for the remaining contracts.
    pub cost_basis_usd: f64,
}

/// Summed position Greeks across the whole book.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PortfolioGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    /// Total premium at risk across open positions, in dollars.
    pub exposure_usd: f64,
}

impl PortfolioGreeks {
    /// Greeks as they would read with a candidate position added.
    #[must_use]
    pub fn with_candidate(&self, candidate: &Greeks, contracts: i32, cost_usd: f64) -> Self {
        let added = candidate.scaled(contracts);
        Self {
            delta: self.delta + added.delta,
            gamma: self.gamma + added.gamma,
            theta: self.theta + added.theta,
            vega: self.vega + added.vega,
            exposure_usd: self.exposure_usd + cost_usd,
        }
    }
}

/// Recomputes [`PortfolioGreeks`] from scratch each cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioRiskAggregator;

impl PortfolioRiskAggregator {
    /// Full recompute over the open position set.
    #[must_use]
    pub fn aggregate(exposures: &[OpenExposure]) -> PortfolioGreeks {
        let mut totals = PortfolioGreeks::default();
        for exposure in exposures {
            let scaled = exposure.greeks.scaled(exposure.contracts);
            totals.delta += scaled.delta;
            totals.gamma += scaled.gamma;
            totals.theta += scaled.theta;
            totals.vega += scaled.vega;
            totals.exposure_usd += exposure.cost_basis_usd;
        }
        tracing::debug!(
            positions = exposures.len(),
            delta = format!("{:.2}", totals.delta),
            gamma = format!("{:.2}", totals.gamma),
            theta = format!("{:.2}", totals.theta),
            vega = format!("{:.2}", totals.vega),
            "Portfolio greeks aggregated"
        );
        totals
    }
}
