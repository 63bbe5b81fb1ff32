//! Pre-trade gating for candidate option entries.
//!
//! Every rejection carries a machine-checkable reason code. The governor
//! never shrinks a rejected trade to force it through: the only size
//! adjustment is the deliberate DTE multiplier, applied before sizing.

use chrono::NaiveDate;
use odte_core::{decimal_to_f64, AccountSummary, Direction, OptionQuote, OptionRight, RejectReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::PortfolioGreeks;
use crate::sizing::{contracts_for_budget, SizingConfig};

/// Delta band keyed by a confidence floor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeltaTier {
    pub min_confidence: f64,
    pub delta_low: f64,
    pub delta_high: f64,
}

/// Size multiplier keyed by a maximum DTE.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DteTier {
    pub max_dte: i64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Acceptable IV rank band, inclusive.
    pub iv_rank_min: f64,
    pub iv_rank_max: f64,
    /// Confidence-tiered target delta bands, highest floor first.
    pub delta_tiers: Vec<DeltaTier>,
    /// Slack around the band when matching chain deltas.
    pub delta_tolerance: f64,
    /// DTE size multipliers, smallest max_dte first. Beyond the last tier
    /// the multiplier is 1.0.
    pub dte_tiers: Vec<DteTier>,
    pub max_portfolio_delta: f64,
    pub max_portfolio_gamma: f64,
    /// Theta budget, compared against |theta|.
    pub max_portfolio_theta: f64,
    pub max_portfolio_vega: f64,
    /// Ceiling on a single position's gamma.
    pub max_position_gamma: f64,
    pub sizing: SizingConfig,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            iv_rank_min: 20.0,
            iv_rank_max: 80.0,
            delta_tiers: vec![
                DeltaTier {
                    min_confidence: 0.85,
                    delta_low: 0.55,
                    delta_high: 0.70,
                },
                DeltaTier {
                    min_confidence: 0.70,
                    delta_low: 0.40,
                    delta_high: 0.55,
                },
                DeltaTier {
                    min_confidence: 0.0,
                    delta_low: 0.25,
                    delta_high: 0.40,
                },
            ],
            delta_tolerance: 0.02,
            dte_tiers: vec![
                DteTier {
                    max_dte: 3,
                    multiplier: 0.50,
                },
                DteTier {
                    max_dte: 7,
                    multiplier: 0.75,
                },
            ],
            max_portfolio_delta: 75.0,
            max_portfolio_gamma: 10.0,
            max_portfolio_theta: 50.0,
            max_portfolio_vega: 200.0,
            max_position_gamma: 3.0,
            sizing: SizingConfig::default(),
        }
    }
}

/// A candidate entry, as produced by the ensemble stage.
#[derive(Debug, Clone)]
pub struct EntryCandidate<'a> {
    pub symbol: &'a str,
    pub direction: Direction,
    pub confidence: f64,
    /// Suggested fraction of the nominal per-trade size, in (0, 1].
    pub size_fraction: f64,
    pub iv_rank: Option<f64>,
    pub chain: &'a [OptionQuote],
}

/// An approved order sized and priced by the governor.
#[derive(Debug, Clone)]
pub struct ApprovedEntry {
    pub quote: OptionQuote,
    pub contracts: i32,
    pub cost_usd: f64,
    pub dte_multiplier: f64,
    pub delta_band: (f64, f64),
}

/// Outcome of the gate chain.
#[derive(Debug, Clone)]
pub enum GovernorDecision {
    Approved(Box<ApprovedEntry>),
    Rejected(RejectReason),
}

impl GovernorDecision {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, GovernorDecision::Approved(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptionsRiskGovernor {
    config: GovernorConfig,
}

impl OptionsRiskGovernor {
    #[must_use]
    pub fn new(config: GovernorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Runs the full gate chain for one candidate.
    #[must_use]
    pub fn evaluate(
        &self,
        candidate: &EntryCandidate<'_>,
        account: &AccountSummary,
        portfolio: &PortfolioGreeks,
        today: NaiveDate,
    ) -> GovernorDecision {
        let cfg = &self.config;

        let Some(iv_rank) = candidate.iv_rank else {
            return self.reject(candidate, RejectReason::IvRankUnavailable);
        };
        if iv_rank < cfg.iv_rank_min || iv_rank > cfg.iv_rank_max {
            return self.reject(
                candidate,
                RejectReason::IvRankOutOfBand {
                    iv_rank,
                    min: cfg.iv_rank_min,
                    max: cfg.iv_rank_max,
                },
            );
        }

        let band = self.delta_band(candidate.confidence);
        let Some(quote) = self.select_contract(candidate, band) else {
            return self.reject(
                candidate,
                RejectReason::DeltaBandUnavailable {
                    low: band.0,
                    high: band.1,
                },
            );
        };

        let dte = quote.contract.days_to_expiry(today);
        let dte_multiplier = self.dte_multiplier(dte);

        let premium_per_contract = quote.mid * quote.contract.multiplier;
        let contracts = contracts_for_budget(
            account,
            &cfg.sizing,
            candidate.size_fraction,
            dte_multiplier,
            premium_per_contract,
        );
        if contracts < 1 {
            return self.reject(candidate, RejectReason::PositionSizeTooSmall);
        }
        let cost_usd = decimal_to_f64(premium_per_contract) * f64::from(contracts);

        let position_gamma = quote.greeks.gamma * f64::from(contracts);
        if position_gamma > cfg.max_position_gamma {
            return self.reject(
                candidate,
                RejectReason::PositionGammaCapBreach {
                    gamma: position_gamma,
                    cap: cfg.max_position_gamma,
                },
            );
        }

        let projected = portfolio.with_candidate(&quote.greeks, contracts, cost_usd);
        if let Some(reason) = self.greek_cap_breach(&projected) {
            return self.reject(candidate, reason);
        }

        let equity = decimal_to_f64(account.equity);
        if equity > 0.0 {
            let would_be_pct = projected.exposure_usd / equity * 100.0;
            if would_be_pct > cfg.sizing.max_allocation_pct {
                return self.reject(
                    candidate,
                    RejectReason::AllocationCapBreach {
                        would_be_pct,
                        max_pct: cfg.sizing.max_allocation_pct,
                    },
                );
            }
        }

        tracing::info!(
            symbol = candidate.symbol,
            contract = quote.contract.display_name(),
            contracts,
            cost_usd = format!("{cost_usd:.0}"),
            dte,
            "Entry approved"
        );
        GovernorDecision::Approved(Box::new(ApprovedEntry {
            quote,
            contracts,
            cost_usd,
            dte_multiplier,
            delta_band: band,
        }))
    }

    fn reject(&self, candidate: &EntryCandidate<'_>, reason: RejectReason) -> GovernorDecision {
        tracing::info!(
            symbol = candidate.symbol,
            direction = %candidate.direction,
            reason = %reason,
            "Entry rejected"
        );
        GovernorDecision::Rejected(reason)
    }

    fn delta_band(&self, confidence: f64) -> (f64, f64) {
        for tier in &self.config.delta_tiers {
            if confidence >= tier.min_confidence {
                return (tier.delta_low, tier.delta_high);
            }
        }
        // Tiers always end with a 0.0 floor; this is the degenerate
        // misconfiguration fallback.
        (0.25, 0.40)
    }

    fn dte_multiplier(&self, dte: i64) -> f64 {
        for tier in &self.config.dte_tiers {
            if dte <= tier.max_dte {
                return tier.multiplier;
            }
        }
        1.0
    }

    /// Nearest-to-midpoint contract of the right type within the band.
    fn select_contract(
        &self,
        candidate: &EntryCandidate<'_>,
        band: (f64, f64),
    ) -> Option<OptionQuote> {
        let wanted_right = match candidate.direction {
            Direction::Long => OptionRight::Call,
            Direction::Short => OptionRight::Put,
            Direction::Flat => return None,
        };
        let (low, high) = band;
        let tolerance = self.config.delta_tolerance;
        let midpoint = (low + high) / 2.0;

        candidate
            .chain
            .iter()
            .filter(|q| q.contract.right == wanted_right && q.mid > Decimal::ZERO)
            .filter(|q| {
                let d = q.greeks.delta.abs();
                d >= low - tolerance && d <= high + tolerance
            })
            .min_by(|a, b| {
                let da = (a.greeks.delta.abs() - midpoint).abs();
                let db = (b.greeks.delta.abs() - midpoint).abs();
                da.total_cmp(&db)
            })
            .cloned()
    }

    fn greek_cap_breach(&self, projected: &PortfolioGreeks) -> Option<RejectReason> {
        let cfg = &self.config;
        let checks = [
            ("delta", projected.delta.abs(), cfg.max_portfolio_delta),
            ("gamma", projected.gamma.abs(), cfg.max_portfolio_gamma),
            ("theta", projected.theta.abs(), cfg.max_portfolio_theta),
            ("vega", projected.vega.abs(), cfg.max_portfolio_vega),
        ];
        for (greek, value, cap) in checks {
            if value > cap {
                return Some(RejectReason::PortfolioGreekCapBreach {
                    greek,
                    projected: value,
                    cap,
                });
            }
        }
        None
    }
}
