//! Position state and lifecycle configuration.

use chrono::{DateTime, NaiveDate, Utc};
use odte_core::{decimal_to_f64, Direction, Greeks, OptionContract};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// One open (or just-closed) options position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionState {
    pub contract: OptionContract,
    pub direction: Direction,
    /// Remaining contracts; reaches zero on the final exit.
    pub contracts: i32,
    pub original_contracts: i32,
    /// Premium per share at entry.
    pub entry_price: Decimal,
    /// Last marked premium per share.
    pub current_price: Decimal,
    /// Per-contract greeks from the entry pricing pass.
    pub greeks: Greeks,
    /// Peak unrealized profit percent seen since entry.
    pub highest_profit_pct: f64,
    /// Ladder tiers fired so far, by tier index.
    pub fired_tiers: Vec<usize>,
    pub trailing_armed: bool,
    /// Agents whose intents contributed to the entry, for weight updates.
    pub origin_agents: Vec<String>,
    pub predictor_contributed: bool,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
}

impl PositionState {
    /// Unrealized profit percent of entry premium.
    ///
    /// Computed in `Decimal` and converted once, so round thresholds like
    /// an exact -20% compare equal against the stop configuration.
    #[must_use]
    pub fn profit_pct(&self) -> f64 {
        if self.entry_price.is_zero() {
            return 0.0;
        }
        let pct = (self.current_price - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED;
        decimal_to_f64(pct)
    }

    /// Marks the latest premium and ratchets the profit peak.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        let pct = self.profit_pct();
        if pct > self.highest_profit_pct {
            self.highest_profit_pct = pct;
        }
    }

    #[must_use]
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        self.contract.days_to_expiry(today)
    }

    /// Premium at risk for the remaining contracts, in dollars.
    #[must_use]
    pub fn cost_basis_usd(&self) -> f64 {
        let per_contract = decimal_to_f64(self.entry_price * self.contract.multiplier);
        per_contract * f64::from(self.contracts)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == PositionStatus::Closed
    }

    #[must_use]
    pub fn tier_fired(&self, tier: usize) -> bool {
        self.fired_tiers.contains(&tier)
    }
}

/// Why an exit fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    FlattenAtClose,
    DteForcedExit,
    HardStop,
    ProfitTier(usize),
    TrailingStop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FlattenAtClose => write!(f, "flatten_at_close"),
            Self::DteForcedExit => write!(f, "dte_forced_exit"),
            Self::HardStop => write!(f, "hard_stop"),
            Self::ProfitTier(tier) => write!(f, "profit_tier_{}", tier + 1),
            Self::TrailingStop => write!(f, "trailing_stop"),
        }
    }
}

/// At most one action per position per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitAction {
    FullExit { reason: ExitReason },
    PartialExit { contracts: i32, reason: ExitReason },
}

impl ExitAction {
    #[must_use]
    pub fn reason(&self) -> ExitReason {
        match self {
            Self::FullExit { reason } | Self::PartialExit { reason, .. } => *reason,
        }
    }
}

/// Required minimum profit below a DTE threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DteExitTier {
    /// Applies when DTE is strictly below this.
    pub below_dte: i64,
    /// Profit percent required to stay in the trade.
    pub required_profit_pct: f64,
}

/// Profit-ladder tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LadderTier {
    pub trigger_pct: f64,
    /// Fraction of the *remaining* contracts to exit.
    pub exit_fraction: f64,
}

/// Allowed pullback from peak while the trailing stop is armed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PullbackTier {
    /// Applies when the peak is strictly below this.
    pub below_peak_pct: f64,
    /// Allowed drop from peak, in profit percentage points.
    pub allowed_pullback_pts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Tightest tier first; the first tier whose `below_dte` exceeds the
    /// position's DTE applies.
    pub dte_exit_tiers: Vec<DteExitTier>,
    /// Full exit at or below this loss percent.
    pub hard_stop_pct: f64,
    /// Ascending profit tiers TP1..TPn.
    pub ladder: Vec<LadderTier>,
    /// Ladder tier index whose crossing arms the trailing stop.
    pub trailing_arm_tier: usize,
    /// Minimum profit the trailing stop locks once armed.
    pub trailing_floor_pct: f64,
    /// Ascending by `below_peak_pct`; past the last entry the final
    /// `fallback_pullback_pts` applies.
    pub pullback_tiers: Vec<PullbackTier>,
    pub fallback_pullback_pts: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            dte_exit_tiers: vec![
                DteExitTier {
                    below_dte: 1,
                    required_profit_pct: 50.0,
                },
                DteExitTier {
                    below_dte: 3,
                    required_profit_pct: 20.0,
                },
                DteExitTier {
                    below_dte: 5,
                    required_profit_pct: 10.0,
                },
            ],
            hard_stop_pct: -20.0,
            ladder: vec![
                LadderTier {
                    trigger_pct: 25.0,
                    exit_fraction: 0.25,
                },
                LadderTier {
                    trigger_pct: 50.0,
                    exit_fraction: 0.25,
                },
                LadderTier {
                    trigger_pct: 75.0,
                    exit_fraction: 0.33,
                },
                LadderTier {
                    trigger_pct: 100.0,
                    exit_fraction: 0.50,
                },
                LadderTier {
                    trigger_pct: 150.0,
                    exit_fraction: 1.0,
                },
            ],
            trailing_arm_tier: 3,
            trailing_floor_pct: 100.0,
            pullback_tiers: vec![
                PullbackTier {
                    below_peak_pct: 120.0,
                    allowed_pullback_pts: 15.0,
                },
                PullbackTier {
                    below_peak_pct: 200.0,
                    allowed_pullback_pts: 10.0,
                },
            ],
            fallback_pullback_pts: 8.0,
        }
    }
}
