//! Contract sizing from account equity and premium.

use odte_core::{decimal_to_f64, AccountSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Percent of account equity risked per trade at full size.
    pub base_risk_pct: f64,
    /// Percent of equity the whole options book may occupy.
    pub max_allocation_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_risk_pct: 2.0,
            max_allocation_pct: 10.0,
        }
    }
}

/// Whole contracts purchasable for the trade's premium budget.
///
/// Budget = equity × base_risk_pct × size_fraction × dte_multiplier. Zero
/// when even one contract exceeds the budget; the governor turns that into
/// a sizing rejection rather than rounding up.
#[must_use]
pub fn contracts_for_budget(
    account: &AccountSummary,
    config: &SizingConfig,
    size_fraction: f64,
    dte_multiplier: f64,
    premium_per_contract: Decimal,
) -> i32 {
    let equity = decimal_to_f64(account.equity);
    let premium = decimal_to_f64(premium_per_contract);
    if premium <= 0.0 || equity <= 0.0 {
        return 0;
    }

    let budget = equity * (config.base_risk_pct / 100.0) * size_fraction * dte_multiplier;
    let contracts = (budget / premium).floor();
    if contracts.is_finite() && contracts > 0.0 {
        contracts as i32
    } else {
        0
    }
}
