//! Structured per-cycle results for observability.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleAction {
    Enter,
    Exit,
    Hold,
    Skip,
}

/// One symbol's outcome for the cycle. Every rejected or skipped decision
/// carries its reason; silent no-ops are forbidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub symbol: String,
    pub action: CycleAction,
    pub reason: String,
    pub contracts: Option<i32>,
    pub price: Option<Decimal>,
}

impl CycleRecord {
    #[must_use]
    pub fn new(symbol: impl Into<String>, action: CycleAction, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action,
            reason: reason.into(),
            contracts: None,
            price: None,
        }
    }

    #[must_use]
    pub fn with_fill(mut self, contracts: i32, price: Decimal) -> Self {
        self.contracts = Some(contracts);
        self.price = Some(price);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub records: Vec<CycleRecord>,
    pub open_positions: usize,
}

impl CycleReport {
    #[must_use]
    pub fn entries(&self) -> usize {
        self.records.iter().filter(|r| r.action == CycleAction::Enter).count()
    }

    #[must_use]
    pub fn exits(&self) -> usize {
        self.records.iter().filter(|r| r.action == CycleAction::Exit).count()
    }
}
