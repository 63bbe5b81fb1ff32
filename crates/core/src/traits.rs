//! Interfaces to external collaborators.
//!
//! The decision core never talks to a broker or data vendor directly; it
//! consumes these narrow traits. Implementations live outside this workspace.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{AccountSummary, OhlcvBar, OptionContract, OptionQuote, OrderFill, OrderRequest};

/// Market-data provider for underlying price history.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Returns up to `lookback` bars, oldest first.
    async fn get_bars(&self, symbol: &str, lookback: usize) -> Result<Vec<OhlcvBar>>;

    async fn latest_price(&self, symbol: &str) -> Result<Decimal>;
}

/// Options-chain and volatility data provider.
#[async_trait]
pub trait OptionsChainProvider: Send + Sync {
    /// Returns quoted contracts expiring within [min_dte, max_dte] days.
    async fn get_chain(&self, symbol: &str, min_dte: i64, max_dte: i64)
        -> Result<Vec<OptionQuote>>;

    /// Current quote for a single contract.
    async fn get_quote(&self, contract: &OptionContract) -> Result<OptionQuote>;

    /// IV rank in [0, 100], or None when the service has no history.
    async fn get_iv_rank(&self, symbol: &str) -> Result<Option<f64>>;
}

/// Broker execution boundary. `place_order` must be idempotent-safe under
/// retry via the request's client-side correlation id.
#[async_trait]
pub trait BrokerExecution: Send + Sync {
    async fn get_account(&self) -> Result<AccountSummary>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderFill>;
}

/// Auxiliary market-calendar service.
#[async_trait]
pub trait MarketCalendar: Send + Sync {
    async fn is_market_open(&self) -> Result<bool>;
}
