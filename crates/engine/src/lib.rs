//! Orchestration for the short-dated options decision engine: configuration,
//! the per-cycle decision loop, and the interval scheduler around it.

pub mod config;
pub mod cycle;
pub mod report;
pub mod scheduler;

pub use config::{AppConfig, ConfigLoader, EngineSettings};
pub use cycle::DecisionEngine;
pub use report::{CycleAction, CycleRecord, CycleReport};
pub use scheduler::{CycleRunner, IntervalScheduler, SchedulerCommand, SchedulerHandle};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use odte_core::{BrokerExecution, MarketCalendar, MarketDataProvider, OptionsChainProvider};

#[async_trait]
impl<M, O, B, C> CycleRunner for DecisionEngine<M, O, B, C>
where
    M: MarketDataProvider,
    O: OptionsChainProvider,
    B: BrokerExecution,
    C: MarketCalendar,
{
    async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        DecisionEngine::run_cycle(self, now).await
    }
}
