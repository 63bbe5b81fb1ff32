//! Wall-clock wiring around the decision core.
//!
//! The core stays a pure `run_cycle` call; this module owns the interval
//! loop and the command channel, so tests can drive cycles directly.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::report::CycleReport;

/// Anything the scheduler can drive one cycle at a time.
#[async_trait]
pub trait CycleRunner: Send {
    async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport>;
}

#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a cycle immediately, outside the interval cadence.
    RunNow,
    Shutdown,
}

/// Handle for controlling a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub async fn run_now(&self) -> Result<()> {
        self.tx.send(SchedulerCommand::RunNow).await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(SchedulerCommand::Shutdown).await?;
        Ok(())
    }
}

/// Fixed-interval cycle scheduler.
pub struct IntervalScheduler {
    interval: Duration,
    rx: mpsc::Receiver<SchedulerCommand>,
}

impl IntervalScheduler {
    #[must_use]
    pub fn new(interval_secs: u64) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(8);
        (
            Self {
                interval: Duration::from_secs(interval_secs),
                rx,
            },
            SchedulerHandle { tx },
        )
    }

    /// Drives the runner until shutdown. Cycle failures are logged and the
    /// loop continues; the next scheduled cycle still runs.
    pub async fn run<R: CycleRunner>(mut self, mut runner: R) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::drive(&mut runner).await;
                }
                command = self.rx.recv() => match command {
                    Some(SchedulerCommand::RunNow) => Self::drive(&mut runner).await,
                    Some(SchedulerCommand::Shutdown) | None => {
                        tracing::info!("Scheduler shutting down");
                        return;
                    }
                },
            }
        }
    }

    async fn drive<R: CycleRunner>(runner: &mut R) {
        if let Err(e) = runner.run_cycle(Utc::now()).await {
            // A failed cycle aborts itself, never the process.
            tracing::error!(error = %e, "Cycle aborted");
        }
    }
}
