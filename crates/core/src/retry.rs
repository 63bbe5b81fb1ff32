//! Bounded iterative retry for the execution boundary.
//!
//! Implemented as a single loop with a max-attempt counter. The retry helper
//! must never be re-entered by the operation it wraps.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given retry attempt (1-based; attempt 1 has no wait).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = self.backoff_multiplier.powi(attempt.saturating_sub(2) as i32);
        Duration::from_millis((self.initial_backoff_ms as f64 * exp) as u64)
    }
}

/// Runs `op` up to `policy.max_attempts` times with exponential backoff.
///
/// # Errors
/// Returns [`EngineError::ExecutionFailure`] carrying the last underlying
/// error once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    op_name: &str,
    mut op: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        let backoff = policy.backoff_for_attempt(attempt);
        if !backoff.is_zero() {
            tokio::time::sleep(backoff).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    op = op_name,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Operation failed"
                );
                last_err = Some(e);
            }
        }
    }

    Err(EngineError::ExecutionFailure {
        attempts,
        source: last_err.unwrap_or_else(|| anyhow::anyhow!("no attempts were made")),
    })
}
