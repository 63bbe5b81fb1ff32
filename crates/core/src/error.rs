//! Error taxonomy for the decision engine.
//!
//! Risk rejections are not errors: they are expected control-flow outcomes
//! carried by [`RejectReason`] and logged with their reason code. Only the
//! variants in [`EngineError`] propagate through `Result`.

use thiserror::Error;

/// Errors raised by the decision core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Not enough bars to compute features. Caller skips the symbol for the
    /// cycle; no within-cycle retry.
    #[error("insufficient data for {symbol}: got {got} bars, need {need}")]
    InsufficientData {
        symbol: String,
        got: usize,
        need: usize,
    },

    /// The learned predictor has no loadable model.
    #[error("predictor model unavailable: {0}")]
    ModelUnavailable(String),

    /// The learned predictor disabled itself after its rolling accuracy fell
    /// below the configured floor. Supervisory state, not a crash.
    #[error("predictor degraded: accuracy {accuracy:.2} below floor, disabled until cycle {until_cycle}")]
    ModelDegraded { accuracy: f64, until_cycle: u64 },

    /// Broker rejected or timed out an order after bounded retries.
    #[error("execution failed after {attempts} attempts: {source}")]
    ExecutionFailure {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// External data did not have the expected shape. Propagates to the
    /// cycle-level handler, which aborts the cycle but not the process.
    #[error("malformed external data: {0}")]
    MalformedData(String),
}

/// Machine-checkable reason a candidate trade was rejected or held.
///
/// Every rejection carries enough context to be auditable; `Display` renders
/// the stable kebab-case reason code used in cycle reports.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// IV rank outside the configured [min, max] band.
    IvRankOutOfBand { iv_rank: f64, min: f64, max: f64 },
    /// No IV rank available from the auxiliary service.
    IvRankUnavailable,
    /// No chain contract satisfies the confidence-tiered delta band.
    DeltaBandUnavailable { low: f64, high: f64 },
    /// Adding the position would breach a portfolio greek cap.
    PortfolioGreekCapBreach {
        greek: &'static str,
        projected: f64,
        cap: f64,
    },
    /// The single position's gamma alone exceeds the per-position ceiling.
    PositionGammaCapBreach { gamma: f64, cap: f64 },
    /// Sized position rounds down to zero contracts.
    PositionSizeTooSmall,
    /// Aggregate options exposure would exceed the account allocation cap.
    AllocationCapBreach { would_be_pct: f64, max_pct: f64 },
    /// DTE forced-exit gate evaluated but its profit floor was not met.
    DteForcedExitNotMet { dte: i64, required_profit_pct: f64 },
}

impl RejectReason {
    /// Stable reason code for logs and cycle reports.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IvRankOutOfBand { .. } => "iv-rank-out-of-band",
            Self::IvRankUnavailable => "iv-rank-unavailable",
            Self::DeltaBandUnavailable { .. } => "delta-band-unavailable",
            Self::PortfolioGreekCapBreach { .. } => "portfolio-greek-cap-breach",
            Self::PositionGammaCapBreach { .. } => "position-gamma-cap-breach",
            Self::PositionSizeTooSmall => "position-size-too-small",
            Self::AllocationCapBreach { .. } => "allocation-cap-breach",
            Self::DteForcedExitNotMet { .. } => "dte-forced-exit-not-met",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_codes_are_stable() {
        assert_eq!(
            RejectReason::IvRankOutOfBand {
                iv_rank: 85.0,
                min: 20.0,
                max: 80.0
            }
            .code(),
            "iv-rank-out-of-band"
        );
        assert_eq!(
            RejectReason::PortfolioGreekCapBreach {
                greek: "delta",
                projected: 90.0,
                cap: 75.0
            }
            .code(),
            "portfolio-greek-cap-breach"
        );
        assert_eq!(RejectReason::PositionSizeTooSmall.code(), "position-size-too-small");
    }

    #[test]
    fn insufficient_data_formats_counts() {
        let err = EngineError::InsufficientData {
            symbol: "SPY".to_string(),
            got: 12,
            need: 30,
        };
        let msg = err.to_string();
        assert!(msg.contains("SPY"));
        assert!(msg.contains("12"));
        assert!(msg.contains("30"));
    }
}
