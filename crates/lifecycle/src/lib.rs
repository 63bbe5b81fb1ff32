//! Open-position state machine: forced exits, stops, the profit ladder,
//! and the trailing stop, evaluated in fixed priority each cycle.

pub mod ladder;
pub mod manager;
pub mod stops;
pub mod trailing;
pub mod types;

pub use manager::PositionLifecycleManager;
pub use types::{ExitAction, ExitReason, LifecycleConfig, PositionState, PositionStatus};
