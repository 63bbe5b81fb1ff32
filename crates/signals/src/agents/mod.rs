//! The heuristic agent pool.

pub mod mean_reversion;
pub mod momentum;
pub mod options_aware;
pub mod trend_follow;
pub mod vol_expansion;

pub use mean_reversion::MeanReversionAgent;
pub use momentum::MomentumAgent;
pub use options_aware::OptionsAwareAgent;
pub use trend_follow::TrendFollowAgent;
pub use vol_expansion::VolExpansionAgent;
