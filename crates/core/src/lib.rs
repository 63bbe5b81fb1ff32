pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{EngineError, RejectReason};
pub use retry::{with_retry, RetryPolicy};
pub use traits::{BrokerExecution, MarketCalendar, MarketDataProvider, OptionsChainProvider};
pub use types::{
    decimal_to_f64, AccountSummary, Direction, Greeks, OhlcvBar, OptionContract, OptionQuote,
    OptionRight, OrderFill, OrderRequest, OrderSide, TradeIntent,
};
