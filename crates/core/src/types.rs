//! Shared types for the options decision engine.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lossy `Decimal` to `f64` conversion for signal math on money values.
///
/// Degenerate values collapse to 0.0 rather than NaN; callers treat zero
/// prices as "no data".
#[must_use]
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}

/// Direction of a trade signal or intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    /// No directional exposure.
    Flat,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
            Self::Flat => Self::Flat,
        }
    }

    /// Returns true if this direction has a directional bias.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        !matches!(self, Self::Flat)
    }

    /// Signed scalar representation: Long = +1, Short = -1, Flat = 0.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
            Self::Flat => 0.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

/// A single OHLCV price bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl OhlcvBar {
    /// High-to-low range of the bar.
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Close-to-open change (signed).
    #[must_use]
    pub fn change(&self) -> Decimal {
        self.close - self.open
    }

    /// Typical price used for VWAP: (high + low + close) / 3.
    #[must_use]
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }

    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// A directional trade proposal emitted by an agent, the predictor, or the
/// ensemble. Read-only once created; consumed within the cycle that made it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub direction: Direction,
    /// Confidence in [0.0, 1.0].
    pub confidence: f64,
    /// Identifier of the producing agent/predictor/ensemble.
    pub source: String,
    /// Human-readable explanation of why the intent was emitted.
    pub rationale: String,
    /// Suggested fraction of the nominal position size, in (0.0, 1.0].
    pub size_fraction: f64,
}

impl TradeIntent {
    /// Creates a new intent with confidence validation.
    ///
    /// # Errors
    /// Returns an error if confidence is outside [0.0, 1.0].
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        confidence: f64,
        source: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            anyhow::bail!("confidence must be in [0.0, 1.0], got {confidence}");
        }
        Ok(Self {
            symbol: symbol.into(),
            direction,
            confidence,
            source: source.into(),
            rationale: rationale.into(),
            size_fraction: 1.0,
        })
    }

    /// Sets the suggested size fraction.
    #[must_use]
    pub fn with_size_fraction(mut self, fraction: f64) -> Self {
        self.size_fraction = fraction.clamp(0.0, 1.0);
        self
    }
}

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// An options contract specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    /// Contract multiplier (100 for standard US equity options).
    pub multiplier: Decimal,
}

impl OptionContract {
    /// Create a new standard US equity options contract.
    #[must_use]
    pub fn new(symbol: &str, expiry: NaiveDate, strike: Decimal, right: OptionRight) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            expiry,
            strike,
            right,
            multiplier: Decimal::from(100),
        }
    }

    /// Days until expiration relative to `today`. Negative after expiry.
    #[must_use]
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }

    /// Human-readable contract description (e.g., "SPY 450C 2026-09-05").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}{} {}", self.symbol, self.strike, self.right, self.expiry)
    }
}

/// Option sensitivity measures (per contract, per share).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl Greeks {
    /// Greeks scaled to a position of `contracts` contracts.
    #[must_use]
    pub fn scaled(&self, contracts: i32) -> Self {
        let n = f64::from(contracts);
        Self {
            delta: self.delta * n,
            gamma: self.gamma * n,
            theta: self.theta * n,
            vega: self.vega * n,
        }
    }
}

/// A quoted option with greeks, as returned by the chain provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    pub contract: OptionContract,
    pub bid: Decimal,
    pub ask: Decimal,
    pub mid: Decimal,
    pub volume: u64,
    pub open_interest: u64,
    /// Implied volatility of this contract.
    pub iv: f64,
    pub greeks: Greeks,
}

/// Broker account snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub equity: Decimal,
    pub buying_power: Decimal,
    pub cash: Decimal,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// An order to be routed to the broker boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub contract: OptionContract,
    pub side: OrderSide,
    pub quantity: i32,
    /// None means market order.
    pub limit_price: Option<Decimal>,
    /// Client-side correlation id so retried submissions can be deduplicated.
    pub correlation_id: String,
}

/// A confirmed fill from the broker boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFill {
    pub order_id: String,
    pub contract: OptionContract,
    pub side: OrderSide,
    pub quantity: i32,
    pub avg_fill_price: Decimal,
    pub filled_at: DateTime<Utc>,
}
