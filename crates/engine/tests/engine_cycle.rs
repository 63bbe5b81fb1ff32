//! End-to-end cycle tests with mocked collaborators: entry through the
//! predictor path, a ladder partial exit, and the close-deadline flatten.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use odte_core::{
    AccountSummary, BrokerExecution, Greeks, MarketCalendar, MarketDataProvider, OhlcvBar,
    OptionContract, OptionQuote, OptionRight, OptionsChainProvider, OrderFill, OrderRequest,
    OrderSide,
};
use odte_engine::{AppConfig, CycleAction, DecisionEngine};
use odte_signals::{DirectionalModel, FeatureVector, RegimeSignal};

struct FixedModel(f64);

impl DirectionalModel for FixedModel {
    fn predict(&self, _f: &FeatureVector, _r: &RegimeSignal) -> Result<f64> {
        Ok(self.0)
    }
}

struct MockMarket {
    bars: Vec<OhlcvBar>,
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn get_bars(&self, _symbol: &str, lookback: usize) -> Result<Vec<OhlcvBar>> {
        Ok(self.bars.iter().rev().take(lookback).rev().cloned().collect())
    }

    async fn latest_price(&self, _symbol: &str) -> Result<Decimal> {
        Ok(self.bars.last().map_or(dec!(100), |b| b.close))
    }
}

struct MockChain {
    /// Premium per share the chain currently quotes.
    premium: Arc<Mutex<Decimal>>,
    expiry: NaiveDate,
    iv_rank: Option<f64>,
}

impl MockChain {
    fn quote(&self) -> OptionQuote {
        let mid = *self.premium.lock().unwrap();
        OptionQuote {
            contract: OptionContract::new("SPY", self.expiry, dec!(450), OptionRight::Call),
            bid: mid - dec!(0.05),
            ask: mid + dec!(0.05),
            mid,
            volume: 1500,
            open_interest: 8000,
            iv: 0.21,
            greeks: Greeks {
                delta: 0.48,
                gamma: 0.04,
                theta: -0.15,
                vega: 0.11,
            },
        }
    }
}

#[async_trait]
impl OptionsChainProvider for MockChain {
    async fn get_chain(
        &self,
        _symbol: &str,
        _min_dte: i64,
        _max_dte: i64,
    ) -> Result<Vec<OptionQuote>> {
        Ok(vec![self.quote()])
    }

    async fn get_quote(&self, _contract: &OptionContract) -> Result<OptionQuote> {
        Ok(self.quote())
    }

    async fn get_iv_rank(&self, _symbol: &str) -> Result<Option<f64>> {
        Ok(self.iv_rank)
    }
}

#[derive(Default)]
struct MockBroker {
    orders: Arc<Mutex<Vec<OrderRequest>>>,
}

#[async_trait]
impl BrokerExecution for MockBroker {
    async fn get_account(&self) -> Result<AccountSummary> {
        Ok(AccountSummary {
            equity: dec!(100000),
            buying_power: dec!(100000),
            cash: dec!(100000),
        })
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderFill> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(OrderFill {
            order_id: format!("fill-{}", order.correlation_id),
            contract: order.contract.clone(),
            side: order.side,
            quantity: order.quantity,
            avg_fill_price: order.limit_price.unwrap_or(dec!(1)),
            filled_at: Utc::now(),
        })
    }
}

/// Chain whose per-contract quotes never come back in time.
struct StalledQuoteChain {
    inner: MockChain,
}

#[async_trait]
impl OptionsChainProvider for StalledQuoteChain {
    async fn get_chain(
        &self,
        symbol: &str,
        min_dte: i64,
        max_dte: i64,
    ) -> Result<Vec<OptionQuote>> {
        self.inner.get_chain(symbol, min_dte, max_dte).await
    }

    async fn get_quote(&self, _contract: &OptionContract) -> Result<OptionQuote> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        anyhow::bail!("stalled feed")
    }

    async fn get_iv_rank(&self, symbol: &str) -> Result<Option<f64>> {
        self.inner.get_iv_rank(symbol).await
    }
}

/// Broker whose fills land well after the per-symbol evaluation budget.
struct SlowFillBroker {
    inner: MockBroker,
}

#[async_trait]
impl BrokerExecution for SlowFillBroker {
    async fn get_account(&self) -> Result<AccountSummary> {
        self.inner.get_account().await
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderFill> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        self.inner.place_order(order).await
    }
}

struct OpenCalendar;

#[async_trait]
impl MarketCalendar for OpenCalendar {
    async fn is_market_open(&self) -> Result<bool> {
        Ok(true)
    }
}

struct ClosedCalendar;

#[async_trait]
impl MarketCalendar for ClosedCalendar {
    async fn is_market_open(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Directionless tape with a 2% bar range: no regime scores high enough to
/// boost or gate anything, leaving the predictor as the only signal source.
fn flat_bars(count: usize) -> Vec<OhlcvBar> {
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 13, 30, 0).unwrap();
    (0..count)
        .map(|i| OhlcvBar {
            timestamp: start + chrono::Duration::minutes(5 * i as i64),
            open: dec!(100),
            high: dec!(101.00),
            low: dec!(99.00),
            close: dec!(100),
            volume: dec!(10000),
        })
        .collect()
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.engine.symbols = vec!["SPY".to_string()];
    config.retry.initial_backoff_ms = 1;
    config
}

fn mid_session(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, minute, 0).unwrap()
}

type Engine = DecisionEngine<MockMarket, MockChain, MockBroker, OpenCalendar>;

fn engine_with(premium: Arc<Mutex<Decimal>>, orders: Arc<Mutex<Vec<OrderRequest>>>) -> Engine {
    let market = MockMarket {
        bars: flat_bars(60),
    };
    let chain = MockChain {
        premium,
        expiry: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        iv_rank: Some(45.0),
    };
    let broker = MockBroker { orders };
    DecisionEngine::new(
        test_config(),
        market,
        chain,
        broker,
        OpenCalendar,
        Some(Box::new(FixedModel(0.9))),
    )
}

#[tokio::test]
async fn predictor_driven_entry_opens_a_position() {
    let premium = Arc::new(Mutex::new(dec!(4.50)));
    let orders = Arc::new(Mutex::new(Vec::new()));
    let mut engine = engine_with(premium, orders.clone());

    let report = engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();

    // Flat tape gives the heuristic agents nothing; the 0.9 model action
    // passes through the ensemble at 0.825 and lands in the 0.40-0.55
    // delta band, which the 0.48-delta call satisfies.
    assert_eq!(report.entries(), 1);
    assert_eq!(engine.open_positions().len(), 1);

    let pos = &engine.open_positions()[0];
    // $2,000 budget at $450 per contract.
    assert_eq!(pos.contracts, 4);
    assert!(pos.predictor_contributed);
    assert_eq!(pos.entry_price, dec!(4.50));

    let placed = orders.lock().unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].side, OrderSide::Buy);
    assert_eq!(placed[0].quantity, 4);
}

#[tokio::test]
async fn profit_tier_fires_partial_exit_on_later_cycle() {
    let premium = Arc::new(Mutex::new(dec!(4.50)));
    let orders = Arc::new(Mutex::new(Vec::new()));
    let mut engine = engine_with(premium.clone(), orders.clone());

    engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();
    assert_eq!(engine.open_positions().len(), 1);

    // Premium rallies 30%: TP1 sells a quarter of the four contracts.
    *premium.lock().unwrap() = dec!(5.85);
    let report = engine.run_cycle(mid_session(3, 15, 0)).await.unwrap();

    assert_eq!(report.exits(), 1);
    let pos = &engine.open_positions()[0];
    assert_eq!(pos.contracts, 3);
    assert!(!pos.is_closed());

    let placed = orders.lock().unwrap();
    let exit = placed.last().unwrap();
    assert_eq!(exit.side, OrderSide::Sell);
    assert_eq!(exit.quantity, 1);

    // Same price next cycle: TP1 does not re-fire.
    drop(placed);
    let report = engine.run_cycle(mid_session(4, 15, 0)).await.unwrap();
    assert_eq!(report.exits(), 0);
    assert_eq!(engine.open_positions()[0].contracts, 3);
}

#[tokio::test]
async fn close_deadline_flattens_everything_and_skips_entries() {
    let premium = Arc::new(Mutex::new(dec!(4.50)));
    let orders = Arc::new(Mutex::new(Vec::new()));
    let mut engine = engine_with(premium.clone(), orders.clone());

    engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();
    assert_eq!(engine.open_positions().len(), 1);

    *premium.lock().unwrap() = dec!(4.80);
    // 15:55 is past the 15:50 deadline.
    let report = engine.run_cycle(mid_session(2, 15, 55)).await.unwrap();

    assert_eq!(report.exits(), 1);
    assert_eq!(report.entries(), 0);
    assert!(engine.open_positions().is_empty());
    assert_eq!(
        report.records[0].reason, "flatten_at_close",
    );

    let placed = orders.lock().unwrap();
    let exit = placed.last().unwrap();
    assert_eq!(exit.quantity, 4);
}

#[tokio::test(start_paused = true)]
async fn flatten_exits_at_last_mark_when_quote_feed_stalls() {
    let premium = Arc::new(Mutex::new(dec!(4.50)));
    let orders = Arc::new(Mutex::new(Vec::new()));
    let chain = StalledQuoteChain {
        inner: MockChain {
            premium,
            expiry: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            iv_rank: Some(45.0),
        },
    };
    let mut config = test_config();
    config.engine.per_symbol_timeout_secs = 1;
    let mut engine = DecisionEngine::new(
        config,
        MockMarket {
            bars: flat_bars(60),
        },
        chain,
        MockBroker {
            orders: orders.clone(),
        },
        OpenCalendar,
        Some(Box::new(FixedModel(0.9))),
    );

    engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();
    assert_eq!(engine.open_positions().len(), 1);

    // Past the deadline a stalled feed must not hold the book open; the
    // exit goes out at the last marked price instead of a fresh quote.
    let report = engine.run_cycle(mid_session(2, 15, 55)).await.unwrap();

    assert_eq!(report.exits(), 1);
    assert!(engine.open_positions().is_empty());
    assert_eq!(report.records[0].reason, "flatten_at_close");

    let placed = orders.lock().unwrap();
    let exit = placed.last().unwrap();
    assert_eq!(exit.side, OrderSide::Sell);
    assert_eq!(exit.quantity, 4);
    assert_eq!(exit.limit_price, Some(dec!(4.50)));
}

#[tokio::test(start_paused = true)]
async fn slow_order_fill_is_still_recorded() {
    let premium = Arc::new(Mutex::new(dec!(4.50)));
    let orders = Arc::new(Mutex::new(Vec::new()));
    let chain = MockChain {
        premium,
        expiry: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        iv_rank: Some(45.0),
    };
    let mut config = test_config();
    config.engine.per_symbol_timeout_secs = 1;
    let mut engine = DecisionEngine::new(
        config,
        MockMarket {
            bars: flat_bars(60),
        },
        chain,
        SlowFillBroker {
            inner: MockBroker {
                orders: orders.clone(),
            },
        },
        OpenCalendar,
        Some(Box::new(FixedModel(0.9))),
    );

    // The fill takes far longer than the evaluation budget; the position
    // must still be tracked once the broker reports it.
    let report = engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();

    assert_eq!(report.entries(), 1);
    assert_eq!(engine.open_positions().len(), 1);
    assert_eq!(orders.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn closed_market_skips_the_cycle() {
    let chain = MockChain {
        premium: Arc::new(Mutex::new(dec!(4.50))),
        expiry: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        iv_rank: Some(45.0),
    };
    let mut engine = DecisionEngine::new(
        test_config(),
        MockMarket {
            bars: flat_bars(60),
        },
        chain,
        MockBroker::default(),
        ClosedCalendar,
        Some(Box::new(FixedModel(0.9))),
    );

    let report = engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.open_positions, 0);
}

#[tokio::test]
async fn rich_premium_is_rejected_with_reason_code() {
    let chain = MockChain {
        premium: Arc::new(Mutex::new(dec!(4.50))),
        expiry: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        iv_rank: Some(92.0),
    };
    let mut engine = DecisionEngine::new(
        test_config(),
        MockMarket {
            bars: flat_bars(60),
        },
        chain,
        MockBroker::default(),
        OpenCalendar,
        Some(Box::new(FixedModel(0.9))),
    );

    let report = engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();

    assert_eq!(report.entries(), 0);
    let record = &report.records[0];
    assert_eq!(record.action, CycleAction::Hold);
    assert_eq!(record.reason, "iv-rank-out-of-band");
}

#[tokio::test]
async fn too_few_bars_skips_the_symbol() {
    let chain = MockChain {
        premium: Arc::new(Mutex::new(dec!(4.50))),
        expiry: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        iv_rank: Some(45.0),
    };
    let mut engine = DecisionEngine::new(
        test_config(),
        MockMarket {
            bars: flat_bars(10),
        },
        chain,
        MockBroker::default(),
        OpenCalendar,
        Some(Box::new(FixedModel(0.9))),
    );

    let report = engine.run_cycle(mid_session(2, 15, 0)).await.unwrap();

    let record = &report.records[0];
    assert_eq!(record.action, CycleAction::Skip);
    assert!(record.reason.starts_with("insufficient-data"));
}
