//! The per-cycle decision loop.
//!
//! `run_cycle` is the whole public surface: position management first, then
//! portfolio aggregation, then the new-entry scan. All risk-state mutation
//! happens on this single call path; the per-symbol fetches are the only
//! suspension points and each is bounded by a timeout so one stalled symbol
//! cannot hold up the cycle.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use odte_core::{
    with_retry, AccountSummary, BrokerExecution, Direction, EngineError, MarketCalendar,
    MarketDataProvider, OptionQuote, OptionRight, OptionsChainProvider, OrderRequest, OrderSide,
    TradeIntent,
};
use odte_lifecycle::{ExitAction, PositionLifecycleManager, PositionState, PositionStatus};
use odte_risk::governor::{ApprovedEntry, EntryCandidate};
use odte_risk::{
    GovernorDecision, OpenExposure, OptionsRiskGovernor, PortfolioGreeks, PortfolioRiskAggregator,
};
use odte_signals::{
    AgentContext, AgentRegistry, DirectionalModel, EnsembleCombiner, FeatureEngine,
    LearnedPredictor, MetaPolicyController, RegimeClassifier, SourcePrediction, WeightTable,
};

use crate::config::AppConfig;
use crate::report::{CycleAction, CycleRecord, CycleReport};

/// Outcome of the pre-order evaluation for one symbol: either a finished
/// record, or an approved entry still awaiting order placement.
enum SymbolDecision {
    Record(CycleRecord),
    Enter {
        entry: Box<ApprovedEntry>,
        sources: Vec<String>,
        meta_pick: Option<TradeIntent>,
    },
}

/// The decision engine, generic over its external collaborators.
pub struct DecisionEngine<M, O, B, C>
where
    M: MarketDataProvider,
    O: OptionsChainProvider,
    B: BrokerExecution,
    C: MarketCalendar,
{
    config: AppConfig,
    market_data: M,
    chain: O,
    broker: B,
    calendar: C,
    features: FeatureEngine,
    classifier: RegimeClassifier,
    agents: AgentRegistry,
    meta: MetaPolicyController,
    predictor: LearnedPredictor,
    ensemble: EnsembleCombiner,
    governor: OptionsRiskGovernor,
    lifecycle: PositionLifecycleManager,
    weights: WeightTable,
    positions: Vec<PositionState>,
    cycle: u64,
}

impl<M, O, B, C> DecisionEngine<M, O, B, C>
where
    M: MarketDataProvider,
    O: OptionsChainProvider,
    B: BrokerExecution,
    C: MarketCalendar,
{
    pub fn new(
        config: AppConfig,
        market_data: M,
        chain: O,
        broker: B,
        calendar: C,
        model: Option<Box<dyn DirectionalModel>>,
    ) -> Self {
        Self {
            features: FeatureEngine::new(config.features.clone()),
            classifier: RegimeClassifier::new(config.regime.clone()),
            agents: AgentRegistry::default_pool(),
            meta: MetaPolicyController::new(config.meta.clone()),
            predictor: LearnedPredictor::new(config.predictor.clone(), model),
            ensemble: EnsembleCombiner::new(config.ensemble.clone()),
            governor: OptionsRiskGovernor::new(config.governor.clone()),
            lifecycle: PositionLifecycleManager::new(config.lifecycle.clone()),
            weights: WeightTable::new(),
            positions: Vec::new(),
            cycle: 0,
            config,
            market_data,
            chain,
            broker,
            calendar,
        }
    }

    #[must_use]
    pub fn open_positions(&self) -> &[PositionState] {
        &self.positions
    }

    #[must_use]
    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Runs one full evaluation cycle at `now`.
    ///
    /// # Errors
    ///
    /// Only top-level failures (account fetch, calendar) abort the cycle;
    /// per-symbol problems are recorded and skipped.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        self.cycle += 1;
        self.predictor.advance_cycle();
        let mut records = Vec::new();

        if !self.calendar.is_market_open().await? {
            tracing::info!(cycle = self.cycle, "Market closed, skipping cycle");
            return Ok(self.report(now, records));
        }

        let flatten = now.time() >= self.config.engine.close_deadline;
        if flatten {
            tracing::warn!(cycle = self.cycle, "Close deadline reached, flattening");
        }

        // Position-management pass runs before any entry scanning.
        self.manage_positions(now, flatten, &mut records).await;
        self.positions.retain(|p| p.status == PositionStatus::Open);

        let portfolio = PortfolioRiskAggregator::aggregate(&self.exposures());

        if !flatten {
            self.scan_entries(now, &portfolio, &mut records).await?;
        }

        Ok(self.report(now, records))
    }

    fn report(&self, now: DateTime<Utc>, records: Vec<CycleRecord>) -> CycleReport {
        let report = CycleReport {
            cycle: self.cycle,
            started_at: now,
            records,
            open_positions: self.positions.len(),
        };
        tracing::info!(
            cycle = report.cycle,
            entries = report.entries(),
            exits = report.exits(),
            open = report.open_positions,
            "Cycle complete"
        );
        report
    }

    fn exposures(&self) -> Vec<OpenExposure> {
        self.positions
            .iter()
            .filter(|p| p.status == PositionStatus::Open)
            .map(|p| OpenExposure {
                symbol: p.contract.symbol.clone(),
                contracts: p.contracts,
                greeks: p.greeks,
                cost_basis_usd: p.cost_basis_usd(),
            })
            .collect()
    }

    async fn manage_positions(
        &mut self,
        now: DateTime<Utc>,
        flatten: bool,
        records: &mut Vec<CycleRecord>,
    ) {
        let today = now.date_naive();
        let timeout = Duration::from_secs(self.config.engine.per_symbol_timeout_secs);

        for idx in 0..self.positions.len() {
            let contract = self.positions[idx].contract.clone();
            let fetched = tokio::time::timeout(timeout, self.chain.get_quote(&contract)).await;
            // Flattening must not be blocked by a dead or stalled feed; any
            // fetch problem past the close deadline exits at the last mark.
            let quote = match fetched {
                Ok(Ok(quote)) => quote,
                Ok(Err(e)) => {
                    if !flatten {
                        tracing::warn!(
                            contract = contract.display_name(),
                            error = %e,
                            "Quote fetch failed, position carried unmarked"
                        );
                        continue;
                    }
                    tracing::warn!(
                        contract = contract.display_name(),
                        error = %e,
                        "Quote fetch failed at close, using last mark"
                    );
                    self.last_mark_quote(idx)
                }
                Err(_) => {
                    if !flatten {
                        tracing::warn!(
                            contract = contract.display_name(),
                            "Quote fetch timed out"
                        );
                        continue;
                    }
                    tracing::warn!(
                        contract = contract.display_name(),
                        "Quote fetch timed out at close, using last mark"
                    );
                    self.last_mark_quote(idx)
                }
            };

            let action = {
                let pos = &mut self.positions[idx];
                self.lifecycle.evaluate(pos, quote.mid, today, flatten)
            };
            let Some(action) = action else {
                continue;
            };

            let quantity = match action {
                ExitAction::FullExit { .. } => self.positions[idx].contracts,
                ExitAction::PartialExit { contracts, .. } => contracts,
            };
            let order = OrderRequest {
                contract: contract.clone(),
                side: OrderSide::Sell,
                quantity,
                limit_price: Some(quote.mid),
                correlation_id: self.correlation_id(&contract.symbol, "exit"),
            };

            let placed = with_retry(&self.config.retry, "place_exit_order", || {
                self.broker.place_order(&order)
            })
            .await;

            match placed {
                Ok(fill) => {
                    let pos = &mut self.positions[idx];
                    self.lifecycle.apply(pos, &action);
                    records.push(
                        CycleRecord::new(
                            pos.contract.symbol.clone(),
                            CycleAction::Exit,
                            action.reason().to_string(),
                        )
                        .with_fill(fill.quantity, fill.avg_fill_price),
                    );
                    if pos.status == PositionStatus::Closed {
                        let won = pos.profit_pct() > 0.0;
                        let origin_agents = pos.origin_agents.clone();
                        let predictor_contributed = pos.predictor_contributed;
                        self.record_outcome(&origin_agents, predictor_contributed, won);
                    }
                }
                Err(e) => {
                    // The rule re-fires next cycle; the position stays open.
                    tracing::warn!(
                        contract = contract.display_name(),
                        error = %e,
                        "Exit order failed after retries"
                    );
                    records.push(CycleRecord::new(
                        contract.symbol.clone(),
                        CycleAction::Hold,
                        format!("exit-execution-failed: {e}"),
                    ));
                }
            }
        }
    }

    /// Synthetic quote at the position's last marked price, for exits that
    /// cannot wait on the live feed.
    fn last_mark_quote(&self, idx: usize) -> OptionQuote {
        let pos = &self.positions[idx];
        OptionQuote {
            contract: pos.contract.clone(),
            bid: pos.current_price,
            ask: pos.current_price,
            mid: pos.current_price,
            volume: 0,
            open_interest: 0,
            iv: 0.0,
            greeks: pos.greeks,
        }
    }

    fn record_outcome(&mut self, origin_agents: &[String], predictor_contributed: bool, won: bool) {
        for agent in origin_agents {
            self.weights.record_outcome(agent, won);
        }
        if predictor_contributed {
            self.predictor.record_outcome(won);
        }
    }

    async fn scan_entries(
        &mut self,
        now: DateTime<Utc>,
        portfolio: &PortfolioGreeks,
        records: &mut Vec<CycleRecord>,
    ) -> Result<()> {
        let account = self.broker.get_account().await?;
        let timeout = Duration::from_secs(self.config.engine.per_symbol_timeout_secs);
        let symbols: Vec<String> = self
            .config
            .engine
            .symbols
            .iter()
            .filter(|s| !self.has_open_position(s))
            .cloned()
            .collect();

        for symbol in symbols {
            let evaluated = tokio::time::timeout(
                timeout,
                self.evaluate_symbol(&symbol, &account, portfolio, now),
            )
            .await;
            let record = match evaluated {
                Ok(SymbolDecision::Record(record)) => record,
                // Order placement runs outside the evaluation timeout: the
                // retry policy bounds it, and cancelling an in-flight order
                // would drop a fill the broker may already have made.
                Ok(SymbolDecision::Enter {
                    entry,
                    sources,
                    meta_pick,
                }) => {
                    self.open_position(&symbol, &sources, meta_pick.as_ref(), *entry, now)
                        .await
                }
                Err(_) => {
                    tracing::warn!(symbol, "Symbol evaluation timed out, skipping");
                    CycleRecord::new(&symbol, CycleAction::Skip, "per-symbol-timeout")
                }
            };
            records.push(record);
        }
        Ok(())
    }

    fn has_open_position(&self, symbol: &str) -> bool {
        self.positions
            .iter()
            .any(|p| p.contract.symbol == symbol && p.status == PositionStatus::Open)
    }

    async fn evaluate_symbol(
        &mut self,
        symbol: &str,
        account: &AccountSummary,
        portfolio: &PortfolioGreeks,
        now: DateTime<Utc>,
    ) -> SymbolDecision {
        let bars = match self
            .market_data
            .get_bars(symbol, self.config.engine.lookback_bars)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Bar fetch failed");
                return SymbolDecision::Record(CycleRecord::new(
                    symbol,
                    CycleAction::Skip,
                    format!("bar-fetch-failed: {e}"),
                ));
            }
        };

        let features = match self.features.compute(symbol, &bars) {
            Ok(features) => features,
            Err(EngineError::InsufficientData { got, need, .. }) => {
                return SymbolDecision::Record(CycleRecord::new(
                    symbol,
                    CycleAction::Skip,
                    format!("insufficient-data: {got}/{need} bars"),
                ));
            }
            Err(e) => {
                return SymbolDecision::Record(CycleRecord::new(
                    symbol,
                    CycleAction::Skip,
                    format!("feature-error: {e}"),
                ));
            }
        };
        let regime = self.classifier.classify(&features);

        let iv_rank = match self.chain.get_iv_rank(symbol).await {
            Ok(rank) => rank,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "IV rank fetch failed");
                None
            }
        };
        let chain = match self
            .chain
            .get_chain(symbol, self.config.engine.min_dte, self.config.engine.max_dte)
            .await
        {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Chain fetch failed");
                Vec::new()
            }
        };
        let atm_delta = atm_delta(&chain);

        let ctx = AgentContext::new(symbol, &features, &regime)
            .with_iv_rank(iv_rank)
            .with_atm_delta(atm_delta);
        let intents = self
            .agents
            .collect_intents(&ctx, self.config.engine.regime_floor);
        let meta_pick = self.meta.select(&intents, &regime, &self.weights);

        let predictor_pick = match self.predictor.predict(symbol, &features, &regime) {
            Ok(pick) => pick,
            Err(e @ (EngineError::ModelUnavailable(_) | EngineError::ModelDegraded { .. })) => {
                tracing::warn!(symbol, reason = %e, "Predictor disabled for this cycle");
                None
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Predictor failed");
                None
            }
        };

        let mut sources = Vec::new();
        if let Some(intent) = &meta_pick {
            sources.push(SourcePrediction::new(
                intent.source.clone(),
                intent.direction,
                intent.confidence,
                self.ensemble.config().heuristic_weight,
            ));
        }
        if let Some(intent) = &predictor_pick {
            sources.push(SourcePrediction::new(
                intent.source.clone(),
                intent.direction,
                intent.confidence,
                self.ensemble.config().predictor_weight,
            ));
        }

        let Some(combined) = self.ensemble.combine(&sources) else {
            return SymbolDecision::Record(CycleRecord::new(
                symbol,
                CycleAction::Hold,
                "no-signal-sources",
            ));
        };
        if combined.direction == Direction::Flat
            || combined.confidence < self.config.engine.min_entry_confidence
        {
            return SymbolDecision::Record(CycleRecord::new(
                symbol,
                CycleAction::Hold,
                format!(
                    "below-entry-floor: {} at {:.2}",
                    combined.direction, combined.confidence
                ),
            ));
        }

        let size_fraction = meta_pick.as_ref().map_or(1.0, |i| i.size_fraction);
        let candidate = EntryCandidate {
            symbol,
            direction: combined.direction,
            confidence: combined.confidence,
            size_fraction,
            iv_rank,
            chain: &chain,
        };
        let decision = self
            .governor
            .evaluate(&candidate, account, portfolio, now.date_naive());
        match decision {
            GovernorDecision::Rejected(reason) => {
                SymbolDecision::Record(CycleRecord::new(symbol, CycleAction::Hold, reason.code()))
            }
            GovernorDecision::Approved(entry) => SymbolDecision::Enter {
                entry,
                sources: combined.sources,
                meta_pick,
            },
        }
    }

    async fn open_position(
        &mut self,
        symbol: &str,
        sources: &[String],
        meta_pick: Option<&TradeIntent>,
        entry: ApprovedEntry,
        now: DateTime<Utc>,
    ) -> CycleRecord {
        let order = OrderRequest {
            contract: entry.quote.contract.clone(),
            side: OrderSide::Buy,
            quantity: entry.contracts,
            limit_price: Some(entry.quote.mid),
            correlation_id: self.correlation_id(symbol, "entry"),
        };

        let placed = with_retry(&self.config.retry, "place_entry_order", || {
            self.broker.place_order(&order)
        })
        .await;

        match placed {
            Ok(fill) => {
                let origin_agents = meta_pick
                    .map(|i| i.source.split('+').map(str::to_string).collect())
                    .unwrap_or_default();
                let direction = if entry.quote.contract.right == OptionRight::Call {
                    Direction::Long
                } else {
                    Direction::Short
                };
                let position = PositionState {
                    contract: fill.contract.clone(),
                    direction,
                    contracts: fill.quantity,
                    original_contracts: fill.quantity,
                    entry_price: fill.avg_fill_price,
                    current_price: fill.avg_fill_price,
                    greeks: entry.quote.greeks,
                    highest_profit_pct: 0.0,
                    fired_tiers: Vec::new(),
                    trailing_armed: false,
                    origin_agents,
                    predictor_contributed: sources.iter().any(|s| s == "predictor"),
                    status: PositionStatus::Open,
                    opened_at: now,
                };
                let record = CycleRecord::new(symbol, CycleAction::Enter, "entry-approved")
                    .with_fill(fill.quantity, fill.avg_fill_price);
                self.positions.push(position);
                record
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Entry order failed after retries");
                CycleRecord::new(symbol, CycleAction::Hold, format!("entry-execution-failed: {e}"))
            }
        }
    }

    fn correlation_id(&self, symbol: &str, kind: &str) -> String {
        format!("odte-{}-{}-{}", self.cycle, kind, symbol.to_lowercase())
    }
}

/// |delta| of the chain contract nearest the money.
fn atm_delta(chain: &[OptionQuote]) -> Option<f64> {
    chain
        .iter()
        .map(|q| q.greeks.delta.abs())
        .min_by(|a, b| (a - 0.5).abs().total_cmp(&(b - 0.5).abs()))
}
