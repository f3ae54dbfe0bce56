//! Auto-trading evaluation.
//!
//! One run walks the resolved strategies and their symbols, turns signal
//! scores into sized orders, and records every outcome in a structured
//! report. Only precondition failures (auto-trading disabled, no
//! strategies, daily limit already exhausted) fail the whole call;
//! per-symbol failures are captured and iteration continues.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use papertrade_core::error::{EngineError, EngineResult};
use papertrade_core::traits::{LedgerStore, PriceSource};
use papertrade_core::types::{
    ExecutedItem, Portfolio, RunReport, SkipReason, Strategy, TradeAction, TradeRequest,
};
use papertrade_engine::TradeExecutor;

use crate::router::SignalRouter;

/// Request for one evaluator run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub portfolio_id: Uuid,
    /// Run only this strategy instead of every auto-execute strategy
    #[serde(default)]
    pub strategy_id: Option<Uuid>,
    /// Override the strategies' configured symbol lists
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

impl RunRequest {
    pub fn portfolio(portfolio_id: Uuid) -> Self {
        Self {
            portfolio_id,
            strategy_id: None,
            symbols: None,
        }
    }

    pub fn with_strategy(mut self, strategy_id: Uuid) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = Some(symbols);
        self
    }
}

enum SymbolOutcome {
    Executed(ExecutedItem),
    Skipped(SkipReason),
}

/// Turns signals into executed trades, subject to threshold, sizing, and
/// the daily auto-trade ceiling.
pub struct AutoTradingEvaluator {
    ledger: Arc<dyn LedgerStore>,
    executor: Arc<TradeExecutor>,
    router: Arc<SignalRouter>,
    prices: Arc<dyn PriceSource>,
}

impl AutoTradingEvaluator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        executor: Arc<TradeExecutor>,
        router: Arc<SignalRouter>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            ledger,
            executor,
            router,
            prices,
        }
    }

    /// Run the evaluator for one portfolio.
    pub async fn run(&self, request: RunRequest) -> EngineResult<RunReport> {
        let portfolio = self
            .ledger
            .portfolio(request.portfolio_id)?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {}", request.portfolio_id)))?;
        if !portfolio.auto_trading_enabled {
            return Err(EngineError::AutoTradingDisabled(portfolio.id));
        }

        let strategies = self.resolve_strategies(&portfolio, request.strategy_id)?;
        if strategies.is_empty() {
            return Err(EngineError::NoStrategies(portfolio.id));
        }

        // The daily window starts at midnight of the portfolio's
        // effective clock, so a time-travelling portfolio counts against
        // its simulated day.
        let since = portfolio.effective_midnight();
        let limit = portfolio.auto_max_trades_per_day;
        let mut executed_today = self.ledger.count_auto_trades_since(portfolio.id, since)?;
        if executed_today >= limit {
            return Err(EngineError::DailyLimitReached {
                executed: executed_today,
                limit,
            });
        }

        let mut report = RunReport::new(portfolio.id);
        for strategy in &strategies {
            let symbols = request
                .symbols
                .clone()
                .unwrap_or_else(|| strategy.config.symbols.clone());

            for symbol in symbols {
                let symbol = symbol.trim().to_ascii_uppercase();
                if executed_today >= limit {
                    report.record_skip(&symbol, &strategy.name, SkipReason::DailyLimit);
                    continue;
                }

                match self.evaluate_symbol(portfolio.id, strategy, &symbol).await {
                    Ok(SymbolOutcome::Executed(item)) => {
                        executed_today += 1;
                        report.record_execution(item);
                    }
                    Ok(SymbolOutcome::Skipped(reason)) => {
                        debug!(symbol = %symbol, strategy = %strategy.name, %reason, "skipped");
                        report.record_skip(&symbol, &strategy.name, reason);
                    }
                    Err(err) => {
                        warn!(
                            symbol = %symbol,
                            strategy = %strategy.name,
                            error = %err,
                            "auto-trade failed"
                        );
                        report.record_error(&symbol, &strategy.name, err.kind(), err.to_string());
                    }
                }
            }
        }

        info!(
            portfolio_id = %portfolio.id,
            executed = report.summary.executed_count,
            skipped = report.summary.skipped_count,
            errors = report.summary.error_count,
            "auto-trading run finished"
        );
        Ok(report)
    }

    /// Run the evaluator for several portfolios concurrently.
    ///
    /// Per-portfolio serialization makes cross-portfolio fan-out safe.
    pub async fn run_many(&self, requests: Vec<RunRequest>) -> Vec<EngineResult<RunReport>> {
        futures::future::join_all(requests.into_iter().map(|request| self.run(request))).await
    }

    fn resolve_strategies(
        &self,
        portfolio: &Portfolio,
        strategy_id: Option<Uuid>,
    ) -> EngineResult<Vec<Strategy>> {
        match strategy_id {
            Some(id) => {
                let strategy = self
                    .ledger
                    .strategy(id)?
                    .filter(|s| s.portfolio_id == portfolio.id)
                    .ok_or_else(|| EngineError::NotFound(format!("strategy {id}")))?;
                Ok(vec![strategy])
            }
            None => {
                let strategies = self.ledger.strategies_for_portfolio(portfolio.id)?;
                Ok(strategies.into_iter().filter(|s| s.auto_execute).collect())
            }
        }
    }

    async fn evaluate_symbol(
        &self,
        portfolio_id: Uuid,
        strategy: &Strategy,
        symbol: &str,
    ) -> EngineResult<SymbolOutcome> {
        let Some(signal) = self.router.signal_for(strategy.kind, symbol).await? else {
            return Ok(SymbolOutcome::Skipped(SkipReason::NoSignal));
        };

        let threshold = strategy.signal_threshold;
        let action = if signal.score >= threshold {
            TradeAction::Buy
        } else if signal.score <= -threshold {
            TradeAction::Sell
        } else {
            return Ok(SymbolOutcome::Skipped(SkipReason::BelowThreshold));
        };

        // Sizing reads the portfolio fresh: earlier executions in this
        // run have already moved cash and equity.
        let portfolio = self
            .ledger
            .portfolio(portfolio_id)?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {portfolio_id}")))?;
        let fraction = strategy
            .config
            .position_size_fraction
            .min(portfolio.auto_risk_limit);
        let price = self.prices.price(symbol).await?;
        if price <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "price must be positive, got {price}"
            )));
        }
        let quantity = portfolio.total_equity * fraction / price;

        let request = TradeRequest {
            portfolio_id,
            symbol: symbol.to_string(),
            action,
            quantity,
            price: Some(price),
            strategy_id: Some(strategy.id),
            auto_traded: true,
        };
        let outcome = self.executor.execute(request).await?;

        Ok(SymbolOutcome::Executed(ExecutedItem {
            symbol: outcome.symbol,
            action: outcome.action,
            quantity: outcome.quantity,
            price: outcome.price,
            score: signal.score,
            trade_id: outcome.trade_id,
            strategy: strategy.name.clone(),
        }))
    }
}
