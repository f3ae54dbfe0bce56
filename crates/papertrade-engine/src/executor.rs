//! Trade execution.
//!
//! The executor is the unit of atomicity: validate, resolve the price,
//! then apply the cash/position/trade mutation under the portfolio's
//! lock and persist all three records in one ledger write. Ownership of
//! the portfolio must be verified by the caller before execution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use papertrade_core::error::{EngineError, EngineResult};
use papertrade_core::traits::{LedgerStore, PriceSource};
use papertrade_core::types::{Portfolio, Position, Trade, TradeAction, TradeRequest};

use crate::aggregator::PortfolioAggregator;
use crate::locks::PortfolioLocks;

/// Result payload for one executed trade.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    pub success: bool,
    pub trade_id: Uuid,
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<Decimal>,
}

impl From<&Trade> for TradeOutcome {
    fn from(trade: &Trade) -> Self {
        Self {
            success: true,
            trade_id: trade.id,
            symbol: trade.symbol.clone(),
            action: trade.action,
            quantity: trade.size,
            price: trade.price,
            total_value: trade.total_value,
            pnl: trade.pnl,
        }
    }
}

/// Validates and applies a single buy or sell against a portfolio.
pub struct TradeExecutor {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceSource>,
    locks: Arc<PortfolioLocks>,
}

impl TradeExecutor {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceSource>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            ledger,
            prices,
            locks,
        }
    }

    /// Execute one trade request.
    ///
    /// On any failure nothing is persisted; the ledger still holds the
    /// pre-trade state.
    pub async fn execute(&self, request: TradeRequest) -> EngineResult<TradeOutcome> {
        request.validate()?;
        let symbol = request.symbol.trim().to_ascii_uppercase();

        // Resolve the price before taking the portfolio lock; the lock
        // is never held across a network call.
        let price = match request.price {
            Some(price) => price,
            None => self.prices.price(&symbol).await?,
        };
        if price <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "price must be positive, got {price}"
            )));
        }

        let _guard = self.locks.acquire(request.portfolio_id).await;

        let mut portfolio = self
            .ledger
            .portfolio(request.portfolio_id)?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {}", request.portfolio_id)))?;
        let now = portfolio.effective_now();
        let open = self.ledger.open_position(portfolio.id, &symbol)?;

        let (position, trade) = match request.action {
            TradeAction::Buy => apply_buy(&mut portfolio, open, &request, &symbol, price, now)?,
            TradeAction::Sell => apply_sell(&mut portfolio, open, &request, &symbol, price, now)?,
        };

        // Roll up against the position set as it will exist after this
        // write: stored open positions with the traded symbol replaced.
        let mut open_set: Vec<Position> = self
            .ledger
            .positions(portfolio.id)?
            .into_iter()
            .filter(|p| p.is_open() && p.symbol != symbol)
            .collect();
        if position.is_open() {
            open_set.push(position.clone());
        }
        PortfolioAggregator::apply_roll_up(&mut portfolio, &open_set, now);

        self.ledger.apply_execution(&portfolio, &position, &trade)?;

        info!(
            portfolio_id = %portfolio.id,
            symbol = %trade.symbol,
            action = %trade.action,
            quantity = %trade.size,
            price = %trade.price,
            pnl = ?trade.pnl,
            auto = trade.auto_traded,
            "trade executed"
        );
        Ok(TradeOutcome::from(&trade))
    }
}

fn apply_buy(
    portfolio: &mut Portfolio,
    open: Option<Position>,
    request: &TradeRequest,
    symbol: &str,
    price: Decimal,
    now: DateTime<Utc>,
) -> EngineResult<(Position, Trade)> {
    let cost = price * request.quantity;
    if portfolio.cash < cost {
        return Err(EngineError::InsufficientFunds {
            required: cost,
            available: portfolio.cash,
        });
    }
    portfolio.cash -= cost;

    let position = match open {
        Some(mut position) => {
            position.blend_buy(request.quantity, price);
            position
        }
        None => {
            let mut position = Position::open(portfolio.id, symbol, request.quantity, price, now);
            if let Some(strategy_id) = request.strategy_id {
                position = position.with_strategy(strategy_id);
            }
            position
        }
    };

    let mut trade = Trade::record(
        portfolio.id,
        symbol,
        TradeAction::Buy,
        request.quantity,
        price,
        now,
    );
    if let Some(strategy_id) = request.strategy_id {
        trade = trade.with_strategy(strategy_id);
    }
    if request.auto_traded {
        trade = trade.auto();
    }
    Ok((position, trade))
}

fn apply_sell(
    portfolio: &mut Portfolio,
    open: Option<Position>,
    request: &TradeRequest,
    symbol: &str,
    price: Decimal,
    now: DateTime<Utc>,
) -> EngineResult<(Position, Trade)> {
    let mut position = open.ok_or_else(|| EngineError::NoPosition(symbol.to_string()))?;
    if position.size < request.quantity {
        return Err(EngineError::InsufficientShares {
            requested: request.quantity,
            held: position.size,
        });
    }

    let realized = position.reduce_sell(request.quantity, price, now);
    portfolio.cash += price * request.quantity;

    let mut trade = Trade::record(
        portfolio.id,
        symbol,
        TradeAction::Sell,
        request.quantity,
        price,
        now,
    )
    .with_pnl(realized);
    if let Some(strategy_id) = request.strategy_id {
        trade = trade.with_strategy(strategy_id);
    }
    if request.auto_traded {
        trade = trade.auto();
    }
    Ok((position, trade))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use papertrade_core::error::DataError;
    use papertrade_ledger::MemoryLedger;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct FixedPrices(HashMap<String, Decimal>);

    impl FixedPrices {
        fn new(pairs: &[(&str, Decimal)]) -> Arc<Self> {
            Arc::new(Self(
                pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            ))
        }
    }

    #[async_trait]
    impl PriceSource for FixedPrices {
        async fn price(&self, symbol: &str) -> Result<Decimal, DataError> {
            self.0
                .get(symbol)
                .copied()
                .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct NoQuotes;

    #[async_trait]
    impl PriceSource for NoQuotes {
        async fn price(&self, _symbol: &str) -> Result<Decimal, DataError> {
            Err(DataError::Unavailable("offline".into()))
        }

        fn name(&self) -> &str {
            "no-quotes"
        }
    }

    fn executor_with(
        cash: Decimal,
        prices: Arc<dyn PriceSource>,
    ) -> (TradeExecutor, Arc<MemoryLedger>, Uuid) {
        let ledger = Arc::new(MemoryLedger::new());
        let mut portfolio = Portfolio::new("user-1", "Main", cash);
        portfolio.cash = cash;
        ledger.create_portfolio(&portfolio).unwrap();
        let executor = TradeExecutor::new(
            ledger.clone(),
            prices,
            Arc::new(PortfolioLocks::new()),
        );
        (executor, ledger, portfolio.id)
    }

    #[tokio::test]
    async fn test_buy_blend_sell_scenario() {
        let (executor, ledger, pid) = executor_with(dec!(100000), Arc::new(NoQuotes));

        // Buy 10 at 50.
        let outcome = executor
            .execute(TradeRequest::buy(pid, "X", dec!(10)).with_price(dec!(50)))
            .await
            .unwrap();
        assert_eq!(outcome.total_value, dec!(500));
        let portfolio = ledger.portfolio(pid).unwrap().unwrap();
        assert_eq!(portfolio.cash, dec!(99500));
        let position = ledger.open_position(pid, "X").unwrap().unwrap();
        assert_eq!(position.size, dec!(10));
        assert_eq!(position.entry_price, dec!(50));

        // Buy 10 more at 60: entry blends to 55.
        executor
            .execute(TradeRequest::buy(pid, "X", dec!(10)).with_price(dec!(60)))
            .await
            .unwrap();
        let portfolio = ledger.portfolio(pid).unwrap().unwrap();
        assert_eq!(portfolio.cash, dec!(98900));
        let position = ledger.open_position(pid, "X").unwrap().unwrap();
        assert_eq!(position.size, dec!(20));
        assert_eq!(position.entry_price, dec!(55));

        // Sell all 20 at 70: realized (70 - 55) * 20 = 300.
        let outcome = executor
            .execute(TradeRequest::sell(pid, "X", dec!(20)).with_price(dec!(70)))
            .await
            .unwrap();
        assert_eq!(outcome.pnl, Some(dec!(300)));
        let portfolio = ledger.portfolio(pid).unwrap().unwrap();
        assert_eq!(portfolio.cash, dec!(100300));
        assert_eq!(portfolio.total_equity, dec!(100300));
        assert_eq!(portfolio.total_pnl, dec!(300));
        assert_eq!(portfolio.open_positions, 0);
        assert!(ledger.open_position(pid, "X").unwrap().is_none());
        assert_eq!(ledger.trades(pid).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_state_untouched() {
        let (executor, ledger, pid) = executor_with(dec!(100), Arc::new(NoQuotes));

        let err = executor
            .execute(TradeRequest::buy(pid, "X", dec!(10)).with_price(dec!(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        assert_eq!(err.status_code(), 400);

        let portfolio = ledger.portfolio(pid).unwrap().unwrap();
        assert_eq!(portfolio.cash, dec!(100));
        assert!(ledger.trades(pid).unwrap().is_empty());
        assert!(ledger.open_position(pid, "X").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sell_without_position() {
        let (executor, _ledger, pid) = executor_with(dec!(1000), Arc::new(NoQuotes));
        let err = executor
            .execute(TradeRequest::sell(pid, "X", dec!(5)).with_price(dec!(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoPosition(_)));
    }

    #[tokio::test]
    async fn test_sell_more_than_held() {
        let (executor, _ledger, pid) = executor_with(dec!(1000), Arc::new(NoQuotes));
        executor
            .execute(TradeRequest::buy(pid, "X", dec!(5)).with_price(dec!(10)))
            .await
            .unwrap();

        let err = executor
            .execute(TradeRequest::sell(pid, "X", dec!(6)).with_price(dec!(10)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientShares {
                requested: _,
                held: _
            }
        ));
    }

    #[tokio::test]
    async fn test_round_trip_realizes_zero() {
        let (executor, ledger, pid) = executor_with(dec!(10000), Arc::new(NoQuotes));
        executor
            .execute(TradeRequest::buy(pid, "X", dec!(7)).with_price(dec!(42)))
            .await
            .unwrap();
        let outcome = executor
            .execute(TradeRequest::sell(pid, "X", dec!(7)).with_price(dec!(42)))
            .await
            .unwrap();

        assert_eq!(outcome.pnl, Some(Decimal::ZERO));
        let portfolio = ledger.portfolio(pid).unwrap().unwrap();
        assert_eq!(portfolio.cash, dec!(10000));
        let positions = ledger.positions(pid).unwrap();
        assert_eq!(positions.len(), 1);
        assert!(positions[0].closed_at.is_some());
    }

    #[tokio::test]
    async fn test_fetches_price_when_absent() {
        let prices = FixedPrices::new(&[("AAPL", dec!(150))]);
        let (executor, ledger, pid) = executor_with(dec!(10000), prices);

        let outcome = executor
            .execute(TradeRequest::buy(pid, "aapl", dec!(4)))
            .await
            .unwrap();
        assert_eq!(outcome.symbol, "AAPL");
        assert_eq!(outcome.price, dec!(150));
        assert_eq!(ledger.portfolio(pid).unwrap().unwrap().cash, dec!(9400));

        let err = executor
            .execute(TradeRequest::buy(pid, "MSFT", dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_unknown_portfolio() {
        let (executor, _ledger, _pid) = executor_with(dec!(1000), Arc::new(NoQuotes));
        let err = executor
            .execute(TradeRequest::buy(Uuid::new_v4(), "X", dec!(1)).with_price(dec!(10)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_concurrent_buys_cannot_overdraw() {
        let (executor, ledger, pid) = executor_with(dec!(600), Arc::new(NoQuotes));

        let first = executor.execute(TradeRequest::buy(pid, "X", dec!(10)).with_price(dec!(50)));
        let second = executor.execute(TradeRequest::buy(pid, "X", dec!(10)).with_price(dec!(50)));
        let (a, b) = tokio::join!(first, second);

        // Cash covers one 500 buy, not two.
        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        let portfolio = ledger.portfolio(pid).unwrap().unwrap();
        assert_eq!(portfolio.cash, dec!(100));
        assert_eq!(ledger.trades(pid).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_outcome_serializes_camel_case() {
        let (executor, _ledger, pid) = executor_with(dec!(10000), Arc::new(NoQuotes));
        let outcome = executor
            .execute(TradeRequest::buy(pid, "X", dec!(2)).with_price(dec!(30)))
            .await
            .unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["totalValue"], serde_json::json!("60"));
        assert_eq!(json["action"], serde_json::json!("buy"));
        assert!(json.get("pnl").is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        // Random valid op sequences never drive cash or any position size
        // negative; failed ops leave state untouched.
        #[test]
        fn prop_cash_and_size_never_negative(
            ops in proptest::collection::vec(
                (any::<bool>(), 1u32..40u32, 1u32..150u32),
                1..25,
            )
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (min_cash, min_size) = rt.block_on(async move {
                let (executor, ledger, pid) =
                    executor_with(dec!(10000), Arc::new(NoQuotes));
                let mut min_cash = dec!(10000);
                for (is_buy, quantity, price) in ops {
                    let quantity = Decimal::from(quantity);
                    let price = Decimal::from(price);
                    let request = if is_buy {
                        TradeRequest::buy(pid, "X", quantity)
                    } else {
                        TradeRequest::sell(pid, "X", quantity)
                    };
                    let _ = executor.execute(request.with_price(price)).await;

                    let cash = ledger.portfolio(pid).unwrap().unwrap().cash;
                    if cash < min_cash {
                        min_cash = cash;
                    }
                }
                let min_size = ledger
                    .positions(pid)
                    .unwrap()
                    .iter()
                    .map(|p| p.size)
                    .min()
                    .unwrap_or(Decimal::ZERO);
                (min_cash, min_size)
            });
            prop_assert!(min_cash >= Decimal::ZERO);
            prop_assert!(min_size >= Decimal::ZERO);
        }
    }
}
