//! Portfolio roll-up computation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use papertrade_core::error::{EngineError, EngineResult};
use papertrade_core::traits::{LedgerStore, PriceSource};
use papertrade_core::types::{Portfolio, Position};

use crate::locks::PortfolioLocks;

/// Recomputes portfolio-level roll-ups from the open position set.
pub struct PortfolioAggregator {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceSource>,
    locks: Arc<PortfolioLocks>,
}

impl PortfolioAggregator {
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

    /// Fold the open position set into the portfolio's roll-up fields.
    ///
    /// Pure with respect to storage; idempotent for a fixed position set.
    /// `now` is the portfolio's effective instant and drives the daily
    /// anchor roll.
    pub fn apply_roll_up(portfolio: &mut Portfolio, open_positions: &[Position], now: DateTime<Utc>) {
        let open: Vec<&Position> = open_positions.iter().filter(|p| p.is_open()).collect();

        portfolio.stocks_value = open.iter().map(|p| p.market_value()).sum();
        portfolio.total_equity = portfolio.cash + portfolio.stocks_value;
        portfolio.total_pnl = portfolio.total_equity - portfolio.initial_balance;
        portfolio.total_pnl_percent = if portfolio.initial_balance != Decimal::ZERO {
            portfolio.total_pnl / portfolio.initial_balance * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        portfolio.open_positions = u32::try_from(open.len()).unwrap_or(u32::MAX);

        // The anchor is the equity at the first roll-up of the effective
        // day; daily P&L measures against it.
        let today = now.date_naive();
        if portfolio.day_anchor_date != Some(today) {
            portfolio.day_anchor_date = Some(today);
            portfolio.day_anchor_equity = portfolio.total_equity;
        }
        portfolio.daily_pnl = portfolio.total_equity - portfolio.day_anchor_equity;
        portfolio.daily_pnl_percent = if portfolio.day_anchor_equity != Decimal::ZERO {
            portfolio.daily_pnl / portfolio.day_anchor_equity * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        portfolio.updated_at = Utc::now();
    }

    /// Re-mark open positions at fresh quotes, recompute the roll-up, and
    /// persist the portfolio snapshot.
    ///
    /// Quotes are fetched before the portfolio lock is taken; a symbol
    /// whose quote fails keeps its stored mark.
    pub async fn refresh(&self, portfolio_id: Uuid) -> EngineResult<Portfolio> {
        let symbols: Vec<String> = self
            .ledger
            .positions(portfolio_id)?
            .into_iter()
            .filter(|p| p.is_open())
            .map(|p| p.symbol)
            .collect();

        let mut quotes: HashMap<String, Decimal> = HashMap::new();
        for symbol in &symbols {
            match self.prices.price(symbol).await {
                Ok(price) => {
                    quotes.insert(symbol.clone(), price);
                }
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "quote failed, keeping last mark");
                }
            }
        }

        let _guard = self.locks.acquire(portfolio_id).await;

        let mut portfolio = self
            .ledger
            .portfolio(portfolio_id)?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {portfolio_id}")))?;

        let mut open: Vec<Position> = self
            .ledger
            .positions(portfolio_id)?
            .into_iter()
            .filter(|p| p.is_open())
            .collect();
        for position in &mut open {
            if let Some(price) = quotes.get(&position.symbol) {
                position.mark(*price);
            }
        }

        let now = portfolio.effective_now();
        Self::apply_roll_up(&mut portfolio, &open, now);
        self.ledger.update_portfolio(&portfolio)?;

        debug!(
            portfolio_id = %portfolio_id,
            equity = %portfolio.total_equity,
            "portfolio roll-up refreshed"
        );
        Ok(portfolio)
    }
}
