//! Historical replay ("time travel").
//!
//! Rebuilds cash and holdings at a cutoff instant by folding the ordered
//! trade log from scratch. The fold never consults live prices or cached
//! snapshots; holdings are valued at their blended average price, so the
//! result is the book value the ledger implies, immune to rounding drift
//! in the live path.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use papertrade_core::error::{EngineError, EngineResult};
use papertrade_core::traits::LedgerStore;
use papertrade_core::types::{close_epsilon, Portfolio, Trade, TradeAction};

use crate::locks::PortfolioLocks;

/// One reconstructed holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayHolding {
    pub symbol: String,
    pub size: Decimal,
    /// Blended average price over the replayed buys
    pub avg_price: Decimal,
    /// size * avg_price (book value, not a live mark)
    pub value: Decimal,
}

/// Reconstructed portfolio state at a cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySnapshot {
    pub portfolio_id: Uuid,
    pub cutoff: DateTime<Utc>,
    pub cash: Decimal,
    /// Holdings in symbol order
    pub holdings: Vec<ReplayHolding>,
    pub total_equity: Decimal,
    pub trades_applied: usize,
}

/// Deterministic state reconstruction from the trade log.
pub struct ReplayEngine {
    ledger: Arc<dyn LedgerStore>,
    locks: Arc<PortfolioLocks>,
}

impl ReplayEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, locks: Arc<PortfolioLocks>) -> Self {
        Self { ledger, locks }
    }

    /// Non-destructive replay to `cutoff`.
    ///
    /// Pins the portfolio clock to the cutoff (time travel on) but leaves
    /// cash, positions, and the trade log untouched.
    pub async fn replay(
        &self,
        portfolio_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> EngineResult<ReplaySnapshot> {
        let _guard = self.locks.acquire(portfolio_id).await;

        let mut portfolio = self.require(portfolio_id)?;
        let trades = self.ledger.trades_until(portfolio_id, cutoff)?;
        let snapshot = fold(&portfolio, &trades, cutoff);

        portfolio.time_travel_enabled = true;
        portfolio.sim_instant = Some(cutoff);
        portfolio.updated_at = Utc::now();
        self.ledger.update_portfolio(&portfolio)?;

        info!(
            portfolio_id = %portfolio_id,
            cutoff = %cutoff,
            trades = snapshot.trades_applied,
            cash = %snapshot.cash,
            "replay computed"
        );
        Ok(snapshot)
    }

    /// Destructive reset: delete every position and trade, restore cash to
    /// the initial balance, and pin the clock to `cutoff`.
    ///
    /// The caller is responsible for obtaining explicit confirmation
    /// before invoking this.
    pub async fn reset(
        &self,
        portfolio_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> EngineResult<Portfolio> {
        let _guard = self.locks.acquire(portfolio_id).await;

        let mut portfolio = self.require(portfolio_id)?;
        portfolio.cash = portfolio.initial_balance;
        portfolio.total_equity = portfolio.initial_balance;
        portfolio.stocks_value = Decimal::ZERO;
        portfolio.total_pnl = Decimal::ZERO;
        portfolio.total_pnl_percent = Decimal::ZERO;
        portfolio.daily_pnl = Decimal::ZERO;
        portfolio.daily_pnl_percent = Decimal::ZERO;
        portfolio.open_positions = 0;
        portfolio.time_travel_enabled = true;
        portfolio.sim_instant = Some(cutoff);
        portfolio.day_anchor_date = None;
        portfolio.day_anchor_equity = portfolio.initial_balance;
        portfolio.updated_at = Utc::now();

        self.ledger.reset_portfolio(&portfolio)?;
        info!(portfolio_id = %portfolio_id, cutoff = %cutoff, "portfolio reset");
        Ok(portfolio)
    }

    /// Leave time travel and return the portfolio to the wall clock.
    pub async fn resume(&self, portfolio_id: Uuid) -> EngineResult<Portfolio> {
        let _guard = self.locks.acquire(portfolio_id).await;

        let mut portfolio = self.require(portfolio_id)?;
        portfolio.time_travel_enabled = false;
        portfolio.sim_instant = None;
        portfolio.updated_at = Utc::now();
        self.ledger.update_portfolio(&portfolio)?;

        info!(portfolio_id = %portfolio_id, "time travel off");
        Ok(portfolio)
    }

    fn require(&self, portfolio_id: Uuid) -> EngineResult<Portfolio> {
        self.ledger
            .portfolio(portfolio_id)?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {portfolio_id}")))
    }
}

fn fold(portfolio: &Portfolio, trades: &[Trade], cutoff: DateTime<Utc>) -> ReplaySnapshot {
    let mut cash = portfolio.initial_balance;
    // (size, blended avg price) keyed by symbol; BTreeMap keeps the
    // output ordering stable.
    let mut holdings: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();

    for trade in trades {
        match trade.action {
            TradeAction::Buy => {
                cash -= trade.total_value;
                let entry = holdings
                    .entry(trade.symbol.clone())
                    .or_insert((Decimal::ZERO, Decimal::ZERO));
                let new_size = entry.0 + trade.size;
                if new_size != Decimal::ZERO {
                    entry.1 = (entry.0 * entry.1 + trade.size * trade.price) / new_size;
                }
                entry.0 = new_size;
            }
            TradeAction::Sell => {
                cash += trade.total_value;
                match holdings.get_mut(&trade.symbol) {
                    Some(entry) => {
                        entry.0 -= trade.size;
                        if entry.0 <= close_epsilon() {
                            holdings.remove(&trade.symbol);
                        }
                    }
                    None => {
                        // A sell the log never bought only moves cash.
                        warn!(
                            trade_id = %trade.id,
                            symbol = %trade.symbol,
                            "replayed sell without prior holding"
                        );
                    }
                }
            }
        }
    }

    let holdings: Vec<ReplayHolding> = holdings
        .into_iter()
        .map(|(symbol, (size, avg_price))| ReplayHolding {
            symbol,
            size,
            avg_price,
            value: size * avg_price,
        })
        .collect();
    let stocks_value: Decimal = holdings.iter().map(|h| h.value).sum();

    ReplaySnapshot {
        portfolio_id: portfolio.id,
        cutoff,
        cash,
        holdings,
        total_equity: cash + stocks_value,
        trades_applied: trades.len(),
    }
}
