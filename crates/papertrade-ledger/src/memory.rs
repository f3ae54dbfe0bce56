//! In-memory ledger store.
//!
//! Backs unit tests and ephemeral runs. A single mutex over the whole
//! state makes every multi-record write atomic by construction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use papertrade_core::error::LedgerError;
use papertrade_core::traits::{LedgerStore, SignalStore};
use papertrade_core::types::{Portfolio, Position, Signal, Strategy, Trade};

#[derive(Default)]
struct MemoryState {
    portfolios: HashMap<Uuid, Portfolio>,
    /// Positions per portfolio, in creation order.
    positions: HashMap<Uuid, Vec<Position>>,
    /// Trades per portfolio, in insertion order.
    trades: HashMap<Uuid, Vec<Trade>>,
    strategies: HashMap<Uuid, Strategy>,
    /// Signals per symbol, in recording order.
    signals: HashMap<String, Vec<Signal>>,
}

/// Ledger store holding everything behind one mutex.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Storage("ledger state mutex poisoned".into()))
    }
}

impl LedgerStore for MemoryLedger {
    fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        if state.portfolios.contains_key(&portfolio.id) {
            return Err(LedgerError::Storage(format!(
                "portfolio {} already exists",
                portfolio.id
            )));
        }
        state.portfolios.insert(portfolio.id, portfolio.clone());
        Ok(())
    }

    fn portfolio(&self, id: Uuid) -> Result<Option<Portfolio>, LedgerError> {
        Ok(self.state()?.portfolios.get(&id).cloned())
    }

    fn portfolios_for_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>, LedgerError> {
        let state = self.state()?;
        let mut owned: Vec<Portfolio> = state
            .portfolios
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|p| p.created_at);
        Ok(owned)
    }

    fn update_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        match state.portfolios.get_mut(&portfolio.id) {
            Some(existing) => {
                *existing = portfolio.clone();
                Ok(())
            }
            None => Err(LedgerError::Storage(format!(
                "portfolio {} not found",
                portfolio.id
            ))),
        }
    }

    fn positions(&self, portfolio_id: Uuid) -> Result<Vec<Position>, LedgerError> {
        Ok(self
            .state()?
            .positions
            .get(&portfolio_id)
            .cloned()
            .unwrap_or_default())
    }

    fn open_position(
        &self,
        portfolio_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, LedgerError> {
        Ok(self.state()?.positions.get(&portfolio_id).and_then(|all| {
            all.iter()
                .find(|p| p.symbol == symbol && p.is_open())
                .cloned()
        }))
    }

    fn trades(&self, portfolio_id: Uuid) -> Result<Vec<Trade>, LedgerError> {
        let state = self.state()?;
        let mut trades = state
            .trades
            .get(&portfolio_id)
            .cloned()
            .unwrap_or_default();
        trades.sort_by_key(|t| t.executed_at);
        trades.reverse();
        Ok(trades)
    }

    fn trades_until(
        &self,
        portfolio_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Trade>, LedgerError> {
        let state = self.state()?;
        let mut trades: Vec<Trade> = state
            .trades
            .get(&portfolio_id)
            .map(|all| {
                all.iter()
                    .filter(|t| t.executed_at <= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort keeps insertion order among equal timestamps.
        trades.sort_by_key(|t| t.executed_at);
        Ok(trades)
    }

    fn count_auto_trades_since(
        &self,
        portfolio_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, LedgerError> {
        let state = self.state()?;
        let count = state
            .trades
            .get(&portfolio_id)
            .map(|all| {
                all.iter()
                    .filter(|t| t.auto_traded && t.executed_at >= since)
                    .count()
            })
            .unwrap_or(0);
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn apply_execution(
        &self,
        portfolio: &Portfolio,
        position: &Position,
        trade: &Trade,
    ) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        if !state.portfolios.contains_key(&portfolio.id) {
            return Err(LedgerError::Storage(format!(
                "portfolio {} not found",
                portfolio.id
            )));
        }

        state.portfolios.insert(portfolio.id, portfolio.clone());

        let positions = state.positions.entry(portfolio.id).or_default();
        match positions.iter_mut().find(|p| p.id == position.id) {
            Some(existing) => *existing = position.clone(),
            None => positions.push(position.clone()),
        }

        state.trades.entry(portfolio.id).or_default().push(trade.clone());
        Ok(())
    }

    fn reset_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        if !state.portfolios.contains_key(&portfolio.id) {
            return Err(LedgerError::Storage(format!(
                "portfolio {} not found",
                portfolio.id
            )));
        }
        state.positions.remove(&portfolio.id);
        state.trades.remove(&portfolio.id);
        state.portfolios.insert(portfolio.id, portfolio.clone());
        Ok(())
    }

    fn create_strategy(&self, strategy: &Strategy) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        if state.strategies.contains_key(&strategy.id) {
            return Err(LedgerError::Storage(format!(
                "strategy {} already exists",
                strategy.id
            )));
        }
        state.strategies.insert(strategy.id, strategy.clone());
        Ok(())
    }

    fn strategy(&self, id: Uuid) -> Result<Option<Strategy>, LedgerError> {
        Ok(self.state()?.strategies.get(&id).cloned())
    }

    fn strategies_for_portfolio(&self, portfolio_id: Uuid) -> Result<Vec<Strategy>, LedgerError> {
        let state = self.state()?;
        let mut strategies: Vec<Strategy> = state
            .strategies
            .values()
            .filter(|s| s.portfolio_id == portfolio_id)
            .cloned()
            .collect();
        strategies.sort_by_key(|s| s.created_at);
        Ok(strategies)
    }
}

impl SignalStore for MemoryLedger {
    fn record_signal(&self, signal: &Signal) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        state
            .signals
            .entry(signal.symbol.clone())
            .or_default()
            .push(signal.clone());
        Ok(())
    }

    fn latest_signal(&self, symbol: &str) -> Result<Option<Signal>, LedgerError> {
        let state = self.state()?;
        // Ties on generated_at resolve to the most recently recorded.
        Ok(state
            .signals
            .get(symbol)
            .and_then(|all| all.iter().max_by_key(|s| s.generated_at).cloned()))
    }

    fn recent_signals(&self, symbol: &str, limit: usize) -> Result<Vec<Signal>, LedgerError> {
        let state = self.state()?;
        let mut signals = state.signals.get(symbol).cloned().unwrap_or_default();
        signals.sort_by_key(|s| s.generated_at);
        signals.reverse();
        signals.truncate(limit);
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use papertrade_core::types::{StrategyConfig, StrategyKind, TradeAction};
    use rust_decimal_macros::dec;

    fn seeded() -> (MemoryLedger, Portfolio) {
        let ledger = MemoryLedger::new();
        let portfolio = Portfolio::new("user-1", "Main", dec!(100000));
        ledger.create_portfolio(&portfolio).unwrap();
        (ledger, portfolio)
    }

    #[test]
    fn test_portfolio_crud() {
        let (ledger, mut portfolio) = seeded();
        assert!(ledger.portfolio(portfolio.id).unwrap().is_some());
        assert!(ledger.portfolio(Uuid::new_v4()).unwrap().is_none());
        assert!(ledger.create_portfolio(&portfolio).is_err());

        portfolio.cash = dec!(500);
        ledger.update_portfolio(&portfolio).unwrap();
        let loaded = ledger.portfolio(portfolio.id).unwrap().unwrap();
        assert_eq!(loaded.cash, dec!(500));

        let owned = ledger.portfolios_for_owner("user-1").unwrap();
        assert_eq!(owned.len(), 1);
        assert!(ledger.portfolios_for_owner("other").unwrap().is_empty());
    }

    #[test]
    fn test_open_position_lookup_ignores_closed() {
        let (ledger, portfolio) = seeded();
        let mut pos = Position::open(portfolio.id, "AAPL", dec!(10), dec!(50), Utc::now());
        let trade = Trade::record(
            portfolio.id,
            "AAPL",
            TradeAction::Buy,
            dec!(10),
            dec!(50),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &pos, &trade).unwrap();
        assert!(ledger.open_position(portfolio.id, "AAPL").unwrap().is_some());

        pos.reduce_sell(dec!(10), dec!(55), Utc::now());
        let sell = Trade::record(
            portfolio.id,
            "AAPL",
            TradeAction::Sell,
            dec!(10),
            dec!(55),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &pos, &sell).unwrap();
        assert!(ledger.open_position(portfolio.id, "AAPL").unwrap().is_none());
        assert_eq!(ledger.positions(portfolio.id).unwrap().len(), 1);
    }

    #[test]
    fn test_trades_until_is_ascending_and_bounded() {
        let (ledger, portfolio) = seeded();
        let base = Utc::now();
        for offset in [3i64, 1, 2] {
            let pos = Position::open(portfolio.id, "X", dec!(1), dec!(10), base);
            let trade = Trade::record(
                portfolio.id,
                "X",
                TradeAction::Buy,
                dec!(1),
                dec!(10),
                base + Duration::seconds(offset),
            );
            ledger.apply_execution(&portfolio, &pos, &trade).unwrap();
        }

        let until = ledger
            .trades_until(portfolio.id, base + Duration::seconds(2))
            .unwrap();
        assert_eq!(until.len(), 2);
        assert!(until[0].executed_at < until[1].executed_at);

        let all = ledger.trades(portfolio.id).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].executed_at > all[2].executed_at);
    }

    #[test]
    fn test_count_auto_trades_since() {
        let (ledger, portfolio) = seeded();
        let base = Utc::now();
        let pos = Position::open(portfolio.id, "X", dec!(1), dec!(10), base);

        let manual = Trade::record(portfolio.id, "X", TradeAction::Buy, dec!(1), dec!(10), base);
        ledger.apply_execution(&portfolio, &pos, &manual).unwrap();

        let yesterday = Trade::record(
            portfolio.id,
            "X",
            TradeAction::Buy,
            dec!(1),
            dec!(10),
            base - Duration::days(1),
        )
        .auto();
        ledger.apply_execution(&portfolio, &pos, &yesterday).unwrap();

        let today = Trade::record(portfolio.id, "X", TradeAction::Buy, dec!(1), dec!(10), base).auto();
        ledger.apply_execution(&portfolio, &pos, &today).unwrap();

        let since = base - Duration::hours(1);
        assert_eq!(ledger.count_auto_trades_since(portfolio.id, since).unwrap(), 1);
        let since_all = base - Duration::days(2);
        assert_eq!(
            ledger.count_auto_trades_since(portfolio.id, since_all).unwrap(),
            2
        );
    }

    #[test]
    fn test_reset_portfolio_wipes_history() {
        let (ledger, portfolio) = seeded();
        let pos = Position::open(portfolio.id, "X", dec!(1), dec!(10), Utc::now());
        let trade = Trade::record(
            portfolio.id,
            "X",
            TradeAction::Buy,
            dec!(1),
            dec!(10),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &pos, &trade).unwrap();

        let mut fresh = portfolio.clone();
        fresh.cash = fresh.initial_balance;
        ledger.reset_portfolio(&fresh).unwrap();

        assert!(ledger.trades(portfolio.id).unwrap().is_empty());
        assert!(ledger.positions(portfolio.id).unwrap().is_empty());
        assert!(ledger.portfolio(portfolio.id).unwrap().is_some());
    }

    #[test]
    fn test_strategy_listing_in_creation_order() {
        let (ledger, portfolio) = seeded();
        let config = StrategyConfig::new(vec!["AAPL".into()], dec!(0.1));
        let first = Strategy::new(
            portfolio.id,
            "first",
            StrategyKind::RuleBased,
            dec!(0.5),
            config.clone(),
        );
        let second = Strategy::new(
            portfolio.id,
            "second",
            StrategyKind::AgentBased,
            dec!(0.6),
            config,
        );
        ledger.create_strategy(&first).unwrap();
        ledger.create_strategy(&second).unwrap();

        let listed = ledger.strategies_for_portfolio(portfolio.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "first");
        assert!(ledger.strategy(first.id).unwrap().is_some());
    }

    #[test]
    fn test_latest_signal_wins_by_generated_at() {
        let ledger = MemoryLedger::new();
        let old = Signal::new("AAPL", dec!(0.2), "analyst")
            .with_generated_at(Utc::now() - Duration::hours(2));
        let new = Signal::new("AAPL", dec!(0.9), "analyst");
        ledger.record_signal(&new).unwrap();
        ledger.record_signal(&old).unwrap();

        let latest = ledger.latest_signal("AAPL").unwrap().unwrap();
        assert_eq!(latest.score, dec!(0.9));
        assert!(ledger.latest_signal("MSFT").unwrap().is_none());

        let recent = ledger.recent_signals("AAPL", 1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].score, dec!(0.9));
    }
}
