//! Ledger store trait definitions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::types::{Portfolio, Position, Signal, Strategy, Trade};

/// Durable storage for portfolios, positions, trades, and strategies.
///
/// The trade log is append-only; `apply_execution` is the single atomic
/// multi-record write the executor relies on. Methods are synchronous:
/// implementations lock internally and callers never hold an async lock
/// across these calls.
pub trait LedgerStore: Send + Sync {
    /// Insert a new portfolio.
    fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError>;

    /// Fetch a portfolio by id.
    fn portfolio(&self, id: Uuid) -> Result<Option<Portfolio>, LedgerError>;

    /// List portfolios belonging to an owner.
    fn portfolios_for_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>, LedgerError>;

    /// Overwrite a portfolio snapshot.
    fn update_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError>;

    /// All positions for a portfolio, open and closed.
    fn positions(&self, portfolio_id: Uuid) -> Result<Vec<Position>, LedgerError>;

    /// The open position for (portfolio, symbol), if any.
    fn open_position(
        &self,
        portfolio_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, LedgerError>;

    /// Trades for a portfolio, newest first.
    fn trades(&self, portfolio_id: Uuid) -> Result<Vec<Trade>, LedgerError>;

    /// Trades with `executed_at <= cutoff`, oldest first.
    ///
    /// Ascending order is load-bearing: replay folds over this scan.
    fn trades_until(
        &self,
        portfolio_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Trade>, LedgerError>;

    /// Count auto-traded trades with `executed_at >= since`.
    fn count_auto_trades_since(
        &self,
        portfolio_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, LedgerError>;

    /// Apply one execution atomically: append the trade, upsert the
    /// position, overwrite the portfolio roll-up. All three land or none.
    fn apply_execution(
        &self,
        portfolio: &Portfolio,
        position: &Position,
        trade: &Trade,
    ) -> Result<(), LedgerError>;

    /// Delete all positions and trades for the portfolio and overwrite
    /// its snapshot, atomically. Backs the destructive replay reset.
    fn reset_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError>;

    /// Insert a new strategy.
    fn create_strategy(&self, strategy: &Strategy) -> Result<(), LedgerError>;

    /// Fetch a strategy by id.
    fn strategy(&self, id: Uuid) -> Result<Option<Strategy>, LedgerError>;

    /// List strategies for a portfolio.
    fn strategies_for_portfolio(&self, portfolio_id: Uuid) -> Result<Vec<Strategy>, LedgerError>;
}

/// Storage for externally produced signals.
///
/// The engine only reads these; recording exists for the producer side
/// and for seeding simulations.
pub trait SignalStore: Send + Sync {
    /// Record a signal.
    fn record_signal(&self, signal: &Signal) -> Result<(), LedgerError>;

    /// The most recent signal for a symbol.
    fn latest_signal(&self, symbol: &str) -> Result<Option<Signal>, LedgerError>;

    /// Recent signals for a symbol, newest first.
    fn recent_signals(&self, symbol: &str, limit: usize) -> Result<Vec<Signal>, LedgerError>;
}
