//! SQLite persistence for the trade ledger.
//!
//! One connection behind a mutex; multi-record writes go through explicit
//! transactions so the executor's three-write unit commits atomically.
//! Money and quantities are stored as canonical decimal strings, instants
//! as millisecond integers.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use papertrade_core::error::LedgerError;
use papertrade_core::traits::{LedgerStore, SignalStore};
use papertrade_core::types::{
    Portfolio, Position, Signal, Strategy, StrategyConfig, StrategyKind, Trade, TradeAction,
};

/// Durable ledger store backed by SQLite.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(LedgerError::storage)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("sqlite ledger initialized");
        Ok(store)
    }

    /// Open an in-memory ledger (for testing and ephemeral runs).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(LedgerError::storage)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("in-memory sqlite ledger initialized");
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Storage("sqlite connection mutex poisoned".into()))
    }

    fn init_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS portfolios (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                cash TEXT NOT NULL,
                initial_balance TEXT NOT NULL,
                total_equity TEXT NOT NULL,
                stocks_value TEXT NOT NULL,
                total_pnl TEXT NOT NULL,
                total_pnl_percent TEXT NOT NULL,
                daily_pnl TEXT NOT NULL,
                daily_pnl_percent TEXT NOT NULL,
                open_positions INTEGER NOT NULL,
                auto_trading_enabled INTEGER NOT NULL,
                auto_max_trades_per_day INTEGER NOT NULL,
                auto_risk_limit TEXT NOT NULL,
                time_travel_enabled INTEGER NOT NULL,
                sim_instant INTEGER,
                day_anchor_date TEXT,
                day_anchor_equity TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_portfolios_owner ON portfolios(owner_id);

            CREATE TABLE IF NOT EXISTS positions (
                id TEXT PRIMARY KEY,
                portfolio_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                entry_price TEXT NOT NULL,
                current_price TEXT NOT NULL,
                size TEXT NOT NULL,
                opened_at INTEGER NOT NULL,
                closed_at INTEGER,
                unrealized_pnl TEXT NOT NULL,
                unrealized_pnl_percent TEXT NOT NULL,
                strategy_id TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_positions_portfolio ON positions(portfolio_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_positions_one_open
                ON positions(portfolio_id, symbol) WHERE closed_at IS NULL;

            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                portfolio_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                action TEXT NOT NULL,
                price TEXT NOT NULL,
                size TEXT NOT NULL,
                total_value TEXT NOT NULL,
                pnl TEXT,
                strategy_id TEXT,
                auto_traded INTEGER NOT NULL,
                executed_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_portfolio_executed
                ON trades(portfolio_id, executed_at);
            CREATE INDEX IF NOT EXISTS idx_trades_portfolio_auto
                ON trades(portfolio_id, auto_traded, executed_at);

            CREATE TABLE IF NOT EXISTS strategies (
                id TEXT PRIMARY KEY,
                portfolio_id TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                auto_execute INTEGER NOT NULL,
                signal_threshold TEXT NOT NULL,
                config_json TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_strategies_portfolio ON strategies(portfolio_id);

            CREATE TABLE IF NOT EXISTS signals (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                score TEXT NOT NULL,
                source TEXT NOT NULL,
                generated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_signals_symbol_generated
                ON signals(symbol, generated_at DESC);",
        )
        .map_err(LedgerError::storage)?;

        Ok(())
    }
}

fn dec_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_dec_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Decimal::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Uuid::parse_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(idx)?;
    millis
        .map(|ms| {
            DateTime::from_timestamp_millis(ms)
                .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
        })
        .transpose()
}

fn opt_date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn map_portfolio(row: &Row<'_>) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: uuid_col(row, 0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        cash: dec_col(row, 3)?,
        initial_balance: dec_col(row, 4)?,
        total_equity: dec_col(row, 5)?,
        stocks_value: dec_col(row, 6)?,
        total_pnl: dec_col(row, 7)?,
        total_pnl_percent: dec_col(row, 8)?,
        daily_pnl: dec_col(row, 9)?,
        daily_pnl_percent: dec_col(row, 10)?,
        open_positions: row.get(11)?,
        auto_trading_enabled: row.get(12)?,
        auto_max_trades_per_day: row.get(13)?,
        auto_risk_limit: dec_col(row, 14)?,
        time_travel_enabled: row.get(15)?,
        sim_instant: opt_ts_col(row, 16)?,
        day_anchor_date: opt_date_col(row, 17)?,
        day_anchor_equity: dec_col(row, 18)?,
        created_at: ts_col(row, 19)?,
        updated_at: ts_col(row, 20)?,
    })
}

fn map_position(row: &Row<'_>) -> rusqlite::Result<Position> {
    Ok(Position {
        id: uuid_col(row, 0)?,
        portfolio_id: uuid_col(row, 1)?,
        symbol: row.get(2)?,
        entry_price: dec_col(row, 3)?,
        current_price: dec_col(row, 4)?,
        size: dec_col(row, 5)?,
        opened_at: ts_col(row, 6)?,
        closed_at: opt_ts_col(row, 7)?,
        unrealized_pnl: dec_col(row, 8)?,
        unrealized_pnl_percent: dec_col(row, 9)?,
        strategy_id: opt_uuid_col(row, 10)?,
    })
}

fn map_trade(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let action: String = row.get(3)?;
    let action = TradeAction::from_str(&action)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Trade {
        id: uuid_col(row, 0)?,
        portfolio_id: uuid_col(row, 1)?,
        symbol: row.get(2)?,
        action,
        price: dec_col(row, 4)?,
        size: dec_col(row, 5)?,
        total_value: dec_col(row, 6)?,
        pnl: opt_dec_col(row, 7)?,
        strategy_id: opt_uuid_col(row, 8)?,
        auto_traded: row.get(9)?,
        executed_at: ts_col(row, 10)?,
        created_at: ts_col(row, 11)?,
    })
}

fn map_strategy(row: &Row<'_>) -> rusqlite::Result<Strategy> {
    let kind: String = row.get(3)?;
    let kind = StrategyKind::from_str(&kind)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let config_json: String = row.get(6)?;
    let config: StrategyConfig = serde_json::from_str(&config_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(Strategy {
        id: uuid_col(row, 0)?,
        portfolio_id: uuid_col(row, 1)?,
        name: row.get(2)?,
        kind,
        auto_execute: row.get(4)?,
        signal_threshold: dec_col(row, 5)?,
        config,
        created_at: ts_col(row, 7)?,
    })
}

fn map_signal(row: &Row<'_>) -> rusqlite::Result<Signal> {
    Ok(Signal {
        id: uuid_col(row, 0)?,
        symbol: row.get(1)?,
        score: dec_col(row, 2)?,
        source: row.get(3)?,
        generated_at: ts_col(row, 4)?,
    })
}

const PORTFOLIO_COLS: &str = "id, owner_id, name, cash, initial_balance, total_equity, \
     stocks_value, total_pnl, total_pnl_percent, daily_pnl, daily_pnl_percent, \
     open_positions, auto_trading_enabled, auto_max_trades_per_day, auto_risk_limit, \
     time_travel_enabled, sim_instant, day_anchor_date, day_anchor_equity, \
     created_at, updated_at";

const POSITION_COLS: &str = "id, portfolio_id, symbol, entry_price, current_price, size, \
     opened_at, closed_at, unrealized_pnl, unrealized_pnl_percent, strategy_id";

const TRADE_COLS: &str = "id, portfolio_id, symbol, action, price, size, total_value, pnl, \
     strategy_id, auto_traded, executed_at, created_at";

fn insert_portfolio(conn: &Connection, p: &Portfolio) -> Result<(), LedgerError> {
    let sql = format!(
        "INSERT INTO portfolios ({PORTFOLIO_COLS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
    );
    conn.execute(
        &sql,
        params![
            p.id.to_string(),
            p.owner_id,
            p.name,
            p.cash.to_string(),
            p.initial_balance.to_string(),
            p.total_equity.to_string(),
            p.stocks_value.to_string(),
            p.total_pnl.to_string(),
            p.total_pnl_percent.to_string(),
            p.daily_pnl.to_string(),
            p.daily_pnl_percent.to_string(),
            p.open_positions,
            p.auto_trading_enabled,
            p.auto_max_trades_per_day,
            p.auto_risk_limit.to_string(),
            p.time_travel_enabled,
            p.sim_instant.map(|t| t.timestamp_millis()),
            p.day_anchor_date.map(|d| d.to_string()),
            p.day_anchor_equity.to_string(),
            p.created_at.timestamp_millis(),
            p.updated_at.timestamp_millis(),
        ],
    )
    .map_err(LedgerError::storage)?;
    Ok(())
}

fn update_portfolio_row(conn: &Connection, p: &Portfolio) -> Result<(), LedgerError> {
    let updated = conn
        .execute(
            "UPDATE portfolios SET
                owner_id = ?2, name = ?3, cash = ?4, initial_balance = ?5,
                total_equity = ?6, stocks_value = ?7, total_pnl = ?8,
                total_pnl_percent = ?9, daily_pnl = ?10, daily_pnl_percent = ?11,
                open_positions = ?12, auto_trading_enabled = ?13,
                auto_max_trades_per_day = ?14, auto_risk_limit = ?15,
                time_travel_enabled = ?16, sim_instant = ?17,
                day_anchor_date = ?18, day_anchor_equity = ?19, updated_at = ?20
             WHERE id = ?1",
            params![
                p.id.to_string(),
                p.owner_id,
                p.name,
                p.cash.to_string(),
                p.initial_balance.to_string(),
                p.total_equity.to_string(),
                p.stocks_value.to_string(),
                p.total_pnl.to_string(),
                p.total_pnl_percent.to_string(),
                p.daily_pnl.to_string(),
                p.daily_pnl_percent.to_string(),
                p.open_positions,
                p.auto_trading_enabled,
                p.auto_max_trades_per_day,
                p.auto_risk_limit.to_string(),
                p.time_travel_enabled,
                p.sim_instant.map(|t| t.timestamp_millis()),
                p.day_anchor_date.map(|d| d.to_string()),
                p.day_anchor_equity.to_string(),
                p.updated_at.timestamp_millis(),
            ],
        )
        .map_err(LedgerError::storage)?;
    if updated == 0 {
        return Err(LedgerError::Storage(format!("portfolio {} not found", p.id)));
    }
    Ok(())
}

fn upsert_position(conn: &Connection, pos: &Position) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT INTO positions (id, portfolio_id, symbol, entry_price, current_price, size,
            opened_at, closed_at, unrealized_pnl, unrealized_pnl_percent, strategy_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
            entry_price = excluded.entry_price,
            current_price = excluded.current_price,
            size = excluded.size,
            closed_at = excluded.closed_at,
            unrealized_pnl = excluded.unrealized_pnl,
            unrealized_pnl_percent = excluded.unrealized_pnl_percent",
        params![
            pos.id.to_string(),
            pos.portfolio_id.to_string(),
            pos.symbol,
            pos.entry_price.to_string(),
            pos.current_price.to_string(),
            pos.size.to_string(),
            pos.opened_at.timestamp_millis(),
            pos.closed_at.map(|t| t.timestamp_millis()),
            pos.unrealized_pnl.to_string(),
            pos.unrealized_pnl_percent.to_string(),
            pos.strategy_id.map(|id| id.to_string()),
        ],
    )
    .map_err(LedgerError::storage)?;
    Ok(())
}

fn insert_trade(conn: &Connection, t: &Trade) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT INTO trades (id, portfolio_id, symbol, action, price, size, total_value,
            pnl, strategy_id, auto_traded, executed_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            t.id.to_string(),
            t.portfolio_id.to_string(),
            t.symbol,
            t.action.to_string().to_lowercase(),
            t.price.to_string(),
            t.size.to_string(),
            t.total_value.to_string(),
            t.pnl.map(|p| p.to_string()),
            t.strategy_id.map(|id| id.to_string()),
            t.auto_traded,
            t.executed_at.timestamp_millis(),
            t.created_at.timestamp_millis(),
        ],
    )
    .map_err(LedgerError::storage)?;
    Ok(())
}

impl LedgerStore for SqliteLedger {
    fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError> {
        let conn = self.conn()?;
        insert_portfolio(&conn, portfolio)
    }

    fn portfolio(&self, id: Uuid) -> Result<Option<Portfolio>, LedgerError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {PORTFOLIO_COLS} FROM portfolios WHERE id = ?1");
        conn.query_row(&sql, params![id.to_string()], map_portfolio)
            .optional()
            .map_err(LedgerError::storage)
    }

    fn portfolios_for_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>, LedgerError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {PORTFOLIO_COLS} FROM portfolios WHERE owner_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(LedgerError::storage)?;
        let rows = stmt
            .query_map(params![owner_id], map_portfolio)
            .map_err(LedgerError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LedgerError::storage)?);
        }
        Ok(out)
    }

    fn update_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError> {
        let conn = self.conn()?;
        update_portfolio_row(&conn, portfolio)
    }

    fn positions(&self, portfolio_id: Uuid) -> Result<Vec<Position>, LedgerError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {POSITION_COLS} FROM positions WHERE portfolio_id = ?1
             ORDER BY opened_at ASC, rowid ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(LedgerError::storage)?;
        let rows = stmt
            .query_map(params![portfolio_id.to_string()], map_position)
            .map_err(LedgerError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LedgerError::storage)?);
        }
        Ok(out)
    }

    fn open_position(
        &self,
        portfolio_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, LedgerError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {POSITION_COLS} FROM positions
             WHERE portfolio_id = ?1 AND symbol = ?2 AND closed_at IS NULL"
        );
        conn.query_row(&sql, params![portfolio_id.to_string(), symbol], map_position)
            .optional()
            .map_err(LedgerError::storage)
    }

    fn trades(&self, portfolio_id: Uuid) -> Result<Vec<Trade>, LedgerError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {TRADE_COLS} FROM trades WHERE portfolio_id = ?1
             ORDER BY executed_at DESC, rowid DESC"
        );
        let mut stmt = conn.prepare(&sql).map_err(LedgerError::storage)?;
        let rows = stmt
            .query_map(params![portfolio_id.to_string()], map_trade)
            .map_err(LedgerError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LedgerError::storage)?);
        }
        Ok(out)
    }

    fn trades_until(
        &self,
        portfolio_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Trade>, LedgerError> {
        let conn = self.conn()?;
        // Ascending scan; rowid breaks timestamp ties by insertion order.
        let sql = format!(
            "SELECT {TRADE_COLS} FROM trades
             WHERE portfolio_id = ?1 AND executed_at <= ?2
             ORDER BY executed_at ASC, rowid ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(LedgerError::storage)?;
        let rows = stmt
            .query_map(
                params![portfolio_id.to_string(), cutoff.timestamp_millis()],
                map_trade,
            )
            .map_err(LedgerError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LedgerError::storage)?);
        }
        Ok(out)
    }

    fn count_auto_trades_since(
        &self,
        portfolio_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, LedgerError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM trades
                 WHERE portfolio_id = ?1 AND auto_traded = 1 AND executed_at >= ?2",
                params![portfolio_id.to_string(), since.timestamp_millis()],
                |row| row.get(0),
            )
            .map_err(LedgerError::storage)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn apply_execution(
        &self,
        portfolio: &Portfolio,
        position: &Position,
        trade: &Trade,
    ) -> Result<(), LedgerError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(LedgerError::storage)?;
        update_portfolio_row(&tx, portfolio)?;
        upsert_position(&tx, position)?;
        insert_trade(&tx, trade)?;
        tx.commit().map_err(LedgerError::storage)?;
        Ok(())
    }

    fn reset_portfolio(&self, portfolio: &Portfolio) -> Result<(), LedgerError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(LedgerError::storage)?;
        tx.execute(
            "DELETE FROM trades WHERE portfolio_id = ?1",
            params![portfolio.id.to_string()],
        )
        .map_err(LedgerError::storage)?;
        tx.execute(
            "DELETE FROM positions WHERE portfolio_id = ?1",
            params![portfolio.id.to_string()],
        )
        .map_err(LedgerError::storage)?;
        update_portfolio_row(&tx, portfolio)?;
        tx.commit().map_err(LedgerError::storage)?;
        Ok(())
    }

    fn create_strategy(&self, strategy: &Strategy) -> Result<(), LedgerError> {
        let config_json =
            serde_json::to_string(&strategy.config).map_err(LedgerError::serialization)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO strategies (id, portfolio_id, name, kind, auto_execute,
                signal_threshold, config_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                strategy.id.to_string(),
                strategy.portfolio_id.to_string(),
                strategy.name,
                strategy.kind.to_string(),
                strategy.auto_execute,
                strategy.signal_threshold.to_string(),
                config_json,
                strategy.created_at.timestamp_millis(),
            ],
        )
        .map_err(LedgerError::storage)?;
        Ok(())
    }

    fn strategy(&self, id: Uuid) -> Result<Option<Strategy>, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, portfolio_id, name, kind, auto_execute, signal_threshold,
                config_json, created_at
             FROM strategies WHERE id = ?1",
            params![id.to_string()],
            map_strategy,
        )
        .optional()
        .map_err(LedgerError::storage)
    }

    fn strategies_for_portfolio(&self, portfolio_id: Uuid) -> Result<Vec<Strategy>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, portfolio_id, name, kind, auto_execute, signal_threshold,
                    config_json, created_at
                 FROM strategies WHERE portfolio_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(LedgerError::storage)?;
        let rows = stmt
            .query_map(params![portfolio_id.to_string()], map_strategy)
            .map_err(LedgerError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LedgerError::storage)?);
        }
        Ok(out)
    }
}

impl SignalStore for SqliteLedger {
    fn record_signal(&self, signal: &Signal) -> Result<(), LedgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals (id, symbol, score, source, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                signal.id.to_string(),
                signal.symbol,
                signal.score.to_string(),
                signal.source,
                signal.generated_at.timestamp_millis(),
            ],
        )
        .map_err(LedgerError::storage)?;
        Ok(())
    }

    fn latest_signal(&self, symbol: &str) -> Result<Option<Signal>, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, symbol, score, source, generated_at FROM signals
             WHERE symbol = ?1
             ORDER BY generated_at DESC, rowid DESC LIMIT 1",
            params![symbol],
            map_signal,
        )
        .optional()
        .map_err(LedgerError::storage)
    }

    fn recent_signals(&self, symbol: &str, limit: usize) -> Result<Vec<Signal>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, score, source, generated_at FROM signals
                 WHERE symbol = ?1
                 ORDER BY generated_at DESC, rowid DESC LIMIT ?2",
            )
            .map_err(LedgerError::storage)?;
        let rows = stmt
            .query_map(params![symbol, limit as i64], map_signal)
            .map_err(LedgerError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(LedgerError::storage)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn seeded() -> (SqliteLedger, Portfolio) {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let portfolio = Portfolio::new("user-1", "Main", dec!(100000));
        ledger.create_portfolio(&portfolio).unwrap();
        (ledger, portfolio)
    }

    #[test]
    fn test_portfolio_round_trip_preserves_fields() {
        let (ledger, mut portfolio) = seeded();
        portfolio.cash = dec!(98765.4321);
        portfolio.time_travel_enabled = true;
        portfolio.sim_instant = Some(Utc::now() - Duration::days(30));
        portfolio.day_anchor_date = Some(Utc::now().date_naive());
        portfolio.day_anchor_equity = dec!(99000.55);
        portfolio.auto_risk_limit = dec!(0.25);
        ledger.update_portfolio(&portfolio).unwrap();

        let loaded = ledger.portfolio(portfolio.id).unwrap().unwrap();
        assert_eq!(loaded.cash, dec!(98765.4321));
        assert!(loaded.time_travel_enabled);
        assert_eq!(
            loaded.sim_instant.map(|t| t.timestamp_millis()),
            portfolio.sim_instant.map(|t| t.timestamp_millis())
        );
        assert_eq!(loaded.day_anchor_date, portfolio.day_anchor_date);
        assert_eq!(loaded.day_anchor_equity, dec!(99000.55));
        assert_eq!(loaded.auto_risk_limit, dec!(0.25));
    }

    #[test]
    fn test_update_missing_portfolio_fails() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let portfolio = Portfolio::new("user-1", "Main", dec!(1000));
        assert!(ledger.update_portfolio(&portfolio).is_err());
    }

    #[test]
    fn test_execution_writes_all_three_records() {
        let (ledger, mut portfolio) = seeded();
        portfolio.cash = dec!(99500);
        let position = Position::open(portfolio.id, "AAPL", dec!(10), dec!(50), Utc::now());
        let trade = Trade::record(
            portfolio.id,
            "AAPL",
            TradeAction::Buy,
            dec!(10),
            dec!(50),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &position, &trade).unwrap();

        assert_eq!(ledger.portfolio(portfolio.id).unwrap().unwrap().cash, dec!(99500));
        let open = ledger.open_position(portfolio.id, "AAPL").unwrap().unwrap();
        assert_eq!(open.size, dec!(10));
        assert_eq!(open.id, position.id);
        assert_eq!(ledger.trades(portfolio.id).unwrap().len(), 1);
    }

    #[test]
    fn test_position_upsert_then_close() {
        let (ledger, portfolio) = seeded();
        let mut position = Position::open(portfolio.id, "AAPL", dec!(10), dec!(50), Utc::now());
        let buy = Trade::record(
            portfolio.id,
            "AAPL",
            TradeAction::Buy,
            dec!(10),
            dec!(50),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &position, &buy).unwrap();

        position.blend_buy(dec!(10), dec!(60));
        let buy2 = Trade::record(
            portfolio.id,
            "AAPL",
            TradeAction::Buy,
            dec!(10),
            dec!(60),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &position, &buy2).unwrap();

        let open = ledger.open_position(portfolio.id, "AAPL").unwrap().unwrap();
        assert_eq!(open.size, dec!(20));
        assert_eq!(open.entry_price, dec!(55));

        position.reduce_sell(dec!(20), dec!(70), Utc::now());
        let sell = Trade::record(
            portfolio.id,
            "AAPL",
            TradeAction::Sell,
            dec!(20),
            dec!(70),
            Utc::now(),
        )
        .with_pnl(dec!(300));
        ledger.apply_execution(&portfolio, &position, &sell).unwrap();

        assert!(ledger.open_position(portfolio.id, "AAPL").unwrap().is_none());
        let all = ledger.positions(portfolio.id).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].closed_at.is_some());

        let trades = ledger.trades(portfolio.id).unwrap();
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].pnl, Some(dec!(300)));
    }

    #[test]
    fn test_trades_until_ascending_with_tie_break() {
        let (ledger, portfolio) = seeded();
        let base = Utc::now();
        let position = Position::open(portfolio.id, "X", dec!(1), dec!(10), base);
        for (price, offset) in [(dec!(30), 2i64), (dec!(10), 0), (dec!(20), 0)] {
            let trade = Trade::record(
                portfolio.id,
                "X",
                TradeAction::Buy,
                dec!(1),
                price,
                base + Duration::seconds(offset),
            );
            ledger.apply_execution(&portfolio, &position, &trade).unwrap();
        }

        let scan = ledger.trades_until(portfolio.id, base + Duration::days(1)).unwrap();
        assert_eq!(scan.len(), 3);
        // Equal timestamps keep insertion order.
        assert_eq!(scan[0].price, dec!(10));
        assert_eq!(scan[1].price, dec!(20));
        assert_eq!(scan[2].price, dec!(30));

        let none = ledger
            .trades_until(portfolio.id, base - Duration::seconds(1))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_count_auto_trades_window() {
        let (ledger, portfolio) = seeded();
        let base = Utc::now();
        let position = Position::open(portfolio.id, "X", dec!(1), dec!(10), base);

        let old_auto = Trade::record(
            portfolio.id,
            "X",
            TradeAction::Buy,
            dec!(1),
            dec!(10),
            base - Duration::days(3),
        )
        .auto();
        let manual = Trade::record(portfolio.id, "X", TradeAction::Buy, dec!(1), dec!(10), base);
        let fresh_auto =
            Trade::record(portfolio.id, "X", TradeAction::Buy, dec!(1), dec!(10), base).auto();
        for t in [&old_auto, &manual, &fresh_auto] {
            ledger.apply_execution(&portfolio, &position, t).unwrap();
        }

        assert_eq!(
            ledger
                .count_auto_trades_since(portfolio.id, base - Duration::hours(1))
                .unwrap(),
            1
        );
        assert_eq!(
            ledger
                .count_auto_trades_since(portfolio.id, base - Duration::days(7))
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_strategy_round_trip() {
        let (ledger, portfolio) = seeded();
        let strategy = Strategy::new(
            portfolio.id,
            "momentum",
            StrategyKind::AgentBased,
            dec!(0.55),
            StrategyConfig::new(vec!["AAPL".into(), "MSFT".into()], dec!(0.07)),
        )
        .auto_execute();
        ledger.create_strategy(&strategy).unwrap();

        let loaded = ledger.strategy(strategy.id).unwrap().unwrap();
        assert_eq!(loaded.kind, StrategyKind::AgentBased);
        assert!(loaded.auto_execute);
        assert_eq!(loaded.signal_threshold, dec!(0.55));
        assert_eq!(loaded.config.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(loaded.config.position_size_fraction, dec!(0.07));

        let listed = ledger.strategies_for_portfolio(portfolio.id).unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_reset_wipes_trades_and_positions() {
        let (ledger, portfolio) = seeded();
        let position = Position::open(portfolio.id, "X", dec!(1), dec!(10), Utc::now());
        let trade = Trade::record(
            portfolio.id,
            "X",
            TradeAction::Buy,
            dec!(1),
            dec!(10),
            Utc::now(),
        );
        ledger.apply_execution(&portfolio, &position, &trade).unwrap();

        let mut fresh = portfolio.clone();
        fresh.cash = fresh.initial_balance;
        ledger.reset_portfolio(&fresh).unwrap();

        assert!(ledger.trades(portfolio.id).unwrap().is_empty());
        assert!(ledger.positions(portfolio.id).unwrap().is_empty());
    }

    #[test]
    fn test_signals_latest_and_recent() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let old = Signal::new("AAPL", dec!(0.1), "analyst")
            .with_generated_at(Utc::now() - Duration::hours(1));
        let new = Signal::new("AAPL", dec!(0.8), "analyst");
        ledger.record_signal(&old).unwrap();
        ledger.record_signal(&new).unwrap();

        assert_eq!(
            ledger.latest_signal("AAPL").unwrap().unwrap().score,
            dec!(0.8)
        );
        assert!(ledger.latest_signal("MSFT").unwrap().is_none());
        assert_eq!(ledger.recent_signals("AAPL", 5).unwrap().len(), 2);
        assert_eq!(ledger.recent_signals("AAPL", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let portfolio = Portfolio::new("user-1", "Main", dec!(5000));
        {
            let ledger = SqliteLedger::open(&path).unwrap();
            ledger.create_portfolio(&portfolio).unwrap();
        }
        let reopened = SqliteLedger::open(&path).unwrap();
        let loaded = reopened.portfolio(portfolio.id).unwrap().unwrap();
        assert_eq!(loaded.cash, dec!(5000));
        assert_eq!(loaded.owner_id, "user-1");
    }
}
