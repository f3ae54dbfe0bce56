//! Error types for the trading engine.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Top-level engine error.
///
/// Every variant maps to a stable machine-readable kind and an
/// HTTP-equivalent status code, so callers embedding the engine behind
/// any transport can translate failures uniformly.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Decimal, held: Decimal },

    #[error("No open position in {0}")]
    NoPosition(String),

    #[error("Auto-trading is disabled for portfolio {0}")]
    AutoTradingDisabled(Uuid),

    #[error("No auto-execute strategies configured for portfolio {0}")]
    NoStrategies(Uuid),

    #[error("Daily auto-trade limit reached: {executed} of {limit}")]
    DailyLimitReached { executed: u32, limit: u32 },

    #[error("Upstream error: {0}")]
    Upstream(#[from] DataError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable kind string for error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::NotFound(_) => "not_found",
            EngineError::Validation(_) => "validation",
            EngineError::InsufficientFunds { .. } => "insufficient_funds",
            EngineError::InsufficientShares { .. } => "insufficient_shares",
            EngineError::NoPosition(_) => "no_position",
            EngineError::AutoTradingDisabled(_) => "auto_trading_disabled",
            EngineError::NoStrategies(_) => "no_strategies",
            EngineError::DailyLimitReached { .. } => "daily_limit_reached",
            EngineError::Upstream(_) => "upstream_unavailable",
            EngineError::Ledger(_) => "ledger",
            EngineError::Internal(_) => "internal",
        }
    }

    /// HTTP-equivalent status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Unauthorized(_) => 401,
            EngineError::NotFound(_) | EngineError::NoStrategies(_) => 404,
            EngineError::Validation(_)
            | EngineError::InsufficientFunds { .. }
            | EngineError::InsufficientShares { .. }
            | EngineError::NoPosition(_)
            | EngineError::AutoTradingDisabled(_)
            | EngineError::DailyLimitReached { .. } => 400,
            EngineError::Upstream(_) => 502,
            EngineError::Ledger(_) | EngineError::Internal(_) => 500,
        }
    }
}

/// Upstream data failures (price quotes, signal analysis).
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Ledger storage failures.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        LedgerError::Storage(err.to_string())
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(EngineError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(EngineError::NotFound("x".into()).status_code(), 404);
        assert_eq!(EngineError::Validation("x".into()).status_code(), 400);
        assert_eq!(
            EngineError::InsufficientFunds {
                required: dec!(500),
                available: dec!(100),
            }
            .status_code(),
            400
        );
        assert_eq!(
            EngineError::Upstream(DataError::Unavailable("quote feed".into())).status_code(),
            502
        );
        assert_eq!(
            EngineError::Ledger(LedgerError::Storage("disk".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(
            EngineError::DailyLimitReached {
                executed: 5,
                limit: 5
            }
            .kind(),
            "daily_limit_reached"
        );
        assert_eq!(EngineError::NoPosition("AAPL".into()).kind(), "no_position");
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = EngineError::InsufficientFunds {
            required: dec!(500.00),
            available: dec!(100.00),
        };
        let msg = err.to_string();
        assert!(msg.contains("500.00"));
        assert!(msg.contains("100.00"));
    }
}
