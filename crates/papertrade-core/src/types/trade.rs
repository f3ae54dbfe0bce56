//! Trade ledger entry types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Trade action (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Get the opposite action.
    pub fn opposite(&self) -> Self {
        match self {
            TradeAction::Buy => TradeAction::Sell,
            TradeAction::Sell => TradeAction::Buy,
        }
    }

    /// Get the cash-flow sign (-1 for buy, +1 for sell).
    pub fn cash_sign(&self) -> Decimal {
        match self {
            TradeAction::Buy => -Decimal::ONE,
            TradeAction::Sell => Decimal::ONE,
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

impl std::str::FromStr for TradeAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeAction::Buy),
            "sell" => Ok(TradeAction::Sell),
            other => Err(EngineError::Validation(format!(
                "unknown trade action: {other}"
            ))),
        }
    }
}

/// An immutable ledger entry for one executed buy or sell.
///
/// Trades are never mutated or deleted after creation; the ordered trade
/// set for a portfolio is the sole source of truth for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade ID
    pub id: Uuid,
    /// Portfolio this trade belongs to
    pub portfolio_id: Uuid,
    /// Asset symbol
    pub symbol: String,
    /// Buy or sell
    pub action: TradeAction,
    /// Execution price per unit
    pub price: Decimal,
    /// Quantity traded (fractional allowed)
    pub size: Decimal,
    /// price * size
    pub total_value: Decimal,
    /// Realized P&L (None for buys)
    pub pnl: Option<Decimal>,
    /// Strategy that originated the trade, if any
    pub strategy_id: Option<Uuid>,
    /// Whether the auto-trading evaluator executed this trade
    pub auto_traded: bool,
    /// Execution instant (wall clock, or simulated clock in time travel)
    pub executed_at: DateTime<Utc>,
    /// Record creation instant (always wall clock)
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Build a trade record for an execution.
    pub fn record(
        portfolio_id: Uuid,
        symbol: impl Into<String>,
        action: TradeAction,
        size: Decimal,
        price: Decimal,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            portfolio_id,
            symbol: symbol.into(),
            action,
            price,
            size,
            total_value: price * size,
            pnl: None,
            strategy_id: None,
            auto_traded: false,
            executed_at,
            created_at: Utc::now(),
        }
    }

    /// Attach the realized P&L (sells only).
    pub fn with_pnl(mut self, pnl: Decimal) -> Self {
        self.pnl = Some(pnl);
        self
    }

    /// Attach the originating strategy.
    pub fn with_strategy(mut self, strategy_id: Uuid) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    /// Flag the trade as executed by the auto-trading evaluator.
    pub fn auto(mut self) -> Self {
        self.auto_traded = true;
        self
    }
}

/// Request to execute a single trade against a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    /// Target portfolio
    pub portfolio_id: Uuid,
    /// Asset symbol
    pub symbol: String,
    /// Buy or sell
    pub action: TradeAction,
    /// Quantity to trade; must be > 0
    pub quantity: Decimal,
    /// Execution price; fetched from the price source when absent
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Originating strategy, if any
    #[serde(default)]
    pub strategy_id: Option<Uuid>,
    /// Set by the auto-trading evaluator
    #[serde(default)]
    pub auto_traded: bool,
}

impl TradeRequest {
    /// Create a buy request.
    pub fn buy(portfolio_id: Uuid, symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            portfolio_id,
            symbol: symbol.into(),
            action: TradeAction::Buy,
            quantity,
            price: None,
            strategy_id: None,
            auto_traded: false,
        }
    }

    /// Create a sell request.
    pub fn sell(portfolio_id: Uuid, symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            portfolio_id,
            symbol: symbol.into(),
            action: TradeAction::Sell,
            quantity,
            price: None,
            strategy_id: None,
            auto_traded: false,
        }
    }

    /// Pin the execution price instead of fetching one.
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Attach the originating strategy.
    pub fn with_strategy(mut self, strategy_id: Uuid) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    /// Mark the request as auto-traded.
    pub fn auto(mut self) -> Self {
        self.auto_traded = true;
        self
    }

    /// Validate request fields before execution.
    pub fn validate(&self) -> EngineResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::Validation("symbol must not be empty".into()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if let Some(price) = self.price {
            if price <= Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "price must be positive, got {price}"
                )));
            }
        }
        Ok(())
    }
}
