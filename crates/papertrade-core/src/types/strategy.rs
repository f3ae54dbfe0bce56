//! Strategy configuration types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// How a strategy obtains its signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// User-driven; never auto-executed
    Manual,
    /// Reads the most recent stored signal for each symbol
    RuleBased,
    /// Calls the live analysis agent for each symbol
    AgentBased,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Manual => write!(f, "manual"),
            StrategyKind::RuleBased => write!(f, "rule_based"),
            StrategyKind::AgentBased => write!(f, "agent_based"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "manual" => Ok(StrategyKind::Manual),
            "rule_based" => Ok(StrategyKind::RuleBased),
            "agent_based" => Ok(StrategyKind::AgentBased),
            other => Err(EngineError::Validation(format!(
                "unknown strategy kind: {other}"
            ))),
        }
    }
}

/// Recognized strategy configuration fields.
///
/// Stored as structured data and validated at write time; unrecognized
/// fields are rejected on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Symbols the strategy trades
    pub symbols: Vec<String>,
    /// Target position value as a fraction of total equity
    pub position_size_fraction: Decimal,
}

impl StrategyConfig {
    pub fn new(symbols: Vec<String>, position_size_fraction: Decimal) -> Self {
        Self {
            symbols,
            position_size_fraction,
        }
    }
}

/// A named configuration that may drive auto-trading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    /// Unique strategy ID
    pub id: Uuid,
    /// Portfolio the strategy belongs to
    pub portfolio_id: Uuid,
    /// Display name
    pub name: String,
    /// Signal sourcing mode
    pub kind: StrategyKind,
    /// Whether the evaluator picks this strategy up automatically
    pub auto_execute: bool,
    /// Minimum absolute signal score that triggers a trade
    pub signal_threshold: Decimal,
    /// Symbols and sizing
    pub config: StrategyConfig,
    /// Record creation instant
    pub created_at: DateTime<Utc>,
}

impl Strategy {
    pub fn new(
        portfolio_id: Uuid,
        name: impl Into<String>,
        kind: StrategyKind,
        signal_threshold: Decimal,
        config: StrategyConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            portfolio_id,
            name: name.into(),
            kind,
            auto_execute: false,
            signal_threshold,
            config,
            created_at: Utc::now(),
        }
    }

    /// Flag the strategy for automatic execution.
    pub fn auto_execute(mut self) -> Self {
        self.auto_execute = true;
        self
    }

    /// Validate the strategy before it is written to the ledger.
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Validation(
                "strategy name must not be empty".into(),
            ));
        }
        if self.signal_threshold <= Decimal::ZERO || self.signal_threshold > Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "signal threshold must be in (0, 1], got {}",
                self.signal_threshold
            )));
        }
        let fraction = self.config.position_size_fraction;
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "position size fraction must be in (0, 1], got {fraction}"
            )));
        }
        if self.auto_execute && self.config.symbols.is_empty() {
            return Err(EngineError::Validation(
                "auto-execute strategies need at least one symbol".into(),
            ));
        }
        if self.config.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(EngineError::Validation(
                "strategy symbols must not be blank".into(),
            ));
        }
        if self.auto_execute && self.kind == StrategyKind::Manual {
            return Err(EngineError::Validation(
                "manual strategies cannot auto-execute".into(),
            ));
        }
        Ok(())
    }
}
