//! Signal types.
//!
//! Signals are produced outside the engine (stored analysis results or a
//! live agent call) and consumed read-only by the auto-trading evaluator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// A directional score for one asset, in [-1, 1].
///
/// Positive scores lean bullish, negative bearish; the evaluator compares
/// the score against each strategy's threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal ID
    pub id: Uuid,
    /// Asset symbol the score applies to
    pub symbol: String,
    /// Directional score in [-1, 1]
    pub score: Decimal,
    /// Producer tag (analysis rule name, agent identifier)
    pub source: String,
    /// When the score was produced
    pub generated_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        symbol: impl Into<String>,
        score: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            score,
            source: source.into(),
            generated_at: Utc::now(),
        }
    }

    /// Pin the generation instant (stored signals carry their own).
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    /// Validate the score range before the signal is recorded.
    pub fn validate(&self) -> EngineResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::Validation("signal symbol must not be empty".into()));
        }
        if self.score < -Decimal::ONE || self.score > Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "signal score must be in [-1, 1], got {}",
                self.score
            )));
        }
        Ok(())
    }
}
