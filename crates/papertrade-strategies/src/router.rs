//! Signal routing by strategy kind.

use std::sync::Arc;

use papertrade_core::error::DataError;
use papertrade_core::traits::SignalSource;
use papertrade_core::types::{Signal, StrategyKind};

/// Routes signal lookups to the right source for a strategy's kind.
///
/// Agent-based strategies call the live analysis source; rule-based
/// strategies read the most recent stored score. Manual strategies never
/// source signals.
pub struct SignalRouter {
    agent: Arc<dyn SignalSource>,
    stored: Arc<dyn SignalSource>,
}

impl SignalRouter {
    pub fn new(agent: Arc<dyn SignalSource>, stored: Arc<dyn SignalSource>) -> Self {
        Self { agent, stored }
    }

    /// Fetch the signal for a symbol via the source the kind selects.
    pub async fn signal_for(
        &self,
        kind: StrategyKind,
        symbol: &str,
    ) -> Result<Option<Signal>, DataError> {
        match kind {
            StrategyKind::AgentBased => self.agent.signal(symbol).await,
            StrategyKind::RuleBased => self.stored.signal(symbol).await,
            StrategyKind::Manual => Ok(None),
        }
    }

    /// Name of the source a kind routes to.
    pub fn source_name(&self, kind: StrategyKind) -> &str {
        match kind {
            StrategyKind::AgentBased => self.agent.name(),
            StrategyKind::RuleBased => self.stored.name(),
            StrategyKind::Manual => "none",
        }
    }
}
