//! Signal source trait definition.

use crate::error::DataError;
use crate::types::Signal;
use async_trait::async_trait;

/// Trait for directional-score providers.
///
/// Two implementations exist: a stored-signal reader for rule-based
/// strategies and a live agent client for agent-based strategies. The
/// evaluator selects one by strategy kind.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Fetch the signal for a symbol.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to score
    ///
    /// # Returns
    /// * `Some(Signal)` with a score in [-1, 1]
    /// * `None` when no signal exists for the symbol
    async fn signal(&self, symbol: &str) -> Result<Option<Signal>, DataError>;

    /// Get the source name.
    fn name(&self) -> &str;
}
