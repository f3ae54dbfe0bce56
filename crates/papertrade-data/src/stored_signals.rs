//! Signal source backed by the ledger's stored signals.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use papertrade_core::error::DataError;
use papertrade_core::traits::{SignalSource, SignalStore};
use papertrade_core::types::Signal;

/// Serves the most recently recorded signal for each symbol.
///
/// Rule-based strategies read from here; the evaluator never consults the
/// store directly. With a max age configured, older signals are treated
/// as absent rather than acted on.
pub struct StoredSignalSource {
    store: Arc<dyn SignalStore>,
    max_age: Option<Duration>,
}

impl StoredSignalSource {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self {
            store,
            max_age: None,
        }
    }

    /// Ignore signals older than `seconds`.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(Duration::seconds(seconds));
        self
    }
}

#[async_trait]
impl SignalSource for StoredSignalSource {
    async fn signal(&self, symbol: &str) -> Result<Option<Signal>, DataError> {
        let latest = self
            .store
            .latest_signal(symbol)
            .map_err(|e| DataError::Unavailable(e.to_string()))?;

        match (latest, self.max_age) {
            (Some(signal), Some(max_age)) if Utc::now() - signal.generated_at > max_age => {
                Ok(None)
            }
            (latest, _) => Ok(latest),
        }
    }

    fn name(&self) -> &str {
        "stored-signals"
    }
}
