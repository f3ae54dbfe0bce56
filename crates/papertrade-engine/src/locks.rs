//! Per-portfolio execution locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed mutex registry serializing mutations per portfolio.
///
/// Two requests against the same portfolio take turns; requests against
/// different portfolios proceed concurrently. Guards are owned so callers
/// can hold them across await points. The registry grows with the set of
/// portfolios touched by the process and is never pruned.
#[derive(Default)]
pub struct PortfolioLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl PortfolioLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one portfolio.
    pub async fn acquire(&self, portfolio_id: Uuid) -> OwnedMutexGuard<()> {
        // The map entry guard must drop before awaiting the mutex.
        let lock = {
            let entry = self.locks.entry(portfolio_id).or_default();
            Arc::clone(entry.value())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_portfolio_serializes() {
        let locks = PortfolioLocks::new();
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(id)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(id)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_portfolios_do_not_block() {
        let locks = PortfolioLocks::new();
        let _guard = locks.acquire(Uuid::new_v4()).await;

        let other = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(other.is_ok());
    }
}
