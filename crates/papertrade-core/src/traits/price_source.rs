//! Price source trait definition.

use crate::error::DataError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for current-price providers.
///
/// Implementations may be a static lookup table, a cache, or a live
/// quote service; latency and failure are outside engine control, so the
/// executor never holds a portfolio lock across a price fetch.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current trade-able price for a symbol.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to price
    ///
    /// # Returns
    /// The current price, or a `DataError` when the source cannot serve it
    async fn price(&self, symbol: &str) -> Result<Decimal, DataError>;

    /// Get the source name.
    fn name(&self) -> &str;
}
