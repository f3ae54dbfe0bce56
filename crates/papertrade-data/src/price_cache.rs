//! Short-lived price caching.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use papertrade_core::error::DataError;
use papertrade_core::traits::PriceSource;

/// A cached quote with its fetch instant.
#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: Decimal,
    fetched_at: DateTime<Utc>,
}

/// Concurrent price cache with a fixed TTL.
///
/// Entries past their TTL are treated as absent; the map is only
/// pruned on lookup, so memory use tracks the distinct symbol set.
pub struct PriceCache {
    entries: DashMap<String, CachedPrice>,
    ttl: Duration,
}

impl PriceCache {
    /// Create a cache whose entries expire after `ttl_seconds`.
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Get a fresh cached price, if any.
    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        let entry = self.entries.get(symbol)?;
        if Utc::now() - entry.fetched_at > self.ttl {
            drop(entry);
            self.entries.remove(symbol);
            return None;
        }
        Some(entry.price)
    }

    /// Store a price for a symbol.
    pub fn put(&self, symbol: &str, price: Decimal) {
        self.entries.insert(
            symbol.to_string(),
            CachedPrice {
                price,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Drop a cached symbol.
    pub fn invalidate(&self, symbol: &str) {
        self.entries.remove(symbol);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached symbols, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A price source wrapper that serves from a [`PriceCache`] before
/// hitting the inner source.
pub struct CachingPriceSource {
    inner: Arc<dyn PriceSource>,
    cache: Arc<PriceCache>,
}

impl CachingPriceSource {
    pub fn new(inner: Arc<dyn PriceSource>, cache: Arc<PriceCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl PriceSource for CachingPriceSource {
    async fn price(&self, symbol: &str) -> Result<Decimal, DataError> {
        if let Some(price) = self.cache.get(symbol) {
            debug!(symbol, %price, "price cache hit");
            return Ok(price);
        }
        let price = self.inner.price(symbol).await?;
        self.cache.put(symbol, price);
        Ok(price)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
