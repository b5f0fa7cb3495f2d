//! # Cache Provider
//!
//! This module defines the cache provider trait that all cache implementations must follow.

use async_trait::async_trait;

use crate::cache::types::{CacheLookupResult, CacheResult, CachedEntry, RequestKey};

/// A single named cache that can store and retrieve request/response pairs.
///
/// Providers are append-only from the proxy's point of view: there is no
/// removal or eviction API.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Check if the cache contains an entry for the given key
    async fn contains(&self, key: &RequestKey) -> CacheResult<bool>;

    /// Get an entry from the cache
    async fn get(&self, key: &RequestKey) -> CacheLookupResult;

    /// Put an entry into the cache, replacing any entry with the same key
    async fn put(&self, entry: CachedEntry) -> CacheResult<()>;

    /// All keys currently stored
    async fn keys(&self) -> CacheResult<Vec<RequestKey>>;
}
