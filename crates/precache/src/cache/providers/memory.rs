//! # Memory Cache Provider
//!
//! This module provides an in-memory cache implementation using Moka caching.

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::cache::providers::CacheProvider;
use crate::cache::types::{CacheLookupResult, CacheResult, CachedEntry, RequestKey};

/// Memory cache provider implementation using Moka.
///
/// The cache has no capacity bound and no TTL, so nothing is ever evicted.
#[derive(Clone)]
pub struct MemoryCache {
    name: String,
    cache: MokaCache<RequestKey, CachedEntry>,
}

impl MemoryCache {
    /// Create a new, empty memory cache
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let cache = MokaCache::builder().build();

        debug!(cache = %name, "Memory cache created");

        Self { name, cache }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait::async_trait]
impl CacheProvider for MemoryCache {
    async fn contains(&self, key: &RequestKey) -> CacheResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn get(&self, key: &RequestKey) -> CacheLookupResult {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, entry: CachedEntry) -> CacheResult<()> {
        debug!(
            cache = %self.name,
            key = %entry.key,
            size = entry.response.body.len(),
            "Added entry to memory cache"
        );
        self.cache.insert(entry.key.clone(), entry).await;
        Ok(())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        let mut keys: Vec<RequestKey> = self.cache.iter().map(|(k, _)| (*k).clone()).collect();
        keys.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{CachedResponse, Request};
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use url::Url;

    #[inline]
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer() // Write to test output
            .try_init();
    }

    // Helper to create a stored entry for a URL
    fn entry(url: &str, body: &str) -> CachedEntry {
        let url = Url::parse(url).unwrap();
        let request = Request::get(url.clone());
        let response = CachedResponse::new(url, StatusCode::OK, HeaderMap::new(), body.to_string());
        CachedEntry::new(&request, response)
    }

    #[tokio::test]
    async fn test_put_get_hit() {
        init_tracing();
        let cache = MemoryCache::new("autograder");
        let e = entry("https://host/app.bin", "hello");

        cache.put(e.clone()).await.unwrap();

        let result = cache.get(&e.key).await.unwrap();
        assert_eq!(result, Some(e));
    }

    #[tokio::test]
    async fn test_get_miss() {
        let cache = MemoryCache::new("autograder");
        let e = entry("https://host/none.bin", "");
        assert!(cache.get(&e.key).await.unwrap().is_none());
        assert!(!cache.contains(&e.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let cache = MemoryCache::new("autograder");
        let first = entry("https://host/app.bin", "one");
        let second = entry("https://host/app.bin", "two");

        cache.put(first).await.unwrap();
        cache.put(second.clone()).await.unwrap();

        let stored = cache.get(&second.key).await.unwrap().unwrap();
        assert_eq!(stored.response.body, "two");
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keys_sorted_by_url() {
        let cache = MemoryCache::new("autograder");
        cache.put(entry("https://host/b.bin", "b")).await.unwrap();
        cache.put(entry("https://host/a.bin", "a")).await.unwrap();

        let urls: Vec<String> = cache.keys().await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(urls, vec!["https://host/a.bin", "https://host/b.bin"]);
    }
}
