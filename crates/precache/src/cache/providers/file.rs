//! # File Cache
//!
//! This module implements a file-based persistent cache provider. Each entry
//! is a body file plus a JSON metadata sidecar, both named after the SHA-256
//! of the request key.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::types::{
    CacheLookupResult, CacheMetadata, CacheResult, CachedEntry, RequestKey,
};

use super::CacheProvider;

const BODY_EXTENSION: &str = "body";
const META_EXTENSION: &str = "meta";

#[derive(Debug, Clone)]
pub struct FileCache {
    name: String,
    cache_dir: PathBuf,
    initialized: Arc<AtomicBool>,
}

impl FileCache {
    /// Create a new file cache rooted at the specified directory
    pub fn new(name: impl Into<String>, cache_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            cache_dir,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Initialize the cache directory
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        // Fast path - already initialized
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        fs::create_dir_all(&self.cache_dir).await?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Get the path for a cached body
    fn get_body_path(&self, key: &RequestKey) -> PathBuf {
        self.cache_dir
            .join(key.to_filename())
            .with_extension(BODY_EXTENSION)
    }

    /// Get the metadata path for a cached body
    fn get_metadata_path(&self, key: &RequestKey) -> PathBuf {
        self.cache_dir
            .join(key.to_filename())
            .with_extension(META_EXTENSION)
    }

    /// Remove a broken entry without blocking the caller
    fn discard_in_background(body_path: PathBuf, meta_path: PathBuf) {
        tokio::spawn(async move {
            let _ = fs::remove_file(&body_path).await;
            let _ = fs::remove_file(&meta_path).await;
        });
    }
}

#[async_trait::async_trait]
impl CacheProvider for FileCache {
    async fn contains(&self, key: &RequestKey) -> CacheResult<bool> {
        self.ensure_initialized().await?;

        let body_exists = fs::try_exists(self.get_body_path(key)).await?;
        let meta_exists = fs::try_exists(self.get_metadata_path(key)).await?;

        Ok(body_exists && meta_exists)
    }

    async fn get(&self, key: &RequestKey) -> CacheLookupResult {
        self.ensure_initialized().await?;

        let body_path = self.get_body_path(key);
        let meta_path = self.get_metadata_path(key);

        if !fs::try_exists(&body_path).await? || !fs::try_exists(&meta_path).await? {
            return Ok(None);
        }

        let metadata_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to read cache metadata file");
                return Ok(None);
            }
        };

        let metadata: CacheMetadata = match serde_json::from_slice(&metadata_bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to parse cache metadata");
                Self::discard_in_background(body_path, meta_path);
                return Ok(None);
            }
        };

        let body = match fs::read(&body_path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!(path = ?body_path, error = %e, "Failed to read cache body file");
                return Ok(None);
            }
        };

        if body.len() as u64 != metadata.size {
            warn!(
                path = ?body_path,
                expected = metadata.size,
                actual = body.len(),
                "Cache body size does not match metadata"
            );
            Self::discard_in_background(body_path, meta_path);
            return Ok(None);
        }

        match CachedEntry::from_parts(body, metadata) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Invalid cache metadata");
                Self::discard_in_background(body_path, meta_path);
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: CachedEntry) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let key = entry.key.clone();
        let body_path = self.get_body_path(&key);
        let meta_path = self.get_metadata_path(&key);

        let (body, metadata) = entry.into_parts();
        let metadata_json = serde_json::to_vec(&metadata).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize metadata: {e}"),
            )
        })?;

        // Write to temporary files first, then rename into place
        let temp_body_path = body_path.with_extension("body.tmp");
        let temp_meta_path = meta_path.with_extension("meta.tmp");

        if let Err(e) = fs::write(&temp_body_path, &body).await {
            warn!(path = ?temp_body_path, error = %e, "Failed to write cache body file");
            return Err(e);
        }

        if let Err(e) = fs::write(&temp_meta_path, &metadata_json).await {
            warn!(path = ?temp_meta_path, error = %e, "Failed to write cache metadata file");
            let _ = fs::remove_file(&temp_body_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_body_path, &body_path).await {
            warn!(
                from = ?temp_body_path,
                to = ?body_path,
                error = %e,
                "Failed to rename temporary body file"
            );
            let _ = fs::remove_file(&temp_body_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        // The metadata file is what makes an entry visible
        if let Err(e) = fs::rename(&temp_meta_path, &meta_path).await {
            warn!(
                from = ?temp_meta_path,
                to = ?meta_path,
                error = %e,
                "Failed to rename temporary metadata file"
            );
            let _ = fs::remove_file(&body_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        debug!(cache = %self.name, key = %key, size = metadata.size, "Cached entry to file");
        Ok(())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        self.ensure_initialized().await?;

        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXTENSION) {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to read cache metadata file");
                    continue;
                }
            };
            match serde_json::from_slice::<CacheMetadata>(&bytes) {
                Ok(metadata) => keys.push(metadata.key),
                Err(e) => warn!(path = ?path, error = %e, "Skipping unparsable cache metadata"),
            }
        }

        keys.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{CachedResponse, Request};
    use reqwest::StatusCode;
    use reqwest::header::{HeaderMap, HeaderValue};
    use url::Url;

    fn entry(url: &str, body: &'static str) -> CachedEntry {
        let url = Url::parse(url).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/wasm"));
        let response = CachedResponse::new(url.clone(), StatusCode::OK, headers, body);
        CachedEntry::new(&Request::get(url), response)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new("autograder", dir.path().join("autograder"));
        let e = entry("https://host/app.bin", "\0asm binary");

        cache.put(e.clone()).await.unwrap();

        assert!(cache.contains(&e.key).await.unwrap());
        assert_eq!(cache.get(&e.key).await.unwrap(), Some(e));
    }

    #[tokio::test]
    async fn test_entries_survive_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autograder");
        let e = entry("https://host/app.bin", "payload");

        FileCache::new("autograder", path.clone())
            .put(e.clone())
            .await
            .unwrap();

        let reopened = FileCache::new("autograder", path);
        assert_eq!(reopened.get(&e.key).await.unwrap(), Some(e.clone()));
        assert_eq!(reopened.keys().await.unwrap(), vec![e.key]);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new("autograder", dir.path().to_path_buf());
        let e = entry("https://host/app.bin", "payload");
        cache.put(e.clone()).await.unwrap();

        std::fs::write(cache.get_metadata_path(&e.key), b"not json").unwrap();

        assert!(cache.get(&e.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_body_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new("autograder", dir.path().to_path_buf());
        let e = entry("https://host/app.bin", "payload");
        cache.put(e.clone()).await.unwrap();

        std::fs::write(cache.get_body_path(&e.key), b"pay").unwrap();

        assert!(cache.get(&e.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new("autograder", dir.path().to_path_buf());
        let e = entry("https://host/none.bin", "");

        assert!(!cache.contains(&e.key).await.unwrap());
        assert!(cache.get(&e.key).await.unwrap().is_none());
        assert!(cache.keys().await.unwrap().is_empty());
    }
}
