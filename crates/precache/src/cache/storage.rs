//! # Cache Storage
//!
//! The set of named caches. `open` creates a cache on first use; lookups
//! through [`CacheStorage::match_request`] search every existing cache in
//! creation order without creating anything.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io;
use tracing::{debug, info};

use crate::cache::providers::{CacheProvider, FileCache, MemoryCache};
use crate::cache::types::{CacheLookupResult, CacheResult};
use crate::config::StorageConfig;
use crate::request::Request;

const INDEX_FILE: &str = "index.json";

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the named cache, creating it if absent
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheProvider>>;

    /// Get the named cache only if it already exists
    async fn lookup(&self, name: &str) -> CacheResult<Option<Arc<dyn CacheProvider>>>;

    /// Names of all existing caches, in creation order
    async fn names(&self) -> CacheResult<Vec<String>>;

    /// Find a stored response for `request` in any cache
    async fn match_request(&self, request: &Request) -> CacheLookupResult {
        let key = request.key();
        if !key.is_cacheable() {
            return Ok(None);
        }

        for name in self.names().await? {
            let Some(cache) = self.lookup(&name).await? else {
                continue;
            };
            match cache.get(&key).await? {
                Some(entry) if entry.matches(request) => {
                    debug!(cache = %name, key = %key, "Cache hit");
                    return Ok(Some(entry));
                }
                _ => {}
            }
        }

        Ok(None)
    }
}

/// Build the storage backend described by `config`
pub async fn open_storage(config: &StorageConfig) -> CacheResult<Arc<dyn CacheStorage>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageConfig::File { root } => Ok(Arc::new(FileStorage::open_root(root.clone()).await?)),
    }
}

/// Process-local storage; caches vanish with the process
#[derive(Default)]
pub struct MemoryStorage {
    caches: parking_lot::Mutex<Vec<(String, Arc<MemoryCache>)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheProvider>> {
        let mut caches = self.caches.lock();
        if let Some((_, cache)) = caches.iter().find(|(n, _)| n == name) {
            return Ok(cache.clone() as Arc<dyn CacheProvider>);
        }

        let cache = Arc::new(MemoryCache::new(name));
        caches.push((name.to_owned(), cache.clone()));
        Ok(cache)
    }

    async fn lookup(&self, name: &str) -> CacheResult<Option<Arc<dyn CacheProvider>>> {
        Ok(self
            .caches
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cache)| cache.clone() as Arc<dyn CacheProvider>))
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        Ok(self.caches.lock().iter().map(|(n, _)| n.clone()).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    name: String,
    dir: String,
}

/// On-disk storage: one directory per cache plus an index of cache names
pub struct FileStorage {
    root: PathBuf,
    state: tokio::sync::Mutex<FileStorageState>,
}

#[derive(Default)]
struct FileStorageState {
    index: Vec<IndexEntry>,
    opened: HashMap<String, Arc<FileCache>>,
}

impl FileStorage {
    /// Open (creating if needed) the storage root and load its index
    pub async fn open_root(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root).await?;

        let index_path = root.join(INDEX_FILE);
        let index = if fs::try_exists(&index_path).await? {
            let bytes = fs::read(&index_path).await?;
            serde_json::from_slice(&bytes).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Failed to parse cache index {}: {e}", index_path.display()),
                )
            })?
        } else {
            Vec::new()
        };

        info!(root = %root.display(), caches = index.len(), "Opened file cache storage");

        Ok(Self {
            root,
            state: tokio::sync::Mutex::new(FileStorageState {
                index,
                opened: HashMap::new(),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(name: &str) -> String {
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(name.as_bytes());
        hex::encode(&digest[..8])
    }

    async fn write_index(&self, index: &[IndexEntry]) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(index).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize cache index: {e}"),
            )
        })?;
        let path = self.root.join(INDEX_FILE);
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).await?;
        fs::rename(&temp, &path).await
    }

    fn cache_for(&self, state: &mut FileStorageState, entry: &IndexEntry) -> Arc<FileCache> {
        state
            .opened
            .entry(entry.name.clone())
            .or_insert_with(|| {
                Arc::new(FileCache::new(entry.name.clone(), self.root.join(&entry.dir)))
            })
            .clone()
    }
}

#[async_trait]
impl CacheStorage for FileStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheProvider>> {
        let mut state = self.state.lock().await;

        let existing = state.index.iter().find(|e| e.name == name).cloned();
        let entry = match existing {
            Some(entry) => entry,
            None => {
                let entry = IndexEntry {
                    name: name.to_owned(),
                    dir: Self::dir_for(name),
                };
                let mut index = state.index.clone();
                index.push(entry.clone());
                self.write_index(&index).await?;
                state.index = index;
                debug!(cache = %name, dir = %entry.dir, "Created file cache");
                entry
            }
        };

        let cache = self.cache_for(&mut state, &entry);
        cache.ensure_initialized().await?;
        Ok(cache)
    }

    async fn lookup(&self, name: &str) -> CacheResult<Option<Arc<dyn CacheProvider>>> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.index.iter().find(|e| e.name == name).cloned() else {
            return Ok(None);
        };
        Ok(Some(self.cache_for(&mut state, &entry) as Arc<dyn CacheProvider>))
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state.index.iter().map(|e| e.name.clone()).collect())
    }
}
