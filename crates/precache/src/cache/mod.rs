//! # Cache System
//!
//! Named caches of request/response pairs. A [`CacheStorage`] hands out
//! [`CacheProvider`]s by name and answers lookups across all of them.

// Module declarations
pub mod providers;
mod storage;
mod types;
mod utils;

// Re-export primary types from our various modules
pub use storage::{CacheStorage, FileStorage, MemoryStorage, open_storage};
pub use types::{
    CacheLookupResult, CacheMetadata, CacheResult, CacheStatus, CachedEntry, RequestKey,
};
pub use utils::vary_header_names;

pub use providers::{CacheProvider, FileCache, MemoryCache};
