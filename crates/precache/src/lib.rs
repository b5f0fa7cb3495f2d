//! # Precache
//!
//! A cache-then-network fetch proxy. A host announces one asset by filename,
//! the proxy precaches it during install, and every later request is served
//! from cache when a stored entry matches and from the network otherwise.
//!
//! ## Features
//!
//! - Message-driven arming with a configurable policy for repeated announcements
//! - Pluggable cache storage (in-memory via Moka, or persistent on disk)
//! - Pluggable network backend (reqwest with rustls by default)
//! - Optional cancellation of install and fetch via `CancellationToken`

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod request;
pub mod worker;

pub use builder::ProxyConfigBuilder;
pub use cache::{CacheStorage, CacheStatus, FileStorage, MemoryStorage};
pub use config::{
    AnnouncementPolicy, DEFAULT_CACHE_NAME, NetworkConfig, ProxyConfig, StorageConfig,
};
pub use error::ProxyError;
pub use events::{
    ASSET_FILENAME_MESSAGE, EventOutcome, HostMessage, InstallOutcome, Lifecycle, MessageOutcome,
    PrecacheTarget, ProxyEvent,
};
pub use network::{HttpNetwork, HttpProxyConfig, Network, create_client};
pub use request::{CachedResponse, Request};
pub use worker::CacheProxy;

pub use tokio_util::sync::CancellationToken;
