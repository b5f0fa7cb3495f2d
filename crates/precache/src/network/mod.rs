//! # Network
//!
//! The proxy reaches the network only through [`Network`], so hosts and
//! tests can substitute their own transport.

mod client;
mod proxy;

use async_trait::async_trait;

use crate::error::ProxyError;
use crate::request::{CachedResponse, Request};

pub use client::{HttpNetwork, create_client};
pub use proxy::{HttpProxyConfig, ProxyAuth, ProxyType, build_proxy_from_config};

#[async_trait]
pub trait Network: Send + Sync {
    /// Perform `request` and buffer the whole response.
    ///
    /// Any status code is a successful fetch; only transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, ProxyError>;
}
