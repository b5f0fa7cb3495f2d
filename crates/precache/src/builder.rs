//! # Builder for ProxyConfig
//!
//! This module provides a builder pattern implementation for creating and customizing
//! ProxyConfig instances with a fluent API.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use precache_engine::{AnnouncementPolicy, ProxyConfig, StorageConfig};
//! use url::Url;
//!
//! let config = ProxyConfig::builder()
//!     .with_scope(Url::parse("https://grader.example.com/app/sw.js").unwrap())
//!     .with_cache_name("autograder")
//!     .with_announcement_policy(AnnouncementPolicy::KeepFirst)
//!     .with_storage(StorageConfig::Memory)
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("MyApp/1.0")
//!     .build();
//!
//! assert_eq!(config.cache_name, "autograder");
//! ```

use std::time::Duration;

use reqwest::header::HeaderValue;
use url::Url;

use crate::config::{AnnouncementPolicy, ProxyConfig, StorageConfig};
use crate::network::HttpProxyConfig;

/// Builder for creating ProxyConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct ProxyConfigBuilder {
    /// Internal config being built
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProxyConfig::default(),
        }
    }

    /// Set the location relative asset paths resolve against
    pub fn with_scope(mut self, scope: Url) -> Self {
        self.config.scope = scope;
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache_name = name.into();
        self
    }

    pub fn with_announcement_policy(mut self, policy: AnnouncementPolicy) -> Self {
        self.config.announcement_policy = policy;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.network.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.network.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.network.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.network.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.network.headers.insert(name, value);
        }
        self
    }

    /// Set an explicit HTTP/SOCKS proxy for outgoing requests
    pub fn with_proxy(mut self, proxy: HttpProxyConfig) -> Self {
        self.config.network.proxy = Some(proxy);
        self
    }

    /// Set whether system proxy settings are honoured when no explicit proxy is set
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.network.use_system_proxy = use_system_proxy;
        self
    }

    pub fn build(self) -> ProxyConfig {
        self.config
    }
}

impl Default for ProxyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = ProxyConfigBuilder::new()
            .with_scope(Url::parse("https://host/app/sw.js").unwrap())
            .with_cache_name("other")
            .with_announcement_policy(AnnouncementPolicy::Accumulate)
            .with_storage(StorageConfig::Memory)
            .with_header("X-Grader", "1")
            .with_header("bad header", "ignored")
            .with_system_proxy(false)
            .build();

        assert_eq!(config.scope.as_str(), "https://host/app/sw.js");
        assert_eq!(config.cache_name, "other");
        assert_eq!(config.announcement_policy, AnnouncementPolicy::Accumulate);
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.network.headers["x-grader"], "1");
        assert!(!config.network.use_system_proxy);
    }
}
