use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::network::HttpProxyConfig;

/// Name of the cache the proxy precaches into
pub const DEFAULT_CACHE_NAME: &str = "autograder";

const DEFAULT_USER_AGENT: &str = concat!("precache/", env!("CARGO_PKG_VERSION"));

const DEFAULT_SCOPE: &str = "http://localhost/";

/// How repeated asset announcements are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum AnnouncementPolicy {
    /// The first announcement arms the proxy; later ones are ignored
    #[default]
    KeepFirst,
    /// Every distinct filename gets its own install registration
    Accumulate,
}

/// Where named caches live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// In-process only, lost when the proxy exits
    Memory,
    /// Persistent storage under `root`
    File { root: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            root: std::env::temp_dir().join("precache-cache"),
        }
    }
}

/// HTTP client options for the network backend
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Overall timeout for the entire HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Idle timeout for pooled connections
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<HttpProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: NetworkConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl NetworkConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate, br"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}

/// Configuration of a [`CacheProxy`](crate::CacheProxy)
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Location of the proxy itself; announced filenames resolve against it
    pub scope: Url,

    /// Cache the announced asset is stored in
    pub cache_name: String,

    pub announcement_policy: AnnouncementPolicy,

    pub network: NetworkConfig,

    pub storage: StorageConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            scope: Url::parse(DEFAULT_SCOPE).expect("default scope is a valid URL"),
            cache_name: DEFAULT_CACHE_NAME.to_owned(),
            announcement_policy: AnnouncementPolicy::default(),
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ProxyConfig {
    pub fn builder() -> crate::builder::ProxyConfigBuilder {
        crate::builder::ProxyConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.cache_name, "autograder");
        assert_eq!(config.announcement_policy, AnnouncementPolicy::KeepFirst);
        assert_eq!(config.scope.as_str(), "http://localhost/");
        assert!(matches!(config.storage, StorageConfig::File { .. }));
        assert!(config.network.follow_redirects);
        assert!(config.network.user_agent.starts_with("precache/"));
    }
}
