use std::sync::Arc;

use reqwest::StatusCode;
use url::Url;

/// Errors surfaced by the cache proxy and its storage/network backends.
///
/// Network and I/O sources are wrapped in `Arc` so the error stays `Clone`
/// and can be handed to every waiter of a shared install future.
#[derive(Debug, thiserror::Error, Clone)]
pub enum ProxyError {
    #[error("Network error: {source}")]
    Network {
        #[from]
        source: Arc<reqwest::Error>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request for {url} failed with status {status}")]
    BadStatus { url: Url, status: StatusCode },

    #[error("Response for {0} cannot be cached")]
    Uncacheable(Url),

    #[error("Invalid asset path: {0}")]
    InvalidAssetPath(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: Arc<std::io::Error>,
    },

    #[error("Invalid proxy configuration: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

// Manual implementation of From<reqwest::Error> for ProxyError
// because of the Arc wrapping.
impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Network {
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Storage {
            source: Arc::new(err),
        }
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::InvalidUrl(err.to_string())
    }
}
