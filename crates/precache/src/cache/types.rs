//! # Cache Types
//!
//! This module defines common types used across the caching system.

use std::io;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::utils::{headers_from_pairs, headers_to_pairs, vary_header_names};
use crate::request::{CachedResponse, Request};

/// Status of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Resource found in cache
    Hit,
    /// Resource not found in cache
    Miss,
}

/// Identity of a cached request: method plus URL without its fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_owned(),
            url: url.into(),
        }
    }

    /// Only `GET` requests take part in caching
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET.as_str()
    }

    /// Convert to a filename-safe string
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(":");
        hasher.update(self.url.as_bytes());

        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// One stored request/response pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub key: RequestKey,
    pub response: CachedResponse,
    /// Request headers named by the response's `Vary` header
    pub request_headers: HeaderMap,
    /// Unix seconds at which the entry was stored
    pub cached_at: u64,
}

impl CachedEntry {
    /// Capture `response` as the stored answer for `request`
    pub fn new(request: &Request, response: CachedResponse) -> Self {
        let mut request_headers = HeaderMap::new();
        if let Some(names) = vary_header_names(&response.headers) {
            for name in names {
                if let Some(value) = request.headers.get(&name) {
                    request_headers.insert(name, value.clone());
                }
            }
        }

        Self {
            key: request.key(),
            response,
            request_headers,
            cached_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    /// Whether this entry answers `request`, honouring the response's `Vary` header
    pub fn matches(&self, request: &Request) -> bool {
        if request.key() != self.key {
            return false;
        }

        match vary_header_names(&self.response.headers) {
            // `Vary: *` never matches a stored entry
            None => false,
            Some(names) => names
                .iter()
                .all(|name| request.headers.get(name) == self.request_headers.get(name)),
        }
    }

    /// Split into body bytes and serializable metadata
    pub fn into_parts(self) -> (Bytes, CacheMetadata) {
        let metadata = CacheMetadata {
            key: self.key,
            url: self.response.url.into(),
            status: self.response.status.as_u16(),
            headers: headers_to_pairs(&self.response.headers),
            request_headers: headers_to_pairs(&self.request_headers),
            cached_at: self.cached_at,
            size: self.response.body.len() as u64,
        };
        (self.response.body, metadata)
    }

    /// Rebuild an entry from stored body bytes and metadata
    pub fn from_parts(body: Bytes, metadata: CacheMetadata) -> io::Result<Self> {
        let url = Url::parse(&metadata.url)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Bad URL: {e}")))?;
        let status = StatusCode::from_u16(metadata.status)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Bad status: {e}")))?;

        Ok(Self {
            key: metadata.key,
            response: CachedResponse::new(url, status, headers_from_pairs(&metadata.headers)?, body),
            request_headers: headers_from_pairs(&metadata.request_headers)?,
            cached_at: metadata.cached_at,
        })
    }
}

/// Metadata sidecar for a cached response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub key: RequestKey,
    /// Final response URL
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub request_headers: Vec<(String, String)>,
    /// When the resource was cached
    pub cached_at: u64,
    /// Size of the cached body in bytes
    pub size: u64,
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;

/// A type representing the result of a cache lookup operation
pub type CacheLookupResult = CacheResult<Option<CachedEntry>>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn response(headers: HeaderMap) -> CachedResponse {
        CachedResponse::new(url("https://host/app.bin"), StatusCode::OK, headers, "payload")
    }

    #[test]
    fn test_key_ignores_fragment() {
        let a = RequestKey::new(Method::GET, &url("https://host/app.bin#part"));
        let b = RequestKey::new(Method::GET, &url("https://host/app.bin"));
        assert_eq!(a, b);
        assert_eq!(a.to_filename(), b.to_filename());
    }

    #[test]
    fn test_key_keeps_query_and_method() {
        let plain = RequestKey::new(Method::GET, &url("https://host/app.bin"));
        let query = RequestKey::new(Method::GET, &url("https://host/app.bin?v=2"));
        let post = RequestKey::new(Method::POST, &url("https://host/app.bin"));
        assert_ne!(plain, query);
        assert_ne!(plain, post);
        assert!(!post.is_cacheable());
    }

    #[test]
    fn test_vary_restricts_match() {
        let mut headers = HeaderMap::new();
        headers.insert("vary", HeaderValue::from_static("Accept-Encoding"));
        let stored_request =
            Request::get(url("https://host/app.bin")).with_header("Accept-Encoding", "br");
        let entry = CachedEntry::new(&stored_request, response(headers));

        let same = Request::get(url("https://host/app.bin")).with_header("Accept-Encoding", "br");
        let other =
            Request::get(url("https://host/app.bin")).with_header("Accept-Encoding", "gzip");
        let none = Request::get(url("https://host/app.bin"));

        assert!(entry.matches(&same));
        assert!(!entry.matches(&other));
        assert!(!entry.matches(&none));
    }

    #[test]
    fn test_vary_star_never_matches() {
        let mut headers = HeaderMap::new();
        headers.insert("vary", HeaderValue::from_static("*"));
        let request = Request::get(url("https://host/app.bin"));
        let entry = CachedEntry::new(&request, response(headers));

        assert!(!entry.matches(&request));
    }

    #[test]
    fn test_parts_preserve_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/wasm"));
        let request = Request::get(url("https://host/app.bin"));
        let entry = CachedEntry::new(&request, response(headers));

        let (body, metadata) = entry.clone().into_parts();
        assert_eq!(metadata.size, 7);
        let rebuilt = CachedEntry::from_parts(body, metadata).unwrap();
        assert_eq!(rebuilt, entry);
    }
}
