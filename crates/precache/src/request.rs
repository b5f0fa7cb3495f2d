//! # Requests and responses
//!
//! Host-independent request/response values that flow through the proxy.
//! Responses carry the full body so a cached copy can be handed out any
//! number of times.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::cache::RequestKey;

/// An intercepted (or synthesised) outgoing request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// A plain `GET` for `url`
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Add a header, silently skipping names or values that are not valid HTTP
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Identity used to key this request in a cache
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.clone(), &self.url)
    }
}

/// A fully buffered response, either fresh from the network or from cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Final URL of the response
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status,
            headers,
            body: body.into(),
        }
    }

    /// Whether the status is in the 200-299 range
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_header_skips_invalid_names() {
        let url = Url::parse("https://example.com/a").unwrap();
        let request = Request::get(url)
            .with_header("Accept", "application/wasm")
            .with_header("bad header", "x");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers["accept"], "application/wasm");
    }

    #[test]
    fn test_response_is_ok() {
        let url = Url::parse("https://example.com/a").unwrap();
        let ok = CachedResponse::new(url.clone(), StatusCode::OK, HeaderMap::new(), "x");
        let missing = CachedResponse::new(url, StatusCode::NOT_FOUND, HeaderMap::new(), "");

        assert!(ok.is_ok());
        assert!(!missing.is_ok());
    }
}
