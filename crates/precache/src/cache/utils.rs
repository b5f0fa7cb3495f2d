//! # Cache Utilities
//!
//! Common utility functions for cache operations.

use std::io;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, VARY};

/// Header names listed in a response's `Vary` header.
///
/// Returns `None` for `Vary: *`, which matches no request at all.
pub fn vary_header_names(headers: &HeaderMap) -> Option<Vec<HeaderName>> {
    let mut names = Vec::new();
    for value in headers.get_all(VARY) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "*" {
                return None;
            }
            if let Ok(name) = part.parse::<HeaderName>() {
                names.push(name);
            }
        }
    }
    Some(names)
}

/// Flatten a header map into name/value string pairs, dropping non-UTF-8 values
pub fn headers_to_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect()
}

/// Rebuild a header map from stored pairs
pub fn headers_from_pairs(pairs: &[(String, String)]) -> io::Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        headers.append(name, value);
    }
    Ok(headers)
}
