//! # Proxy events
//!
//! The three things a host can ask of the proxy, and what comes back.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ProxyError;
use crate::request::{CachedResponse, Request};

/// Discriminator of the message announcing the asset to precache
pub const ASSET_FILENAME_MESSAGE: &str = "WASM_FILENAME";

/// Messages a host posts to the proxy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "WASM_FILENAME")]
    AssetFilename { filename: String },
    #[serde(other)]
    Other,
}

impl HostMessage {
    /// Parse a raw payload; anything malformed yields `None`
    pub fn parse(payload: &Value) -> Option<Self> {
        HostMessage::deserialize(payload).ok()
    }

    /// Build the payload announcing `filename`
    pub fn announcement(filename: &str) -> Value {
        serde_json::json!({
            "type": ASSET_FILENAME_MESSAGE,
            "filename": filename,
        })
    }
}

/// An asset registered for precaching by an announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheTarget {
    pub filename: String,
}

impl PrecacheTarget {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    /// Path relative to the proxy's own location
    pub fn relative_path(&self) -> String {
        format!("./{}", self.filename)
    }

    /// Resolve against `scope` to the absolute URL that gets precached
    pub fn resolve(&self, scope: &Url) -> Result<Url, ProxyError> {
        let url = scope.join(&self.relative_path()).map_err(|e| {
            ProxyError::InvalidAssetPath(format!("{}: {e}", self.relative_path()))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ProxyError::InvalidAssetPath(format!(
                "{} resolves to unsupported scheme {scheme}",
                self.relative_path()
            ))),
        }
    }
}

/// Lifecycle of a proxy; there is no way back to `Uninitialized`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No install handler registered
    Uninitialized,
    /// At least one install handler registered
    Armed,
}

/// Events delivered by the host
#[derive(Debug, Clone)]
pub enum ProxyEvent {
    MessageReceived(Value),
    InstallRequested,
    FetchRequested(Request),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Not an asset announcement (or malformed); nothing happened
    Ignored,
    /// An install handler was registered for `target`
    Armed { target: PrecacheTarget },
    /// Valid announcement that the announcement policy declined
    AlreadyArmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// No announcement was received; install has nothing to do
    NothingToPrecache,
    /// URLs stored in the cache, in announcement order
    Precached(Vec<Url>),
}

/// Result of handling one [`ProxyEvent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Message(MessageOutcome),
    Installed(InstallOutcome),
    Response(CachedResponse),
}
