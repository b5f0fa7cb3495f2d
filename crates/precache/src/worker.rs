//! # Cache Proxy
//!
//! Sits between a host, the one asset the host announces, and the network.
//! The announced asset is precached at install; every fetch is answered from
//! cache when possible and from the network otherwise. Fetches never write
//! to the cache.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheProvider, CacheStatus, CacheStorage, CachedEntry, open_storage, vary_header_names,
};
use crate::config::{AnnouncementPolicy, ProxyConfig};
use crate::error::ProxyError;
use crate::events::{
    EventOutcome, HostMessage, InstallOutcome, Lifecycle, MessageOutcome, PrecacheTarget,
    ProxyEvent,
};
use crate::network::{HttpNetwork, Network};
use crate::request::{CachedResponse, Request};

pub struct CacheProxy {
    config: Arc<ProxyConfig>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    /// Install registrations, in announcement order
    registrations: Mutex<Vec<PrecacheTarget>>,
}

impl CacheProxy {
    pub fn new(
        config: ProxyConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            network,
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Build a proxy with the storage and HTTP backends described by `config`
    pub async fn from_config(config: ProxyConfig) -> Result<Self, ProxyError> {
        let storage = open_storage(&config.storage).await?;
        let network = Arc::new(HttpNetwork::from_config(&config.network)?);
        Ok(Self::new(config, storage, network))
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.registrations.lock().is_empty() {
            Lifecycle::Uninitialized
        } else {
            Lifecycle::Armed
        }
    }

    /// Filenames registered for precaching, in announcement order
    pub fn registered_targets(&self) -> Vec<PrecacheTarget> {
        self.registrations.lock().clone()
    }

    /// Handle a message posted by the host.
    ///
    /// Only asset announcements register anything; every other payload is
    /// ignored without touching the cache.
    pub fn on_message(&self, payload: &Value) -> MessageOutcome {
        let Some(HostMessage::AssetFilename { filename }) = HostMessage::parse(payload) else {
            debug!(payload = %payload, "Ignoring message");
            return MessageOutcome::Ignored;
        };

        let mut registrations = self.registrations.lock();
        let declined = match self.config.announcement_policy {
            AnnouncementPolicy::KeepFirst => !registrations.is_empty(),
            AnnouncementPolicy::Accumulate => registrations.iter().any(|t| t.filename == filename),
        };
        if declined {
            debug!(
                filename = %filename,
                policy = ?self.config.announcement_policy,
                "Announcement declined, proxy already armed"
            );
            return MessageOutcome::AlreadyArmed;
        }

        let target = PrecacheTarget::new(filename);
        registrations.push(target.clone());
        info!(path = %target.relative_path(), "Registered install handler");

        MessageOutcome::Armed { target }
    }

    /// Run the install phase: precache every registered asset.
    ///
    /// The first failure aborts the install and is returned unchanged; there
    /// is no retry.
    pub async fn install(&self) -> Result<InstallOutcome, ProxyError> {
        let targets = self.registered_targets();
        if targets.is_empty() {
            debug!("No asset announced, nothing to precache");
            return Ok(InstallOutcome::NothingToPrecache);
        }

        let cache = self.storage.open(&self.config.cache_name).await?;

        let mut precached = Vec::with_capacity(targets.len());
        for target in &targets {
            let result = match target.resolve(&self.config.scope) {
                Ok(url) => self
                    .add(cache.as_ref(), Request::get(url.clone()))
                    .await
                    .map(|()| url),
                Err(e) => Err(e),
            };

            match result {
                Ok(url) => precached.push(url),
                Err(e) => {
                    warn!(
                        path = %target.relative_path(),
                        cache = %self.config.cache_name,
                        error = %e,
                        "Precache failed, install aborted"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            cache = %self.config.cache_name,
            count = precached.len(),
            "Install complete"
        );
        Ok(InstallOutcome::Precached(precached))
    }

    /// Fetch and store `request`; nothing is stored unless the response is usable
    async fn add(&self, cache: &dyn CacheProvider, request: Request) -> Result<(), ProxyError> {
        let response = self.network.fetch(&request).await?;

        if !response.is_ok() {
            return Err(ProxyError::BadStatus {
                url: request.url,
                status: response.status,
            });
        }
        if vary_header_names(&response.headers).is_none() {
            return Err(ProxyError::Uncacheable(request.url));
        }

        cache.put(CachedEntry::new(&request, response)).await?;
        Ok(())
    }

    /// Answer an intercepted request from cache, or from the network on a miss
    pub async fn fetch(&self, request: Request) -> Result<CachedResponse, ProxyError> {
        self.fetch_with_status(request)
            .await
            .map(|(response, _)| response)
    }

    /// Like [`fetch`](Self::fetch), also reporting whether the cache answered
    pub async fn fetch_with_status(
        &self,
        request: Request,
    ) -> Result<(CachedResponse, CacheStatus), ProxyError> {
        if let Some(entry) = self.storage.match_request(&request).await? {
            debug!(url = %request.url, status = ?CacheStatus::Hit, "Served from cache");
            return Ok((entry.response, CacheStatus::Hit));
        }

        debug!(url = %request.url, status = ?CacheStatus::Miss, "Falling through to network");
        let response = self.network.fetch(&request).await?;
        Ok((response, CacheStatus::Miss))
    }

    /// [`install`](Self::install), abandoned with `Cancelled` once `token` fires
    pub async fn install_with_cancel(
        &self,
        token: &CancellationToken,
    ) -> Result<InstallOutcome, ProxyError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ProxyError::Cancelled),
            result = self.install() => result,
        }
    }

    /// [`fetch`](Self::fetch), abandoned with `Cancelled` once `token` fires
    pub async fn fetch_with_cancel(
        &self,
        request: Request,
        token: &CancellationToken,
    ) -> Result<CachedResponse, ProxyError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ProxyError::Cancelled),
            result = self.fetch(request) => result,
        }
    }

    /// Handle one host event; the returned future is the event's pending completion
    pub fn dispatch(&self, event: ProxyEvent) -> BoxFuture<'_, Result<EventOutcome, ProxyError>> {
        async move {
            match event {
                ProxyEvent::MessageReceived(payload) => {
                    Ok(EventOutcome::Message(self.on_message(&payload)))
                }
                ProxyEvent::InstallRequested => self.install().await.map(EventOutcome::Installed),
                ProxyEvent::FetchRequested(request) => {
                    self.fetch(request).await.map(EventOutcome::Response)
                }
            }
        }
        .boxed()
    }

    /// Run `event` on the tokio runtime, detached from the caller
    pub fn spawn_event(
        self: &Arc<Self>,
        event: ProxyEvent,
    ) -> tokio::task::JoinHandle<Result<EventOutcome, ProxyError>> {
        let proxy = Arc::clone(self);
        tokio::spawn(async move { proxy.dispatch(event).await })
    }
}
