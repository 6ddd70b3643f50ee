//! Request resolution strategies.
//!
//! Two algorithms consume the store and the network: cache-first for
//! precached/cache-eligible resources (serve the snapshot, refresh in the
//! background) and network-first for everything else intercepted (network
//! wins, cache is the fallback resource). Shared plumbing lives here; the
//! algorithms are in [`cache_first`] and [`network_first`].
//!
//! Cache writes on the serving path are soft: a failed put is logged and
//! the real response is still returned.

pub mod cache_first;
pub mod network_first;

use std::sync::Arc;

use offcache_client::{FetchResponse, Network};
use offcache_core::{CacheDb, CacheEntry, Error, Request};
use tokio::task::JoinHandle;
use url::Url;

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// The application-shell document served when a navigation request
    /// could not be satisfied any other way.
    Fallback,
}

/// The response handed back to the hosting application.
#[derive(Debug, Clone)]
pub struct ResolvedResponse {
    pub url: String,
    pub status: u16,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl ResolvedResponse {
    pub fn from_entry(entry: CacheEntry, source: ResponseSource) -> Self {
        Self {
            url: entry.url,
            status: entry.status,
            headers_json: entry.headers_json,
            body: entry.body,
            source,
        }
    }

    pub fn from_network(response: &FetchResponse) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            headers_json: response.headers_json(),
            body: response.body.to_vec(),
            source: ResponseSource::Network,
        }
    }
}

/// Result of resolving one intercepted request.
///
/// `revalidation` carries the detached stale-while-revalidate task when one
/// was spawned; the host is expected to keep the event alive until it
/// finishes, but the served response never waits for it.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: ResolvedResponse,
    pub revalidation: Option<JoinHandle<()>>,
}

impl FetchOutcome {
    pub fn new(response: ResolvedResponse) -> Self {
        Self { response, revalidation: None }
    }
}

/// Strategy executor sharing the store, the network, and the fallback
/// document identity.
#[derive(Clone)]
pub struct Strategies {
    store: CacheDb,
    network: Arc<dyn Network>,
    fallback_url: Url,
}

impl Strategies {
    pub fn new(store: CacheDb, network: Arc<dyn Network>, fallback_url: Url) -> Self {
        Self { store, network, fallback_url }
    }

    /// Read the entry for a request from the current generation.
    ///
    /// The read snapshot is taken before any refresh write is spawned, so
    /// a concurrent revalidation for the same key never affects what this
    /// invocation returns. Storage errors on the read path degrade to a
    /// miss (warn and continue).
    pub(crate) async fn lookup(&self, request: &Request) -> Option<CacheEntry> {
        let generation = match self.store.current_generation().await {
            Ok(Some(generation)) => generation,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache read failed; treating as miss");
                return None;
            }
        };

        match self.store.get_entry(&generation, &request.key()).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store a successful response under the request's identity.
    ///
    /// Soft-failing: quota or I/O errors must not abort an in-flight
    /// response, so they are logged and swallowed. Non-GET requests are
    /// never stored.
    pub(crate) async fn store_response(&self, request: &Request, response: &FetchResponse) {
        if !request.is_get() || !response.is_success() {
            return;
        }

        let generation = match self.store.current_generation().await {
            Ok(Some(generation)) => generation,
            Ok(None) => {
                tracing::warn!(url = %request.url, "no current generation; skipping cache write");
                return;
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache write failed");
                return;
            }
        };

        let entry = CacheEntry::new(
            &generation,
            &request.method,
            request.url.as_str(),
            response.status,
            response.headers_json(),
            response.body.to_vec(),
        );

        if let Err(e) = self.store.put_entry(&entry).await {
            tracing::warn!(url = %request.url, error = %e, "cache write failed");
        }
    }

    /// Spawn the detached stale-while-revalidate refresh for a request.
    ///
    /// Success overwrites the cache entry; any failure is swallowed with a
    /// debug log and never reaches the response already returned.
    pub(crate) fn spawn_revalidate(&self, request: Request) -> JoinHandle<()> {
        let strategies = self.clone();
        tokio::spawn(async move {
            match strategies.network.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    strategies.store_response(&request, &response).await;
                    tracing::debug!(url = %request.url, "background refresh updated cache");
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "background refresh skipped");
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "background refresh failed");
                }
            }
        })
    }

    /// Serve the fallback application-shell document from the cache.
    pub(crate) async fn fallback_document(&self) -> Result<ResolvedResponse, Error> {
        let request = Request::get(self.fallback_url.clone());
        match self.lookup(&request).await {
            Some(entry) => Ok(ResolvedResponse::from_entry(entry, ResponseSource::Fallback)),
            None => Err(Error::CacheMiss(self.fallback_url.to_string())),
        }
    }
}
