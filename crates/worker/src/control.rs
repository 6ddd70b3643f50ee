//! Control channel between the hosting application and the worker.
//!
//! Request/reply over an asynchronous channel: messages arrive as JSON
//! envelopes, replies (where the message type mandates one) go back over a
//! oneshot channel. Malformed messages never crash the control surface;
//! they are logged and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use offcache_client::Network;
use offcache_core::url::resolve;
use offcache_core::{CacheDb, CacheEntry, Request};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

/// Recognized control messages.
///
/// Wire format: `{"type": "...", "urls"?: [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate a freshly installed generation without waiting for old
    /// clients to close. No reply.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Add the given URLs to the current generation, best-effort,
    /// fire-and-forget.
    #[serde(rename = "CACHE_URLS")]
    CacheUrls { urls: Vec<String> },

    /// Delete every entry of the current generation. Always replies
    /// `{"success": true}`, even when there was nothing to delete.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,

    /// Reply with the current cache version. No side effects.
    #[serde(rename = "GET_VERSION")]
    GetVersion,
}

/// Replies for the message types that mandate one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlReply {
    Success { success: bool },
    Version { version: String },
}

/// One inbound message plus its optional reply channel.
#[derive(Debug)]
pub struct ControlEnvelope {
    pub message: serde_json::Value,
    pub reply: Option<oneshot::Sender<ControlReply>>,
}

/// Handles control messages against the store and lifecycle flags.
pub struct ControlChannel {
    store: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    /// Version reported before any generation has been activated.
    configured_version: String,
    skip_waiting: Arc<AtomicBool>,
}

impl ControlChannel {
    pub fn new(
        store: CacheDb,
        network: Arc<dyn Network>,
        origin: Url,
        configured_version: String,
        skip_waiting: Arc<AtomicBool>,
    ) -> Self {
        Self { store, network, origin, configured_version, skip_waiting }
    }

    /// Process one envelope.
    ///
    /// Returns the handle of any background work the message kicked off
    /// (only CACHE_URLS spawns one); the host may await it or let it run
    /// detached.
    pub async fn handle(&self, envelope: ControlEnvelope) -> Option<JoinHandle<()>> {
        let message: ControlMessage = match serde_json::from_value(envelope.message) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed control message");
                return None;
            }
        };

        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::debug!("skip waiting requested");
                None
            }

            ControlMessage::CacheUrls { urls } => Some(self.cache_urls(urls)),

            ControlMessage::ClearCache => {
                let Some(reply) = envelope.reply else {
                    tracing::warn!("CLEAR_CACHE without reply channel; ignoring");
                    return None;
                };

                match self.store.current_generation().await {
                    Ok(Some(generation)) => match self.store.clear_generation(&generation).await {
                        Ok(deleted) => tracing::info!(%generation, deleted, "cache cleared"),
                        Err(e) => tracing::warn!(%generation, error = %e, "cache clear failed"),
                    },
                    Ok(None) => tracing::debug!("cache clear requested with no current generation"),
                    Err(e) => tracing::warn!(error = %e, "cache clear failed"),
                }

                // The contract is an unconditional acknowledgement once the
                // attempt completes, no-op included.
                let _ = reply.send(ControlReply::Success { success: true });
                None
            }

            ControlMessage::GetVersion => {
                let Some(reply) = envelope.reply else {
                    tracing::warn!("GET_VERSION without reply channel; ignoring");
                    return None;
                };

                let version = match self.store.current_generation().await {
                    Ok(Some(generation)) => generation,
                    Ok(None) => self.configured_version.clone(),
                    Err(e) => {
                        tracing::warn!(error = %e, "version lookup failed");
                        self.configured_version.clone()
                    }
                };

                let _ = reply.send(ControlReply::Version { version });
                None
            }
        }
    }

    /// Best-effort bulk caching into the current generation.
    fn cache_urls(&self, urls: Vec<String>) -> JoinHandle<()> {
        let store = self.store.clone();
        let network = Arc::clone(&self.network);
        let origin = self.origin.clone();

        tokio::spawn(async move {
            let generation = match store.current_generation().await {
                Ok(Some(generation)) => generation,
                Ok(None) => {
                    tracing::warn!("CACHE_URLS with no current generation; dropping");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "CACHE_URLS store lookup failed");
                    return;
                }
            };

            for raw in urls {
                let url = match resolve(&origin, &raw) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(url = %raw, error = %e, "skipping uncacheable URL");
                        continue;
                    }
                };

                let request = Request::get(url.clone());
                match network.fetch(&request).await {
                    Ok(response) if response.is_success() => {
                        let entry = CacheEntry::new(
                            &generation,
                            "GET",
                            url.as_str(),
                            response.status,
                            response.headers_json(),
                            response.body.to_vec(),
                        );
                        if let Err(e) = store.put_entry(&entry).await {
                            tracing::warn!(%url, error = %e, "cache write failed");
                        }
                    }
                    Ok(response) => {
                        tracing::debug!(%url, status = response.status, "not caching non-2xx response");
                    }
                    Err(e) => {
                        tracing::debug!(%url, error = %e, "CACHE_URLS fetch failed");
                    }
                }
            }
        })
    }
}
