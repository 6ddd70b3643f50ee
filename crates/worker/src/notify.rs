//! Background-sync and push-notification triggers.
//!
//! Ancillary entry points outside the request-resolution hot path. The
//! sync trigger is the one place failures propagate instead of being
//! recovered locally: the host platform's scheduler owns the retry.

use std::sync::Arc;

use offcache_client::Network;
use offcache_core::url::resolve;
use offcache_core::{Error, Request};
use serde::{Deserialize, Serialize};
use url::Url;

/// A user-facing notification produced from a push payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Navigation target for a click on the notification.
    pub url: String,
}

/// Push payload wire format: all fields optional.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    url: Option<String>,
}

/// Handles sync and push triggers against the network and config defaults.
pub struct NotificationBridge {
    network: Arc<dyn Network>,
    origin: Url,
    sync_tag: String,
    sync_url: String,
    default_title: String,
    default_body: String,
}

impl NotificationBridge {
    pub fn new(
        network: Arc<dyn Network>,
        origin: Url,
        sync_tag: String,
        sync_url: String,
        default_title: String,
        default_body: String,
    ) -> Self {
        Self { network, origin, sync_tag, sync_url, default_title, default_body }
    }

    /// Run the data-sync routine for a recognized tag.
    ///
    /// Failures propagate so the external scheduler can reschedule a
    /// retry; tags this worker does not own are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Result<(), Error> {
        if tag != self.sync_tag {
            tracing::debug!(tag, "ignoring unrecognized sync tag");
            return Ok(());
        }

        let url = resolve(&self.origin, &self.sync_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = self.network.fetch(&Request::get(url)).await?;

        if !response.is_success() {
            return Err(Error::Network(format!("sync failed with status {}", response.status)));
        }

        tracing::info!(tag, "data sync complete");
        Ok(())
    }

    /// Turn a push payload into a notification, defaulting absent fields.
    ///
    /// An unparseable payload is treated as empty rather than dropped; the
    /// user still sees the default notification.
    pub fn handle_push(&self, payload: &[u8]) -> Notification {
        let parsed: PushPayload = serde_json::from_slice(payload).unwrap_or_default();

        Notification {
            title: parsed.title.unwrap_or_else(|| self.default_title.clone()),
            body: parsed.body.unwrap_or_else(|| self.default_body.clone()),
            url: parsed.url.unwrap_or_else(|| "/".to_string()),
        }
    }

    /// Resolve the navigation target carried by a clicked notification.
    pub fn handle_notification_click(&self, notification: &Notification) -> Result<Url, Error> {
        resolve(&self.origin, &notification.url).map_err(|e| Error::InvalidUrl(e.to_string()))
    }
}
