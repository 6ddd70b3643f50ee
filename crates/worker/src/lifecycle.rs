//! Install/activate lifecycle for cache generations.
//!
//! State machine: Installing -> Installed -> Activating -> Activated, with
//! Redundant as the terminal state of an instance superseded before it ever
//! activated. Install populates a fresh generation with the whole precache
//! manifest atomically; activation promotes it and garbage-collects every
//! other generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use offcache_client::Network;
use offcache_core::{CacheDb, CacheEntry, Error, PrecacheManifest, Request};
use url::Url;

/// Lifecycle state of this worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Activated,
    /// Terminal: a newer install superseded this instance before it
    /// reached Activated.
    Redundant,
}

/// Owns the CacheVersion transition for one worker instance.
///
/// Strategies and the control channel receive the version through this
/// controller instead of reading process-wide state.
pub struct LifecycleController {
    store: CacheDb,
    network: Arc<dyn Network>,
    version: String,
    origin: Url,
    state: LifecycleState,
    skip_waiting: Arc<AtomicBool>,
}

impl LifecycleController {
    pub fn new(
        store: CacheDb,
        network: Arc<dyn Network>,
        version: String,
        origin: Url,
        skip_waiting: bool,
    ) -> Self {
        Self {
            store,
            network,
            version,
            origin,
            state: LifecycleState::Installing,
            skip_waiting: Arc::new(AtomicBool::new(skip_waiting)),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Shared flag the control channel flips on SKIP_WAITING.
    pub fn skip_waiting_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.skip_waiting)
    }

    /// Whether a waiting generation should activate without waiting for
    /// existing clients to close.
    pub fn should_activate_immediately(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Populate a fresh generation with every manifest entry.
    ///
    /// All-or-nothing: the first entry that fails to fetch or store aborts
    /// the install, the partial generation is deleted, and whatever was
    /// current stays current and untouched.
    pub async fn install(&mut self, manifest: &PrecacheManifest) -> Result<(), Error> {
        self.state = LifecycleState::Installing;

        // Reinstalling the live version would tear down the serving
        // generation before repopulating it; its content is already there,
        // so leave it alone.
        if self.store.current_generation().await?.as_deref() == Some(self.version.as_str()) {
            tracing::info!(version = %self.version, "generation already current; skipping precache");
            self.state = LifecycleState::Installed;
            return Ok(());
        }

        let urls = manifest
            .resolve(&self.origin)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        self.store.create_generation(&self.version).await?;
        tracing::info!(version = %self.version, entries = urls.len(), "precaching manifest");

        for url in urls {
            let request = Request::get(url.clone());

            let response = match self.network.fetch(&request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    return self
                        .abort_install(&url, format!("status {}", response.status))
                        .await;
                }
                Err(e) => return self.abort_install(&url, e.to_string()).await,
            };

            let entry = CacheEntry::new(
                &self.version,
                "GET",
                url.as_str(),
                response.status,
                response.headers_json(),
                response.body.to_vec(),
            );

            // A storage failure during install is fatal for the generation,
            // unlike the soft writes on the serving path.
            if let Err(e) = self.store.put_entry(&entry).await {
                return self.abort_install(&url, e.to_string()).await;
            }
        }

        self.store.mark_waiting(&self.version).await?;
        self.state = LifecycleState::Installed;
        tracing::info!(version = %self.version, "install complete");
        Ok(())
    }

    async fn abort_install(&self, url: &Url, reason: String) -> Result<(), Error> {
        tracing::warn!(version = %self.version, url = %url, %reason, "precache failed; abandoning generation");
        if let Err(e) = self.store.delete_generation(&self.version).await {
            tracing::warn!(version = %self.version, error = %e, "failed to delete abandoned generation");
        }
        Err(Error::PrecacheIncomplete { url: url.to_string(), reason })
    }

    /// Promote the installed generation and delete every other one.
    ///
    /// Runs only after the new generation is fully populated; deletion is
    /// full and immediate, never partial.
    pub async fn activate(&mut self) -> Result<(), Error> {
        if self.state != LifecycleState::Installed {
            return Err(Error::Protocol(format!(
                "cannot activate from state {:?}",
                self.state
            )));
        }

        self.state = LifecycleState::Activating;
        self.store.promote_generation(&self.version).await?;
        self.state = LifecycleState::Activated;
        tracing::info!(version = %self.version, "activated; now controlling all clients");
        Ok(())
    }

    /// Mark this instance redundant: a newer install superseded it.
    ///
    /// No-op once activated; Redundant is only reachable before activation.
    pub fn supersede(&mut self) {
        if self.state != LifecycleState::Activated {
            self.state = LifecycleState::Redundant;
        }
    }
}
