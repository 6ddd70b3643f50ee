//! The worker: wires classification, strategies, lifecycle, control
//! channel, and notification bridge over one shared store and network.

use std::sync::Arc;

use crate::classify::{Policy, Route, classify};
use crate::control::ControlChannel;
use crate::events::{Event, Outcome};
use crate::lifecycle::{LifecycleController, LifecycleState};
use crate::notify::NotificationBridge;
use crate::strategy::{FetchOutcome, ResolvedResponse, Strategies};
use offcache_client::Network;
use offcache_core::url::resolve;
use offcache_core::{AppConfig, CacheDb, Error, PrecacheManifest, Request};

/// One worker instance serving a hosting application.
pub struct Worker {
    config: AppConfig,
    store: CacheDb,
    network: Arc<dyn Network>,
    policy: Policy,
    strategies: Strategies,
    lifecycle: LifecycleController,
    control: ControlChannel,
    bridge: NotificationBridge,
}

impl Worker {
    pub fn new(config: AppConfig, store: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let policy = Policy::from_config(&config)?;
        let origin = policy.origin().clone();

        let fallback_url = resolve(&origin, &config.fallback_document)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let strategies = Strategies::new(store.clone(), Arc::clone(&network), fallback_url);

        let lifecycle = LifecycleController::new(
            store.clone(),
            Arc::clone(&network),
            config.cache_version.clone(),
            origin.clone(),
            config.skip_waiting,
        );

        let control = ControlChannel::new(
            store.clone(),
            Arc::clone(&network),
            origin.clone(),
            config.cache_version.clone(),
            lifecycle.skip_waiting_handle(),
        );

        let bridge = NotificationBridge::new(
            Arc::clone(&network),
            origin,
            config.sync_tag.clone(),
            config.sync_url.clone(),
            config.push_title.clone(),
            config.push_body.clone(),
        );

        Ok(Self { config, store, network, policy, strategies, lifecycle, control, bridge })
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// Dispatch one host-platform event onto the owning component.
    pub async fn dispatch(&mut self, event: Event) -> Result<Outcome, Error> {
        match event {
            Event::Install => {
                self.install().await?;
                Ok(Outcome::Installed)
            }
            Event::Activate => {
                self.lifecycle.activate().await?;
                Ok(Outcome::Activated)
            }
            Event::Fetch(request) => self.handle_fetch(&request).await.map(Outcome::Response),
            Event::Message(envelope) => Ok(Outcome::MessageHandled(self.control.handle(envelope).await)),
            Event::Sync(tag) => {
                self.bridge.handle_sync(&tag).await?;
                Ok(Outcome::Synced)
            }
            Event::Push(payload) => Ok(Outcome::Notified(self.bridge.handle_push(&payload))),
        }
    }

    /// Precache the configured manifest into this worker's generation.
    pub async fn install(&mut self) -> Result<(), Error> {
        let manifest = PrecacheManifest::new(self.config.precache_manifest.clone());
        self.lifecycle.install(&manifest).await
    }

    /// Resolve an intercepted request through its classified route.
    ///
    /// Bypass routes forward to the network unmodified and never touch
    /// the cache.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match classify(request, &self.policy) {
            Route::Bypass => {
                let response = self.network.fetch(request).await?;
                Ok(FetchOutcome::new(ResolvedResponse::from_network(&response)))
            }
            Route::CacheFirst => self.strategies.cache_first(request).await,
            Route::NetworkFirst => self.strategies.network_first(request).await,
        }
    }

    /// Bring the store up to the configured version at startup.
    ///
    /// An install failure is fatal only for the new generation: with a
    /// current generation in place the failure is logged and that
    /// generation keeps serving. The failure propagates only when nothing
    /// can serve at all.
    pub async fn bootstrap(&mut self) -> Result<(), Error> {
        if let Err(e) = self.install().await {
            match self.store.current_generation().await? {
                Some(generation) => {
                    tracing::warn!(error = %e, %generation, "install failed; keeping current generation");
                    return Ok(());
                }
                None => return Err(e),
            }
        }
        self.activate_if_requested().await
    }

    /// Activate a waiting generation when immediate takeover is requested.
    pub async fn activate_if_requested(&mut self) -> Result<(), Error> {
        if self.lifecycle.state() == LifecycleState::Installed
            && self.lifecycle.should_activate_immediately()
        {
            self.lifecycle.activate().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlEnvelope, ControlReply};
    use crate::strategy::ResponseSource;
    use crate::testutil::StubNetwork;
    use offcache_core::RequestMode;
    use serde_json::json;
    use tokio::sync::oneshot;
    use url::Url;

    const INDEX: &str = "https://app.example.com/index.html";
    const APP_JS: &str = "https://app.example.com/app.js";

    fn config() -> AppConfig {
        AppConfig {
            origin: "https://app.example.com".into(),
            cache_version: "v1".into(),
            precache_manifest: vec!["/index.html".into(), "/app.js".into()],
            bypass_origins: vec!["api.example.com".into()],
            skip_waiting: true,
            ..Default::default()
        }
    }

    async fn online_worker() -> (Arc<StubNetwork>, Worker) {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::new();
        network.insert(INDEX, 200, b"<html>shell</html>");
        network.insert(APP_JS, 200, b"bundle");
        let worker = Worker::new(config(), store, network.clone()).unwrap();
        (network, worker)
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_bootstrap_installs_and_activates() {
        let (_network, mut worker) = online_worker().await;
        worker.bootstrap().await.unwrap();
        assert_eq!(worker.lifecycle().state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_precached_resources_served_offline() {
        let (network, mut worker) = online_worker().await;
        worker.bootstrap().await.unwrap();

        network.set_offline(true);
        let fetches_before = network.total_fetches();

        let outcome = worker.handle_fetch(&get(INDEX)).await.unwrap();
        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.response.body, b"<html>shell</html>");

        // Served from cache; the only network activity is the detached
        // revalidation attempt, which never touches the response.
        assert_eq!(outcome.response.source, ResponseSource::Cache);
        if let Some(handle) = outcome.revalidation {
            handle.await.unwrap();
        }
        assert!(network.total_fetches() <= fetches_before + 1);
    }

    #[tokio::test]
    async fn test_unknown_navigation_offline_gets_shell() {
        let (network, mut worker) = online_worker().await;
        worker.bootstrap().await.unwrap();
        network.set_offline(true);

        let request = Request::navigate(Url::parse("https://app.example.com/unknown-page").unwrap());
        let outcome = worker.handle_fetch(&request).await.unwrap();

        assert_eq!(outcome.response.source, ResponseSource::Fallback);
        assert_eq!(outcome.response.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_failed_install_keeps_prior_version() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::new();
        network.insert(INDEX, 200, b"<html>v1</html>");
        network.insert(APP_JS, 200, b"bundle");

        let mut worker = Worker::new(config(), store.clone(), network.clone()).unwrap();
        worker.bootstrap().await.unwrap();

        // v2 manifest includes an unreachable URL.
        let v2 = AppConfig {
            cache_version: "v2".into(),
            precache_manifest: vec!["/index.html".into(), "/missing.js".into()],
            ..config()
        };
        let mut worker2 = Worker::new(v2, store, network).unwrap();
        // The failed install is absorbed: v1 keeps serving.
        worker2.bootstrap().await.unwrap();

        // The prior version still answers GET_VERSION.
        let (tx, rx) = oneshot::channel();
        let env = ControlEnvelope { message: json!({"type": "GET_VERSION"}), reply: Some(tx) };
        worker2.dispatch(Event::Message(env)).await.unwrap();
        assert_eq!(rx.await.unwrap(), ControlReply::Version { version: "v1".into() });
    }

    #[tokio::test]
    async fn test_bootstrap_fails_when_nothing_can_serve() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::new();
        network.set_offline(true);

        // First boot with no prior generation: the failure must surface.
        let mut worker = Worker::new(config(), store, network).unwrap();
        let result = worker.bootstrap().await;
        assert!(matches!(result, Err(Error::PrecacheIncomplete { .. })));
    }

    #[tokio::test]
    async fn test_bypass_origin_never_cached() {
        let (network, mut worker) = online_worker().await;
        worker.bootstrap().await.unwrap();
        network.insert("https://api.example.com/auth", 200, b"token");

        let outcome = worker.handle_fetch(&get("https://api.example.com/auth")).await.unwrap();
        assert_eq!(outcome.response.body, b"token");

        // Offline, the same request fails instead of being served stale.
        network.set_offline(true);
        let result = worker.handle_fetch(&get("https://api.example.com/auth")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let (network, mut worker) = online_worker().await;
        worker.bootstrap().await.unwrap();
        network.insert("https://app.example.com/api/score", 200, b"saved");

        let request = Request::new(
            "POST",
            Url::parse("https://app.example.com/api/score").unwrap(),
            RequestMode::Subresource,
        );
        let outcome = worker.handle_fetch(&request).await.unwrap();
        assert_eq!(outcome.response.body, b"saved");
    }

    #[tokio::test]
    async fn test_dispatch_push_event() {
        let (_network, mut worker) = online_worker().await;
        let outcome = worker
            .dispatch(Event::Push(br#"{"title": "Hello"}"#.to_vec()))
            .await
            .unwrap();

        match outcome {
            Outcome::Notified(notification) => assert_eq!(notification.title, "Hello"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_install_and_activate_events() {
        let (_network, mut worker) = online_worker().await;

        let outcome = worker.dispatch(Event::Install).await.unwrap();
        assert!(matches!(outcome, Outcome::Installed));

        let outcome = worker.dispatch(Event::Activate).await.unwrap();
        assert!(matches!(outcome, Outcome::Activated));
        assert_eq!(worker.lifecycle().state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_enables_takeover() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::new();
        network.insert(INDEX, 200, b"<html>");
        network.insert(APP_JS, 200, b"js");

        let cfg = AppConfig { skip_waiting: false, ..config() };
        let mut worker = Worker::new(cfg, store, network).unwrap();

        worker.dispatch(Event::Install).await.unwrap();
        worker.activate_if_requested().await.unwrap();
        assert_eq!(worker.lifecycle().state(), LifecycleState::Installed);

        let env = ControlEnvelope { message: json!({"type": "SKIP_WAITING"}), reply: None };
        worker.dispatch(Event::Message(env)).await.unwrap();
        worker.activate_if_requested().await.unwrap();
        assert_eq!(worker.lifecycle().state(), LifecycleState::Activated);
    }
}
