//! Cache-first resolution with stale-while-revalidate.

use super::{FetchOutcome, ResolvedResponse, ResponseSource, Strategies};
use offcache_core::{Error, Request};

impl Strategies {
    /// Resolve a cache-eligible request.
    ///
    /// Hit: return the cached response immediately and refresh the entry
    /// from the network in a detached task whose outcome never affects the
    /// returned response.
    ///
    /// Miss: go to the network and store a 2xx response before returning
    /// it. If the network fails, a navigation request gets the fallback
    /// document; anything else gets one more cache lookup (a concurrent
    /// writer may have filled the entry mid-flight) before the failure
    /// propagates.
    pub async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(entry) = self.lookup(request).await {
            let revalidation = self.spawn_revalidate(request.clone());
            return Ok(FetchOutcome {
                response: ResolvedResponse::from_entry(entry, ResponseSource::Cache),
                revalidation: Some(revalidation),
            });
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_response(request, &response).await;
                Ok(FetchOutcome::new(ResolvedResponse::from_network(&response)))
            }
            Err(err) => {
                if request.is_navigation() {
                    match self.fallback_document().await {
                        Ok(response) => Ok(FetchOutcome::new(response)),
                        Err(_) => Err(err),
                    }
                } else if let Some(entry) = self.lookup(request).await {
                    Ok(FetchOutcome::new(ResolvedResponse::from_entry(entry, ResponseSource::Cache)))
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{StubNetwork, install_generation};
    use offcache_core::CacheDb;
    use offcache_core::cache::hash::request_key;
    use url::Url;

    const INDEX: &str = "https://app.example.com/index.html";
    const APP_JS: &str = "https://app.example.com/app.js";

    async fn setup() -> (CacheDb, std::sync::Arc<StubNetwork>, Strategies) {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::new();
        let strategies = Strategies::new(store.clone(), network.clone(), Url::parse(INDEX).unwrap());
        (store, network, strategies)
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_hit_serves_cache_offline() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[(INDEX, b"<html>shell</html>")]).await;
        network.set_offline(true);

        let outcome = strategies.cache_first(&get(INDEX)).await.unwrap();
        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.response.body, b"<html>shell</html>");
        assert_eq!(outcome.response.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_hit_revalidates_in_background() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[(APP_JS, b"old")]).await;
        network.insert(APP_JS, 200, b"new");

        let request = get(APP_JS);
        let outcome = strategies.cache_first(&request).await.unwrap();

        // The served response is the pre-refresh snapshot.
        assert_eq!(outcome.response.body, b"old");

        outcome.revalidation.unwrap().await.unwrap();

        let key = request_key("GET", APP_JS);
        let entry = store.get_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(entry.body, b"new");
    }

    #[tokio::test]
    async fn test_hit_revalidation_failure_is_swallowed() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[(APP_JS, b"old")]).await;
        network.set_offline(true);

        let outcome = strategies.cache_first(&get(APP_JS)).await.unwrap();
        assert_eq!(outcome.response.body, b"old");

        // Refresh fails quietly; the entry is untouched.
        outcome.revalidation.unwrap().await.unwrap();
        let key = request_key("GET", APP_JS);
        let entry = store.get_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(entry.body, b"old");
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.insert(APP_JS, 200, b"bundle");

        let outcome = strategies.cache_first(&get(APP_JS)).await.unwrap();
        assert_eq!(outcome.response.body, b"bundle");
        assert_eq!(outcome.response.source, ResponseSource::Network);
        assert!(outcome.revalidation.is_none());

        let key = request_key("GET", APP_JS);
        assert!(store.get_entry("v1", &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_miss_non_2xx_not_cached() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.insert(APP_JS, 404, b"not found");

        let outcome = strategies.cache_first(&get(APP_JS)).await.unwrap();
        assert_eq!(outcome.response.status, 404);
        assert_eq!(store.count_entries("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_fallback() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[(INDEX, b"<html>shell</html>")]).await;
        network.set_offline(true);

        let request = Request::navigate(Url::parse("https://app.example.com/unknown-page").unwrap());
        let outcome = strategies.cache_first(&request).await.unwrap();

        assert_eq!(outcome.response.source, ResponseSource::Fallback);
        assert_eq!(outcome.response.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_offline_subresource_miss_propagates() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.set_offline(true);

        let result = strategies.cache_first(&get(APP_JS)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_offline_navigation_without_fallback_propagates() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.set_offline(true);

        let request = Request::navigate(Url::parse("https://app.example.com/unknown-page").unwrap());
        let result = strategies.cache_first(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
