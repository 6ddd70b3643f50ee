//! Network-first resolution with cache fallback.

use super::{FetchOutcome, ResolvedResponse, ResponseSource, Strategies};
use offcache_core::{Error, Request};

impl Strategies {
    /// Resolve an intercepted request that is not cache-eligible for
    /// serving priority.
    ///
    /// The network is asked first. A 2xx response is opportunistically
    /// stored as a fallback resource before being returned. On network
    /// failure the cache is consulted; for navigation requests the fallback
    /// document is the last resort, otherwise the failure propagates.
    pub async fn network_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_response(request, &response).await;
                Ok(FetchOutcome::new(ResolvedResponse::from_network(&response)))
            }
            Err(err) => {
                if let Some(entry) = self.lookup(request).await {
                    return Ok(FetchOutcome::new(ResolvedResponse::from_entry(entry, ResponseSource::Cache)));
                }
                if request.is_navigation() {
                    match self.fallback_document().await {
                        Ok(response) => Ok(FetchOutcome::new(response)),
                        Err(_) => Err(err),
                    }
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
    const PAGE: &str = "https://app.example.com/words/daily";

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
    async fn test_network_wins_and_is_stored() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.insert(PAGE, 200, b"fresh");

        let outcome = strategies.network_first(&get(PAGE)).await.unwrap();
        assert_eq!(outcome.response.body, b"fresh");
        assert_eq!(outcome.response.source, ResponseSource::Network);

        let key = request_key("GET", PAGE);
        assert!(store.get_entry("v1", &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_non_2xx_returned_uncached() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.insert(PAGE, 500, b"boom");

        let outcome = strategies.network_first(&get(PAGE)).await.unwrap();
        assert_eq!(outcome.response.status, 500);
        assert_eq!(store.count_entries("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_cache() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[(PAGE, b"stale but servable")]).await;
        network.set_offline(true);

        let outcome = strategies.network_first(&get(PAGE)).await.unwrap();
        assert_eq!(outcome.response.body, b"stale but servable");
        assert_eq!(outcome.response.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_failure_navigation_gets_fallback_document() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[(INDEX, b"<html>shell</html>")]).await;
        network.set_offline(true);

        let request = Request::navigate(Url::parse(PAGE).unwrap());
        let outcome = strategies.network_first(&request).await.unwrap();
        assert_eq!(outcome.response.source, ResponseSource::Fallback);
        assert_eq!(outcome.response.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_failure_without_fallback_propagates() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        network.set_offline(true);

        let result = strategies.network_first(&get(PAGE)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writes_last_wins() {
        let (store, network, strategies) = setup().await;
        install_generation(&store, "v1", &[]).await;
        // Each racing fetch gets a distinct body.
        network.push_response(PAGE, 200, b"body-a");
        network.push_response(PAGE, 200, b"body-b");

        let a = strategies.clone();
        let b = strategies.clone();
        let req_a = get(PAGE);
        let req_b = get(PAGE);

        let (ra, rb) = tokio::join!(a.network_first(&req_a), b.network_first(&req_b));
        ra.unwrap();
        rb.unwrap();

        // Both raced to write; the stored value is exactly one whole
        // response body, not a merge or corruption.
        let key = request_key("GET", PAGE);
        let entry = store.get_entry("v1", &key).await.unwrap().unwrap();
        assert!(entry.body == b"body-a" || entry.body == b"body-b");
        assert_eq!(network.fetch_count(PAGE), 2);
    }
}
