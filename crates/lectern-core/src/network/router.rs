//! Request classification and fetch strategies.

use super::{Fetch, FetchRequest, FetchResponse, Method};
use crate::cache::{CacheStore, CachedAsset};
use crate::config::NetworkConfig;
use crate::error::Result;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classification of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// API call: network-only, never served from cache.
    Api,
    /// Static asset: cache-first with network refresh.
    Static,
}

/// Routes every outgoing request through one of two fetch strategies.
///
/// API data must never be silently served stale (correctness over
/// availability); static assets must be available offline (availability
/// over freshness). The split is strict: an API URL is never served from
/// cache even if an identical path was once stored as an asset.
pub struct RequestRouter {
    fetch: Arc<dyn Fetch>,
    cache: Arc<CacheStore>,
}

impl RequestRouter {
    pub fn new(fetch: Arc<dyn Fetch>, cache: Arc<CacheStore>) -> Self {
        Self { fetch, cache }
    }

    /// Classify a request path.
    pub fn classify(path: &str) -> RouteClass {
        if path.starts_with(NetworkConfig::API_PREFIX) {
            RouteClass::Api
        } else {
            RouteClass::Static
        }
    }

    /// Handle a request according to its classification.
    pub async fn handle(&self, request: &FetchRequest) -> Result<FetchResponse> {
        match Self::classify(&request.path) {
            RouteClass::Api => self.network_only(request).await,
            RouteClass::Static => self.cache_first(request).await,
        }
    }

    /// Network-only with a synthesized offline payload on transport failure.
    ///
    /// The caller gets a structured response either way; a raw transport
    /// error never escapes to the UI for API calls.
    async fn network_only(&self, request: &FetchRequest) -> Result<FetchResponse> {
        match self.fetch.fetch(request).await {
            Ok(response) => Ok(response),
            Err(err) if err.is_offline() => {
                warn!("API request {} failed offline: {}", request.path, err);
                Ok(offline_response(&err.user_message()))
            }
            Err(err) => Err(err),
        }
    }

    /// Cache-first with refresh: return a hit immediately, otherwise fetch
    /// and store a copy under the current generation before returning.
    async fn cache_first(&self, request: &FetchRequest) -> Result<FetchResponse> {
        if request.method == Method::Get {
            if let Some(asset) = self.cache.get(&request.path)? {
                debug!("Cache hit for {}", request.path);
                let mut response =
                    FetchResponse::new(asset.status, asset.content_type, asset.body);
                response.from_cache = true;
                return Ok(response);
            }
        }

        // Miss: a failed network fetch propagates to the caller.
        let response = self.fetch.fetch(request).await?;

        if request.method == Method::Get && response.is_success() {
            let asset = CachedAsset::new(
                response.body.clone(),
                response.content_type.clone(),
                response.status,
            );
            // Refresh is best-effort; an uninstalled cache must not break
            // the page load.
            if let Err(e) = self.cache.put(&request.path, &asset) {
                debug!("Skipped cache refresh for {}: {}", request.path, e);
            }
        }

        Ok(response)
    }
}

/// Build the structured offline payload for a failed API request.
fn offline_response(detail: &str) -> FetchResponse {
    let body = serde_json::json!({
        "detail": detail,
        "offline": true,
    });
    let mut response = FetchResponse::new(
        NetworkConfig::OFFLINE_STATUS,
        Some("application/json".to_string()),
        Bytes::from(body.to_string()),
    );
    response.offline = true;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::LecternError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Transport fake: counts calls, optionally unreachable, per-path status.
    struct ScriptedFetch {
        calls: AtomicU32,
        unreachable: bool,
        status: u16,
    }

    impl ScriptedFetch {
        fn online() -> Self {
            Self {
                calls: AtomicU32::new(0),
                unreachable: false,
                status: 200,
            }
        }

        fn offline() -> Self {
            Self {
                calls: AtomicU32::new(0),
                unreachable: true,
                status: 200,
            }
        }

        fn with_status(status: u16) -> Self {
            Self {
                calls: AtomicU32::new(0),
                unreachable: false,
                status,
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(LecternError::Offline {
                    message: "connection refused".into(),
                });
            }
            Ok(FetchResponse::new(
                self.status,
                Some("text/plain".into()),
                Bytes::from(format!("net:{}", request.path)),
            ))
        }
    }

    fn empty_store() -> Arc<CacheStore> {
        Arc::new(CacheStore::new(Arc::new(MemoryCache::new())))
    }

    async fn router_with_active_cache(
        fetch: Arc<ScriptedFetch>,
    ) -> (RequestRouter, Arc<CacheStore>) {
        let store = Arc::new(CacheStore::new(Arc::new(MemoryCache::new())));
        let installer = ScriptedFetch::online();
        store
            .install_manifest(&installer, "gen-test", &["/".to_string()])
            .await
            .unwrap();
        store.activate().unwrap();
        (RequestRouter::new(fetch, store.clone()), store)
    }

    #[test]
    fn test_classification_is_strict() {
        assert_eq!(RequestRouter::classify("/api/books"), RouteClass::Api);
        assert_eq!(
            RequestRouter::classify("/api/books/isbn/978"),
            RouteClass::Api
        );
        assert_eq!(RequestRouter::classify("/index.html"), RouteClass::Static);
        assert_eq!(RequestRouter::classify("/"), RouteClass::Static);
    }

    #[tokio::test]
    async fn test_api_request_never_served_from_cache() {
        let fetch = Arc::new(ScriptedFetch::online());
        let (router, store) = router_with_active_cache(fetch.clone()).await;

        // Poison the cache with an entry under an API path
        store
            .put(
                "/api/books",
                &CachedAsset::new(Bytes::from("stale list"), None, 200),
            )
            .unwrap();

        let response = router
            .handle(&FetchRequest::get("/api/books"))
            .await
            .unwrap();
        assert!(!response.from_cache);
        assert_eq!(response.body, Bytes::from("net:/api/books"));
        assert_eq!(fetch.call_count(), 1);
    }

    #[tokio::test]
    async fn test_api_offline_synthesizes_structured_payload() {
        let fetch = Arc::new(ScriptedFetch::offline());
        let (router, _store) = router_with_active_cache(fetch).await;

        let response = router
            .handle(&FetchRequest::get("/api/books"))
            .await
            .unwrap();
        assert!(response.offline);
        assert_eq!(response.status, NetworkConfig::OFFLINE_STATUS);

        let payload: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(payload["offline"], serde_json::json!(true));
        assert!(payload["detail"].is_string());
    }

    #[tokio::test]
    async fn test_static_hit_served_without_network() {
        let fetch = Arc::new(ScriptedFetch::online());
        let (router, store) = router_with_active_cache(fetch.clone()).await;
        store
            .put(
                "/styles.css",
                &CachedAsset::new(Bytes::from("cached css"), Some("text/css".into()), 200),
            )
            .unwrap();

        let response = router
            .handle(&FetchRequest::get("/styles.css"))
            .await
            .unwrap();
        assert!(response.from_cache);
        assert_eq!(response.body, Bytes::from("cached css"));
        assert_eq!(fetch.call_count(), 0);
    }

    #[tokio::test]
    async fn test_static_miss_fetches_and_refreshes_cache() {
        let fetch = Arc::new(ScriptedFetch::online());
        let (router, store) = router_with_active_cache(fetch.clone()).await;

        let response = router
            .handle(&FetchRequest::get("/app.js"))
            .await
            .unwrap();
        assert!(!response.from_cache);
        assert_eq!(fetch.call_count(), 1);

        // Second request is a hit
        let again = router.handle(&FetchRequest::get("/app.js")).await.unwrap();
        assert!(again.from_cache);
        assert_eq!(fetch.call_count(), 1);
        assert!(store.get("/app.js").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_static_error_status_not_cached() {
        let fetch = Arc::new(ScriptedFetch::with_status(404));
        let (router, store) = router_with_active_cache(fetch.clone()).await;

        let response = router
            .handle(&FetchRequest::get("/missing.js"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(store.get("/missing.js").unwrap().is_none());

        // Still goes to the network next time
        router
            .handle(&FetchRequest::get("/missing.js"))
            .await
            .unwrap();
        assert_eq!(fetch.call_count(), 2);
    }

    #[tokio::test]
    async fn test_static_miss_offline_propagates() {
        let fetch = Arc::new(ScriptedFetch::offline());
        let (router, _store) = router_with_active_cache(fetch).await;

        let result = router.handle(&FetchRequest::get("/never-seen.js")).await;
        assert!(matches!(result, Err(LecternError::Offline { .. })));
    }

    #[tokio::test]
    async fn test_uninstalled_cache_does_not_break_static_fetch() {
        let fetch = Arc::new(ScriptedFetch::online());
        let router = RequestRouter::new(fetch, empty_store());

        let response = router.handle(&FetchRequest::get("/app.js")).await.unwrap();
        assert!(response.is_success());
        assert!(!response.from_cache);
    }
}
