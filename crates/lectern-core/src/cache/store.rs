//! Generation lifecycle over a cache backend.

use super::traits::{CacheBackend, CachedAsset};
use crate::config::ShellCacheConfig;
use crate::error::{LecternError, Result};
use crate::network::{Fetch, FetchRequest};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Versioned store of shell assets.
///
/// At most one generation is current at a time. A new generation is staged
/// by [`CacheStore::install`] without displacing the serving one, promoted
/// by [`CacheStore::activate`], and every other generation is evicted at
/// that point. Open sessions adopt the promoted generation on their next
/// read; no reload is required.
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    current: RwLock<Option<String>>,
    staged: RwLock<Option<String>>,
}

impl CacheStore {
    /// Create a store over a backend, adopting the configured generation if
    /// a previous session already populated it.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        let configured = ShellCacheConfig::generation_name();
        let current = match backend.entry_count(&configured) {
            Ok(n) if n > 0 => {
                debug!("Adopting existing cache generation {} ({} entries)", configured, n);
                Some(configured)
            }
            _ => None,
        };
        Self {
            backend,
            current: RwLock::new(current),
            staged: RwLock::new(None),
        }
    }

    /// The generation currently serving reads, if any.
    pub fn current_generation(&self) -> Option<String> {
        self.current.read().expect("generation lock poisoned").clone()
    }

    /// Pre-populate the configured shell manifest under a new generation.
    ///
    /// Delegates to [`CacheStore::install_manifest`] with the compiled-in
    /// manifest and generation name.
    pub async fn install(&self, fetch: &dyn Fetch) -> Result<String> {
        let manifest: Vec<String> = ShellCacheConfig::SHELL_MANIFEST
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.install_manifest(fetch, &ShellCacheConfig::generation_name(), &manifest)
            .await
    }

    /// Fetch every manifest asset and stage them under `generation`.
    ///
    /// All-or-nothing: nothing is written until every asset has been
    /// fetched with a success status, so a failed install leaves the
    /// previously-serving generation untouched and the staged generation
    /// empty.
    pub async fn install_manifest(
        &self,
        fetch: &dyn Fetch,
        generation: &str,
        manifest: &[String],
    ) -> Result<String> {
        let fetches = manifest.iter().map(|path| async move {
            let response = fetch
                .fetch(&FetchRequest::get(path.clone()))
                .await
                .map_err(|e| LecternError::CacheInstallFailed {
                    asset: path.clone(),
                    message: e.to_string(),
                })?;
            if !response.is_success() {
                return Err(LecternError::CacheInstallFailed {
                    asset: path.clone(),
                    message: format!("HTTP {}", response.status),
                });
            }
            Ok((path.clone(), response))
        });

        let fetched = futures::future::try_join_all(fetches).await?;

        for (path, response) in fetched {
            let asset = CachedAsset::new(response.body, response.content_type, response.status);
            self.backend.set(generation, &path, &asset)?;
        }

        *self.staged.write().expect("generation lock poisoned") = Some(generation.to_string());
        info!("Staged cache generation {} ({} assets)", generation, manifest.len());
        Ok(generation.to_string())
    }

    /// Promote the staged generation to current and evict all others.
    ///
    /// This is the only point at which prior generations' entries are
    /// deleted.
    pub fn activate(&self) -> Result<usize> {
        {
            let mut staged = self.staged.write().expect("generation lock poisoned");
            let mut current = self.current.write().expect("generation lock poisoned");
            match staged.take() {
                Some(generation) => {
                    info!("Activating cache generation {}", generation);
                    *current = Some(generation);
                }
                None if current.is_some() => {
                    // Nothing staged; re-activation just re-runs eviction.
                }
                None => {
                    return Err(LecternError::Config {
                        message: "No cache generation staged or current".to_string(),
                    });
                }
            }
        }
        self.evict_non_current()
    }

    /// Delete every generation other than the current one.
    ///
    /// Returns the number of entries removed.
    pub fn evict_non_current(&self) -> Result<usize> {
        let current = self.current_generation();
        let mut removed = 0;
        for generation in self.backend.generations()? {
            if Some(&generation) != current.as_ref() {
                removed += self.backend.remove_generation(&generation)?;
                debug!("Evicted stale cache generation {}", generation);
            }
        }
        Ok(removed)
    }

    /// Look up an asset in the current generation.
    pub fn get(&self, key: &str) -> Result<Option<CachedAsset>> {
        match self.current_generation() {
            Some(generation) => self.backend.get(&generation, key),
            None => Ok(None),
        }
    }

    /// Store an asset under the current generation.
    ///
    /// Rejected when no generation is current; entries are never written
    /// under a stale or unstaged generation.
    pub fn put(&self, key: &str, asset: &CachedAsset) -> Result<()> {
        match self.current_generation() {
            Some(generation) => self.backend.set(&generation, key, asset),
            None => {
                warn!("Cache write for {} rejected: no current generation", key);
                Err(LecternError::StaleGeneration {
                    generation: "<none>".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::network::FetchResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;

    /// Transport fake serving a fixed set of paths.
    struct FixedFetch {
        responses: HashMap<String, u16>,
    }

    impl FixedFetch {
        fn serving(paths: &[&str]) -> Self {
            Self {
                responses: paths.iter().map(|p| (p.to_string(), 200)).collect(),
            }
        }

        fn with_status(mut self, path: &str, status: u16) -> Self {
            self.responses.insert(path.to_string(), status);
            self
        }
    }

    #[async_trait]
    impl Fetch for FixedFetch {
        async fn fetch(&self, request: &FetchRequest) -> crate::error::Result<FetchResponse> {
            match self.responses.get(&request.path) {
                Some(&status) => Ok(FetchResponse::new(
                    status,
                    Some("text/plain".into()),
                    Bytes::from(format!("body of {}", request.path)),
                )),
                None => Err(LecternError::Offline {
                    message: format!("unreachable: {}", request.path),
                }),
            }
        }
    }

    fn store() -> CacheStore {
        CacheStore::new(Arc::new(MemoryCache::new()))
    }

    fn manifest(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_install_then_activate_serves_assets() {
        let store = store();
        let fetch = FixedFetch::serving(&["/", "/app.js"]);

        store
            .install_manifest(&fetch, "gen-1", &manifest(&["/", "/app.js"]))
            .await
            .unwrap();
        // Staged but not yet current: reads still miss
        assert!(store.get("/app.js").unwrap().is_none());

        store.activate().unwrap();
        assert_eq!(store.current_generation().as_deref(), Some("gen-1"));
        let hit = store.get("/app.js").unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from("body of /app.js"));
    }

    #[tokio::test]
    async fn test_failed_install_leaves_previous_generation_current() {
        let store = store();
        let fetch = FixedFetch::serving(&["/", "/app.js"]);
        store
            .install_manifest(&fetch, "gen-1", &manifest(&["/", "/app.js"]))
            .await
            .unwrap();
        store.activate().unwrap();

        // Second install fails on one asset: transport error for /app.js
        let broken = FixedFetch::serving(&["/"]);
        let result = store
            .install_manifest(&broken, "gen-2", &manifest(&["/", "/app.js"]))
            .await;
        assert!(result.is_err());

        // gen-1 still current and fully readable; gen-2 wrote nothing
        assert_eq!(store.current_generation().as_deref(), Some("gen-1"));
        assert!(store.get("/app.js").unwrap().is_some());
        assert_eq!(store.backend.entry_count("gen-2").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_success_manifest_asset_aborts_install() {
        let store = store();
        let fetch = FixedFetch::serving(&["/", "/app.js"]).with_status("/app.js", 404);

        let result = store
            .install_manifest(&fetch, "gen-1", &manifest(&["/", "/app.js"]))
            .await;
        assert!(matches!(
            result,
            Err(LecternError::CacheInstallFailed { .. })
        ));
        assert_eq!(store.backend.entry_count("gen-1").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_activation_evicts_prior_generation() {
        let store = store();
        let fetch = FixedFetch::serving(&["/"]);

        store
            .install_manifest(&fetch, "gen-1", &manifest(&["/"]))
            .await
            .unwrap();
        store.activate().unwrap();

        store
            .install_manifest(&fetch, "gen-2", &manifest(&["/"]))
            .await
            .unwrap();
        store.activate().unwrap();

        assert_eq!(store.current_generation().as_deref(), Some("gen-2"));
        // Nothing written under gen-1 remains retrievable
        assert_eq!(store.backend.entry_count("gen-1").unwrap(), 0);
        assert!(store.backend.get("gen-1", "/").unwrap().is_none());
        assert!(store.get("/").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_rejected_without_current_generation() {
        let store = store();
        let asset = CachedAsset::new(Bytes::from("x"), None, 200);
        assert!(matches!(
            store.put("/x", &asset),
            Err(LecternError::StaleGeneration { .. })
        ));
    }

    #[tokio::test]
    async fn test_adopts_populated_generation_on_startup() {
        let backend = Arc::new(MemoryCache::new());
        let asset = CachedAsset::new(Bytes::from("x"), None, 200);
        backend
            .set(&ShellCacheConfig::generation_name(), "/", &asset)
            .unwrap();

        let store = CacheStore::new(backend);
        assert_eq!(
            store.current_generation(),
            Some(ShellCacheConfig::generation_name())
        );
        assert!(store.get("/").unwrap().is_some());
    }
}
