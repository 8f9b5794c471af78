//! In-memory cache backend.

use super::traits::{CacheBackend, CachedAsset};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory cache backend.
///
/// Entries live in a `HashMap` behind an [`RwLock`], so all trait methods
/// operate on `&self` without external synchronisation. Used by unit tests
/// and by hosts that don't want the shell cache to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryCache {
    generations: RwLock<HashMap<String, HashMap<String, CachedAsset>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>> {
        let generations = self.generations.read().expect("cache lock poisoned");
        Ok(generations
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, generation: &str, key: &str, asset: &CachedAsset) -> Result<()> {
        let mut generations = self.generations.write().expect("cache lock poisoned");
        generations
            .entry(generation.to_string())
            .or_default()
            .insert(key.to_string(), asset.clone());
        Ok(())
    }

    fn generations(&self) -> Result<Vec<String>> {
        let generations = self.generations.read().expect("cache lock poisoned");
        let mut names: Vec<String> = generations.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn remove_generation(&self, generation: &str) -> Result<usize> {
        let mut generations = self.generations.write().expect("cache lock poisoned");
        Ok(generations
            .remove(generation)
            .map(|entries| entries.len())
            .unwrap_or(0))
    }

    fn entry_count(&self, generation: &str) -> Result<usize> {
        let generations = self.generations.read().expect("cache lock poisoned");
        Ok(generations
            .get(generation)
            .map(|entries| entries.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn asset(body: &str) -> CachedAsset {
        CachedAsset::new(Bytes::from(body.to_string()), Some("text/css".into()), 200)
    }

    #[test]
    fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("gen-1", "/styles.css", &asset("body{}")).unwrap();

        let hit = cache.get("gen-1", "/styles.css").unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from("body{}"));
        assert!(cache.get("gen-2", "/styles.css").unwrap().is_none());
    }

    #[test]
    fn test_remove_generation() {
        let cache = MemoryCache::new();
        cache.set("gen-1", "/a", &asset("a")).unwrap();
        cache.set("gen-1", "/b", &asset("b")).unwrap();
        cache.set("gen-2", "/a", &asset("a2")).unwrap();

        assert_eq!(cache.remove_generation("gen-1").unwrap(), 2);
        assert!(cache.get("gen-1", "/a").unwrap().is_none());
        assert!(cache.get("gen-2", "/a").unwrap().is_some());
    }

    #[test]
    fn test_generations_listing() {
        let cache = MemoryCache::new();
        cache.set("gen-2", "/a", &asset("a")).unwrap();
        cache.set("gen-1", "/a", &asset("a")).unwrap();
        assert_eq!(cache.generations().unwrap(), vec!["gen-1", "gen-2"]);
    }
}
