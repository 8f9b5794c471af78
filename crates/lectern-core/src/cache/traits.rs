//! Cache backend trait and types.

use crate::error::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A cached response body with the metadata needed to replay it.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    /// Response body.
    pub body: Bytes,
    /// Content type reported by the origin.
    pub content_type: Option<String>,
    /// HTTP status the asset was stored with.
    pub status: u16,
    /// When the asset was cached.
    pub cached_at: DateTime<Utc>,
}

impl CachedAsset {
    /// Create an asset stamped with the current time.
    pub fn new(body: Bytes, content_type: Option<String>, status: u16) -> Self {
        Self {
            body,
            content_type,
            status,
            cached_at: Utc::now(),
        }
    }

    /// Whether the stored status is a success status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Generation-scoped cache storage.
///
/// Keys are request URLs; generations isolate asset versions from each
/// other. All operations are synchronous to match rusqlite's API; callers
/// hold no locks across await points.
pub trait CacheBackend: Send + Sync {
    /// Get a cached asset by generation and key.
    fn get(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>>;

    /// Store an asset under a generation, overwriting any existing entry
    /// with the same key.
    fn set(&self, generation: &str, key: &str, asset: &CachedAsset) -> Result<()>;

    /// List the generations that currently hold entries.
    fn generations(&self) -> Result<Vec<String>>;

    /// Delete every entry belonging to a generation.
    ///
    /// Returns the number of entries removed.
    fn remove_generation(&self, generation: &str) -> Result<usize>;

    /// Number of entries in a generation.
    fn entry_count(&self, generation: &str) -> Result<usize>;
}
