//! Centralized configuration for the Lectern client core.
//!
//! This module provides configuration constants for network routing, query
//! synchronization, the offline shell cache, and barcode scanning.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Lectern";
    pub const USER_AGENT: &'static str = "Lectern/1.0";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    /// Path prefix that marks a request as an API call. API calls are
    /// network-only; everything else is cache-first.
    pub const API_PREFIX: &'static str = "/api/";

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

    /// Synthesized status for offline API responses.
    pub const OFFLINE_STATUS: u16 = 503;
}

/// Query synchronization timing and paging.
pub struct QueryConfig;

impl QueryConfig {
    /// Quiet period before a search-text change triggers a refetch.
    pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Pages shown on each side of the current page in the pagination
    /// control.
    pub const PAGE_WINDOW: u32 = 2;
}

/// Offline shell cache configuration.
pub struct ShellCacheConfig;

impl ShellCacheConfig {
    /// Version token embedded in the cache generation name. Must change
    /// whenever the manifest or any shell asset changes, to force a
    /// generation rollover.
    pub const CACHE_VERSION: &'static str = "v3";

    /// Fixed manifest of shell assets cached at install time.
    pub const SHELL_MANIFEST: [&'static str; 5] = [
        "/",
        "/index.html",
        "/static/styles.css",
        "/static/app.js",
        "/static/icons/book.svg",
    ];

    /// Name of the cache generation for the current shell version.
    pub fn generation_name() -> String {
        format!("lectern-shell-{}", Self::CACHE_VERSION)
    }
}

/// Barcode scan configuration.
pub struct ScanConfig;

impl ScanConfig {
    /// Capacity of the candidate channel between decoder and session.
    pub const CANDIDATE_BUFFER: usize = 16;
}
