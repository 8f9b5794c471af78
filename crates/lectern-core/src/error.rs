//! Error types for the Lectern client core.
//!
//! This module defines the error taxonomy shared by the cache, router, query
//! and scan subsystems, and the classification helpers the UI layer uses to
//! decide between inline messaging and transient notifications.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Lectern client core.
#[derive(Debug, Error)]
pub enum LecternError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend is unreachable. Surfaced to the UI as an inline offline
    /// indicator, never as a raw transport error.
    #[error("Backend unreachable: {message}")]
    Offline { message: String },

    /// Non-2xx API response. `detail` carries the response body's error
    /// detail verbatim when present; `user_message` surfaces it.
    #[error("API error: HTTP {status}")]
    Api { status: u16, detail: Option<String> },

    // Cache errors
    #[error("Cache install failed for {asset}: {message}")]
    CacheInstallFailed { asset: String, message: String },

    #[error("Cache write rejected: generation {generation} is not current")]
    StaleGeneration { generation: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Scan errors
    #[error("Camera unavailable: {message}")]
    CameraUnavailable { message: String },

    #[error("Barcode decoder failed: {message}")]
    DecoderFailed { message: String },

    #[error("No book found for ISBN {code}")]
    IsbnNotFound { code: String },

    #[error("Scan cancelled")]
    ScanCancelled,

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Lectern operations.
pub type Result<T> = std::result::Result<T, LecternError>;

// Conversion implementations for common error types

impl From<std::io::Error> for LecternError {
    fn from(err: std::io::Error) -> Self {
        LecternError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LecternError {
    fn from(err: serde_json::Error) -> Self {
        LecternError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for LecternError {
    fn from(err: rusqlite::Error) -> Self {
        LecternError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for LecternError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LecternError::Timeout(std::time::Duration::from_secs(0))
        } else if err.is_connect() {
            LecternError::Offline {
                message: err.to_string(),
            }
        } else {
            LecternError::Network {
                message: err.to_string(),
                cause: std::error::Error::source(&err).map(|s| s.to_string()),
            }
        }
    }
}

impl LecternError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LecternError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error means the backend could not be reached at all.
    ///
    /// Offline errors render as an inline indicator in place of data; every
    /// other failure goes through the notification channel.
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            LecternError::Offline { .. } | LecternError::Timeout(_)
        )
    }

    /// Check if this error leaves a scan session able to continue.
    ///
    /// Recoverable scan errors transition to `RetryableError` with the
    /// manual-entry path still available; they never tear down the host app.
    pub fn is_scan_recoverable(&self) -> bool {
        matches!(
            self,
            LecternError::CameraUnavailable { .. }
                | LecternError::DecoderFailed { .. }
                | LecternError::IsbnNotFound { .. }
                | LecternError::Network { .. }
                | LecternError::Offline { .. }
                | LecternError::Timeout(_)
        )
    }

    /// Short message suitable for a transient notification.
    pub fn user_message(&self) -> String {
        match self {
            LecternError::Offline { .. } => "You appear to be offline".to_string(),
            LecternError::Api { status, detail } => detail
                .clone()
                .unwrap_or_else(|| format!("HTTP {}", status)),
            other => other.to_string(),
        }
    }
}
