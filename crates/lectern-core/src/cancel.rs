//! Cooperative cancellation for async operations.
//!
//! A [`CancellationToken`] is shared between a scan session and its driving
//! task so that closing the scan UI interrupts camera acquisition and the
//! decode loop even while an async step is in flight. The token only flags
//! the request; each holder is responsible for releasing its own resources
//! once it observes the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation token for cooperative cancellation of async operations.
///
/// This token can be cloned and shared across tasks. When `cancel()` is
/// called on any clone, all clones will observe the cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Check cancellation and return an error if cancelled.
    pub fn check(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            Err(crate::error::LecternError::ScanCancelled)
        } else {
            Ok(())
        }
    }
}
