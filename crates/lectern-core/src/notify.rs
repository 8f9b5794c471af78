//! Transient user notifications.
//!
//! User-visible failures and confirmations go through a broadcast channel as
//! dismissible toasts with three semantic kinds. Irrecoverable list/query
//! errors are NOT sent here; those render inline in the content area they
//! would have populated.

use tokio::sync::broadcast;

/// Semantic kind of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

/// A transient, dismissible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }
}

/// Handle for emitting notifications.
///
/// Cloneable; renderers call [`Notifier::subscribe`] and drain the receiver.
/// Sending never blocks and succeeds even with no subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }

    /// Subscribe to future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Emit a notification. Lagging or absent subscribers are ignored.
    pub fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
