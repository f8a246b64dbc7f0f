//! Notification channel implementations.
//!
//! The scheduler reports pending/success/failure through the
//! [`Notifier`] trait. [`ToastNotifier`] fans toasts out to UI subscribers;
//! [`TracingNotifier`] only logs.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use notekeep_core::Notifier;

/// A transient, dismissible UI notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Toast {
    Pending,
    Success,
    Failure(String),
}

/// Broadcasts toasts to any number of UI subscribers.
#[derive(Debug, Clone)]
pub struct ToastNotifier {
    tx: broadcast::Sender<Toast>,
}

impl ToastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }
}

impl Notifier for ToastNotifier {
    fn notify_pending(&self) {
        let _ = self.tx.send(Toast::Pending);
    }

    fn notify_success(&self) {
        let _ = self.tx.send(Toast::Success);
    }

    fn notify_failure(&self, message: &str) {
        let _ = self.tx.send(Toast::Failure(message.to_string()));
    }
}

/// Notifier that writes to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_pending(&self) {
        debug!(component = "notifier", "Saving");
    }

    fn notify_success(&self) {
        info!(component = "notifier", "Saved");
    }

    fn notify_failure(&self, message: &str) {
        warn!(component = "notifier", error = message, "Save failed");
    }
}
