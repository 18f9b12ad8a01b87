//! User-facing, non-fatal notifications.
//!
//! The orchestrator reports recoverable problems (such as an unreadable
//! path template) through a [`Notifier`] so the host can surface them as
//! warnings without failing the run.

use std::sync::Mutex;

use tracing::warn;

/// Receives warnings meant for the user.
///
/// Implementations must be [`Send`] and [`Sync`] so one notifier can be
/// shared by every run of a controller.
pub trait Notifier: Send + Sync {
    /// Surface a warning message.
    fn warn(&self, message: &str);
}

/// Notifier that forwards warnings to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        warn!(target: "notebook_chat::user", "{message}");
    }
}

/// Notifier that keeps every warning in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    /// Construct an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected warnings.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Drain the collected warnings.
    pub fn take(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn warn(&self, message: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.to_owned());
        }
    }
}
