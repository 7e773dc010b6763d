//! Current-user cell with fan-out to change-stream subscribers.

use tokio::sync::mpsc;

use super::{ChangeStream, ProviderUser};

/// Holds a provider instance's current user and its live subscribers.
///
/// Closed subscribers are pruned on every publish.
#[derive(Default)]
pub(crate) struct Notifier {
    current: Option<ProviderUser>,
    listeners: Vec<mpsc::UnboundedSender<Option<ProviderUser>>>,
}

impl Notifier {
    pub(crate) fn current(&self) -> Option<&ProviderUser> {
        self.current.as_ref()
    }

    /// Register a listener and queue the current value for it.
    pub(crate) fn subscribe(&mut self) -> ChangeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive here, so the initial send cannot fail.
        let _ = tx.send(self.current.clone());
        self.listeners.push(tx);
        rx
    }

    /// Replace the current user and notify listeners if it changed.
    ///
    /// Returns `true` when a notification was sent.
    pub(crate) fn publish(&mut self, next: Option<ProviderUser>) -> bool {
        if self.current == next {
            return false;
        }
        self.current = next;
        let current = &self.current;
        self.listeners.retain(|tx| tx.send(current.clone()).is_ok());
        true
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.iter().filter(|tx| !tx.is_closed()).count()
    }
}

#[cfg(test)]
#[path = "notifier_test.rs"]
mod tests;
