//! Cross-view refresh signal.
//!
//! After any admin product write, every open catalog view must re-fetch so
//! stale filtered results are never shown. Views subscribe here; the admin
//! service publishes.

use tokio::sync::broadcast;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEvent {
    /// The product catalog was created/updated/deleted against.
    CatalogChanged,
}

/// Broadcast channel fanning refresh events out to open views.
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    tx: broadcast::Sender<RefreshEvent>,
}

impl RefreshSignal {
    /// Create a signal with room for a small backlog per subscriber.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Subscribe; the receiver sees every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns how many subscribers received it; publishing with no open
    /// views is fine and delivers to nobody.
    pub fn publish(&self, event: RefreshEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_published_events() {
        let signal = RefreshSignal::new();
        let mut a = signal.subscribe();
        let mut b = signal.subscribe();

        assert_eq!(signal.publish(RefreshEvent::CatalogChanged), 2);
        assert_eq!(a.recv().await.unwrap(), RefreshEvent::CatalogChanged);
        assert_eq!(b.recv().await.unwrap(), RefreshEvent::CatalogChanged);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let signal = RefreshSignal::new();
        assert_eq!(signal.publish(RefreshEvent::CatalogChanged), 0);
    }
}
