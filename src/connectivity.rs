//! Online/offline state shared across caches and the sync engine.
//!
//! The host application owns the platform signal (browser events, NWPath,
//! netlink, ...) and forwards it through `set_online`. Consumers either poll
//! `is_online` at decision points or `subscribe` for transition events.

use std::sync::Arc;

use tokio::sync::watch;

/// Cheaply cloneable handle to the current connectivity state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the state. Subscribers are only woken on an actual transition.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
    }

    /// Subscribe to transitions. The receiver sees the latest value only;
    /// intermediate flaps between polls are coalesced.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_initial_state() {
        assert!(Connectivity::new(true).is_online());
        assert!(!Connectivity::new(false).is_online());
    }

    #[tokio::test]
    async fn test_subscriber_sees_transition() {
        let conn = Connectivity::new(false);
        let mut rx = conn.subscribe();

        conn.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_repeated_value_is_not_a_transition() {
        let conn = Connectivity::new(true);
        let mut rx = conn.subscribe();
        rx.borrow_and_update();

        conn.set_online(true);
        assert!(!rx.has_changed().unwrap());

        conn.set_online(false);
        assert!(rx.has_changed().unwrap());
    }
}
