//! Typed cross-view cart notifications.
//!
//! A process-wide broadcast with no payload beyond "the cart changed".
//! Subscribers must re-fetch their own projection rather than trust anything
//! about the emitter's state; there is no ordering guarantee between an
//! emitter's local list and what a subscriber's next fetch returns.

use tokio::sync::broadcast;

/// Lagging subscribers lose old events, which is harmless here: every event
/// means the same thing, "re-fetch".
const CHANNEL_CAPACITY: usize = 16;

/// What changed. One variant today; typed so tomorrow's variants don't turn
/// into stringly-keyed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// The cart's contents changed in some way.
    Changed,
}

/// Handle to the process-wide cart event channel.
///
/// Cheap to clone. The channel outlives any single subscriber; dropping a
/// [`broadcast::Receiver`] is unsubscription.
#[derive(Debug, Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartEvent>,
}

impl CartEvents {
    /// Create a new event channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe for change notifications.
    ///
    /// Only events sent after this call are delivered.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.sender.subscribe()
    }

    /// Announce that the cart changed.
    ///
    /// A send error only means nobody is subscribed right now, which is fine.
    pub fn notify(&self) {
        let _ = self.sender.send(CartEvent::Changed);
    }
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let events = CartEvents::new();
        let mut a = events.subscribe();
        let mut b = events.subscribe();

        events.notify();

        assert_eq!(a.recv().await.unwrap(), CartEvent::Changed);
        assert_eq!(b.recv().await.unwrap(), CartEvent::Changed);
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_fine() {
        let events = CartEvents::new();
        events.notify();

        // A subscriber arriving later does not see the earlier event.
        let mut late = events.subscribe();
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn clones_share_one_channel() {
        let events = CartEvents::new();
        let clone = events.clone();
        let mut rx = events.subscribe();

        clone.notify();

        assert_eq!(rx.recv().await.unwrap(), CartEvent::Changed);
    }
}
