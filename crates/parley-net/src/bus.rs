//! Explicit subscribe/unsubscribe event dispatch.
//!
//! Each subscriber gets its own unbounded queue, so publishing never blocks
//! and two sessions in one process never see each other's events.

use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving side of one subscription.
#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next queued event, without waiting.
    pub fn try_next(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. `None` once the bus dropped this subscriber.
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Fan-out of cloned events to every live subscriber.
#[derive(Debug)]
pub struct EventBus<E> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<E>)>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Subscription<E> {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push((id, tx));
        Subscription { id, rx }
    }

    /// Stop delivering to `id`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        before != self.subscribers.len()
    }

    /// Deliver to every subscriber; subscribers whose receiver was dropped
    /// are removed.
    pub fn publish(&mut self, event: E) {
        self.subscribers.retain(|(id, tx)| {
            let alive = tx.send(event.clone()).is_ok();
            if !alive {
                trace!(subscription = id.0, "Dropping closed subscriber");
            }
            alive
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
