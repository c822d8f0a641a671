//! Fan-out of relayed frames to every connected socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Relayed {
    /// Connection that produced the frame; it does not get it back.
    pub from: Uuid,
    pub frame: String,
}

#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Relayed>,
    connections: Arc<AtomicUsize>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Relayed> {
        self.tx.subscribe()
    }

    /// Returns the number of sockets the frame was queued for.
    pub fn publish(&self, from: Uuid, frame: String) -> usize {
        self.tx.send(Relayed { from, frame }).unwrap_or(0)
    }

    /// Count a connection for as long as the guard lives.
    pub fn join(&self) -> ConnectionGuard {
        self.connections.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            connections: self.connections.clone(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(256)
    }
}

pub struct ConnectionGuard {
    connections: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let hub = Hub::default();
        let mut rx = hub.subscribe();
        let from = Uuid::new_v4();

        assert_eq!(hub.publish(from, "hi".into()), 1);
        let got = rx.recv().await.unwrap();
        assert_eq!(got.from, from);
        assert_eq!(got.frame, "hi");
    }

    #[test]
    fn test_publish_without_listeners() {
        let hub = Hub::default();
        assert_eq!(hub.publish(Uuid::new_v4(), "nobody".into()), 0);
    }

    #[test]
    fn test_guard_tracks_connections() {
        let hub = Hub::default();
        let a = hub.join();
        let b = hub.join();
        assert_eq!(hub.connection_count(), 2);
        drop(a);
        assert_eq!(hub.connection_count(), 1);
        drop(b);
        assert_eq!(hub.connection_count(), 0);
    }
}
