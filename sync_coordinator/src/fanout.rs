use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Channel name for cross-server delta propagation for one document.
pub fn document_channel(document_id: &sync_replication::DocumentId) -> String {
    format!("doc:{document_id}")
}

/// Channel name for announcements not scoped to a single document.
pub const BROADCAST_CHANNEL: &str = "broadcast";

const SUBSCRIBER_CAPACITY: usize = 256;

/// Publish/subscribe boundary used to coordinate multiple coordinator processes (§6).
/// Payloads are opaque bytes — this crate doesn't care what's inside, only that delivery is
/// at-least-once and unordered; [[sync_replication::Delta]] application is commutative, so
/// neither property threatens convergence.
#[async_trait]
pub trait FanOutAdapter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), Self::Error>;

    /// Registers interest in `channel`, returning a receiver that yields every payload
    /// published to it from this point on.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Vec<u8>>, Self::Error>;
}

/// A single-process reference implementation: publishing fans out to every receiver
/// currently subscribed to that channel, in memory. Useful for tests and for a coordinator
/// running standalone (no cross-server coordination).
#[derive(Default)]
pub struct InMemoryFanOut {
    channels: Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
}

impl InMemoryFanOut {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FanOutAdapter for InMemoryFanOut {
    type Error = std::convert::Infallible;

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        let senders = {
            let mut channels = self.channels.lock().unwrap();
            let Some(senders) = channels.get_mut(channel) else {
                return Ok(());
            };
            senders.retain(|tx| !tx.is_closed());
            senders.clone()
        };
        for tx in senders {
            // Best-effort: a full or closed receiver just misses this payload.
            let _ = tx.try_send(payload.clone());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Vec<u8>>, Self::Error> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.channels
            .lock()
            .unwrap()
            .entry(channel.to_owned())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_payload() {
        let fanout = InMemoryFanOut::new();
        let mut rx = fanout.subscribe("doc:1").await.unwrap();
        fanout.publish("doc:1", b"hello".to_vec()).await.unwrap();
        assert_eq!(rx.recv().await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn publish_to_unsubscribed_channel_is_a_noop() {
        let fanout = InMemoryFanOut::new();
        fanout.publish("doc:nobody-listening", b"x".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let fanout = InMemoryFanOut::new();
        let mut a = fanout.subscribe("doc:1").await.unwrap();
        let mut b = fanout.subscribe("doc:1").await.unwrap();
        fanout.publish("doc:1", b"hi".to_vec()).await.unwrap();
        assert_eq!(a.recv().await, Some(b"hi".to_vec()));
        assert_eq!(b.recv().await, Some(b"hi".to_vec()));
    }
}
