//! Broadcast sink - fans published messages out to WebSocket subscribers

use serde::Serialize;
use tokio::sync::broadcast;

use super::envelope::Float64MultiArray;
use super::PublishSink;

/// Published message notification (sent via WebSocket)
#[derive(Debug, Clone, Serialize)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Float64MultiArray,
    pub timestamp: u64,
}

/// Sink that forwards every publish to a tokio broadcast channel
pub struct BroadcastSink {
    tx: broadcast::Sender<PublishedMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.tx.subscribe()
    }
}

impl PublishSink for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn publish(&self, topic: &str, payload: &Float64MultiArray) {
        let message = PublishedMessage {
            topic: topic.to_string(),
            payload: payload.clone(),
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
        };

        // Best-effort broadcast (ignore if no subscribers)
        let _ = self.tx.send(message);
    }
}
