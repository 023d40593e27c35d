use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use classmeet_signaling::signaling::{ChannelError, ChannelId, PeerChannel};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Recording channel standing in for a live WebSocket connection.
pub struct MockChannel {
    id: ChannelId,
    sent: Arc<RwLock<Vec<String>>>,
    closed: Arc<RwLock<bool>>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            sent: Arc::new(RwLock::new(Vec::new())),
            closed: Arc::new(RwLock::new(false)),
        })
    }

    /// Everything delivered to this channel, parsed, in send order.
    pub async fn sent_messages(&self) -> Vec<Value> {
        self.sent
            .read()
            .await
            .iter()
            .map(|text| serde_json::from_str(text).expect("channel frames are JSON"))
            .collect()
    }

    /// The `type` tag of every delivered message, in send order.
    pub async fn message_types(&self) -> Vec<String> {
        self.sent_messages()
            .await
            .iter()
            .map(|m| {
                m.get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Messages with a given `type` tag.
    pub async fn messages_of_type(&self, message_type: &str) -> Vec<Value> {
        self.sent_messages()
            .await
            .into_iter()
            .filter(|m| m.get("type").and_then(Value::as_str) == Some(message_type))
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.read().await
    }
}

#[async_trait]
impl PeerChannel for MockChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    async fn send(&self, text: String) -> Result<(), ChannelError> {
        if *self.closed.read().await {
            return Err(ChannelError::Closed);
        }
        self.sent.write().await.push(text);
        Ok(())
    }

    async fn close(&self) {
        *self.closed.write().await = true;
    }
}
