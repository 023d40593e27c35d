use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one live channel instance.
///
/// Disconnect events carry it so a stale close event cannot remove a
/// replacement session that already took over the same peer id.
pub type ChannelId = Uuid;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
}

/// Frame handed to a connection's outbound pump.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// One member's message channel, as seen by the core.
///
/// The transport owns the connection lifetime; the core only holds this
/// sending handle inside the room maps. Sends are best-effort: an error
/// means the connection is gone and callers absorb it.
#[async_trait]
pub trait PeerChannel: Send + Sync {
    fn id(&self) -> ChannelId;

    /// Queue one framed text message for delivery.
    async fn send(&self, text: String) -> Result<(), ChannelError>;

    /// Ask the transport to close the connection.
    async fn close(&self);
}

/// mpsc-backed channel feeding the WebSocket pump loop in `handler`.
pub struct WebSocketChannel {
    id: ChannelId,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl WebSocketChannel {
    pub fn new(outbound: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
        }
    }
}

#[async_trait]
impl PeerChannel for WebSocketChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    async fn send(&self, text: String) -> Result<(), ChannelError> {
        self.outbound
            .send(OutboundFrame::Text(text))
            .map_err(|_| ChannelError::Closed)
    }

    async fn close(&self) {
        // Pump loop exits on Close; if it is already gone there is nothing
        // left to close.
        let _ = self.outbound.send(OutboundFrame::Close);
    }
}
