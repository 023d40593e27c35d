// Public API
pub use channel::{ChannelError, ChannelId, OutboundFrame, PeerChannel, WebSocketChannel};
pub use connection::{ConnectionState, SignalingConnection};
pub use coordinator::{JoinOutcome, SessionCoordinator};
pub use handler::websocket_handler;
pub use messages::{ClientMessage, ParseError, ServerMessage};

// Internal modules
pub mod channel;
pub mod connection;
pub mod coordinator;
mod handler;
pub mod messages;
