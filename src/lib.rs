// Library crate for the classmeet signaling server
// This file exposes the public API for integration tests

pub mod auth;
pub mod room;
pub mod shared;
pub mod signaling;

// Re-export commonly used types for easier access in tests
pub use auth::{AuthClaims, TokenConfig};
pub use room::{ParticipantInfo, Role, RoomRegistry, WaitingInfo};
pub use shared::{AppError, AppState};
pub use signaling::{
    ChannelError, ChannelId, ClientMessage, ConnectionState, JoinOutcome, PeerChannel,
    ServerMessage, SessionCoordinator, SignalingConnection,
};
