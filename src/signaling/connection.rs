use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::types::AuthClaims;
use crate::room::registry::RoomRegistry;
use crate::signaling::channel::PeerChannel;
use crate::signaling::coordinator::{JoinOutcome, SessionCoordinator};
use crate::signaling::messages::{ClientMessage, ParseError};

/// Lifecycle of one signaling connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport accepted, `init` not yet sent.
    Connecting,
    /// `init` sent; addressable by the ephemeral id until a join arrives.
    Pending,
    /// Joined, admission-pending in the waiting room.
    Waiting,
    /// Joined and approved.
    Approved,
    /// Torn down.
    Closed,
}

/// Per-connection dispatcher: tracks the connection state machine and routes
/// each inbound frame to the matching coordinator operation.
///
/// Transitions: Connecting → Pending on `open`; Pending → Waiting or
/// Approved on join; Waiting → Approved when another connection's approval
/// is observed; any → Closed on teardown.
pub struct SignalingConnection {
    coordinator: Arc<SessionCoordinator>,
    registry: Arc<RoomRegistry>,
    channel: Arc<dyn PeerChannel>,
    claims: AuthClaims,
    room_id: String,
    peer_id: String,
    state: ConnectionState,
}

impl SignalingConnection {
    pub fn new(
        coordinator: Arc<SessionCoordinator>,
        registry: Arc<RoomRegistry>,
        channel: Arc<dyn PeerChannel>,
        claims: AuthClaims,
        room_id: String,
    ) -> Self {
        Self {
            coordinator,
            registry,
            channel,
            claims,
            room_id,
            peer_id: String::new(),
            state: ConnectionState::Connecting,
        }
    }

    /// Registers the connection and sends `init` with the ephemeral id.
    pub async fn open(&mut self) {
        self.peer_id = self.coordinator.connect(&self.room_id, &self.channel).await;
        self.state = ConnectionState::Pending;
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Routes one inbound frame. `Err` means the frame was not JSON and the
    /// caller must tear the connection down; every other failure is absorbed
    /// here.
    pub async fn handle_frame(&mut self, text: &str) -> Result<(), ParseError> {
        self.refresh_state();

        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e @ ParseError::InvalidJson(_)) => return Err(e),
            Err(e) => {
                warn!(
                    room_id = %self.room_id,
                    peer_id = %self.peer_id,
                    error = %e,
                    "Dropping malformed payload"
                );
                return Ok(());
            }
        };

        use ConnectionState::{Approved, Closed};

        match message {
            _ if self.state == Closed => {
                debug!(room_id = %self.room_id, "Frame after close ignored");
            }

            ClientMessage::Join(payload) => {
                let stable_id = payload.user_id.unwrap_or_else(|| self.peer_id.clone());
                let username = payload.username.unwrap_or_else(|| "Guest".to_string());
                self.peer_id = stable_id.clone();

                // Role comes from the verified claims, never from the client
                // payload.
                let outcome = self
                    .coordinator
                    .join(
                        &self.room_id,
                        &stable_id,
                        self.channel.clone(),
                        &username,
                        self.claims.role,
                    )
                    .await;
                self.state = match outcome {
                    JoinOutcome::Waiting => ConnectionState::Waiting,
                    JoinOutcome::Approved => ConnectionState::Approved,
                };
            }

            ClientMessage::ApproveUser(target) if self.state == Approved => {
                self.coordinator
                    .approve(&self.room_id, &self.peer_id, &target.target_user_id)
                    .await;
            }

            ClientMessage::RejectUser(target) if self.state == Approved => {
                self.coordinator
                    .reject(&self.room_id, &self.peer_id, &target.target_user_id)
                    .await;
            }

            ClientMessage::ScreenShare(payload) if self.state == Approved => {
                self.coordinator
                    .screen_share(&self.room_id, &self.peer_id, payload.is_sharing)
                    .await;
            }

            ClientMessage::Chat(mut payload) if self.state == Approved => {
                self.stamp_sender(&mut payload);
                self.coordinator.chat(&self.room_id, payload).await;
            }

            ClientMessage::KickUser(target) if self.state == Approved => {
                self.coordinator
                    .kick_by(&self.room_id, &self.peer_id, &target.target_user_id)
                    .await;
            }

            // Relay passes through in any live state so waiting members can
            // still exchange signaling with privileged peers.
            ClientMessage::Relay { target_id, mut payload } => {
                self.stamp_sender(&mut payload);
                self.coordinator
                    .relay(&self.room_id, &self.peer_id, target_id.as_deref(), payload)
                    .await;
            }

            dropped => {
                warn!(
                    room_id = %self.room_id,
                    peer_id = %self.peer_id,
                    state = ?self.state,
                    message = ?dropped,
                    "Message dropped by connection state machine"
                );
            }
        }

        Ok(())
    }

    /// Cleanup when the transport reports the connection closed.
    pub async fn closed(&mut self) {
        if self.state != ConnectionState::Connecting {
            self.coordinator
                .disconnect(&self.room_id, &self.peer_id, self.channel.id())
                .await;
        }
        self.state = ConnectionState::Closed;
    }

    /// Recipients key fan-out payloads by sender; non-object frames pass
    /// through unstamped.
    fn stamp_sender(&self, payload: &mut serde_json::Value) {
        if let Some(object) = payload.as_object_mut() {
            object.insert(
                "sender_id".to_string(),
                serde_json::Value::String(self.peer_id.clone()),
            );
        }
    }

    /// An approval lands on another connection's task; this one observes the
    /// promotion at its next inbound frame.
    fn refresh_state(&mut self) {
        if self.state == ConnectionState::Waiting
            && self.registry.is_approved(&self.room_id, &self.peer_id)
        {
            debug!(
                room_id = %self.room_id,
                peer_id = %self.peer_id,
                "Waiting connection observed its approval"
            );
            self.state = ConnectionState::Approved;
        }
    }
}
