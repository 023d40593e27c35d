use serde_json::{json, Value};
use std::sync::Arc;

use classmeet_signaling::{
    auth::AuthClaims,
    room::{Role, RoomRegistry},
    signaling::{ConnectionState, PeerChannel, SessionCoordinator, SignalingConnection},
};

use super::mocks::MockChannel;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub registry: Arc<RoomRegistry>,
    pub coordinator: Arc<SessionCoordinator>,
}

impl TestSetup {
    pub fn new() -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let coordinator = Arc::new(SessionCoordinator::new(Arc::clone(&registry)));
        Self {
            registry,
            coordinator,
        }
    }

    /// Opens a connection into a room with a verified identity, as the
    /// transport would after a successful upgrade.
    pub async fn open(&self, room_id: &str, username: &str, role: Role) -> TestConnection {
        let channel = MockChannel::new();
        let claims = AuthClaims {
            email: format!("{}@example.com", username.to_lowercase()),
            username: username.to_string(),
            role,
            exp: 4102444800, // far future
            iat: 0,
        };
        let mut connection = SignalingConnection::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.registry),
            channel.clone() as Arc<dyn PeerChannel>,
            claims,
            room_id.to_string(),
        );
        connection.open().await;
        TestConnection {
            channel,
            connection,
            username: username.to_string(),
        }
    }

    /// Checks that a peer id sits in at most one membership map.
    pub fn assert_membership_exclusive(&self, room_id: &str, peer_id: &str) {
        let approved = self.registry.is_approved(room_id, peer_id);
        let waiting = self
            .registry
            .waiting_users(room_id)
            .iter()
            .any(|w| w.user_id == peer_id);
        assert!(
            !(approved && waiting),
            "{peer_id} must not be both approved and waiting"
        );
    }

    /// Checks that the presenter, when set, names an approved member.
    pub fn assert_presenter_valid(&self, room_id: &str) {
        if let Some(presenter) = self.registry.presenter(room_id) {
            assert!(
                self.registry.is_approved(room_id, &presenter),
                "presenter {presenter} must hold an approved seat"
            );
        }
    }
}

pub struct TestConnection {
    pub channel: Arc<MockChannel>,
    pub connection: SignalingConnection,
    pub username: String,
}

impl TestConnection {
    /// Feeds one raw frame through the dispatcher, as the pump loop would.
    pub async fn send_frame(&mut self, frame: Value) {
        self.connection
            .handle_frame(&frame.to_string())
            .await
            .expect("frame is valid JSON");
    }

    pub async fn join(&mut self, user_id: &str) {
        let username = self.username.clone();
        self.send_frame(json!({
            "type": "join",
            "userId": user_id,
            "username": username,
        }))
        .await;
    }

    pub async fn approve(&mut self, target_id: &str) {
        self.send_frame(json!({"type": "approve-user", "targetUserId": target_id}))
            .await;
    }

    pub async fn reject(&mut self, target_id: &str) {
        self.send_frame(json!({"type": "reject-user", "targetUserId": target_id}))
            .await;
    }

    pub async fn kick(&mut self, target_id: &str) {
        self.send_frame(json!({"type": "kick-user", "targetUserId": target_id}))
            .await;
    }

    pub async fn chat(&mut self, text: &str) {
        self.send_frame(json!({"type": "chat-message", "text": text}))
            .await;
    }

    pub async fn screen_share(&mut self, is_sharing: bool) {
        self.send_frame(json!({"type": "screen-share", "isSharing": is_sharing}))
            .await;
    }

    /// Simulates the transport reporting this connection closed.
    pub async fn close(&mut self) {
        self.connection.closed().await;
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn peer_id(&self) -> String {
        self.connection.peer_id().to_string()
    }
}
