use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::room::models::{ParticipantInfo, WaitingInfo};

/// Client-to-server payloads
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    /// Stable identity asserted by the client; the ephemeral connect id is
    /// used when absent.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetPayload {
    #[serde(rename = "targetUserId")]
    pub target_user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenSharePayload {
    #[serde(rename = "isSharing", default)]
    pub is_sharing: bool,
}

/// One inbound message, decoded from its `type` tag.
///
/// Chat payloads are kept verbatim so history replay and fan-out deliver
/// exactly what the sender wrote; anything without a recognized tag is a
/// relay frame passed through untouched.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Join(JoinPayload),
    ApproveUser(TargetPayload),
    RejectUser(TargetPayload),
    ScreenShare(ScreenSharePayload),
    Chat(Value),
    KickUser(TargetPayload),
    Relay {
        target_id: Option<String>,
        payload: Value,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// The frame is not JSON at all; the connection is torn down.
    #[error("invalid JSON frame: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The frame carried a recognized tag but an unusable payload; the
    /// message is dropped.
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text).map_err(ParseError::InvalidJson)?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        fn typed<T: serde::de::DeserializeOwned>(
            kind: &'static str,
            value: Value,
        ) -> Result<T, ParseError> {
            serde_json::from_value(value)
                .map_err(|source| ParseError::MalformedPayload { kind, source })
        }

        match kind.as_str() {
            "join" => Ok(Self::Join(typed("join", value)?)),
            "approve-user" => Ok(Self::ApproveUser(typed("approve-user", value)?)),
            "reject-user" => Ok(Self::RejectUser(typed("reject-user", value)?)),
            "screen-share" => Ok(Self::ScreenShare(typed("screen-share", value)?)),
            "chat-message" => Ok(Self::Chat(value)),
            "kick-user" => Ok(Self::KickUser(typed("kick-user", value)?)),
            _ => {
                let target_id = value
                    .get("target_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Self::Relay { target_id, payload: value })
            }
        }
    }
}

/// Server-to-client messages produced by the coordinator.
///
/// Flat JSON objects tagged by `type`, matching what the frontend speaks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Init {
        peer_id: String,
    },
    JoinRequest {
        #[serde(rename = "userId")]
        user_id: String,
        username: String,
    },
    WaitingForApproval,
    JoinApproved,
    Kicked {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        message: String,
    },
    Participants {
        users: Vec<ParticipantInfo>,
        presenter: Option<String>,
    },
    Join {
        sender_id: String,
        username: String,
    },
    Leave {
        sender_id: String,
        message: String,
    },
    ChatHistory {
        history: Vec<Value>,
    },
    UserKickedNotification {
        username: String,
        message: String,
    },
    WaitingUsersList {
        users: Vec<WaitingInfo>,
    },
}

/// Helper constructors for messages with fixed or derived wording
impl ServerMessage {
    pub fn init(peer_id: String) -> Self {
        Self::Init { peer_id }
    }

    pub fn join_request(user_id: &str, username: &str) -> Self {
        Self::JoinRequest {
            user_id: user_id.to_string(),
            username: username.to_string(),
        }
    }

    /// Sent to the superseded connection when a new one claims its peer id.
    pub fn kicked_session_replaced() -> Self {
        Self::Kicked {
            reason: Some("session-replaced".to_string()),
            message: "You joined from another tab. This session has been disconnected."
                .to_string(),
        }
    }

    /// Sent to a member removed or rejected by a privileged peer.
    pub fn kicked_by_host() -> Self {
        Self::Kicked {
            reason: None,
            message: "You were removed or rejected by the host".to_string(),
        }
    }

    pub fn participants(users: Vec<ParticipantInfo>, presenter: Option<String>) -> Self {
        Self::Participants { users, presenter }
    }

    pub fn join_notice(sender_id: &str, username: &str) -> Self {
        Self::Join {
            sender_id: sender_id.to_string(),
            username: username.to_string(),
        }
    }

    pub fn leave(sender_id: &str) -> Self {
        Self::Leave {
            sender_id: sender_id.to_string(),
            message: format!("User {sender_id} has left the room"),
        }
    }

    pub fn chat_history(history: Vec<Value>) -> Self {
        Self::ChatHistory { history }
    }

    pub fn user_kicked_notification(username: &str) -> Self {
        Self::UserKickedNotification {
            username: username.to_string(),
            message: format!("{username} was removed by admin"),
        }
    }

    pub fn waiting_users_list(users: Vec<WaitingInfo>) -> Self {
        Self::WaitingUsersList { users }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server message serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::models::Role;

    #[test]
    fn test_server_message_tags_and_round_trip() {
        // init
        let m = ServerMessage::init("peer-1".to_string());
        let v: Value = serde_json::from_str(&m.to_json()).unwrap();
        assert_eq!(v["type"], "init");
        assert_eq!(v["peer_id"], "peer-1");
        let back: ServerMessage = serde_json::from_value(v).unwrap();
        assert_eq!(back, m);

        // join-request
        let v: Value =
            serde_json::from_str(&ServerMessage::join_request("u1", "Ada").to_json()).unwrap();
        assert_eq!(v["type"], "join-request");
        assert_eq!(v["userId"], "u1");
        assert_eq!(v["username"], "Ada");

        // waiting-for-approval (unit variant)
        let v: Value =
            serde_json::from_str(&ServerMessage::WaitingForApproval.to_json()).unwrap();
        assert_eq!(v["type"], "waiting-for-approval");

        // join-approved
        let v: Value = serde_json::from_str(&ServerMessage::JoinApproved.to_json()).unwrap();
        assert_eq!(v["type"], "join-approved");

        // kicked, with and without reason
        let v: Value =
            serde_json::from_str(&ServerMessage::kicked_session_replaced().to_json()).unwrap();
        assert_eq!(v["type"], "kicked");
        assert_eq!(v["reason"], "session-replaced");
        let v: Value = serde_json::from_str(&ServerMessage::kicked_by_host().to_json()).unwrap();
        assert!(v.get("reason").is_none());

        // participants
        let users = vec![ParticipantInfo {
            user_id: "u1".to_string(),
            username: "Ada".to_string(),
            role: Role::Student,
        }];
        let v: Value = serde_json::from_str(
            &ServerMessage::participants(users, Some("u1".to_string())).to_json(),
        )
        .unwrap();
        assert_eq!(v["type"], "participants");
        assert_eq!(v["users"][0]["userId"], "u1");
        assert_eq!(v["users"][0]["role"], "student");
        assert_eq!(v["presenter"], "u1");

        // join notice
        let v: Value =
            serde_json::from_str(&ServerMessage::join_notice("u1", "Ada").to_json()).unwrap();
        assert_eq!(v["type"], "join");
        assert_eq!(v["sender_id"], "u1");

        // leave
        let v: Value = serde_json::from_str(&ServerMessage::leave("u1").to_json()).unwrap();
        assert_eq!(v["type"], "leave");
        assert_eq!(v["message"], "User u1 has left the room");

        // chat-history
        let v: Value = serde_json::from_str(
            &ServerMessage::chat_history(vec![serde_json::json!({"text": "hi"})]).to_json(),
        )
        .unwrap();
        assert_eq!(v["type"], "chat-history");
        assert_eq!(v["history"][0]["text"], "hi");

        // user-kicked-notification
        let v: Value =
            serde_json::from_str(&ServerMessage::user_kicked_notification("Ada").to_json())
                .unwrap();
        assert_eq!(v["type"], "user-kicked-notification");
        assert_eq!(v["message"], "Ada was removed by admin");

        // waiting-users-list
        let users = vec![WaitingInfo {
            user_id: "u2".to_string(),
            username: "Grace".to_string(),
        }];
        let v: Value =
            serde_json::from_str(&ServerMessage::waiting_users_list(users).to_json()).unwrap();
        assert_eq!(v["type"], "waiting-users-list");
        assert_eq!(v["users"][0]["userId"], "u2");
    }

    #[test]
    fn test_parse_join_with_and_without_fields() {
        let m = ClientMessage::parse(r#"{"type":"join","userId":"u1","username":"Ada"}"#).unwrap();
        match m {
            ClientMessage::Join(p) => {
                assert_eq!(p.user_id.as_deref(), Some("u1"));
                assert_eq!(p.username.as_deref(), Some("Ada"));
            }
            other => panic!("expected join, got {other:?}"),
        }

        let m = ClientMessage::parse(r#"{"type":"join"}"#).unwrap();
        match m {
            ClientMessage::Join(p) => {
                assert!(p.user_id.is_none());
                assert!(p.username.is_none());
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_typed_messages() {
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"approve-user","targetUserId":"u1"}"#).unwrap(),
            ClientMessage::ApproveUser(p) if p.target_user_id == "u1"
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"reject-user","targetUserId":"u1"}"#).unwrap(),
            ClientMessage::RejectUser(_)
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"kick-user","targetUserId":"u1"}"#).unwrap(),
            ClientMessage::KickUser(_)
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"screen-share","isSharing":true}"#).unwrap(),
            ClientMessage::ScreenShare(p) if p.is_sharing
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"chat-message","text":"hi"}"#).unwrap(),
            ClientMessage::Chat(_)
        ));
    }

    #[test]
    fn test_parse_unknown_type_is_relay() {
        let m = ClientMessage::parse(r#"{"type":"offer","sdp":"...","target_id":"u2"}"#).unwrap();
        match m {
            ClientMessage::Relay { target_id, payload } => {
                assert_eq!(target_id.as_deref(), Some("u2"));
                assert_eq!(payload["sdp"], "...");
            }
            other => panic!("expected relay, got {other:?}"),
        }

        // No type tag at all is still a broadcast relay.
        let m = ClientMessage::parse(r#"{"candidate":"ice"}"#).unwrap();
        assert!(matches!(m, ClientMessage::Relay { target_id: None, .. }));
    }

    #[test]
    fn test_parse_invalid_json_is_fatal() {
        assert!(matches!(
            ClientMessage::parse("not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_missing_required_field_is_malformed() {
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"approve-user"}"#),
            Err(ParseError::MalformedPayload { kind: "approve-user", .. })
        ));
    }
}
