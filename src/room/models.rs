use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

use crate::signaling::channel::PeerChannel;

/// Role of a room member, as asserted by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Tutor,
    Student,
}

impl Role {
    /// Privileged roles skip the waiting room and may approve, reject and
    /// kick other members.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Tutor)
    }
}

/// One logical member instance inside a room.
///
/// The channel is a reference to the transport-owned connection; it stays
/// valid until the transport reports the disconnect.
#[derive(Clone)]
pub struct Participant {
    pub peer_id: String,
    pub username: String,
    pub role: Role,
    pub channel: Arc<dyn PeerChannel>,
}

/// Snapshot of an approved member, as carried by `participants` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantInfo {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

/// Snapshot of an admission-pending member, as carried by `join-request`
/// and `waiting-users-list` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitingInfo {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
}

/// One live session: admission queue, approved membership, presenter and
/// chat history.
///
/// A peer id appears in at most one of `waiting`/`peers`, and `presenter`
/// always names a current key of `peers`; `RoomRegistry` maintains both.
#[derive(Default)]
pub struct Room {
    pub waiting: HashMap<String, Participant>,
    pub peers: HashMap<String, Participant>,
    pub presenter: Option<String>,
    pub messages: Vec<serde_json::Value>,
}

impl Room {
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty() && self.peers.is_empty()
    }

    /// Approved members as wire-ready snapshots.
    pub fn participant_infos(&self) -> Vec<ParticipantInfo> {
        self.peers
            .values()
            .map(|p| ParticipantInfo {
                user_id: p.peer_id.clone(),
                username: p.username.clone(),
                role: p.role,
            })
            .collect()
    }

    /// Admission-pending members as wire-ready snapshots.
    pub fn waiting_infos(&self) -> Vec<WaitingInfo> {
        self.waiting
            .values()
            .map(|p| WaitingInfo {
                user_id: p.peer_id.clone(),
                username: p.username.clone(),
            })
            .collect()
    }
}
