use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

use super::models::{Participant, ParticipantInfo, Role, Room, WaitingInfo};
use crate::signaling::channel::{ChannelId, PeerChannel};

/// Process-wide table of live rooms.
///
/// The registry is the sole mutator of room existence: rooms are created on
/// first connect and deleted the moment both membership maps drain. Every
/// method locks, mutates or snapshots, and unlocks — nothing awaits while
/// the lock is held, so broadcast loops always iterate over a snapshot taken
/// before their first send.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the room if it does not exist yet.
    #[instrument(skip(self))]
    pub fn ensure_room(&self, room_id: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        if !rooms.contains_key(room_id) {
            info!(room_id = %room_id, "Creating room");
            rooms.insert(room_id.to_string(), Room::default());
        }
    }

    pub fn contains_room(&self, room_id: &str) -> bool {
        self.rooms.lock().unwrap().contains_key(room_id)
    }

    /// True if the peer id currently holds an approved seat.
    pub fn is_approved(&self, room_id: &str, peer_id: &str) -> bool {
        let rooms = self.rooms.lock().unwrap();
        rooms
            .get(room_id)
            .map(|room| room.peers.contains_key(peer_id))
            .unwrap_or(false)
    }

    /// Removes any existing entry for `peer_id` from either membership map
    /// and returns its channel so the caller can notify and close it.
    ///
    /// Clears the presenter if the removed entry held it. The room itself is
    /// left in place even if it drains: callers re-insert the replacement
    /// session immediately, and deleting here would drop the chat history.
    #[instrument(skip(self))]
    pub fn take_session(&self, room_id: &str, peer_id: &str) -> Option<Arc<dyn PeerChannel>> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id)?;

        if let Some(old) = room.peers.remove(peer_id) {
            if room.presenter.as_deref() == Some(peer_id) {
                room.presenter = None;
            }
            debug!(room_id = %room_id, peer_id = %peer_id, "Replacing approved session");
            return Some(old.channel);
        }

        if let Some(old) = room.waiting.remove(peer_id) {
            debug!(room_id = %room_id, peer_id = %peer_id, "Replacing waiting session");
            return Some(old.channel);
        }

        None
    }

    /// Places a participant into the admission queue.
    #[instrument(skip(self, participant), fields(peer_id = %participant.peer_id))]
    pub fn insert_waiting(&self, room_id: &str, participant: Participant) {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.entry(room_id.to_string()).or_default();
        // A peer id lives in at most one membership map.
        room.peers.remove(&participant.peer_id);
        debug!(room_id = %room_id, "Participant added to waiting");
        room.waiting.insert(participant.peer_id.clone(), participant);
    }

    /// Places a participant into the approved membership.
    #[instrument(skip(self, participant), fields(peer_id = %participant.peer_id))]
    pub fn insert_peer(&self, room_id: &str, participant: Participant) {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.entry(room_id.to_string()).or_default();
        room.waiting.remove(&participant.peer_id);
        debug!(room_id = %room_id, "Participant added to peers");
        room.peers.insert(participant.peer_id.clone(), participant);
    }

    /// Moves a waiting participant into the approved membership, reusing its
    /// channel, username and role. Returns the promoted participant, or None
    /// if the id has no waiting entry.
    #[instrument(skip(self))]
    pub fn promote_waiting(&self, room_id: &str, peer_id: &str) -> Option<Participant> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id)?;
        let participant = room.waiting.remove(peer_id)?;
        room.peers.insert(peer_id.to_string(), participant.clone());
        info!(room_id = %room_id, peer_id = %peer_id, "Participant approved");
        Some(participant)
    }

    /// Approved members plus the current presenter, for `participants`
    /// payloads.
    pub fn participants(&self, room_id: &str) -> (Vec<ParticipantInfo>, Option<String>) {
        let rooms = self.rooms.lock().unwrap();
        match rooms.get(room_id) {
            Some(room) => (room.participant_infos(), room.presenter.clone()),
            None => (Vec::new(), None),
        }
    }

    pub fn waiting_users(&self, room_id: &str) -> Vec<WaitingInfo> {
        let rooms = self.rooms.lock().unwrap();
        rooms
            .get(room_id)
            .map(|room| room.waiting_infos())
            .unwrap_or_default()
    }

    /// Role of an approved member. Waiting members hold no authority.
    pub fn role_of(&self, room_id: &str, peer_id: &str) -> Option<Role> {
        let rooms = self.rooms.lock().unwrap();
        rooms
            .get(room_id)
            .and_then(|room| room.peers.get(peer_id))
            .map(|p| p.role)
    }

    /// Display name of a member, approved or waiting.
    pub fn username_of(&self, room_id: &str, peer_id: &str) -> Option<String> {
        let rooms = self.rooms.lock().unwrap();
        let room = rooms.get(room_id)?;
        room.peers
            .get(peer_id)
            .or_else(|| room.waiting.get(peer_id))
            .map(|p| p.username.clone())
    }

    /// Unconditional presenter overwrite; the dispatch layer owns the policy.
    #[instrument(skip(self))]
    pub fn set_presenter(&self, room_id: &str, peer_id: Option<String>) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(room_id) {
            debug!(room_id = %room_id, presenter = ?peer_id, "Presenter changed");
            room.presenter = peer_id;
        }
    }

    /// Clears the presenter only if `peer_id` currently holds it. Returns
    /// whether a clear happened, so a stale stop-share cannot clobber a
    /// newer presenter.
    pub fn clear_presenter_if(&self, room_id: &str, peer_id: &str) -> bool {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(room_id) {
            if room.presenter.as_deref() == Some(peer_id) {
                room.presenter = None;
                debug!(room_id = %room_id, peer_id = %peer_id, "Presenter cleared");
                return true;
            }
        }
        false
    }

    pub fn presenter(&self, room_id: &str) -> Option<String> {
        let rooms = self.rooms.lock().unwrap();
        rooms.get(room_id).and_then(|room| room.presenter.clone())
    }

    /// Appends a chat payload to the room history.
    pub fn push_message(&self, room_id: &str, message: serde_json::Value) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(room_id) {
            room.messages.push(message);
        }
    }

    /// Chat history snapshot, in insertion order.
    pub fn messages(&self, room_id: &str) -> Vec<serde_json::Value> {
        let rooms = self.rooms.lock().unwrap();
        rooms
            .get(room_id)
            .map(|room| room.messages.clone())
            .unwrap_or_default()
    }

    /// Channel of a member, looked up in `peers` first, then `waiting`.
    pub fn find_channel(&self, room_id: &str, target_id: &str) -> Option<Arc<dyn PeerChannel>> {
        let rooms = self.rooms.lock().unwrap();
        let room = rooms.get(room_id)?;
        room.peers
            .get(target_id)
            .or_else(|| room.waiting.get(target_id))
            .map(|p| p.channel.clone())
    }

    /// Snapshot of approved recipients for a broadcast. Waiting members
    /// never receive broadcasts.
    pub fn peer_channels(
        &self,
        room_id: &str,
        exclude: Option<&str>,
        only_privileged: bool,
    ) -> Vec<Arc<dyn PeerChannel>> {
        let rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get(room_id) else {
            return Vec::new();
        };
        room.peers
            .values()
            .filter(|p| exclude != Some(p.peer_id.as_str()))
            .filter(|p| !only_privileged || p.role.is_privileged())
            .map(|p| p.channel.clone())
            .collect()
    }

    /// Removes a member from whichever map holds it, guarded by channel
    /// identity when `expected_channel` is given: a close event from a
    /// superseded connection must not remove the session that replaced it.
    ///
    /// Clears the presenter if the removed member held it and deletes the
    /// room once both maps are empty. Returns whether an entry was removed.
    #[instrument(skip(self))]
    pub fn remove_participant(
        &self,
        room_id: &str,
        peer_id: &str,
        expected_channel: Option<ChannelId>,
    ) -> bool {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };

        let stored_channel = room
            .peers
            .get(peer_id)
            .or_else(|| room.waiting.get(peer_id))
            .map(|p| p.channel.id());
        let removed = match stored_channel {
            Some(stored) => {
                if expected_channel.is_some_and(|expected| stored != expected) {
                    warn!(
                        room_id = %room_id,
                        peer_id = %peer_id,
                        "Stale disconnect ignored, session was replaced"
                    );
                    return false;
                }
                if room.peers.remove(peer_id).is_some() {
                    if room.presenter.as_deref() == Some(peer_id) {
                        room.presenter = None;
                    }
                } else {
                    room.waiting.remove(peer_id);
                }
                info!(room_id = %room_id, peer_id = %peer_id, "Participant removed");
                true
            }
            None => false,
        };

        if room.is_empty() {
            info!(room_id = %room_id, "Room is empty, deleting");
            rooms.remove(room_id);
        }

        removed
    }
}
