use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::room::models::{Participant, Role};
use crate::room::registry::RoomRegistry;
use crate::signaling::channel::{ChannelId, PeerChannel};
use crate::signaling::messages::ServerMessage;

/// Where a join landed the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting,
    Approved,
}

/// The behavioral core: admission decisions, presenter arbitration, message
/// relay and fan-out, duplicate-session eviction, disconnect/kick cleanup.
///
/// Operates purely on registry state plus the channels stored in it. All
/// sends are best-effort: a failed delivery is logged and never propagated
/// to the operation that triggered it.
pub struct SessionCoordinator {
    registry: Arc<RoomRegistry>,
}

impl SessionCoordinator {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Registers a fresh connection: ensures the room exists, mints an
    /// ephemeral peer id and announces it with `init`. The id is addressable
    /// only until the join message supplies a stable one.
    pub async fn connect(&self, room_id: &str, channel: &Arc<dyn PeerChannel>) -> String {
        self.registry.ensure_room(room_id);
        let ephemeral_id = Uuid::new_v4().to_string();
        self.send(channel, &ServerMessage::init(ephemeral_id.clone()))
            .await;
        debug!(room_id = %room_id, peer_id = %ephemeral_id, "Connection registered");
        ephemeral_id
    }

    /// Admits a member under its stable id, evicting any previous session
    /// holding that id first.
    ///
    /// Non-privileged first-time joiners go to the waiting room; privileged
    /// roles and ids that already held an approved seat (tab refresh) are
    /// admitted directly.
    pub async fn join(
        &self,
        room_id: &str,
        stable_id: &str,
        channel: Arc<dyn PeerChannel>,
        username: &str,
        role: Role,
    ) -> JoinOutcome {
        // Evaluated before eviction: a reconnect to an approved seat must be
        // re-admitted directly, not re-queued.
        let was_approved = self.registry.is_approved(room_id, stable_id);

        if let Some(old) = self.registry.take_session(room_id, stable_id) {
            // A re-join on the same live channel replaces its own entry;
            // only a genuinely different connection gets evicted.
            if old.id() != channel.id() {
                info!(room_id = %room_id, peer_id = %stable_id, "Evicting replaced session");
                self.send(&old, &ServerMessage::kicked_session_replaced())
                    .await;
                old.close().await;
            }
        }

        let participant = Participant {
            peer_id: stable_id.to_string(),
            username: username.to_string(),
            role,
            channel: channel.clone(),
        };

        if !role.is_privileged() && !was_approved {
            self.registry.insert_waiting(room_id, participant);
            self.broadcast(
                room_id,
                &ServerMessage::join_request(stable_id, username),
                None,
                true,
            )
            .await;
            self.send(&channel, &ServerMessage::WaitingForApproval).await;
            JoinOutcome::Waiting
        } else {
            self.registry.insert_peer(room_id, participant);
            self.announce_admission(room_id, stable_id, username, &channel)
                .await;
            if role.is_privileged() {
                let waiting = self.registry.waiting_users(room_id);
                if !waiting.is_empty() {
                    self.send(&channel, &ServerMessage::waiting_users_list(waiting))
                        .await;
                }
            }
            JoinOutcome::Approved
        }
    }

    /// Moves a waiting member into the approved membership. No-op unless the
    /// requester holds a privileged approved seat and the target is waiting.
    pub async fn approve(&self, room_id: &str, requester_id: &str, target_id: &str) {
        if !self.is_privileged_peer(room_id, requester_id) {
            warn!(
                room_id = %room_id,
                requester_id = %requester_id,
                "Unauthorized approve dropped"
            );
            return;
        }
        let Some(promoted) = self.registry.promote_waiting(room_id, target_id) else {
            debug!(room_id = %room_id, target_id = %target_id, "Approve target not waiting");
            return;
        };
        self.send(&promoted.channel, &ServerMessage::JoinApproved)
            .await;
        self.announce_admission(room_id, &promoted.peer_id, &promoted.username, &promoted.channel)
            .await;
    }

    /// Rejects a waiting member: privileged-only, then the same path as a
    /// kick.
    pub async fn reject(&self, room_id: &str, requester_id: &str, target_id: &str) {
        if !self.is_privileged_peer(room_id, requester_id) {
            warn!(
                room_id = %room_id,
                requester_id = %requester_id,
                "Unauthorized reject dropped"
            );
            return;
        }
        self.kick(room_id, target_id).await;
    }

    /// Removes a member (approved or waiting): kicked notice, channel close,
    /// then the same cleanup path as a disconnect. Absent target is a no-op.
    pub async fn kick(&self, room_id: &str, target_id: &str) {
        let Some(channel) = self.registry.find_channel(room_id, target_id) else {
            debug!(room_id = %room_id, target_id = %target_id, "Kick target not present");
            return;
        };
        self.send(&channel, &ServerMessage::kicked_by_host()).await;
        channel.close().await;
        self.registry.remove_participant(room_id, target_id, None);
    }

    /// The `kick-user` operation: authorization check, kick, then a
    /// notification naming the removed user and a membership update.
    pub async fn kick_by(&self, room_id: &str, requester_id: &str, target_id: &str) {
        if !self.is_privileged_peer(room_id, requester_id) {
            warn!(
                room_id = %room_id,
                requester_id = %requester_id,
                "Unauthorized kick dropped"
            );
            return;
        }
        let Some(username) = self.registry.username_of(room_id, target_id) else {
            debug!(room_id = %room_id, target_id = %target_id, "Kick target already absent");
            return;
        };

        self.kick(room_id, target_id).await;

        self.broadcast(
            room_id,
            &ServerMessage::user_kicked_notification(&username),
            None,
            false,
        )
        .await;
        let (users, presenter) = self.registry.participants(room_id);
        self.broadcast(
            room_id,
            &ServerMessage::participants(users, presenter),
            None,
            false,
        )
        .await;
    }

    /// Presenter arbitration: starting a share always wins; stopping only
    /// clears the slot if the sender still holds it.
    pub async fn screen_share(&self, room_id: &str, peer_id: &str, is_sharing: bool) {
        if is_sharing {
            self.registry.set_presenter(room_id, Some(peer_id.to_string()));
        } else {
            self.registry.clear_presenter_if(room_id, peer_id);
        }
    }

    /// Appends a chat payload to history and fans it out to every approved
    /// peer, sender included.
    pub async fn chat(&self, room_id: &str, payload: serde_json::Value) {
        self.registry.push_message(room_id, payload.clone());
        self.broadcast_value(room_id, &payload, None).await;
    }

    /// Generic relay: targeted delivery when `target_id` is given, otherwise
    /// broadcast to every approved peer except the sender.
    pub async fn relay(
        &self,
        room_id: &str,
        sender_id: &str,
        target_id: Option<&str>,
        payload: serde_json::Value,
    ) {
        match target_id {
            Some(target) => self.send_to_target(room_id, target, &payload).await,
            None => self.broadcast_value(room_id, &payload, Some(sender_id)).await,
        }
    }

    /// Delivers a payload to one member, approved or waiting. Silent no-op
    /// if the target is absent.
    pub async fn send_to_target(&self, room_id: &str, target_id: &str, payload: &serde_json::Value) {
        if let Some(channel) = self.registry.find_channel(room_id, target_id) {
            self.send_text(&channel, payload.to_string()).await;
        }
    }

    /// Cleanup for a closed connection, guarded by channel identity so a
    /// stale close cannot remove a replacement session. Remaining peers are
    /// notified only when an entry was actually removed.
    pub async fn disconnect(&self, room_id: &str, peer_id: &str, channel_id: ChannelId) {
        let removed = self
            .registry
            .remove_participant(room_id, peer_id, Some(channel_id));
        if !removed {
            return;
        }

        let (users, presenter) = self.registry.participants(room_id);
        self.broadcast(
            room_id,
            &ServerMessage::participants(users, presenter),
            None,
            false,
        )
        .await;
        self.broadcast(room_id, &ServerMessage::leave(peer_id), None, false)
            .await;
    }

    /// Membership broadcast, join notice and history replay for a freshly
    /// admitted member (direct join or approval).
    async fn announce_admission(
        &self,
        room_id: &str,
        peer_id: &str,
        username: &str,
        channel: &Arc<dyn PeerChannel>,
    ) {
        let (users, presenter) = self.registry.participants(room_id);
        self.broadcast(
            room_id,
            &ServerMessage::participants(users, presenter),
            None,
            false,
        )
        .await;
        self.broadcast(
            room_id,
            &ServerMessage::join_notice(peer_id, username),
            Some(peer_id),
            false,
        )
        .await;

        let history = self.registry.messages(room_id);
        if !history.is_empty() {
            self.send(channel, &ServerMessage::chat_history(history)).await;
        }
    }

    /// Fan-out of one typed message to approved peers. Recipients are
    /// snapshotted before the first send, so membership changes scheduled
    /// while sends are in flight cannot skew the loop.
    async fn broadcast(
        &self,
        room_id: &str,
        message: &ServerMessage,
        exclude: Option<&str>,
        only_privileged: bool,
    ) {
        let text = message.to_json();
        for channel in self.registry.peer_channels(room_id, exclude, only_privileged) {
            self.send_text(&channel, text.clone()).await;
        }
    }

    /// Fan-out of a verbatim payload (chat, relay).
    async fn broadcast_value(
        &self,
        room_id: &str,
        payload: &serde_json::Value,
        exclude: Option<&str>,
    ) {
        let text = payload.to_string();
        for channel in self.registry.peer_channels(room_id, exclude, false) {
            self.send_text(&channel, text.clone()).await;
        }
    }

    async fn send(&self, channel: &Arc<dyn PeerChannel>, message: &ServerMessage) {
        self.send_text(channel, message.to_json()).await;
    }

    /// Failures are isolated per recipient: the connection is gone and its
    /// own disconnect handling owns the cleanup.
    async fn send_text(&self, channel: &Arc<dyn PeerChannel>, text: String) {
        if let Err(e) = channel.send(text).await {
            debug!(error = %e, "Dropping message for unreachable channel");
        }
    }

    fn is_privileged_peer(&self, room_id: &str, peer_id: &str) -> bool {
        self.registry
            .role_of(room_id, peer_id)
            .map(|role| role.is_privileged())
            .unwrap_or(false)
    }
}
