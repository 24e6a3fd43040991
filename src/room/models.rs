use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::broadcast::OutboundQueue;

pub type ConnectionId = String;
pub type PrincipalId = String;

/// What a connection is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Chat,
    Video,
    Both,
}

impl Default for ConnectionKind {
    fn default() -> Self {
        ConnectionKind::Both
    }
}

/// Lifecycle of a connection. `Disconnected` is terminal: a reconnecting
/// client always gets a fresh Connection id from a new handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active,
    Disconnected,
}

/// Per-connection mutable flags visible to room peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub is_audio_muted: bool,
    pub is_video_enabled: bool,
    pub is_screen_sharing: bool,
}

impl Default for Presence {
    fn default() -> Self {
        // New participants join unmuted with video on
        Self {
            is_audio_muted: false,
            is_video_enabled: true,
            is_screen_sharing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceField {
    AudioMuted,
    VideoEnabled,
    ScreenSharing,
}

/// One live transport session bound to one authenticated principal.
/// Owned exclusively by the ConnectionRegistry.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub principal_id: PrincipalId,
    pub display_name: String,
    pub room_id: String,
    pub kind: ConnectionKind,
    pub presence: Presence,
    pub state: ConnectionState,
    pub joined_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        principal_id: impl Into<PrincipalId>,
        display_name: impl Into<String>,
        room_id: impl Into<String>,
        kind: ConnectionKind,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            principal_id: principal_id.into(),
            display_name: display_name.into(),
            room_id: room_id.into(),
            kind,
            presence: Presence::default(),
            state: ConnectionState::Connecting,
            joined_at: Utc::now(),
        }
    }

    pub fn apply_presence(&mut self, field: PresenceField, value: bool) {
        match field {
            PresenceField::AudioMuted => self.presence.is_audio_muted = value,
            PresenceField::VideoEnabled => self.presence.is_video_enabled = value,
            PresenceField::ScreenSharing => self.presence.is_screen_sharing = value,
        }
    }

    pub fn participant_info(&self) -> ParticipantInfo {
        ParticipantInfo {
            principal_id: self.principal_id.clone(),
            display_name: self.display_name.clone(),
            is_audio_muted: self.presence.is_audio_muted,
            is_video_enabled: self.presence.is_video_enabled,
            is_screen_sharing: self.presence.is_screen_sharing,
            joined_at: self.joined_at,
        }
    }
}

/// Snapshot of one participant, as shared with room peers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub principal_id: PrincipalId,
    pub display_name: String,
    pub is_audio_muted: bool,
    pub is_video_enabled: bool,
    pub is_screen_sharing: bool,
    pub joined_at: DateTime<Utc>,
}

/// A registry member: the connection record plus its outbound queue
pub(crate) struct Member {
    pub connection: Connection,
    pub queue: Arc<OutboundQueue>,
}

/// A named real-time session grouping a bounded set of connections.
/// Created lazily on first join, deleted the instant it empties.
pub struct Room {
    pub id: String,
    pub(crate) members: HashMap<ConnectionId, Member>,
    pub max_participants: usize,
    pub is_recording: bool,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub(crate) fn new(id: impl Into<String>, max_participants: usize) -> Self {
        Self {
            id: id.into(),
            members: HashMap::new(),
            max_participants,
            is_recording: false,
            created_at: Utc::now(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_participants
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        let mut infos: Vec<ParticipantInfo> = self
            .members
            .values()
            .map(|m| m.connection.participant_info())
            .collect();
        infos.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::OverflowPolicy;

    #[test]
    fn new_connection_has_default_presence() {
        let conn = Connection::new("u1", "Alice", "room1", ConnectionKind::Both);

        assert_eq!(conn.state, ConnectionState::Connecting);
        assert!(!conn.presence.is_audio_muted);
        assert!(conn.presence.is_video_enabled);
        assert!(!conn.presence.is_screen_sharing);
    }

    #[test]
    fn connection_ids_are_unique() {
        let a = Connection::new("u1", "Alice", "room1", ConnectionKind::Both);
        let b = Connection::new("u1", "Alice", "room1", ConnectionKind::Both);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn apply_presence_mutates_the_right_flag() {
        let mut conn = Connection::new("u1", "Alice", "room1", ConnectionKind::Video);

        conn.apply_presence(PresenceField::AudioMuted, true);
        assert!(conn.presence.is_audio_muted);

        conn.apply_presence(PresenceField::VideoEnabled, false);
        assert!(!conn.presence.is_video_enabled);

        conn.apply_presence(PresenceField::ScreenSharing, true);
        assert!(conn.presence.is_screen_sharing);
    }

    #[test]
    fn room_capacity_checks() {
        let mut room = Room::new("room1", 2);
        assert!(!room.is_full());

        for name in ["Alice", "Bob"] {
            let conn = Connection::new(name.to_lowercase(), name, "room1", ConnectionKind::Both);
            room.members.insert(
                conn.id.clone(),
                Member {
                    connection: conn,
                    queue: Arc::new(OutboundQueue::new(4, OverflowPolicy::DropOldest)),
                },
            );
        }

        assert_eq!(room.member_count(), 2);
        assert!(room.is_full());
    }
}
