use serde::{Deserialize, Serialize};

/// A moderator's decision on a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Delete,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Delete => "delete",
        }
    }
}

/// Domain events carried by the bus.
///
/// Events are facts about things that have already happened: a message was
/// durably stored, a message was rejected by the filter, a moderator acted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoomEvent {
    /// A chat message passed moderation and was persisted
    MessageStored {
        room_id: String,
        message_id: i64,
        sender_id: String,
        sender_name: String,
        content: String,
    },

    /// The content filter rejected a message; only the redacted form leaves
    /// the send path
    MessageRejected {
        room_id: String,
        sender_id: String,
        sender_name: String,
        violations: Vec<String>,
        filtered_content: String,
    },

    /// A moderator acted on a stored message
    ModerationApplied {
        room_id: String,
        message_id: i64,
        action: ModerationAction,
        moderator_id: String,
    },
}

impl RoomEvent {
    pub fn room_id(&self) -> &str {
        match self {
            RoomEvent::MessageStored { room_id, .. } => room_id,
            RoomEvent::MessageRejected { room_id, .. } => room_id,
            RoomEvent::ModerationApplied { room_id, .. } => room_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::MessageStored { .. } => "message_stored",
            RoomEvent::MessageRejected { .. } => "message_rejected",
            RoomEvent::ModerationApplied { .. } => "moderation_applied",
        }
    }
}

/// Where a subscription listens. A typed scope, so "global" can never
/// collide with a room that happens to use that id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Room(String),
    Global,
}

impl Scope {
    pub fn room(id: impl Into<String>) -> Self {
        Scope::Room(id.into())
    }
}
