use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::room::{ParticipantInfo, PresenceField};
use crate::signaling::{SignalKind, SignalingEnvelope};

/// Client-to-server frames. The `type` discriminator is a closed set; frames
/// with any other tag fail to parse and are dropped by the dispatcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ChatMessage {
        content: String,
    },
    Typing {
        is_typing: bool,
    },
    WebrtcOffer {
        payload: Value,
        #[serde(default)]
        target_id: Option<String>,
    },
    WebrtcAnswer {
        payload: Value,
        #[serde(default)]
        target_id: Option<String>,
    },
    IceCandidate {
        candidate: Value,
        #[serde(default)]
        target_id: Option<String>,
    },
    UserAction {
        action: PresenceAction,
        #[serde(default)]
        value: Option<Value>,
    },
    MediaStreamEvent {
        event_type: MediaEventKind,
        stream_type: StreamKind,
        #[serde(default)]
        stream_id: Option<String>,
    },
    RecordingControl {
        action: RecordingAction,
    },
    Ping {},
    GetParticipants {},
}

/// Self-reported participant actions that mutate presence flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAction {
    Mute,
    Unmute,
    VideoOn,
    VideoOff,
    ScreenShareStart,
    ScreenShareStop,
}

impl PresenceAction {
    /// The presence flag this action sets, and to what
    pub fn as_presence_change(self) -> (PresenceField, bool) {
        match self {
            PresenceAction::Mute => (PresenceField::AudioMuted, true),
            PresenceAction::Unmute => (PresenceField::AudioMuted, false),
            PresenceAction::VideoOn => (PresenceField::VideoEnabled, true),
            PresenceAction::VideoOff => (PresenceField::VideoEnabled, false),
            PresenceAction::ScreenShareStart => (PresenceField::ScreenSharing, true),
            PresenceAction::ScreenShareStop => (PresenceField::ScreenSharing, false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEventKind {
    StreamStarted,
    StreamEnded,
    StreamPaused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Audio,
    Video,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingAction {
    Start,
    Stop,
}

/// Server-to-client frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerFrameType {
    RoomInfo,
    UserJoined,
    UserLeft,
    ChatMessage,
    MessageModerated,
    Typing,
    WebrtcOffer,
    WebrtcAnswer,
    IceCandidate,
    UserAction,
    MediaStreamEvent,
    RecordingControl,
    ParticipantsList,
    Pong,
}

/// The canonical outbound envelope: `{"type", "data", "timestamp"}` with an
/// ISO-8601 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(rename = "type")]
    pub frame_type: ServerFrameType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ServerFrame {
    pub fn new(frame_type: ServerFrameType, data: Value) -> Self {
        Self {
            frame_type,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Initial snapshot sent to a connection right after it joins
    pub fn room_info(room_id: &str, your_id: &str, participants: &[ParticipantInfo]) -> Self {
        Self::new(
            ServerFrameType::RoomInfo,
            json!({
                "room_id": room_id,
                "your_id": your_id,
                "participants": participants,
                "participant_count": participants.len(),
            }),
        )
    }

    pub fn user_joined(
        room_id: &str,
        principal_id: &str,
        display_name: &str,
        participant_count: usize,
    ) -> Self {
        Self::new(
            ServerFrameType::UserJoined,
            json!({
                "room_id": room_id,
                "principal_id": principal_id,
                "display_name": display_name,
                "participant_count": participant_count,
            }),
        )
    }

    pub fn user_left(
        room_id: &str,
        principal_id: &str,
        display_name: &str,
        participant_count: usize,
    ) -> Self {
        Self::new(
            ServerFrameType::UserLeft,
            json!({
                "room_id": room_id,
                "principal_id": principal_id,
                "display_name": display_name,
                "participant_count": participant_count,
            }),
        )
    }

    /// Chat delivery. Carries the durable message id assigned by the store,
    /// never a client-generated placeholder.
    pub fn chat_message(
        room_id: &str,
        message_id: i64,
        sender_id: &str,
        sender_name: &str,
        content: &str,
    ) -> Self {
        Self::new(
            ServerFrameType::ChatMessage,
            json!({
                "room_id": room_id,
                "message_id": message_id,
                "sender_id": sender_id,
                "sender_name": sender_name,
                "content": content,
            }),
        )
    }

    /// Moderation outcome delivered in place of rejected content
    pub fn message_rejected(
        room_id: &str,
        sender_id: &str,
        violations: &[String],
        filtered_content: &str,
    ) -> Self {
        Self::new(
            ServerFrameType::MessageModerated,
            json!({
                "room_id": room_id,
                "sender_id": sender_id,
                "status": "rejected",
                "violations": violations,
                "filtered_content": filtered_content,
            }),
        )
    }

    /// A moderator's decision on an already stored message
    pub fn moderation_applied(
        room_id: &str,
        message_id: i64,
        action: &str,
        moderator_id: &str,
    ) -> Self {
        Self::new(
            ServerFrameType::MessageModerated,
            json!({
                "room_id": room_id,
                "message_id": message_id,
                "status": action,
                "moderator_id": moderator_id,
            }),
        )
    }

    pub fn typing(sender_id: &str, sender_name: &str, is_typing: bool) -> Self {
        Self::new(
            ServerFrameType::Typing,
            json!({
                "sender_id": sender_id,
                "sender_name": sender_name,
                "is_typing": is_typing,
            }),
        )
    }

    /// Relayed signaling frame. The payload passes through untouched.
    pub fn signal(envelope: &SignalingEnvelope) -> Self {
        let frame_type = match envelope.kind {
            SignalKind::Offer => ServerFrameType::WebrtcOffer,
            SignalKind::Answer => ServerFrameType::WebrtcAnswer,
            SignalKind::IceCandidate => ServerFrameType::IceCandidate,
        };
        Self::new(
            frame_type,
            json!({
                "sender_id": envelope.sender_id,
                "sender_name": envelope.sender_name,
                "target_id": envelope.target_id,
                "payload": envelope.payload,
            }),
        )
    }

    pub fn user_action(
        sender_id: &str,
        sender_name: &str,
        action: PresenceAction,
        value: Option<Value>,
        participant: &ParticipantInfo,
    ) -> Self {
        Self::new(
            ServerFrameType::UserAction,
            json!({
                "sender_id": sender_id,
                "sender_name": sender_name,
                "action": action,
                "value": value,
                "participant": participant,
            }),
        )
    }

    pub fn media_stream_event(
        sender_id: &str,
        event_type: MediaEventKind,
        stream_type: StreamKind,
        stream_id: Option<&str>,
    ) -> Self {
        Self::new(
            ServerFrameType::MediaStreamEvent,
            json!({
                "sender_id": sender_id,
                "event_type": event_type,
                "stream_type": stream_type,
                "stream_id": stream_id,
            }),
        )
    }

    pub fn recording_control(sender_id: &str, action: RecordingAction, is_recording: bool) -> Self {
        Self::new(
            ServerFrameType::RecordingControl,
            json!({
                "sender_id": sender_id,
                "action": action,
                "is_recording": is_recording,
            }),
        )
    }

    pub fn participants_list(room_id: &str, participants: &[ParticipantInfo]) -> Self {
        Self::new(
            ServerFrameType::ParticipantsList,
            json!({
                "room_id": room_id,
                "participants": participants,
                "participant_count": participants.len(),
            }),
        )
    }

    pub fn pong() -> Self {
        Self::new(ServerFrameType::Pong, json!({}))
    }
}
