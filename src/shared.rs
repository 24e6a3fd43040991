use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::AuthService;
use crate::broadcast::BroadcastEngine;
use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::event::EventBus;
use crate::room::RoomSessionManager;
use crate::signaling::SignalingRelay;
use crate::websockets::MessageDispatcher;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: Arc<dyn AuthService>,
    pub sessions: Arc<RoomSessionManager>,
    pub engine: Arc<BroadcastEngine>,
    pub relay: Arc<SignalingRelay>,
    pub chat: Arc<ChatService>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub event_bus: EventBus,
}

/// Error taxonomy for the routing core.
///
/// Every variant except `MalformedFrame` is a recoverable condition: the
/// connection's receive loop logs it and keeps running. `MalformedFrame`
/// (text that is not well-formed JSON) is the single condition that closes
/// the connection.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("room {room_id} is full ({max_participants} participants)")]
    RoomFull {
        room_id: String,
        max_participants: usize,
    },

    #[error("unknown frame type: {0}")]
    UnknownFrameType(String),

    #[error("handler failure: {0}")]
    HandlerFailure(String),

    #[error("delivery failure: {0}")]
    DeliveryFailure(String),

    #[error("signaling target not found: {0}")]
    SignalingTargetNotFound(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Whether this error must terminate the connection
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::MalformedFrame(_))
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            CoreError::AuthenticationFailure(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            CoreError::RoomFull { .. } => (StatusCode::CONFLICT, self.to_string()),
            CoreError::Storage(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", msg),
            ),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_malformed_frames_are_fatal() {
        assert!(CoreError::MalformedFrame("not json".to_string()).is_fatal());

        assert!(!CoreError::AuthenticationFailure("bad token".to_string()).is_fatal());
        assert!(!CoreError::RoomFull {
            room_id: "r1".to_string(),
            max_participants: 4
        }
        .is_fatal());
        assert!(!CoreError::UnknownFrameType("dance".to_string()).is_fatal());
        assert!(!CoreError::HandlerFailure("boom".to_string()).is_fatal());
        assert!(!CoreError::DeliveryFailure("queue closed".to_string()).is_fatal());
        assert!(!CoreError::SignalingTargetNotFound("u9".to_string()).is_fatal());
        assert!(!CoreError::Storage("db down".to_string()).is_fatal());
    }
}
