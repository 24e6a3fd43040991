use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signal type tags routed by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Routing metadata plus an opaque payload.
///
/// The relay only ever reads the routing fields; `payload` is carried as-is
/// so codec or media-stack changes never touch this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingEnvelope {
    pub sender_id: String,
    pub sender_name: String,
    pub target_id: Option<String>,
    pub kind: SignalKind,
    pub payload: Value,
}

impl SignalingEnvelope {
    pub fn new(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        kind: SignalKind,
        payload: Value,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            target_id: None,
            kind,
            payload,
        }
    }

    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }
}

/// Loose progression of one signaling exchange. ICE candidates are routed at
/// any phase and never advance it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    OfferSent,
    AnswerReceived,
    Connected,
}
