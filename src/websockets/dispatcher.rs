use std::sync::Arc;
use tracing::{debug, warn};

use super::messages::{
    ClientFrame, MediaEventKind, ServerFrame, StreamKind,
};
use crate::broadcast::{BroadcastEngine, OutboundQueue};
use crate::chat::ChatService;
use crate::room::{PresenceField, RoomSessionManager};
use crate::shared::CoreError;
use crate::signaling::{SignalKind, SignalingEnvelope, SignalingRelay};

/// Per-connection identity handed to every dispatch call
#[derive(Clone)]
pub struct ConnectionContext {
    pub connection_id: String,
    pub room_id: String,
    pub principal_id: String,
    pub display_name: String,
    /// The connection's own outbound queue, for in-place replies
    pub queue: Arc<OutboundQueue>,
}

impl ConnectionContext {
    /// Queue a frame straight back to this connection
    pub fn reply(&self, frame: &ServerFrame) {
        match serde_json::to_string(frame) {
            Ok(text) => {
                if let Err(e) = self.queue.push(text) {
                    debug!(
                        connection_id = %self.connection_id,
                        outcome = ?e,
                        "In-place reply dropped"
                    );
                }
            }
            Err(e) => {
                warn!(connection_id = %self.connection_id, error = %e, "Failed to serialize reply");
            }
        }
    }
}

/// What the receive loop should do after a frame was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    Disconnect,
}

/// Classifies inbound frames and routes them to the chat, signaling and
/// presence paths.
///
/// Dispatch is the isolation boundary of the receive loop: a handler error
/// is logged and the loop continues. The only fatal condition is text that
/// is not well-formed JSON. Well-formed JSON with an unknown `type` is
/// logged and dropped.
pub struct MessageDispatcher {
    sessions: Arc<RoomSessionManager>,
    engine: Arc<BroadcastEngine>,
    relay: Arc<SignalingRelay>,
    chat: Arc<ChatService>,
}

impl MessageDispatcher {
    pub fn new(
        sessions: Arc<RoomSessionManager>,
        engine: Arc<BroadcastEngine>,
        relay: Arc<SignalingRelay>,
        chat: Arc<ChatService>,
    ) -> Self {
        Self {
            sessions,
            engine,
            relay,
            chat,
        }
    }

    pub async fn dispatch(&self, ctx: &ConnectionContext, text: &str) -> DispatchOutcome {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                let err = CoreError::MalformedFrame(e.to_string());
                warn!(
                    connection_id = %ctx.connection_id,
                    room_id = %ctx.room_id,
                    error = %err,
                    "Closing connection on unparseable frame"
                );
                return DispatchOutcome::Disconnect;
            }
        };

        let frame: ClientFrame = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(e) => {
                let err = CoreError::UnknownFrameType(e.to_string());
                debug!(
                    connection_id = %ctx.connection_id,
                    room_id = %ctx.room_id,
                    error = %err,
                    "Dropping frame"
                );
                return DispatchOutcome::Continue;
            }
        };

        if let Err(e) = self.handle(ctx, frame).await {
            let err = CoreError::HandlerFailure(e.to_string());
            warn!(
                connection_id = %ctx.connection_id,
                room_id = %ctx.room_id,
                error = %err,
                "Frame handler failed, connection stays open"
            );
        }

        DispatchOutcome::Continue
    }

    async fn handle(&self, ctx: &ConnectionContext, frame: ClientFrame) -> Result<(), CoreError> {
        match frame {
            ClientFrame::ChatMessage { content } => {
                self.chat
                    .send(&ctx.room_id, &ctx.principal_id, &ctx.display_name, &content)
                    .await
            }

            ClientFrame::Typing { is_typing } => {
                let frame = ServerFrame::typing(&ctx.principal_id, &ctx.display_name, is_typing);
                self.engine
                    .broadcast(&ctx.room_id, &frame, Some(&ctx.connection_id))
                    .await;
                Ok(())
            }

            ClientFrame::WebrtcOffer { payload, target_id } => {
                self.relay_signal(ctx, SignalKind::Offer, payload, target_id)
                    .await
            }

            ClientFrame::WebrtcAnswer { payload, target_id } => {
                self.relay_signal(ctx, SignalKind::Answer, payload, target_id)
                    .await
            }

            ClientFrame::IceCandidate {
                candidate,
                target_id,
            } => {
                self.relay_signal(ctx, SignalKind::IceCandidate, candidate, target_id)
                    .await
            }

            ClientFrame::UserAction { action, value } => {
                let (field, flag) = action.as_presence_change();
                let Some(participant) = self
                    .sessions
                    .update_presence(&ctx.room_id, &ctx.connection_id, field, flag)
                    .await
                else {
                    return Err(CoreError::HandlerFailure(format!(
                        "presence update on unknown connection {}",
                        ctx.connection_id
                    )));
                };

                let frame = ServerFrame::user_action(
                    &ctx.principal_id,
                    &ctx.display_name,
                    action,
                    value,
                    &participant,
                );
                self.engine
                    .broadcast(&ctx.room_id, &frame, Some(&ctx.connection_id))
                    .await;
                Ok(())
            }

            ClientFrame::MediaStreamEvent {
                event_type,
                stream_type,
                stream_id,
            } => {
                let (field, flag) = media_presence_change(event_type, stream_type);
                self.sessions
                    .update_presence(&ctx.room_id, &ctx.connection_id, field, flag)
                    .await;

                let frame = ServerFrame::media_stream_event(
                    &ctx.principal_id,
                    event_type,
                    stream_type,
                    stream_id.as_deref(),
                );
                self.engine
                    .broadcast(&ctx.room_id, &frame, Some(&ctx.connection_id))
                    .await;
                Ok(())
            }

            ClientFrame::RecordingControl { action } => {
                let Some(is_recording) =
                    self.sessions.set_recording(&ctx.room_id, action).await
                else {
                    return Err(CoreError::HandlerFailure(format!(
                        "recording control for unknown room {}",
                        ctx.room_id
                    )));
                };

                let frame = ServerFrame::recording_control(&ctx.principal_id, action, is_recording);
                // Everyone sees the recording state change, the sender included
                self.engine.broadcast(&ctx.room_id, &frame, None).await;
                Ok(())
            }

            ClientFrame::Ping {} => {
                ctx.reply(&ServerFrame::pong());
                Ok(())
            }

            ClientFrame::GetParticipants {} => {
                let participants = self.sessions.participants(&ctx.room_id).await;
                ctx.reply(&ServerFrame::participants_list(&ctx.room_id, &participants));
                Ok(())
            }
        }
    }

    async fn relay_signal(
        &self,
        ctx: &ConnectionContext,
        kind: SignalKind,
        payload: serde_json::Value,
        target_id: Option<String>,
    ) -> Result<(), CoreError> {
        let mut envelope =
            SignalingEnvelope::new(&ctx.principal_id, &ctx.display_name, kind, payload);
        if let Some(target_id) = target_id {
            envelope = envelope.with_target(target_id);
        }

        self.relay
            .relay(&ctx.room_id, &ctx.connection_id, envelope)
            .await;
        Ok(())
    }
}

// Media stream events fold into the same presence flags that user actions
// set: audio is muted once its stream ends, video and screen share are on
// while theirs run.
fn media_presence_change(event: MediaEventKind, stream: StreamKind) -> (PresenceField, bool) {
    match stream {
        StreamKind::Audio => (
            PresenceField::AudioMuted,
            event == MediaEventKind::StreamEnded,
        ),
        StreamKind::Video => (
            PresenceField::VideoEnabled,
            event == MediaEventKind::StreamStarted,
        ),
        StreamKind::Screen => (
            PresenceField::ScreenSharing,
            event == MediaEventKind::StreamStarted,
        ),
    }
}
