use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::messages::ServerFrame;
use crate::broadcast::BroadcastEngine;
use crate::event::{EventError, EventSubscriber, RoomEvent};

/// Global bus subscriber that turns domain events into live WebSocket
/// delivery. Registered once at startup; this is the bridge between the
/// persistence-facing send path and the fan-out engine.
pub struct WebSocketSubscriber {
    engine: Arc<BroadcastEngine>,
}

impl WebSocketSubscriber {
    pub fn new(engine: Arc<BroadcastEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EventSubscriber for WebSocketSubscriber {
    async fn on_event(&self, event: &RoomEvent) -> Result<(), EventError> {
        let frame = match event {
            RoomEvent::MessageStored {
                room_id,
                message_id,
                sender_id,
                sender_name,
                content,
            } => ServerFrame::chat_message(room_id, *message_id, sender_id, sender_name, content),

            RoomEvent::MessageRejected {
                room_id,
                sender_id,
                violations,
                filtered_content,
                ..
            } => ServerFrame::message_rejected(room_id, sender_id, violations, filtered_content),

            RoomEvent::ModerationApplied {
                room_id,
                message_id,
                action,
                moderator_id,
            } => ServerFrame::moderation_applied(room_id, *message_id, action.as_str(), moderator_id),
        };

        // Chat and moderation outcomes echo back to the sender's own socket
        let delivered = self.engine.broadcast(event.room_id(), &frame, None).await;
        debug!(
            room_id = %event.room_id(),
            event_type = event.event_type(),
            delivered = delivered,
            "Event fanned out to WebSocket connections"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "websocket_subscriber"
    }
}
