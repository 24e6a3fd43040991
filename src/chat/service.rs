use std::sync::Arc;
use tracing::{info, instrument};

use super::repository::{MessageId, MessageStore};
use crate::event::{EventBus, ModerationAction, RoomEvent};
use crate::moderation::ContentFilter;
use crate::shared::CoreError;

/// The chat send path.
///
/// Moderation runs synchronously before the persistence commit; a rejected
/// message never reaches the store and only its redacted form leaves this
/// service. Accepted messages are stored first so every downstream consumer
/// sees the durable id.
pub struct ChatService {
    filter: ContentFilter,
    store: Arc<dyn MessageStore>,
    bus: EventBus,
}

impl ChatService {
    pub fn new(filter: ContentFilter, store: Arc<dyn MessageStore>, bus: EventBus) -> Self {
        Self { filter, store, bus }
    }

    #[instrument(skip(self, content), fields(sender_id = %sender_id))]
    pub async fn send(
        &self,
        room_id: &str,
        sender_id: &str,
        sender_name: &str,
        content: &str,
    ) -> Result<(), CoreError> {
        let verdict = self.filter.check(content);

        if !verdict.is_valid {
            info!(
                room_id = %room_id,
                violations = ?verdict.violations,
                "Message rejected by content filter"
            );
            self.bus
                .notify(
                    room_id,
                    RoomEvent::MessageRejected {
                        room_id: room_id.to_string(),
                        sender_id: sender_id.to_string(),
                        sender_name: sender_name.to_string(),
                        violations: verdict.violations,
                        filtered_content: verdict.filtered_content,
                    },
                )
                .await;
            return Ok(());
        }

        let message_id = self.store.store_message(room_id, sender_id, content).await?;

        self.bus
            .notify(
                room_id,
                RoomEvent::MessageStored {
                    room_id: room_id.to_string(),
                    message_id,
                    sender_id: sender_id.to_string(),
                    sender_name: sender_name.to_string(),
                    content: content.to_string(),
                },
            )
            .await;

        Ok(())
    }

    /// Bridges an external moderator's decision on a stored message onto the
    /// bus so live subscribers see it.
    #[instrument(skip(self))]
    pub async fn apply_moderation(
        &self,
        message_id: MessageId,
        action: ModerationAction,
        moderator_id: &str,
    ) -> Result<(), CoreError> {
        let message = self
            .store
            .message(message_id)
            .await?
            .ok_or_else(|| CoreError::Storage(format!("message {} not found", message_id)))?;

        info!(
            room_id = %message.room_id,
            message_id = message_id,
            action = action.as_str(),
            "Moderation action applied"
        );

        let room_id = message.room_id.clone();
        self.bus
            .notify(
                &room_id,
                RoomEvent::ModerationApplied {
                    room_id: message.room_id,
                    message_id,
                    action,
                    moderator_id: moderator_id.to_string(),
                },
            )
            .await;

        Ok(())
    }
}
