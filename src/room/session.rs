use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::models::{ConnectionId, ConnectionKind, ParticipantInfo, PresenceField};
use super::registry::ConnectionRegistry;
use crate::auth::Principal;
use crate::broadcast::{BroadcastEngine, OutboundQueue};
use crate::shared::CoreError;
use crate::websockets::{RecordingAction, ServerFrame};

/// What a successful join hands back to the caller
pub struct JoinSnapshot {
    pub connection_id: ConnectionId,
    pub room_id: String,
    /// Room participants at join time, including the new member
    pub participants: Vec<ParticipantInfo>,
    pub participant_count: usize,
}

/// Join/leave semantics and presence on top of the registry.
///
/// Peer notification goes through the broadcast engine: `user_joined` to
/// everyone but the new member, `user_left` to whoever remains.
pub struct RoomSessionManager {
    registry: Arc<ConnectionRegistry>,
    engine: Arc<BroadcastEngine>,
}

impl RoomSessionManager {
    pub fn new(registry: Arc<ConnectionRegistry>, engine: Arc<BroadcastEngine>) -> Self {
        Self { registry, engine }
    }

    #[instrument(skip(self, principal, queue), fields(principal_id = %principal.id))]
    pub async fn join(
        &self,
        principal: &Principal,
        room_id: &str,
        kind: ConnectionKind,
        queue: Arc<OutboundQueue>,
    ) -> Result<JoinSnapshot, CoreError> {
        let registered = self
            .registry
            .register(principal, room_id, kind, queue)
            .await?;

        let frame = ServerFrame::user_joined(
            room_id,
            &principal.id,
            &principal.display_name,
            registered.participant_count,
        );
        self.engine
            .broadcast(room_id, &frame, Some(&registered.connection_id))
            .await;

        Ok(JoinSnapshot {
            connection_id: registered.connection_id,
            room_id: room_id.to_string(),
            participants: registered.participants,
            participant_count: registered.participant_count,
        })
    }

    /// Idempotent: leaving an already-removed connection is a no-op.
    /// Returns whether a connection was actually removed.
    #[instrument(skip(self))]
    pub async fn leave(&self, room_id: &str, connection_id: &str) -> bool {
        let Some(removed) = self.registry.remove(room_id, connection_id).await else {
            debug!(
                room_id = %room_id,
                connection_id = %connection_id,
                "Leave on unknown connection, nothing to do"
            );
            return false;
        };

        if !removed.room_deleted {
            let frame = ServerFrame::user_left(
                room_id,
                &removed.connection.principal_id,
                &removed.connection.display_name,
                removed.remaining_count,
            );
            self.engine.broadcast(room_id, &frame, None).await;
        }

        info!(
            room_id = %room_id,
            principal_id = %removed.connection.principal_id,
            remaining = removed.remaining_count,
            "Participant left"
        );
        true
    }

    pub async fn update_presence(
        &self,
        room_id: &str,
        connection_id: &str,
        field: PresenceField,
        value: bool,
    ) -> Option<ParticipantInfo> {
        self.registry
            .update_presence(room_id, connection_id, field, value)
            .await
    }

    pub async fn participants(&self, room_id: &str) -> Vec<ParticipantInfo> {
        self.registry.participants(room_id).await
    }

    /// Applies a recording control action; `None` when the room is gone
    pub async fn set_recording(&self, room_id: &str, action: RecordingAction) -> Option<bool> {
        self.registry
            .set_recording(room_id, action == RecordingAction::Start)
            .await
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}
