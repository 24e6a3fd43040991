use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::models::{
    Connection, ConnectionId, ConnectionKind, ConnectionState, Member, ParticipantInfo,
    PresenceField, PrincipalId, Room,
};
use crate::auth::Principal;
use crate::broadcast::OutboundQueue;
use crate::shared::CoreError;

/// Outcome of registering a new connection
pub struct RegisteredConnection {
    pub connection_id: ConnectionId,
    /// Snapshot of the room after the join, including the new member
    pub participants: Vec<ParticipantInfo>,
    pub participant_count: usize,
}

/// Outcome of removing a connection
pub struct RemovedConnection {
    pub connection: Connection,
    pub remaining_count: usize,
    pub room_deleted: bool,
}

/// In-memory registry of rooms and live connections.
///
/// Locking discipline: the room-existence map sits behind one `RwLock` and
/// each room behind its own `Mutex`, so traffic in one room never serializes
/// another. The principal index is a separate `RwLock` map giving O(1) point
/// delivery. Lock order is always map, then room; no operation ever holds
/// two room locks at once.
pub struct ConnectionRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    principals: RwLock<HashMap<PrincipalId, PrincipalEntry>>,
    max_participants: usize,
}

struct PrincipalEntry {
    room_id: String,
    connection_id: ConnectionId,
    queue: Arc<OutboundQueue>,
}

impl ConnectionRegistry {
    pub fn new(max_participants: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            principals: RwLock::new(HashMap::new()),
            max_participants,
        }
    }

    /// Registers a connection for `principal` in `room_id`, creating the room
    /// on first join. Fails with `RoomFull` before any state is touched.
    pub async fn register(
        &self,
        principal: &Principal,
        room_id: &str,
        kind: ConnectionKind,
        queue: Arc<OutboundQueue>,
    ) -> Result<RegisteredConnection, CoreError> {
        let rooms = self.rooms.read().await;

        let registered = if let Some(room) = rooms.get(room_id) {
            let room = Arc::clone(room);
            let result = self.insert_member(&room, principal, room_id, kind, &queue).await;
            drop(rooms);
            result?
        } else {
            drop(rooms);
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .entry(room_id.to_string())
                .or_insert_with(|| {
                    debug!(room_id = %room_id, "Creating room on first join");
                    Arc::new(Mutex::new(Room::new(room_id, self.max_participants)))
                })
                .clone();
            let result = self.insert_member(&room, principal, room_id, kind, &queue).await;
            drop(rooms);
            result?
        };

        let mut principals = self.principals.write().await;
        // Last write wins: a second socket for the same principal takes over
        // point delivery while the old connection keeps its room seat.
        principals.insert(
            principal.id.clone(),
            PrincipalEntry {
                room_id: room_id.to_string(),
                connection_id: registered.connection_id.clone(),
                queue,
            },
        );

        info!(
            room_id = %room_id,
            principal_id = %principal.id,
            connection_id = %registered.connection_id,
            participant_count = registered.participant_count,
            "Connection registered"
        );

        Ok(registered)
    }

    // Caller holds a rooms-map guard so the room cannot be deleted from under us.
    async fn insert_member(
        &self,
        room: &Arc<Mutex<Room>>,
        principal: &Principal,
        room_id: &str,
        kind: ConnectionKind,
        queue: &Arc<OutboundQueue>,
    ) -> Result<RegisteredConnection, CoreError> {
        let mut guard = room.lock().await;

        if guard.is_full() {
            warn!(
                room_id = %room_id,
                principal_id = %principal.id,
                max_participants = guard.max_participants,
                "Join rejected, room is full"
            );
            return Err(CoreError::RoomFull {
                room_id: room_id.to_string(),
                max_participants: guard.max_participants,
            });
        }

        let mut connection =
            Connection::new(&principal.id, &principal.display_name, room_id, kind);
        connection.state = ConnectionState::Active;
        let connection_id = connection.id.clone();

        guard.members.insert(
            connection_id.clone(),
            Member {
                connection,
                queue: Arc::clone(queue),
            },
        );

        Ok(RegisteredConnection {
            connection_id,
            participants: guard.participants(),
            participant_count: guard.member_count(),
        })
    }

    /// Removes a connection. Idempotent: removing an unknown connection is a
    /// no-op returning `None`. Deletes the room entry when it empties.
    pub async fn remove(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Option<RemovedConnection> {
        let mut rooms = self.rooms.write().await;
        let room = Arc::clone(rooms.get(room_id)?);
        let mut guard = room.lock().await;

        let mut member = match guard.members.remove(connection_id) {
            Some(member) => member,
            None => {
                debug!(
                    room_id = %room_id,
                    connection_id = %connection_id,
                    "Connection already removed"
                );
                return None;
            }
        };

        member.connection.state = ConnectionState::Disconnected;
        member.queue.close();

        let remaining_count = guard.member_count();
        let room_deleted = remaining_count == 0;
        if room_deleted {
            rooms.remove(room_id);
            info!(room_id = %room_id, "Room deleted after last member left");
        }
        drop(guard);
        drop(rooms);

        let mut principals = self.principals.write().await;
        let points_here = principals
            .get(&member.connection.principal_id)
            .map(|entry| entry.connection_id == connection_id)
            .unwrap_or(false);
        if points_here {
            principals.remove(&member.connection.principal_id);
        }

        info!(
            room_id = %room_id,
            connection_id = %connection_id,
            principal_id = %member.connection.principal_id,
            remaining = remaining_count,
            "Connection removed"
        );

        Some(RemovedConnection {
            connection: member.connection,
            remaining_count,
            room_deleted,
        })
    }

    /// Mutates one presence flag and returns the updated participant state
    pub async fn update_presence(
        &self,
        room_id: &str,
        connection_id: &str,
        field: PresenceField,
        value: bool,
    ) -> Option<ParticipantInfo> {
        let rooms = self.rooms.read().await;
        let room = rooms.get(room_id)?;
        let mut guard = room.lock().await;

        let member = guard.members.get_mut(connection_id)?;
        member.connection.apply_presence(field, value);
        Some(member.connection.participant_info())
    }

    /// Current participants of a room; empty when the room does not exist
    pub async fn participants(&self, room_id: &str) -> Vec<ParticipantInfo> {
        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            Some(room) => room.lock().await.participants(),
            None => Vec::new(),
        }
    }

    /// Connection record for a principal, if one is live
    pub async fn find_by_principal(&self, principal_id: &str) -> Option<Connection> {
        let (room_id, connection_id) = {
            let principals = self.principals.read().await;
            let entry = principals.get(principal_id)?;
            (entry.room_id.clone(), entry.connection_id.clone())
        };

        let rooms = self.rooms.read().await;
        let room = rooms.get(&room_id)?;
        let guard = room.lock().await;
        guard
            .members
            .get(&connection_id)
            .map(|member| member.connection.clone())
    }

    /// Outbound queues of a room's members, optionally excluding one connection
    pub async fn room_queues(
        &self,
        room_id: &str,
        exclude: Option<&str>,
    ) -> Vec<(ConnectionId, Arc<OutboundQueue>)> {
        let rooms = self.rooms.read().await;
        let Some(room) = rooms.get(room_id) else {
            return Vec::new();
        };
        let guard = room.lock().await;
        guard
            .members
            .iter()
            .filter(|(id, _)| exclude != Some(id.as_str()))
            .map(|(id, member)| (id.clone(), Arc::clone(&member.queue)))
            .collect()
    }

    /// O(1) point-delivery lookup by principal
    pub async fn principal_queue(
        &self,
        principal_id: &str,
    ) -> Option<(ConnectionId, Arc<OutboundQueue>)> {
        let principals = self.principals.read().await;
        principals
            .get(principal_id)
            .map(|entry| (entry.connection_id.clone(), Arc::clone(&entry.queue)))
    }

    /// Flips the room's recording flag; returns the new value
    pub async fn set_recording(&self, room_id: &str, recording: bool) -> Option<bool> {
        let rooms = self.rooms.read().await;
        let room = rooms.get(room_id)?;
        let mut guard = room.lock().await;
        guard.is_recording = recording;
        Some(guard.is_recording)
    }

    pub async fn is_recording(&self, room_id: &str) -> bool {
        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            Some(room) => room.lock().await.is_recording,
            None => false,
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Total live connections, summed across rooms
    pub async fn connection_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        let mut total = 0;
        for room in rooms.values() {
            total += room.lock().await.member_count();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::OverflowPolicy;

    fn queue() -> Arc<OutboundQueue> {
        Arc::new(OutboundQueue::new(16, OverflowPolicy::DropOldest))
    }

    #[tokio::test]
    async fn join_creates_room_lazily() {
        let registry = ConnectionRegistry::new(4);
        assert_eq!(registry.room_count().await, 0);

        let alice = Principal::new("u1", "Alice");
        let registered = registry
            .register(&alice, "room1", ConnectionKind::Both, queue())
            .await
            .unwrap();

        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registered.participant_count, 1);
        assert_eq!(registered.participants[0].principal_id, "u1");
    }

    #[tokio::test]
    async fn join_rejected_when_room_is_full() {
        let registry = ConnectionRegistry::new(2);

        for (id, name) in [("u1", "Alice"), ("u2", "Bob")] {
            registry
                .register(&Principal::new(id, name), "room1", ConnectionKind::Both, queue())
                .await
                .unwrap();
        }

        let result = registry
            .register(
                &Principal::new("u3", "Carol"),
                "room1",
                ConnectionKind::Both,
                queue(),
            )
            .await;

        assert!(matches!(result, Err(CoreError::RoomFull { .. })));
        // The rejected join created no connection
        assert_eq!(registry.connection_count().await, 2);
        assert!(registry.principal_queue("u3").await.is_none());
    }

    #[tokio::test]
    async fn last_leave_deletes_the_room() {
        let registry = ConnectionRegistry::new(4);
        let alice = Principal::new("u1", "Alice");
        let registered = registry
            .register(&alice, "room1", ConnectionKind::Both, queue())
            .await
            .unwrap();

        let removed = registry
            .remove("room1", &registered.connection_id)
            .await
            .unwrap();

        assert!(removed.room_deleted);
        assert_eq!(removed.remaining_count, 0);
        assert_eq!(removed.connection.state, ConnectionState::Disconnected);
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.participants("room1").await.is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = ConnectionRegistry::new(4);
        let registered = registry
            .register(
                &Principal::new("u1", "Alice"),
                "room1",
                ConnectionKind::Both,
                queue(),
            )
            .await
            .unwrap();

        assert!(registry
            .remove("room1", &registered.connection_id)
            .await
            .is_some());
        assert!(registry
            .remove("room1", &registered.connection_id)
            .await
            .is_none());
        assert!(registry.remove("no-such-room", "nope").await.is_none());
    }

    #[tokio::test]
    async fn presence_update_returns_the_new_state() {
        let registry = ConnectionRegistry::new(4);
        let registered = registry
            .register(
                &Principal::new("u1", "Alice"),
                "room1",
                ConnectionKind::Video,
                queue(),
            )
            .await
            .unwrap();

        let info = registry
            .update_presence(
                "room1",
                &registered.connection_id,
                PresenceField::AudioMuted,
                true,
            )
            .await
            .unwrap();

        assert!(info.is_audio_muted);
        assert!(registry.participants("room1").await[0].is_audio_muted);
    }

    #[tokio::test]
    async fn rejoin_takes_over_point_delivery() {
        let registry = ConnectionRegistry::new(4);
        let alice = Principal::new("u1", "Alice");

        let first = registry
            .register(&alice, "room1", ConnectionKind::Both, queue())
            .await
            .unwrap();
        let second = registry
            .register(&alice, "room2", ConnectionKind::Both, queue())
            .await
            .unwrap();

        let (connection_id, _) = registry.principal_queue("u1").await.unwrap();
        assert_eq!(connection_id, second.connection_id);

        // Removing the stale first connection must not evict the new index entry
        registry.remove("room1", &first.connection_id).await.unwrap();
        assert!(registry.principal_queue("u1").await.is_some());
    }

    #[tokio::test]
    async fn find_by_principal_returns_the_live_connection() {
        let registry = ConnectionRegistry::new(4);
        let registered = registry
            .register(
                &Principal::new("u1", "Alice"),
                "room1",
                ConnectionKind::Video,
                queue(),
            )
            .await
            .unwrap();

        let connection = registry.find_by_principal("u1").await.unwrap();
        assert_eq!(connection.id, registered.connection_id);
        assert_eq!(connection.room_id, "room1");
        assert_eq!(connection.state, ConnectionState::Active);
        assert_eq!(connection.kind, ConnectionKind::Video);

        assert!(registry.find_by_principal("u404").await.is_none());

        registry.remove("room1", &registered.connection_id).await;
        assert!(registry.find_by_principal("u1").await.is_none());
    }

    #[tokio::test]
    async fn recording_flag_round_trip() {
        let registry = ConnectionRegistry::new(4);
        registry
            .register(
                &Principal::new("u1", "Alice"),
                "room1",
                ConnectionKind::Both,
                queue(),
            )
            .await
            .unwrap();

        assert!(!registry.is_recording("room1").await);
        assert_eq!(registry.set_recording("room1", true).await, Some(true));
        assert!(registry.is_recording("room1").await);
        assert_eq!(registry.set_recording("missing", true).await, None);
    }
}
