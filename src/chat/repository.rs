use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::shared::CoreError;

pub type MessageId = i64;

/// A durably stored chat message
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: MessageId,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The persistence collaborator contract. The store assigns the canonical
/// message id; broadcast payloads always carry it, never a client-side
/// placeholder.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn store_message(
        &self,
        room_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<MessageId, CoreError>;

    async fn message(&self, message_id: MessageId) -> Result<Option<StoredMessage>, CoreError>;
}

/// In-memory implementation for development and testing
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn store_message(
        &self,
        room_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<MessageId, CoreError> {
        let mut messages = self.messages.lock().unwrap();
        let id = messages.len() as MessageId + 1;
        messages.push(StoredMessage {
            id,
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        });

        debug!(room_id = %room_id, message_id = id, "Message stored in memory");
        Ok(id)
    }

    async fn message(&self, message_id: MessageId) -> Result<Option<StoredMessage>, CoreError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages.iter().find(|m| m.id == message_id).cloned())
    }
}

/// PostgreSQL-backed implementation
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    #[instrument(skip(self, content))]
    async fn store_message(
        &self,
        room_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<MessageId, CoreError> {
        let row = sqlx::query(
            "INSERT INTO messages (room_id, sender_id, content, created_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;

        let id: MessageId = row.get("id");
        debug!(room_id = %room_id, message_id = id, "Message stored in database");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn message(&self, message_id: MessageId) -> Result<Option<StoredMessage>, CoreError> {
        let row = sqlx::query(
            "SELECT id, room_id, sender_id, content, created_at
             FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;

        Ok(row.map(|row| StoredMessage {
            id: row.get("id"),
            room_id: row.get("room_id"),
            sender_id: row.get("sender_id"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        }))
    }
}
