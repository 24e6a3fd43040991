use async_trait::async_trait;
use thiserror::Error;

use super::events::RoomEvent;

/// Errors surfaced by a subscriber. The bus logs them; it never retries and
/// a failing subscriber simply misses that event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("subscriber failure: {0}")]
    Failure(String),
}

impl EventError {
    pub fn failure(msg: impl Into<String>) -> Self {
        EventError::Failure(msg.into())
    }
}

/// A bus subscriber. `name()` doubles as the idempotence key: subscribing
/// the same name to the same scope twice is a no-op, so one event can never
/// fire a callback more than once.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn on_event(&self, event: &RoomEvent) -> Result<(), EventError>;

    fn name(&self) -> &'static str;
}
