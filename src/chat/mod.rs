// The chat send path: content filter -> durable store -> event bus.

// Public API
pub use repository::{InMemoryMessageStore, MessageId, MessageStore, PostgresMessageStore, StoredMessage};
pub use service::ChatService;

// Internal modules
mod repository;
mod service;
