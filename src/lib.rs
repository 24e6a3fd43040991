// Library crate for the roomcast routing server
// This file exposes the public API for integration tests

pub mod auth;
pub mod broadcast;
pub mod chat;
pub mod config;
pub mod event;
pub mod moderation;
pub mod room;
pub mod shared;
pub mod signaling;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use auth::{AuthService, JwtAuthService, Principal, TokenConfig};
pub use broadcast::{BroadcastEngine, OutboundQueue, OverflowPolicy};
pub use chat::{ChatService, InMemoryMessageStore, MessageStore};
pub use config::AppConfig;
pub use event::{EventBus, EventSubscriber, RoomEvent, Scope};
pub use moderation::ContentFilter;
pub use room::{ConnectionKind, ConnectionRegistry, RoomSessionManager};
pub use shared::{AppState, CoreError};
pub use signaling::{SignalKind, SignalingEnvelope, SignalingRelay};
pub use websockets::{
    ClientSession, ConnectionContext, MessageDispatcher, ServerFrame, SocketWrapper,
    WebSocketSubscriber,
};
