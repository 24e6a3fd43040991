// Room membership core: who is connected, to which room, with what presence.
//
// The registry owns all Connection state. The session manager layers
// join/leave semantics and peer notification on top of it.

// Public API
pub use models::{
    Connection, ConnectionId, ConnectionKind, ConnectionState, ParticipantInfo, Presence,
    PresenceField, PrincipalId, Room,
};
pub use registry::{ConnectionRegistry, RegisteredConnection, RemovedConnection};
pub use session::{JoinSnapshot, RoomSessionManager};

// Internal modules
mod models;
mod registry;
mod session;
