// Public API
pub use dispatcher::{ConnectionContext, DispatchOutcome, MessageDispatcher};
pub use handler::websocket_handler;
pub use messages::{
    ClientFrame, MediaEventKind, PresenceAction, RecordingAction, ServerFrame, ServerFrameType,
    StreamKind,
};
pub use socket::{ClientSession, SocketError, SocketWrapper};
pub use subscriber::WebSocketSubscriber;

// Internal modules
mod dispatcher;
mod handler;
mod messages;
mod socket;
mod subscriber;
