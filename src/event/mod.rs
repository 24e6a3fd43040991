// Observer layer bridging persisted domain events to live delivery.
//
// Producers (the chat send path, moderation actions) call
// `EventBus::notify`; subscribers react without any coupling to where the
// event came from.

// Public API
pub use bus::EventBus;
pub use events::{ModerationAction, RoomEvent, Scope};
pub use subscriber::{EventError, EventSubscriber};

// Internal modules
mod bus;
mod events;
mod subscriber;
