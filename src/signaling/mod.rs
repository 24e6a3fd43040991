// WebRTC signaling relay. Routes offer/answer/ICE envelopes between room
// peers without ever inspecting the media payloads.

// Public API
pub use envelope::{ExchangePhase, SignalKind, SignalingEnvelope};
pub use relay::SignalingRelay;

// Internal modules
mod envelope;
mod relay;
