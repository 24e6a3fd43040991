// Fan-out delivery with per-connection failure isolation.
//
// Every live connection owns one bounded `OutboundQueue`; the engine only
// ever enqueues. A connection whose queue is closed (send failure, overflow
// under the Disconnect policy) is effectively marked for pruning: its own
// socket task observes the closed queue and runs the normal leave path.

// Public API
pub use engine::BroadcastEngine;
pub use outbound::{OutboundQueue, OverflowPolicy, PushError, PushOutcome};

// Internal modules
mod engine;
mod outbound;
