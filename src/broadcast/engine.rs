use std::sync::Arc;
use tracing::{debug, warn};

use super::outbound::{PushError, PushOutcome};
use crate::room::ConnectionRegistry;
use crate::shared::CoreError;
use crate::websockets::ServerFrame;

/// Fan-out and point delivery over the connection registry.
///
/// Delivery is best-effort, at-most-once, FIFO per connection. The central
/// invariant is failure isolation: one connection's enqueue failure never
/// stops delivery to the rest.
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastEngine {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Delivers `frame` to every connection in `room_id` except `exclude`.
    /// Returns how many connections the frame was queued for.
    pub async fn broadcast(
        &self,
        room_id: &str,
        frame: &ServerFrame,
        exclude: Option<&str>,
    ) -> usize {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "Failed to serialize outbound frame");
                return 0;
            }
        };

        let targets = self.registry.room_queues(room_id, exclude).await;
        let mut delivered = 0;

        for (connection_id, queue) in targets {
            match queue.push(text.clone()) {
                Ok(PushOutcome::Queued) => delivered += 1,
                Ok(PushOutcome::DroppedOldest) => {
                    delivered += 1;
                    warn!(
                        room_id = %room_id,
                        connection_id = %connection_id,
                        "Outbound queue full, dropped oldest frame"
                    );
                }
                Err(PushError::Overflow) => {
                    let err = CoreError::DeliveryFailure(format!(
                        "outbound queue overflowed for connection {}",
                        connection_id
                    ));
                    warn!(room_id = %room_id, error = %err, "Connection marked for pruning");
                }
                Err(PushError::Closed) => {
                    debug!(
                        room_id = %room_id,
                        connection_id = %connection_id,
                        "Skipping connection pending pruning"
                    );
                }
            }
        }

        delivered
    }

    /// Point delivery to a principal's live connection. Returns `false` when
    /// the principal has no live connection or its queue refused the frame,
    /// a routine outcome rather than an error.
    pub async fn send_to(&self, principal_id: &str, frame: &ServerFrame) -> bool {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(principal_id = %principal_id, error = %e, "Failed to serialize outbound frame");
                return false;
            }
        };

        match self.registry.principal_queue(principal_id).await {
            Some((connection_id, queue)) => match queue.push(text) {
                Ok(_) => true,
                Err(e) => {
                    debug!(
                        principal_id = %principal_id,
                        connection_id = %connection_id,
                        outcome = ?e,
                        "Point delivery failed"
                    );
                    false
                }
            },
            None => {
                debug!(principal_id = %principal_id, "No live connection for principal");
                false
            }
        }
    }
}
