use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

use super::envelope::{ExchangePhase, SignalKind, SignalingEnvelope};
use crate::broadcast::BroadcastEngine;
use crate::shared::CoreError;
use crate::websockets::ServerFrame;

struct ExchangeState {
    phase: ExchangePhase,
    signals: u64,
}

/// Routes signaling envelopes between room peers.
///
/// Targeted envelopes are unicast; a missing target is a benign race (the
/// peer may have just disconnected) and is dropped without surfacing an
/// error to the sender. Untargeted envelopes fan out to the sender's room,
/// excluding the sender.
pub struct SignalingRelay {
    engine: Arc<BroadcastEngine>,
    /// (room_id, principal_id) -> exchange bookkeeping
    exchanges: Mutex<HashMap<(String, String), ExchangeState>>,
}

impl SignalingRelay {
    pub fn new(engine: Arc<BroadcastEngine>) -> Self {
        Self {
            engine,
            exchanges: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self, envelope), fields(kind = ?envelope.kind, sender_id = %envelope.sender_id))]
    pub async fn relay(
        &self,
        room_id: &str,
        exclude_connection: &str,
        envelope: SignalingEnvelope,
    ) {
        self.track(room_id, &envelope);

        let frame = ServerFrame::signal(&envelope);
        match &envelope.target_id {
            Some(target_id) => {
                if !self.engine.send_to(target_id, &frame).await {
                    // The target raced a disconnect; drop silently.
                    let err = CoreError::SignalingTargetNotFound(target_id.clone());
                    debug!(room_id = %room_id, error = %err, "Dropping targeted signal");
                }
            }
            None => {
                let delivered = self
                    .engine
                    .broadcast(room_id, &frame, Some(exclude_connection))
                    .await;
                debug!(
                    room_id = %room_id,
                    delivered = delivered,
                    "Signal fanned out to room"
                );
            }
        }
    }

    // Phase tracking is intentionally loose: offers and answers move the
    // progression, ICE candidates only bump the counter.
    fn track(&self, room_id: &str, envelope: &SignalingEnvelope) {
        let mut exchanges = self.exchanges.lock().unwrap();

        let sender_key = (room_id.to_string(), envelope.sender_id.clone());
        let state = exchanges.entry(sender_key).or_insert(ExchangeState {
            phase: ExchangePhase::Idle,
            signals: 0,
        });
        state.signals += 1;

        match envelope.kind {
            SignalKind::Offer => state.phase = ExchangePhase::OfferSent,
            SignalKind::Answer => {
                state.phase = ExchangePhase::AnswerReceived;
                // An answer addressed to the offerer completes their exchange.
                if let Some(target_id) = &envelope.target_id {
                    let target_key = (room_id.to_string(), target_id.clone());
                    if let Some(target_state) = exchanges.get_mut(&target_key) {
                        if target_state.phase == ExchangePhase::OfferSent {
                            target_state.phase = ExchangePhase::Connected;
                        }
                    }
                }
            }
            SignalKind::IceCandidate => {}
        }
    }

    /// Current phase of a principal's exchange in a room
    pub fn exchange_phase(&self, room_id: &str, principal_id: &str) -> Option<ExchangePhase> {
        let exchanges = self.exchanges.lock().unwrap();
        exchanges
            .get(&(room_id.to_string(), principal_id.to_string()))
            .map(|state| state.phase)
    }

    /// Signals relayed for a principal's exchange in a room
    pub fn signal_count(&self, room_id: &str, principal_id: &str) -> u64 {
        let exchanges = self.exchanges.lock().unwrap();
        exchanges
            .get(&(room_id.to_string(), principal_id.to_string()))
            .map(|state| state.signals)
            .unwrap_or(0)
    }

    /// Drops exchange bookkeeping when a principal leaves a room
    pub fn clear_for(&self, room_id: &str, principal_id: &str) {
        let mut exchanges = self.exchanges.lock().unwrap();
        if exchanges
            .remove(&(room_id.to_string(), principal_id.to_string()))
            .is_some()
        {
            info!(
                room_id = %room_id,
                principal_id = %principal_id,
                "Cleared signaling exchange state"
            );
        }
    }
}
