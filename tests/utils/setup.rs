use std::sync::Arc;

use roomcast::auth::Principal;
use roomcast::broadcast::{BroadcastEngine, OutboundQueue, OverflowPolicy};
use roomcast::chat::{ChatService, InMemoryMessageStore};
use roomcast::event::{EventBus, Scope};
use roomcast::moderation::ContentFilter;
use roomcast::room::{ConnectionKind, ConnectionRegistry, JoinSnapshot, RoomSessionManager};
use roomcast::shared::CoreError;
use roomcast::signaling::SignalingRelay;
use roomcast::websockets::{ConnectionContext, MessageDispatcher, WebSocketSubscriber};

/// Builder for the full service graph backed by in-memory collaborators
pub struct TestSetupBuilder {
    max_participants: usize,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            max_participants: 50,
            queue_capacity: 64,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }

    pub fn with_max_participants(mut self, max: usize) -> Self {
        self.max_participants = max;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub async fn build(self) -> TestSetup {
        let registry = Arc::new(ConnectionRegistry::new(self.max_participants));
        let engine = Arc::new(BroadcastEngine::new(Arc::clone(&registry)));
        let sessions = Arc::new(RoomSessionManager::new(
            Arc::clone(&registry),
            Arc::clone(&engine),
        ));
        let relay = Arc::new(SignalingRelay::new(Arc::clone(&engine)));
        let bus = EventBus::new();
        let store = Arc::new(InMemoryMessageStore::new());
        let chat = Arc::new(ChatService::new(
            ContentFilter::new(),
            store.clone(),
            bus.clone(),
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::clone(&sessions),
            Arc::clone(&engine),
            Arc::clone(&relay),
            Arc::clone(&chat),
        ));

        bus.subscribe(
            Scope::Global,
            Arc::new(WebSocketSubscriber::new(Arc::clone(&engine))),
        )
        .await;

        TestSetup {
            registry,
            engine,
            sessions,
            relay,
            bus,
            chat,
            dispatcher,
            store,
            queue_capacity: self.queue_capacity,
            overflow_policy: self.overflow_policy,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestSetup {
    pub registry: Arc<ConnectionRegistry>,
    pub engine: Arc<BroadcastEngine>,
    pub sessions: Arc<RoomSessionManager>,
    pub relay: Arc<SignalingRelay>,
    pub bus: EventBus,
    pub chat: Arc<ChatService>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub store: Arc<InMemoryMessageStore>,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
}

impl TestSetup {
    pub async fn join(&self, principal_id: &str, display_name: &str, room_id: &str) -> TestClient {
        self.try_join(principal_id, display_name, room_id)
            .await
            .expect("join failed")
    }

    pub async fn try_join(
        &self,
        principal_id: &str,
        display_name: &str,
        room_id: &str,
    ) -> Result<TestClient, CoreError> {
        let principal = Principal::new(principal_id, display_name);
        let queue = Arc::new(OutboundQueue::new(self.queue_capacity, self.overflow_policy));

        let snapshot = self
            .sessions
            .join(&principal, room_id, ConnectionKind::Both, Arc::clone(&queue))
            .await?;

        Ok(TestClient {
            principal,
            room_id: room_id.to_string(),
            queue,
            snapshot,
        })
    }
}

/// One simulated connection: the principal, its outbound queue and the
/// snapshot its join returned
pub struct TestClient {
    pub principal: Principal,
    pub room_id: String,
    pub queue: Arc<OutboundQueue>,
    pub snapshot: JoinSnapshot,
}

impl TestClient {
    pub fn connection_id(&self) -> &str {
        &self.snapshot.connection_id
    }

    pub fn ctx(&self) -> ConnectionContext {
        ConnectionContext {
            connection_id: self.snapshot.connection_id.clone(),
            room_id: self.room_id.clone(),
            principal_id: self.principal.id.clone(),
            display_name: self.principal.display_name.clone(),
            queue: Arc::clone(&self.queue),
        }
    }

    /// Pop every frame currently queued for this connection
    pub async fn drain(&self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while !self.queue.is_empty() {
            match self.queue.recv().await {
                Some(text) => {
                    frames.push(serde_json::from_str(&text).expect("outbound frame is JSON"))
                }
                None => break,
            }
        }
        frames
    }

    /// Drained frames of one `type`
    pub async fn drain_of_type(&self, frame_type: &str) -> Vec<serde_json::Value> {
        self.drain()
            .await
            .into_iter()
            .filter(|frame| frame["type"] == frame_type)
            .collect()
    }
}
