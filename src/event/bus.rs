use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::events::{RoomEvent, Scope};
use super::subscriber::EventSubscriber;

#[derive(Default)]
struct SubscriberTable {
    room: HashMap<String, Vec<Arc<dyn EventSubscriber>>>,
    global: Vec<Arc<dyn EventSubscriber>>,
}

/// Event bus distributing domain events to room-scoped and global
/// subscribers.
///
/// `notify` is structured fan-out: it returns only once every subscriber has
/// run to completion. A failing subscriber never prevents delivery to any
/// other, and never cancels one. This mirrors the broadcast engine's
/// failure-isolation contract.
#[derive(Clone)]
pub struct EventBus {
    table: Arc<RwLock<SubscriberTable>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(SubscriberTable::default())),
        }
    }

    /// Idempotent subscribe. A duplicate name in the same scope is a logged
    /// no-op; returns whether the subscriber was added.
    pub async fn subscribe(&self, scope: Scope, subscriber: Arc<dyn EventSubscriber>) -> bool {
        let mut table = self.table.write().await;
        let list = match &scope {
            Scope::Room(room_id) => table.room.entry(room_id.clone()).or_default(),
            Scope::Global => &mut table.global,
        };

        if list.iter().any(|s| s.name() == subscriber.name()) {
            debug!(
                subscriber = subscriber.name(),
                scope = ?scope,
                "Already subscribed, ignoring"
            );
            return false;
        }

        info!(subscriber = subscriber.name(), scope = ?scope, "Subscriber registered");
        list.push(subscriber);
        true
    }

    /// Idempotent unsubscribe; returns whether anything was removed
    pub async fn unsubscribe(&self, scope: &Scope, name: &str) -> bool {
        let mut table = self.table.write().await;
        let removed = match scope {
            Scope::Room(room_id) => match table.room.get_mut(room_id) {
                Some(list) => {
                    let before = list.len();
                    list.retain(|s| s.name() != name);
                    let removed = list.len() != before;
                    if list.is_empty() {
                        table.room.remove(room_id);
                    }
                    removed
                }
                None => false,
            },
            Scope::Global => {
                let before = table.global.len();
                table.global.retain(|s| s.name() != name);
                table.global.len() != before
            }
        };

        if removed {
            info!(subscriber = name, scope = ?scope, "Subscriber removed");
        } else {
            debug!(subscriber = name, scope = ?scope, "Unsubscribe on unknown subscriber");
        }
        removed
    }

    /// Notifies every global subscriber and every subscriber scoped to
    /// `room_id`, concurrently, and waits for all of them. Returns how many
    /// subscribers were invoked.
    pub async fn notify(&self, room_id: &str, event: RoomEvent) -> usize {
        let targets: Vec<Arc<dyn EventSubscriber>> = {
            let table = self.table.read().await;
            table
                .global
                .iter()
                .chain(table.room.get(room_id).into_iter().flatten())
                .cloned()
                .collect()
        };

        debug!(
            room_id = %room_id,
            event_type = event.event_type(),
            subscribers = targets.len(),
            "Notifying subscribers"
        );

        let results = join_all(targets.iter().map(|subscriber| {
            let event = &event;
            async move { (subscriber.name(), subscriber.on_event(event).await) }
        }))
        .await;

        for (name, result) in &results {
            if let Err(e) = result {
                error!(
                    room_id = %room_id,
                    subscriber = *name,
                    error = %e,
                    "Event subscriber failed"
                );
            }
        }

        results.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::subscriber::EventError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSubscriber {
        name: &'static str,
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingSubscriber {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                fail: false,
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl EventSubscriber for CountingSubscriber {
        async fn on_event(&self, _event: &RoomEvent) -> Result<(), EventError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                Err(EventError::failure("simulated failure"))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn stored_event(room_id: &str) -> RoomEvent {
        RoomEvent::MessageStored {
            room_id: room_id.to_string(),
            message_id: 1,
            sender_id: "u1".to_string(),
            sender_name: "Alice".to_string(),
            content: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn room_and_global_subscribers_both_fire() {
        let bus = EventBus::new();
        let global = CountingSubscriber::new("global");
        let scoped = CountingSubscriber::new("scoped");
        let elsewhere = CountingSubscriber::new("elsewhere");

        bus.subscribe(Scope::Global, global.clone()).await;
        bus.subscribe(Scope::room("room1"), scoped.clone()).await;
        bus.subscribe(Scope::room("room2"), elsewhere.clone()).await;

        let invoked = bus.notify("room1", stored_event("room1")).await;

        assert_eq!(invoked, 2);
        assert_eq!(global.calls(), 1);
        assert_eq!(scoped.calls(), 1);
        assert_eq!(elsewhere.calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_subscribe_is_a_no_op() {
        let bus = EventBus::new();
        let subscriber = CountingSubscriber::new("dup");

        assert!(bus.subscribe(Scope::room("room1"), subscriber.clone()).await);
        assert!(!bus.subscribe(Scope::room("room1"), subscriber.clone()).await);

        bus.notify("room1", stored_event("room1")).await;
        assert_eq!(subscriber.calls(), 1);
    }

    #[tokio::test]
    async fn failing_subscribers_do_not_block_the_rest() {
        let bus = EventBus::new();
        let failing_a = CountingSubscriber::failing("failing_a");
        let failing_b = CountingSubscriber::failing("failing_b");
        let healthy = CountingSubscriber::new("healthy");

        bus.subscribe(Scope::Global, failing_a.clone()).await;
        bus.subscribe(Scope::room("room1"), failing_b.clone()).await;
        bus.subscribe(Scope::room("room1"), healthy.clone()).await;

        let invoked = bus.notify("room1", stored_event("room1")).await;

        assert_eq!(invoked, 3);
        assert_eq!(failing_a.calls(), 1);
        assert_eq!(failing_b.calls(), 1);
        assert_eq!(healthy.calls(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = EventBus::new();
        let subscriber = CountingSubscriber::new("leaver");

        bus.subscribe(Scope::room("room1"), subscriber.clone()).await;
        assert!(bus.unsubscribe(&Scope::room("room1"), "leaver").await);
        assert!(!bus.unsubscribe(&Scope::room("room1"), "leaver").await);

        bus.notify("room1", stored_event("room1")).await;
        assert_eq!(subscriber.calls(), 0);
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        assert_eq!(bus.notify("room1", stored_event("room1")).await, 0);
    }
}
