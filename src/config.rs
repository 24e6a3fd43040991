use std::time::Duration;

use crate::broadcast::OverflowPolicy;

/// Runtime configuration for the routing core, read from the environment
/// with sensible defaults for local development.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: String,
    /// Maximum participants per room
    pub max_participants: usize,
    /// How long a connection may go without an inbound frame before it is closed
    pub idle_timeout: Duration,
    /// Bound of each connection's outbound frame queue
    pub outbound_capacity: usize,
    /// What to do when a connection's outbound queue is full
    pub overflow_policy: OverflowPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let max_participants = std::env::var("ROOM_MAX_PARTICIPANTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);

        let idle_timeout_secs: u64 = std::env::var("CONNECTION_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let outbound_capacity = std::env::var("OUTBOUND_QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256);

        let overflow_policy = match std::env::var("OUTBOUND_OVERFLOW_POLICY").as_deref() {
            Ok("disconnect") => OverflowPolicy::Disconnect,
            _ => OverflowPolicy::DropOldest,
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            max_participants,
            idle_timeout: Duration::from_secs(idle_timeout_secs),
            outbound_capacity,
            overflow_policy,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            max_participants: 50,
            idle_timeout: Duration::from_secs(300),
            outbound_capacity: 256,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}
