use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roomcast::websockets::{SocketError, SocketWrapper};

/// One step of a scripted client
pub enum ScriptItem {
    /// The client sends this text frame
    Frame(String),
    /// The client stays quiet for this long before the next step
    Delay(Duration),
    /// The client goes silent forever (never closes)
    Hold,
}

/// Scripted WebSocket for driving a ClientSession without a network
pub struct MockSocket {
    script: Mutex<VecDeque<ScriptItem>>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockSocket {
    pub fn new(script: Vec<ScriptItem>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handles for inspecting the socket after the session consumed it
    pub fn handles(&self) -> (Arc<Mutex<Vec<String>>>, Arc<AtomicBool>) {
        (Arc::clone(&self.sent), Arc::clone(&self.closed))
    }
}

#[async_trait]
impl SocketWrapper for MockSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            let item = self.script.lock().unwrap().pop_front();
            match item {
                Some(ScriptItem::Frame(text)) => return Ok(Some(text)),
                Some(ScriptItem::Delay(duration)) => {
                    tokio::time::sleep(duration).await;
                }
                Some(ScriptItem::Hold) => {
                    futures::future::pending::<()>().await;
                }
                // Script exhausted: the client disconnects
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close_with(&mut self, _code: u16, _reason: &str) -> Result<(), SocketError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
