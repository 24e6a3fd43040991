use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use super::dispatcher::{ConnectionContext, DispatchOutcome, MessageDispatcher};

/// Simple WebSocket abstraction - all we care about is send/receive/close
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Receive the next message from the client (None if connection closed)
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;

    /// Close the connection with an explicit close code
    async fn close_with(&mut self, code: u16, reason: &str) -> Result<(), SocketError>;
}

#[derive(Debug)]
pub enum SocketError {
    ConnectionClosed,
    SendFailed(String),
    ReceiveFailed(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => continue, // Ignore binary/ping/pong
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
                None => return Ok(None), // Connection closed
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn close_with(&mut self, code: u16, reason: &str) -> Result<(), SocketError> {
        self.send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await
        .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// One connection's driving loop: drains the outbound queue to the socket,
/// feeds inbound text to the dispatcher, and enforces the idle timeout.
///
/// The loop ends when the client disconnects, the dispatcher demands a
/// disconnect, the outbound queue is closed (pruning), or the idle deadline
/// passes. The caller owns cleanup; it runs whatever way the loop ends.
pub struct ClientSession {
    ctx: ConnectionContext,
    socket: Box<dyn SocketWrapper>,
    dispatcher: Arc<MessageDispatcher>,
    idle_timeout: Duration,
}

impl ClientSession {
    pub fn new(
        ctx: ConnectionContext,
        socket: Box<dyn SocketWrapper>,
        dispatcher: Arc<MessageDispatcher>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            socket,
            dispatcher,
            idle_timeout,
        }
    }

    /// Run the connection until disconnect
    pub async fn run(mut self) -> Result<(), SocketError> {
        // The deadline moves only on inbound frames; outbound traffic alone
        // cannot keep a silent peer alive.
        let mut idle_deadline = Instant::now() + self.idle_timeout;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(idle_deadline) => {
                    info!(
                        connection_id = %self.ctx.connection_id,
                        room_id = %self.ctx.room_id,
                        "Closing idle connection"
                    );
                    break;
                }

                // Outbound frames (from the engine to the client)
                frame = self.ctx.queue.recv() => {
                    match frame {
                        Some(text) => self.socket.send_message(text).await?,
                        None => break, // Queue closed, connection pruned
                    }
                }

                // Inbound frames (from the client)
                inbound = self.socket.receive_message() => {
                    match inbound {
                        Ok(Some(text)) => {
                            idle_deadline = Instant::now() + self.idle_timeout;
                            if self.dispatcher.dispatch(&self.ctx, &text).await
                                == DispatchOutcome::Disconnect
                            {
                                break;
                            }
                        }
                        Ok(None) => break, // Client disconnected
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Clean disconnect
        let _ = self.socket.close().await;
        Ok(())
    }
}
