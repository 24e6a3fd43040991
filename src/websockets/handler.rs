use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::dispatcher::ConnectionContext;
use super::messages::ServerFrame;
use super::socket::{ClientSession, SocketWrapper};
use crate::broadcast::OutboundQueue;
use crate::room::ConnectionKind;
use crate::shared::{AppState, CoreError};

// WebSocket close codes: policy violation (bad credentials) and try again
// later (room at capacity).
const CLOSE_POLICY_VIOLATION: u16 = 1008;
const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    kind: Option<ConnectionKind>,
}

/// WebSocket endpoint that authenticates via the Sec-WebSocket-Protocol
/// header: GET /ws/{room_id} with the access token as the subprotocol value.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Result<Response, CoreError> {
    info!(room_id = %room_id, "WebSocket connection requested");

    let token = headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .map(|t| t.to_string())
        .ok_or_else(|| {
            warn!("Missing or invalid Sec-WebSocket-Protocol header");
            CoreError::AuthenticationFailure("missing authentication token".to_string())
        })?;

    let kind = params.kind.unwrap_or_default();

    Ok(ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, room_id, token, kind, app_state)
    }))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    room_id: String,
    token: String,
    kind: ConnectionKind,
    app_state: AppState,
) {
    let mut socket: Box<dyn SocketWrapper> = Box::new(socket);

    // Auth runs exactly once, before any registry state exists
    let principal = match app_state.auth.authenticate(&token).await {
        Ok(principal) => principal,
        Err(e) => {
            warn!(room_id = %room_id, error = %e, "WebSocket authentication failed");
            let _ = socket
                .close_with(CLOSE_POLICY_VIOLATION, "authentication failed")
                .await;
            return;
        }
    };

    let queue = Arc::new(OutboundQueue::new(
        app_state.config.outbound_capacity,
        app_state.config.overflow_policy,
    ));

    let joined = match app_state
        .sessions
        .join(&principal, &room_id, kind, Arc::clone(&queue))
        .await
    {
        Ok(joined) => joined,
        Err(e @ CoreError::RoomFull { .. }) => {
            warn!(room_id = %room_id, principal_id = %principal.id, error = %e, "Join rejected");
            let _ = socket.close_with(CLOSE_TRY_AGAIN_LATER, "room is full").await;
            return;
        }
        Err(e) => {
            warn!(room_id = %room_id, principal_id = %principal.id, error = %e, "Join failed");
            let _ = socket.close().await;
            return;
        }
    };

    info!(
        room_id = %room_id,
        principal_id = %principal.id,
        connection_id = %joined.connection_id,
        "WebSocket connection established"
    );

    let ctx = ConnectionContext {
        connection_id: joined.connection_id.clone(),
        room_id: room_id.clone(),
        principal_id: principal.id.clone(),
        display_name: principal.display_name.clone(),
        queue,
    };

    // The join snapshot goes to the new connection before anything else
    ctx.reply(&ServerFrame::room_info(
        &room_id,
        &principal.id,
        &joined.participants,
    ));

    let connection_id = joined.connection_id;
    let session = ClientSession::new(
        ctx,
        socket,
        Arc::clone(&app_state.dispatcher),
        app_state.config.idle_timeout,
    );

    match session.run().await {
        Ok(()) => {
            info!(
                room_id = %room_id,
                connection_id = %connection_id,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                room_id = %room_id,
                connection_id = %connection_id,
                error = ?e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup runs on every exit path: clean close, protocol error, fatal
    // frame, idle timeout, pruning.
    app_state.sessions.leave(&room_id, &connection_id).await;
    app_state.relay.clear_for(&room_id, &principal.id);

    info!(
        room_id = %room_id,
        connection_id = %connection_id,
        "WebSocket connection cleaned up"
    );
}
