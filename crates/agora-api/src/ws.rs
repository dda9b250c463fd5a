//! `WebSocket` transport for live post updates.
//!
//! Clients connect to `GET /ws/posts/{id}` and receive a JSON text frame
//! `{"type": ..., "data": ...}` for every bus event that matches the
//! connection's filter: comments, votes, post changes, and typing rosters
//! for the watched post, plus the caller's own notifications when a
//! `token` query parameter authenticates the connection.
//!
//! Each connection owns an independent heartbeat timer (a ping every 30 s)
//! to keep intermediary proxies from timing the connection out. Any failed
//! write ends the task, which drops the broadcast receiver -- that drop is
//! the deregistration, so a dead connection cannot leak a listener.
//!
//! If a client falls behind, lagged events are silently skipped and the
//! client resumes from the most recent event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use agora_types::EventFilter;

use crate::auth::resolve_stream_user;
use crate::error::ApiError;
use crate::handlers::require_post;
use crate::state::AppState;

/// Interval between heartbeat pings on a live connection.
pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming events for one post.
///
/// # Route
///
/// `GET /ws/posts/{id}?token=<session>`
pub async fn ws_post(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = require_post(&state, &id).await?;
    let user = resolve_stream_user(&state, params.get("token").map(String::as_str)).await?;

    let mut filter = EventFilter::for_post(post_id);
    if let Some(user) = &user {
        filter = filter.with_recipient(user.id);
    }

    Ok(ws.on_upgrade(move |socket| handle_ws(socket, state, filter)))
}

/// Handle the `WebSocket` lifecycle: subscribe to the bus, forward
/// filtered events as text frames, ping on the heartbeat interval.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, filter: EventFilter) {
    debug!("WebSocket client connected");

    let mut rx = state.bus.subscribe();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // The first tick fires immediately; consume it so the first ping
    // lands one interval after connect.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            // Keep intermediary proxies from timing out the connection.
            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    debug!("WebSocket client disconnected (ping failed)");
                    return;
                }
            }
            // Receive a domain event from the bus.
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !event.matches(&filter) {
                            continue;
                        }
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to serialize event frame: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Bus closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Ignore other message types from the client.
                    }
                }
            }
        }
    }
}
