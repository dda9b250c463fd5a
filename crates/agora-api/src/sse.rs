//! SSE transport for live post updates.
//!
//! `GET /api/posts/{id}/live` holds the HTTP response open and writes one
//! `data: {"type": ..., "data": ...}` frame per matching bus event. The
//! stream opens with a `data: {"type":"connected","postId":...}` frame and
//! carries a `: heartbeat` comment frame every 30 seconds so intermediary
//! proxies keep the connection alive.
//!
//! When the client disconnects, Axum drops the stream and with it the
//! broadcast receiver -- the connection's filter deregisters itself and
//! delivery to every other subscriber continues unaffected.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tracing::debug;

use agora_types::{EventFilter, ForumEvent};

use crate::auth::resolve_stream_user;
use crate::error::ApiError;
use crate::handlers::require_post;
use crate::state::AppState;
use crate::ws::HEARTBEAT_INTERVAL;

/// Open a live event stream for one post.
///
/// # Route
///
/// `GET /api/posts/{id}/live?token=<session>`
pub async fn sse_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let post_id = require_post(&state, &id).await?;
    let user = resolve_stream_user(&state, params.get("token").map(String::as_str)).await?;

    let mut filter = EventFilter::for_post(post_id);
    if let Some(user) = &user {
        filter = filter.with_recipient(user.id);
    }

    let rx = state.bus.subscribe();
    debug!(%post_id, "SSE client connected");

    let connected = Event::default().data(
        serde_json::json!({ "type": "connected", "postId": post_id }).to_string(),
    );

    let events = stream::unfold((rx, filter), |(mut rx, filter)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !event.matches(&filter) {
                        continue;
                    }
                    let Some(frame) = event_frame(&event) else {
                        continue;
                    };
                    return Some((Ok(frame), (rx, filter)));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "SSE client lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    let stream = stream::once(async move { Ok(connected) }).chain(events);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    ))
}

/// Serialize one event into an SSE data frame.
fn event_frame(event: &ForumEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            tracing::warn!("Failed to serialize event frame: {e}");
            None
        }
    }
}
