//! Axum router construction for the API server.
//!
//! Assembles all routes (REST + `WebSocket` + SSE) into a single
//! [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::sse;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `POST/GET /api/posts`, `GET/PATCH/DELETE /api/posts/{id}`
/// - `POST/GET /api/posts/{id}/comments`, `DELETE /api/comments/{id}`,
///   `GET /api/comments/{id}/subtree`
/// - `PUT/DELETE /api/votes`
/// - `PUT/DELETE /api/posts/{id}/bookmark`, `GET /api/bookmarks`
/// - `POST /api/topics`, `GET /api/topics/{id}`,
///   `PUT/DELETE /api/topics/{id}/subscription`
/// - `PUT/DELETE /api/users/{id}/follow`
/// - `GET /api/notifications`, `POST /api/notifications/{id}/read`
/// - `POST/DELETE/GET /api/posts/{id}/typing`
/// - `GET /api/posts/{id}/live` -- SSE event stream
/// - `GET /ws/posts/{id}` -- `WebSocket` event stream
///
/// CORS is configured to allow any origin for development. In production
/// this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Posts
        .route(
            "/api/posts",
            post(handlers::create_post).get(handlers::list_posts),
        )
        .route(
            "/api/posts/{id}",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        // Comments
        .route(
            "/api/posts/{id}/comments",
            post(handlers::create_comment).get(handlers::list_comments),
        )
        .route("/api/comments/{id}", delete(handlers::delete_comment))
        .route(
            "/api/comments/{id}/subtree",
            get(handlers::comment_subtree),
        )
        // Votes
        .route(
            "/api/votes",
            put(handlers::cast_vote).delete(handlers::remove_vote),
        )
        // Bookmarks
        .route(
            "/api/posts/{id}/bookmark",
            put(handlers::bookmark_post).delete(handlers::unbookmark_post),
        )
        .route("/api/bookmarks", get(handlers::list_bookmarks))
        // Topics and subscriptions
        .route("/api/topics", post(handlers::create_topic))
        .route("/api/topics/{id}", get(handlers::get_topic))
        .route(
            "/api/topics/{id}/subscription",
            put(handlers::subscribe_topic).delete(handlers::unsubscribe_topic),
        )
        // Follows
        .route(
            "/api/users/{id}/follow",
            put(handlers::follow_user).delete(handlers::unfollow_user),
        )
        // Notifications
        .route("/api/notifications", get(handlers::list_notifications))
        .route(
            "/api/notifications/{id}/read",
            post(handlers::mark_notification_read),
        )
        // Typing presence
        .route(
            "/api/posts/{id}/typing",
            post(handlers::start_typing)
                .delete(handlers::stop_typing)
                .get(handlers::get_typing),
        )
        // Live transports
        .route("/api/posts/{id}/live", get(sse::sse_post))
        .route("/ws/posts/{id}", get(ws::ws_post))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
