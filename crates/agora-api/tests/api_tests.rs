//! Integration tests for the API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, auth,
//! and error mapping without needing a live network connection or
//! database -- the router runs over the in-memory store.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;

use agora_api::build_router;
use agora_api::state::AppState;
use agora_core::bus::EventBus;
use agora_core::presence::TypingTracker;
use agora_core::store::Store;
use agora_db::MemoryStore;
use agora_types::{Topic, TopicId, User, UserId};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    topic: Topic,
}

async fn make_app() -> TestApp {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let typing = Arc::new(TypingTracker::new(Arc::clone(&bus)));
    let state = Arc::new(AppState::new(store, bus, typing));

    let topic = Topic {
        id: TopicId::new(),
        slug: String::from("general"),
        name: String::from("General"),
        subscriber_count: 0,
        created_at: Utc::now(),
    };
    state.store.insert_topic(topic.clone()).await.unwrap();

    TestApp {
        router: build_router(Arc::clone(&state)),
        state,
        topic,
    }
}

async fn make_user(app: &TestApp, name: &str) -> User {
    let user = User {
        id: UserId::new(),
        username: name.to_lowercase(),
        display_name: name.to_owned(),
        reputation: 0,
        verified: false,
        admin: false,
        active: true,
        created_at: Utc::now(),
    };
    app.state.store.insert_user(user.clone()).await.unwrap();
    user
}

fn request(method: &str, uri: &str, user: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.id));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_post(app: &TestApp, author: &User, title: &str) -> Value {
    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/posts",
            Some(author),
            Some(json!({
                "topicId": app.topic.id,
                "title": title,
                "body": "body text",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn post_feed_assembles_views_through_the_loaders() {
    let app = make_app().await;
    let author = make_user(&app, "Ada").await;
    create_post(&app, &author, "hello world").await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/posts", Some(&author), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let edges = body["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    let node = &edges[0]["node"];
    assert_eq!(node["title"], "hello world");
    assert_eq!(node["author"]["displayName"], "Ada");
    assert_eq!(node["voteCount"], 0);
    assert_eq!(node["bookmarked"], false);
    assert_eq!(body["pageInfo"]["hasNextPage"], false);
    assert_eq!(body["pageInfo"]["hasPreviousPage"], false);
}

#[tokio::test]
async fn mutations_require_authentication() {
    let app = make_app().await;
    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/posts",
            None,
            Some(json!({ "topicId": app.topic.id, "title": "t", "body": "b" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "authentication");
}

#[tokio::test]
async fn vote_round_trip_over_http() {
    let app = make_app().await;
    let author = make_user(&app, "Author").await;
    let voter = make_user(&app, "Voter").await;
    let post = create_post(&app, &author, "votable").await;
    let post_id = post["id"].as_str().unwrap().to_owned();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "PUT",
            "/api/votes",
            Some(&voter),
            Some(json!({ "targetId": post_id, "targetKind": "post", "direction": "up" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["voteCount"], 1);
    assert_eq!(body["userVote"], "up");

    let response = app
        .router
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/votes",
            Some(&voter),
            Some(json!({ "targetId": post_id, "targetKind": "post" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["voteCount"], 0);

    // Removing again: the vote is gone, so NotFound -- not a silent
    // success.
    let response = app
        .router
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/votes",
            Some(&voter),
            Some(json!({ "targetId": post_id, "targetKind": "post" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn unbookmark_is_idempotent_but_duplicate_bookmark_conflicts() {
    let app = make_app().await;
    let author = make_user(&app, "Author").await;
    let reader = make_user(&app, "Reader").await;
    let post = create_post(&app, &author, "bookmarkable").await;
    let post_id = post["id"].as_str().unwrap().to_owned();

    // Unbookmark before any bookmark exists: idempotent success.
    let response = app
        .router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/posts/{post_id}/bookmark"),
            Some(&reader),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/posts/{post_id}/bookmark"),
            Some(&reader),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/posts/{post_id}/bookmark"),
            Some(&reader),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn page_size_is_clamped_at_the_http_boundary() {
    let app = make_app().await;
    let author = make_user(&app, "Author").await;
    create_post(&app, &author, "one").await;
    create_post(&app, &author, "two").await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/posts?first=0", None, None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["edges"].as_array().unwrap().len(), 1);
    assert_eq!(body["pageInfo"]["hasNextPage"], true);
}

#[tokio::test]
async fn malformed_ids_and_unknown_posts_map_to_stable_kinds() {
    let app = make_app().await;
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/posts/not-a-uuid", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "validation");

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/posts/{}", uuid::Uuid::now_v7()),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn typing_round_trip_over_http() {
    let app = make_app().await;
    let author = make_user(&app, "Author").await;
    let typist = make_user(&app, "Typist").await;
    let post = create_post(&app, &author, "busy thread").await;
    let post_id = post["id"].as_str().unwrap().to_owned();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/posts/{post_id}/typing"),
            Some(&typist),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/posts/{post_id}/typing"),
            None,
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let roster = body.as_array().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0]["displayName"], "Typist");

    let response = app
        .router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/posts/{post_id}/typing"),
            Some(&typist),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/posts/{post_id}/typing"),
            None,
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn moderation_flags_are_admin_only() {
    let app = make_app().await;
    let author = make_user(&app, "Author").await;
    let post = create_post(&app, &author, "lockable").await;
    let post_id = post["id"].as_str().unwrap().to_owned();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/api/posts/{post_id}"),
            Some(&author),
            Some(json!({ "locked": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "authorization");
}
