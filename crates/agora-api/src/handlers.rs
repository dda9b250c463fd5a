//! REST endpoint handlers.
//!
//! Read handlers assemble their responses through a per-request
//! [`Loaders`](agora_core::loader::Loaders) bundle: one page of posts costs
//! one grouped query per entity kind (authors, scores, caller votes,
//! caller bookmarks) no matter how many rows the page has.
//!
//! All mutations run through the core services; nothing here touches the
//! store's write paths directly.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use agora_core::error::CoreError;
use agora_core::pagination::{Connection, Edge};
use agora_core::posts::{PostDraft, PostPatch};
use agora_types::{
    Comment, CommentId, CommentOrder, Notification, NotificationId, Post, PostId, PostOrder,
    TargetKind, Topic, TopicId, TypingUser, User, UserId, Vote, VoteDirection,
};

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query and body shapes
// ---------------------------------------------------------------------------

/// Query parameters for the post feed.
#[derive(Debug, Deserialize)]
pub struct PostFeedQuery {
    /// Feed ordering (`newest` | `oldest` | `top`).
    pub order: Option<PostOrder>,
    /// Requested page size; clamped into `[1, 50]`.
    pub first: Option<i64>,
    /// Resume cursor from a previous page's `endCursor`.
    pub after: Option<String>,
}

/// Query parameters for a post's comment listing.
#[derive(Debug, Deserialize)]
pub struct CommentFeedQuery {
    /// Listing ordering (`oldest` | `newest` | `top`).
    pub order: Option<CommentOrder>,
    /// Requested page size; clamped into `[1, 50]`.
    pub first: Option<i64>,
    /// Resume cursor from a previous page's `endCursor`.
    pub after: Option<String>,
}

/// Query parameters for the bookmark feed.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Requested page size; clamped into `[1, 50]`.
    pub first: Option<i64>,
    /// Resume cursor from a previous page's `endCursor`.
    pub after: Option<String>,
}

/// Query parameters for the notification listing.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    /// Maximum rows to return; clamped into `[1, 50]`.
    pub limit: Option<i64>,
}

/// Body for `POST /api/posts`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostBody {
    /// Topic to classify the post under.
    pub topic_id: Uuid,
    /// Post title.
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    /// Post body.
    #[validate(length(max = 40000))]
    pub body: String,
}

/// Body for `PATCH /api/posts/{id}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostBody {
    /// New title, if changing.
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    /// New body, if changing.
    #[validate(length(max = 40000))]
    pub body: Option<String>,
    /// New pinned flag (admin only).
    pub pinned: Option<bool>,
    /// New locked flag (admin only).
    pub locked: Option<bool>,
}

/// Body for `POST /api/posts/{id}/comments`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentBody {
    /// Parent comment for a nested reply.
    pub parent_id: Option<Uuid>,
    /// Comment text.
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// Body for `PUT /api/votes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    /// The post or comment being voted on.
    pub target_id: Uuid,
    /// Whether the target is a post or a comment.
    pub target_kind: TargetKind,
    /// Up or down.
    pub direction: VoteDirection,
}

/// Body for `DELETE /api/votes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVoteBody {
    /// The post or comment whose vote is being removed.
    pub target_id: Uuid,
    /// Whether the target is a post or a comment.
    pub target_kind: TargetKind,
}

/// Body for `POST /api/topics`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicBody {
    /// URL-safe topic identifier.
    #[validate(length(min = 1, max = 60))]
    pub slug: String,
    /// Human-readable topic name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

// ---------------------------------------------------------------------------
// View shapes
// ---------------------------------------------------------------------------

/// The public slice of a user attached to posts and comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    /// Author's user id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Derived net vote score across the author's content.
    pub reputation: i64,
    /// Verification badge.
    pub verified: bool,
}

impl From<User> for AuthorView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            reputation: user.reputation,
            verified: user.verified,
        }
    }
}

/// A post enriched with its author, score, and the caller's state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    /// The post row.
    #[serde(flatten)]
    pub post: Post,
    /// The author, when still present.
    pub author: Option<AuthorView>,
    /// Net vote score.
    pub vote_count: i64,
    /// The caller's vote, when authenticated.
    pub user_vote: Option<VoteDirection>,
    /// Whether the caller bookmarked the post.
    pub bookmarked: bool,
}

/// A comment enriched with its author, score, and the caller's state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    /// The comment row.
    #[serde(flatten)]
    pub comment: Comment,
    /// The author, when still present.
    pub author: Option<AuthorView>,
    /// Net vote score.
    pub vote_count: i64,
    /// The caller's vote, when authenticated.
    pub user_vote: Option<VoteDirection>,
}

/// A bookmark feed entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedPostView {
    /// The bookmarked post, enriched like any feed entry.
    #[serde(flatten)]
    pub post: PostView,
    /// When the caller bookmarked it.
    pub bookmarked_at: DateTime<Utc>,
}

/// Mutation acknowledgement carrying the vote aggregate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    /// Always `true`; failures surface as error responses.
    pub success: bool,
    /// The target's recomputed net score.
    pub vote_count: i64,
    /// The caller's vote after the mutation.
    pub user_vote: Option<VoteDirection>,
}

fn success() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true }))
}

fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidUuid(raw.to_owned()))
}

// ---------------------------------------------------------------------------
// View assembly (per-request batch loading)
// ---------------------------------------------------------------------------

async fn post_views(
    state: &AppState,
    caller: Option<&User>,
    posts: Vec<Post>,
) -> Result<Vec<PostView>, ApiError> {
    let loaders = state.loaders();

    let author_ids: Vec<UserId> = posts.iter().map(|post| post.author_id).collect();
    let authors = loaders.users.load_many(&author_ids).await?;

    let count_keys: Vec<(Uuid, TargetKind)> = posts
        .iter()
        .map(|post| (post.id.into_inner(), TargetKind::Post))
        .collect();
    let counts = loaders.vote_counts.load_many(&count_keys).await?;

    let (votes, bookmarks) = match caller {
        Some(caller) => {
            let vote_keys: Vec<(UserId, Uuid, TargetKind)> = posts
                .iter()
                .map(|post| (caller.id, post.id.into_inner(), TargetKind::Post))
                .collect();
            let bookmark_keys: Vec<(UserId, PostId)> =
                posts.iter().map(|post| (caller.id, post.id)).collect();
            (
                loaders.votes.load_many(&vote_keys).await?,
                loaders.bookmarks.load_many(&bookmark_keys).await?,
            )
        }
        None => (HashMap::new(), HashMap::new()),
    };

    Ok(posts
        .into_iter()
        .map(|post| {
            let author = authors.get(&post.author_id).cloned().map(AuthorView::from);
            let vote_count = counts
                .get(&(post.id.into_inner(), TargetKind::Post))
                .copied()
                .unwrap_or(0);
            let user_vote = caller.and_then(|caller| {
                votes
                    .get(&(caller.id, post.id.into_inner(), TargetKind::Post))
                    .map(|vote: &Vote| vote.direction)
            });
            let bookmarked = caller
                .is_some_and(|caller| bookmarks.contains_key(&(caller.id, post.id)));
            PostView {
                author,
                vote_count,
                user_vote,
                bookmarked,
                post,
            }
        })
        .collect())
}

async fn comment_views(
    state: &AppState,
    caller: Option<&User>,
    comments: Vec<Comment>,
) -> Result<Vec<CommentView>, ApiError> {
    let loaders = state.loaders();

    let author_ids: Vec<UserId> = comments.iter().map(|comment| comment.author_id).collect();
    let authors = loaders.users.load_many(&author_ids).await?;

    let count_keys: Vec<(Uuid, TargetKind)> = comments
        .iter()
        .map(|comment| (comment.id.into_inner(), TargetKind::Comment))
        .collect();
    let counts = loaders.vote_counts.load_many(&count_keys).await?;

    let votes = match caller {
        Some(caller) => {
            let vote_keys: Vec<(UserId, Uuid, TargetKind)> = comments
                .iter()
                .map(|comment| (caller.id, comment.id.into_inner(), TargetKind::Comment))
                .collect();
            loaders.votes.load_many(&vote_keys).await?
        }
        None => HashMap::new(),
    };

    Ok(comments
        .into_iter()
        .map(|comment| {
            let author = authors
                .get(&comment.author_id)
                .cloned()
                .map(AuthorView::from);
            let vote_count = counts
                .get(&(comment.id.into_inner(), TargetKind::Comment))
                .copied()
                .unwrap_or(0);
            let user_vote = caller.and_then(|caller| {
                votes
                    .get(&(caller.id, comment.id.into_inner(), TargetKind::Comment))
                    .map(|vote| vote.direction)
            });
            CommentView {
                author,
                vote_count,
                user_vote,
                comment,
            }
        })
        .collect())
}

/// Swap a connection's nodes for assembled views, keeping every edge
/// cursor and the page info untouched.
fn with_views<T, V>(connection: Connection<T>, views: Vec<V>) -> Connection<V> {
    let Connection { edges, page_info } = connection;
    Connection {
        edges: edges
            .into_iter()
            .zip(views)
            .map(|(edge, view)| Edge {
                node: view,
                cursor: edge.cursor,
            })
            .collect(),
        page_info,
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// `POST /api/posts`
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreatePostBody>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    body.validate()?;
    let post = state
        .posts
        .create_post(
            &caller,
            PostDraft {
                topic_id: TopicId::from(body.topic_id),
                title: body.title,
                body: body.body,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /api/posts`
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Query(query): Query<PostFeedQuery>,
) -> Result<Json<Connection<PostView>>, ApiError> {
    let connection = state
        .feeds
        .posts(
            query.order.unwrap_or_default(),
            query.first,
            query.after.as_deref(),
        )
        .await?;
    let posts: Vec<Post> = connection.edges.iter().map(|edge| edge.node.clone()).collect();
    let views = post_views(&state, caller.as_ref(), posts).await?;
    Ok(Json(with_views(connection, views)))
}

/// `GET /api/posts/{id}`
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<Json<PostView>, ApiError> {
    let post_id = PostId::from(parse_uuid(&id)?);
    let post = state.posts.post_detail(post_id).await?;
    let mut views = post_views(&state, caller.as_ref(), vec![post]).await?;
    views
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::Core(CoreError::NotFound(format!("post {post_id}"))))
}

/// `PATCH /api/posts/{id}`
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdatePostBody>,
) -> Result<Json<Post>, ApiError> {
    body.validate()?;
    let post_id = PostId::from(parse_uuid(&id)?);
    let post = state
        .posts
        .update_post(
            &caller,
            post_id,
            PostPatch {
                title: body.title,
                body: body.body,
                pinned: body.pinned,
                locked: body.locked,
            },
        )
        .await?;
    Ok(Json(post))
}

/// `DELETE /api/posts/{id}`
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let post_id = PostId::from(parse_uuid(&id)?);
    state.posts.delete_post(&caller, post_id).await?;
    Ok(success())
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// `POST /api/posts/{id}/comments`
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CreateCommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    body.validate()?;
    let post_id = PostId::from(parse_uuid(&id)?);
    let comment = state
        .comments
        .create_comment(
            &caller,
            post_id,
            body.parent_id.map(CommentId::from),
            &body.content,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /api/posts/{id}/comments`
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
    Query(query): Query<CommentFeedQuery>,
) -> Result<Json<Connection<CommentView>>, ApiError> {
    let post_id = PostId::from(parse_uuid(&id)?);
    let connection = state
        .feeds
        .comments(
            post_id,
            query.order.unwrap_or_default(),
            query.first,
            query.after.as_deref(),
        )
        .await?;
    let comments: Vec<Comment> = connection.edges.iter().map(|edge| edge.node.clone()).collect();
    let views = comment_views(&state, caller.as_ref(), comments).await?;
    Ok(Json(with_views(connection, views)))
}

/// `DELETE /api/comments/{id}`
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let comment_id = CommentId::from(parse_uuid(&id)?);
    state.comments.delete_comment(&caller, comment_id).await?;
    Ok(success())
}

/// `GET /api/comments/{id}/subtree`
pub async fn comment_subtree(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let comment_id = CommentId::from(parse_uuid(&id)?);
    let comments = state.comments.subtree(comment_id).await?;
    let views = comment_views(&state, caller.as_ref(), comments).await?;
    Ok(Json(views))
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

/// `PUT /api/votes`
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<VoteBody>,
) -> Result<Json<VoteResponse>, ApiError> {
    let outcome = state
        .votes
        .cast_vote(&caller, body.target_id, body.target_kind, body.direction)
        .await?;
    Ok(Json(VoteResponse {
        success: true,
        vote_count: outcome.vote_count,
        user_vote: outcome.user_vote,
    }))
}

/// `DELETE /api/votes`
pub async fn remove_vote(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<RemoveVoteBody>,
) -> Result<Json<VoteResponse>, ApiError> {
    let outcome = state
        .votes
        .remove_vote(&caller, body.target_id, body.target_kind)
        .await?;
    Ok(Json(VoteResponse {
        success: true,
        vote_count: outcome.vote_count,
        user_vote: outcome.user_vote,
    }))
}

// ---------------------------------------------------------------------------
// Bookmarks
// ---------------------------------------------------------------------------

/// `PUT /api/posts/{id}/bookmark`
pub async fn bookmark_post(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let post_id = PostId::from(parse_uuid(&id)?);
    state.bookmarks.bookmark_post(caller.id, post_id).await?;
    Ok((StatusCode::CREATED, success()))
}

/// `DELETE /api/posts/{id}/bookmark`
///
/// Idempotent: succeeds whether or not a bookmark existed.
pub async fn unbookmark_post(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let post_id = PostId::from(parse_uuid(&id)?);
    state.bookmarks.unbookmark_post(caller.id, post_id).await?;
    Ok(success())
}

/// `GET /api/bookmarks`
pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Connection<BookmarkedPostView>>, ApiError> {
    let connection = state
        .feeds
        .bookmarks(caller.id, query.first, query.after.as_deref())
        .await?;
    let posts: Vec<Post> = connection
        .edges
        .iter()
        .map(|edge| edge.node.1.clone())
        .collect();
    let bookmarked_at: Vec<DateTime<Utc>> = connection
        .edges
        .iter()
        .map(|edge| edge.node.0.created_at)
        .collect();
    let views = post_views(&state, Some(&caller), posts).await?;
    let views: Vec<BookmarkedPostView> = views
        .into_iter()
        .zip(bookmarked_at)
        .map(|(post, bookmarked_at)| BookmarkedPostView {
            post,
            bookmarked_at,
        })
        .collect();
    Ok(Json(with_views(connection, views)))
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// `POST /api/topics`
pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreateTopicBody>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    body.validate()?;
    let topic = state
        .topics
        .create_topic(&caller, &body.slug, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

/// `GET /api/topics/{id}`
pub async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Topic>, ApiError> {
    let topic_id = TopicId::from(parse_uuid(&id)?);
    Ok(Json(state.topics.topic(topic_id).await?))
}

/// `PUT /api/topics/{id}/subscription`
pub async fn subscribe_topic(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let topic_id = TopicId::from(parse_uuid(&id)?);
    state.topics.subscribe(caller.id, topic_id).await?;
    Ok((StatusCode::CREATED, success()))
}

/// `DELETE /api/topics/{id}/subscription`
pub async fn unsubscribe_topic(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let topic_id = TopicId::from(parse_uuid(&id)?);
    state.topics.unsubscribe(caller.id, topic_id).await?;
    Ok(success())
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

/// `PUT /api/users/{id}/follow`
pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let followee = UserId::from(parse_uuid(&id)?);
    state.follows.follow(&caller, followee).await?;
    Ok((StatusCode::CREATED, success()))
}

/// `DELETE /api/users/{id}/follow`
pub async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let followee = UserId::from(parse_uuid(&id)?);
    state.follows.unfollow(&caller, followee).await?;
    Ok(success())
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// `GET /api/notifications`
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(
        state.notifications.list(caller.id, query.limit).await?,
    ))
}

/// `POST /api/notifications/{id}/read`
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notification_id = NotificationId::from(parse_uuid(&id)?);
    state
        .notifications
        .mark_read(caller.id, notification_id)
        .await?;
    Ok(success())
}

// ---------------------------------------------------------------------------
// Typing presence
// ---------------------------------------------------------------------------

/// `POST /api/posts/{id}/typing`
pub async fn start_typing(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let post_id = require_post(&state, &id).await?;
    state
        .typing
        .start_typing(post_id, caller.id, &caller.display_name)
        .await;
    Ok(success())
}

/// `DELETE /api/posts/{id}/typing`
pub async fn stop_typing(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let post_id = require_post(&state, &id).await?;
    state.typing.stop_typing(post_id, caller.id).await;
    Ok(success())
}

/// `GET /api/posts/{id}/typing`
pub async fn get_typing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TypingUser>>, ApiError> {
    let post_id = require_post(&state, &id).await?;
    Ok(Json(state.typing.typing_users(post_id).await))
}

/// Parse a post id and confirm the post is live.
pub(crate) async fn require_post(state: &AppState, raw: &str) -> Result<PostId, ApiError> {
    let post_id = PostId::from(parse_uuid(raw)?);
    state
        .store
        .post_by_id(post_id)
        .await
        .map_err(CoreError::Storage)
        .map_err(ApiError::Core)?
        .ok_or_else(|| ApiError::Core(CoreError::NotFound(format!("post {post_id}"))))?;
    Ok(post_id)
}
