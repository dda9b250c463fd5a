//! Async port traits the data layer implements.
//!
//! The services in this crate never talk to a database directly; they hold
//! an `Arc<dyn Store>` and the data layer (`agora-db`) provides the
//! implementations -- `PostgreSQL` for deployments, an in-memory store for
//! tests and small setups.
//!
//! Contract notes the implementations must honor:
//!
//! - **Soft-delete filtering is the store's job.** Every read of posts and
//!   comments excludes tombstoned rows (`deleted_at IS NULL`); callers never
//!   re-apply the predicate.
//! - **Vote uniqueness is the store's job.** [`VoteStore::upsert_vote`] must
//!   resolve concurrent casts for the same `(user, target)` through a
//!   transactionally-consistent unique constraint (or an equivalent single
//!   critical section), not application locking.
//! - **Batch getters issue one grouped query** per call and return only the
//!   rows that exist; absence is expressed by omission, never by an error.
//! - **Page queries** apply the compound cursor predicate and ordering for
//!   the requested order mode and return at most `limit` rows; callers pass
//!   one more than the page size to peek for a next page.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_types::{
    Bookmark, Comment, CommentId, CommentOrder, Follow, Notification, NotificationId, Post,
    PostId, PostOrder, TargetKind, Topic, TopicId, TopicSubscription, User, UserId, Vote,
};

use crate::pagination::Cursor;

/// Errors produced by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store failed (connection, query, constraint other than
    /// the ones modeled as `bool` returns).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A row could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shorthand result for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// User rows and the derived reputation column.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    async fn insert_user(&self, user: User) -> StoreResult<()>;

    /// Fetch one user by id.
    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Grouped fetch of users by id.
    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;

    /// Overwrite a user's derived reputation with a freshly computed value.
    async fn set_reputation(&self, id: UserId, reputation: i64) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Topics and subscriptions
// ---------------------------------------------------------------------------

/// Topic rows and the `(user, topic)` subscription rows, including the
/// denormalized subscriber counter the store keeps equal to the row count.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Insert a new topic.
    async fn insert_topic(&self, topic: Topic) -> StoreResult<()>;

    /// Fetch one topic by id.
    async fn topic_by_id(&self, id: TopicId) -> StoreResult<Option<Topic>>;

    /// Insert a subscription row and bump the topic's counter.
    ///
    /// Returns `false` when the `(user, topic)` pair already exists (the
    /// caller maps that to a conflict); the counter is untouched in that
    /// case.
    async fn insert_subscription(&self, subscription: TopicSubscription) -> StoreResult<bool>;

    /// Delete a subscription row and decrement the topic's counter.
    ///
    /// Returns `false` when no row existed.
    async fn delete_subscription(&self, user_id: UserId, topic_id: TopicId) -> StoreResult<bool>;

    /// Grouped fetch of subscription rows by `(user, topic)` key.
    async fn subscriptions_by_keys(
        &self,
        keys: &[(UserId, TopicId)],
    ) -> StoreResult<Vec<TopicSubscription>>;
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Post rows. All reads exclude tombstoned rows.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a new post.
    async fn insert_post(&self, post: Post) -> StoreResult<()>;

    /// Fetch one live post by id.
    async fn post_by_id(&self, id: PostId) -> StoreResult<Option<Post>>;

    /// Grouped fetch of live posts by id.
    async fn posts_by_ids(&self, ids: &[PostId]) -> StoreResult<Vec<Post>>;

    /// Overwrite a post's mutable columns (title, body, flags, `updated_at`).
    async fn update_post(&self, post: &Post) -> StoreResult<()>;

    /// Tombstone a post. Returns `false` when the post was absent or
    /// already tombstoned.
    async fn soft_delete_post(&self, id: PostId, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Bump the view counter without touching `updated_at`.
    async fn increment_view_count(&self, id: PostId) -> StoreResult<()>;

    /// One page of the post feed: compound cursor predicate applied,
    /// ordered per `order`, at most `limit` rows.
    async fn page_posts(
        &self,
        order: PostOrder,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Post>>;
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Comment rows with their materialized ancestor paths. All reads exclude
/// tombstoned rows.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a new comment with its precomputed depth and path.
    async fn insert_comment(&self, comment: Comment) -> StoreResult<()>;

    /// Fetch one live comment by id.
    async fn comment_by_id(&self, id: CommentId) -> StoreResult<Option<Comment>>;

    /// Grouped fetch of live comments by id.
    async fn comments_by_ids(&self, ids: &[CommentId]) -> StoreResult<Vec<Comment>>;

    /// Tombstone a comment. Children are untouched -- deletion does not
    /// cascade. Returns `false` when the comment was absent or already
    /// tombstoned.
    async fn soft_delete_comment(&self, id: CommentId, at: DateTime<Utc>) -> StoreResult<bool>;

    /// One page of a post's comments: compound cursor predicate applied,
    /// ordered per `order`, at most `limit` rows.
    async fn page_comments(
        &self,
        post_id: PostId,
        order: CommentOrder,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Comment>>;

    /// All live comments whose path is the given path or a descendant of
    /// it, ordered by creation time ascending then id ascending.
    async fn subtree_comments(&self, post_id: PostId, path: &str) -> StoreResult<Vec<Comment>>;
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

/// Vote rows and the aggregates derived from them.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Fetch the caller's vote on one target, if any.
    async fn vote_by_key(
        &self,
        user_id: UserId,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<Option<Vote>>;

    /// Grouped fetch of vote rows by `(user, target id, target kind)` key.
    async fn votes_by_keys(
        &self,
        keys: &[(UserId, Uuid, TargetKind)],
    ) -> StoreResult<Vec<Vote>>;

    /// Insert the vote, or overwrite the direction of the existing row for
    /// the same `(user, target)` -- never a second row.
    async fn upsert_vote(&self, vote: Vote) -> StoreResult<()>;

    /// Physically delete a vote row. Returns `false` when no row existed.
    async fn delete_vote(
        &self,
        user_id: UserId,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<bool>;

    /// Net score of one target: the live sum over all of its vote rows.
    async fn vote_sum_for_target(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<i64>;

    /// Grouped net scores for many targets. Targets with no votes are
    /// omitted (the caller treats omission as zero).
    async fn vote_counts_for_targets(
        &self,
        keys: &[(Uuid, TargetKind)],
    ) -> StoreResult<HashMap<(Uuid, TargetKind), i64>>;

    /// Net score across every live post and comment the user authored.
    /// This is the source of truth for reputation.
    async fn vote_sum_for_author(&self, author_id: UserId) -> StoreResult<i64>;
}

// ---------------------------------------------------------------------------
// Bookmarks
// ---------------------------------------------------------------------------

/// Presence-only `(user, post)` bookmark rows.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Insert a bookmark row. Returns `false` when the `(user, post)` pair
    /// already exists.
    async fn insert_bookmark(&self, bookmark: Bookmark) -> StoreResult<bool>;

    /// Delete a bookmark row. Returns `false` when no row existed.
    async fn delete_bookmark(&self, user_id: UserId, post_id: PostId) -> StoreResult<bool>;

    /// Grouped fetch of bookmark rows by `(user, post)` key.
    async fn bookmarks_by_keys(&self, keys: &[(UserId, PostId)]) -> StoreResult<Vec<Bookmark>>;

    /// One page of the user's bookmarked posts, newest bookmark first,
    /// compound cursor predicate on `(bookmark created_at, bookmark id)`.
    /// Tombstoned posts are excluded together with their bookmarks.
    async fn page_bookmarked_posts(
        &self,
        user_id: UserId,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<(Bookmark, Post)>>;
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

/// Directed follow edges between users.
#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Insert a follow edge. Returns `false` when it already exists.
    async fn insert_follow(&self, follow: Follow) -> StoreResult<bool>;

    /// Delete a follow edge. Returns `false` when no row existed.
    async fn delete_follow(&self, follower_id: UserId, followee_id: UserId) -> StoreResult<bool>;

    /// Grouped fetch of follow rows by `(follower, followee)` key.
    async fn follows_by_keys(&self, keys: &[(UserId, UserId)]) -> StoreResult<Vec<Follow>>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Notification rows. Only the read flag is ever updated.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a notification row.
    async fn insert_notification(&self, notification: Notification) -> StoreResult<()>;

    /// The recipient's notifications, newest first, at most `limit` rows.
    async fn list_notifications(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> StoreResult<Vec<Notification>>;

    /// Set the read flag on one of the recipient's notifications. Returns
    /// `false` when the notification does not exist or belongs to someone
    /// else.
    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> StoreResult<bool>;
}

// ---------------------------------------------------------------------------
// The combined store
// ---------------------------------------------------------------------------

/// Everything a full deployment needs, as one object-safe supertrait so
/// services can hold a single `Arc<dyn Store>`.
pub trait Store:
    UserStore
    + TopicStore
    + PostStore
    + CommentStore
    + VoteStore
    + BookmarkStore
    + FollowStore
    + NotificationStore
{
}

impl<T> Store for T where
    T: UserStore
        + TopicStore
        + PostStore
        + CommentStore
        + VoteStore
        + BookmarkStore
        + FollowStore
        + NotificationStore
{
}
