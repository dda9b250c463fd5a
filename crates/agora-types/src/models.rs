//! Entity structs for the Agora forum backend.
//!
//! These are the shapes shared between the store ports, the services, and
//! the API layer. Posts and comments are soft-deleted (a `deleted_at`
//! tombstone, never a physical delete while referenced); votes are the one
//! entity that is physically removed. All wire-facing structs serialize in
//! camelCase for the JavaScript frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{NotificationKind, TargetKind, VoteDirection};
use crate::ids::{
    BookmarkId, CommentId, FollowId, NotificationId, PostId, SubscriptionId, TopicId, UserId,
    VoteId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user.
///
/// `reputation` is derived state: the net sum of votes across everything the
/// user has authored. It is recomputed from vote rows after every vote
/// mutation, never incremented in place, so replays cannot make it drift.
/// Users are deactivated rather than deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user id.
    pub id: UserId,
    /// Login name, unique per deployment.
    pub username: String,
    /// Name shown next to posts, comments, and typing indicators.
    pub display_name: String,
    /// Net vote score across all of this user's posts and comments.
    pub reputation: i64,
    /// Whether the account passed verification.
    pub verified: bool,
    /// Whether the account has moderator powers (pin, lock, delete).
    pub admin: bool,
    /// Deactivated accounts keep their rows but cannot authenticate.
    pub active: bool,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A thread classification that posts belong to and users subscribe to.
///
/// `subscriber_count` is denormalized and must stay equal to the number of
/// subscription rows pointing at the topic; the storage layer maintains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Unique topic id.
    pub id: TopicId,
    /// URL-safe identifier (`"rust-help"`).
    pub slug: String,
    /// Human-readable name.
    pub name: String,
    /// Number of active subscriptions. Kept equal to the row count.
    pub subscriber_count: i64,
    /// When the topic was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A top-level post in a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique post id.
    pub id: PostId,
    /// The author. Exactly one per post.
    pub author_id: UserId,
    /// The topic this post is classified under.
    pub topic_id: TopicId,
    /// Post title.
    pub title: String,
    /// Post body.
    pub body: String,
    /// Pinned posts sort to the top of topic pages (presentation concern).
    pub pinned: bool,
    /// Locked posts reject new comments.
    pub locked: bool,
    /// How many times the post detail has been served.
    pub view_count: i64,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// When the post was last edited.
    pub updated_at: DateTime<Utc>,
    /// Tombstone. Set instead of deleting while comments, votes, or
    /// bookmarks still reference the row.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Whether the post is still visible (not tombstoned).
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment on a post, optionally nested under a parent comment.
///
/// `depth` is 0 for top-level comments and `parent.depth + 1` otherwise,
/// capped at [`MAX_COMMENT_DEPTH`](crate::models::MAX_COMMENT_DEPTH).
/// `path` is the materialized ancestor path (ltree-compatible labels joined
/// by `.`), ending in this comment's own segment; subtree queries are prefix
/// queries on it. Soft deletion does not cascade -- children of a tombstoned
/// comment remain addressable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique comment id.
    pub id: CommentId,
    /// The post this comment belongs to. Never changes.
    pub post_id: PostId,
    /// The author.
    pub author_id: UserId,
    /// Parent comment for nested replies; `None` for top-level comments.
    pub parent_id: Option<CommentId>,
    /// Comment text.
    pub content: String,
    /// Nesting depth: 0 for top-level, `parent.depth + 1` otherwise.
    pub depth: i16,
    /// Materialized ancestor path, ending in this comment's own segment.
    pub path: String,
    /// When the comment was created.
    pub created_at: DateTime<Utc>,
    /// Tombstone; children stay addressable when set.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Maximum comment nesting depth. Attempting to reply below this depth is a
/// validation failure, not a silent truncation.
pub const MAX_COMMENT_DEPTH: i16 = 5;

impl Comment {
    /// Whether the comment is still visible (not tombstoned).
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

/// A single vote by a user on a target.
///
/// At most one row exists per `(user_id, target_id, target_kind)`; casting
/// again overwrites `direction` in place. Removing a vote deletes the row
/// entirely -- votes are not tombstoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Unique vote row id.
    pub id: VoteId,
    /// The voter.
    pub user_id: UserId,
    /// The post or comment voted on. Untyped because it may refer to either
    /// table; `target_kind` discriminates.
    pub target_id: Uuid,
    /// Whether `target_id` names a post or a comment.
    pub target_kind: TargetKind,
    /// Up or down.
    pub direction: VoteDirection,
    /// When the vote was first cast.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Bookmark
// ---------------------------------------------------------------------------

/// A presence-only `(user, post)` bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Unique bookmark row id.
    pub id: BookmarkId,
    /// The bookmarking user.
    pub user_id: UserId,
    /// The bookmarked post.
    pub post_id: PostId,
    /// When the bookmark was created (orders the bookmark feed).
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Topic subscription
// ---------------------------------------------------------------------------

/// A `(user, topic)` subscription row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct TopicSubscription {
    /// Unique subscription row id.
    pub id: SubscriptionId,
    /// The subscribing user.
    pub user_id: UserId,
    /// The topic subscribed to.
    pub topic_id: TopicId,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Follow
// ---------------------------------------------------------------------------

/// A directed follow edge between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    /// Unique follow row id.
    pub id: FollowId,
    /// The user doing the following.
    pub follower_id: UserId,
    /// The user being followed.
    pub followee_id: UserId,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A notification issued as a side effect of another mutation.
///
/// The payload is opaque JSON whose shape depends on `kind`. Rows are never
/// updated after creation except for the `read` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique notification id.
    pub id: NotificationId,
    /// The recipient.
    pub user_id: UserId,
    /// Why the notification was issued.
    pub kind: NotificationKind,
    /// Kind-specific payload (ids and display strings for rendering).
    #[ts(type = "unknown")]
    pub payload: Value,
    /// Whether the recipient has seen it.
    pub read: bool,
    /// When the notification was issued.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Typing presence
// ---------------------------------------------------------------------------

/// One entry in a post's live typing roster.
///
/// Transient and in-memory only; entries expire after a fixed idle window
/// and are never persisted or replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct TypingUser {
    /// The typing user.
    pub user_id: UserId,
    /// Name to render in the indicator.
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_casing_is_camel_case() {
        let user = User {
            id: UserId::new(),
            username: String::from("ada"),
            display_name: String::from("Ada"),
            reputation: 0,
            verified: false,
            admin: false,
            active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap_or_default();
        assert!(json.get("displayName").is_some());
        assert!(json.get("display_name").is_none());
    }

    #[test]
    fn tombstone_controls_liveness() {
        let mut post = Post {
            id: PostId::new(),
            author_id: UserId::new(),
            topic_id: TopicId::new(),
            title: String::from("t"),
            body: String::from("b"),
            pinned: false,
            locked: false,
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        assert!(post.is_live());
        post.deleted_at = Some(Utc::now());
        assert!(!post.is_live());
    }
}
