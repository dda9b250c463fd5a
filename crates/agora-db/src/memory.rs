//! In-memory store for tests and small single-process deployments.
//!
//! All state lives behind one [`RwLock`]; every mutation takes the write
//! lock for its whole read-modify-write sequence, which gives the same
//! atomicity the `PostgreSQL` unique constraints give -- two concurrent
//! vote casts for one `(user, target)` cannot produce two rows.
//!
//! Soft-delete filtering is centralized in the private `live_*` accessors;
//! no public read path touches tombstoned rows.

use std::collections::{BTreeMap, HashMap};
use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use agora_core::pagination::{Cursor, CursorKey};
use agora_core::store::{
    BookmarkStore, CommentStore, FollowStore, NotificationStore, PostStore, StoreResult,
    TopicStore, UserStore, VoteStore,
};
use agora_types::{
    Bookmark, Comment, CommentId, CommentOrder, Follow, Notification, NotificationId, Post,
    PostId, PostOrder, TargetKind, Topic, TopicId, TopicSubscription, User, UserId, Vote,
};

/// Everything the store holds, guarded by one lock.
#[derive(Debug, Default)]
struct MemoryInner {
    users: BTreeMap<UserId, User>,
    topics: BTreeMap<TopicId, Topic>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    votes: HashMap<(UserId, Uuid, TargetKind), Vote>,
    bookmarks: HashMap<(UserId, PostId), Bookmark>,
    subscriptions: HashMap<(UserId, TopicId), TopicSubscription>,
    follows: HashMap<(UserId, UserId), Follow>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl MemoryInner {
    fn live_post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id).filter(|post| post.is_live())
    }

    fn live_comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id).filter(|comment| comment.is_live())
    }

    fn score_of(&self, target_id: Uuid, target_kind: TargetKind) -> i64 {
        self.votes
            .values()
            .filter(|vote| vote.target_id == target_id && vote.target_kind == target_kind)
            .map(|vote| vote.direction.score())
            .sum()
    }
}

/// The in-memory implementation of every store port.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Cursor predicates (the compound keyset comparisons)
// ---------------------------------------------------------------------------

/// Strictly after the cursor in a (time desc, id desc) feed.
fn after_desc(created_at: DateTime<Utc>, id: Uuid, cursor: &Cursor) -> bool {
    match cursor.key {
        CursorKey::Time(at) => match created_at.cmp(&at) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => id < cursor.id,
        },
        // A cursor of the wrong shape never filters; the feed layer
        // decodes order-aware so this arm is unreachable in practice.
        CursorKey::Score(_) | CursorKey::DepthTime(..) => true,
    }
}

/// Strictly after the cursor in a (time asc, id asc) feed.
fn after_asc(created_at: DateTime<Utc>, id: Uuid, cursor: &Cursor) -> bool {
    match cursor.key {
        CursorKey::Time(at) => match created_at.cmp(&at) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => id > cursor.id,
        },
        CursorKey::Score(_) | CursorKey::DepthTime(..) => true,
    }
}

/// Strictly after the cursor in a (score desc, id desc) feed.
fn after_score_desc(score: i64, id: Uuid, cursor: &Cursor) -> bool {
    match cursor.key {
        CursorKey::Score(at) => match score.cmp(&at) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => id < cursor.id,
        },
        CursorKey::Time(_) | CursorKey::DepthTime(..) => true,
    }
}

/// Strictly after the cursor in the (depth asc, time desc, id desc)
/// comment order.
fn after_depth_time(
    depth: i16,
    created_at: DateTime<Utc>,
    id: Uuid,
    cursor: &Cursor,
) -> bool {
    match cursor.key {
        CursorKey::DepthTime(cursor_depth, at) => match depth.cmp(&cursor_depth) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match created_at.cmp(&at) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => id < cursor.id,
            },
        },
        CursorKey::Time(_) | CursorKey::Score(_) => true,
    }
}

fn truncate<T>(mut rows: Vec<T>, limit: i64) -> Vec<T> {
    rows.truncate(usize::try_from(limit).unwrap_or(0));
    rows
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<()> {
        self.inner.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn set_reputation(&self, id: UserId, reputation: i64) -> StoreResult<()> {
        if let Some(user) = self.inner.write().await.users.get_mut(&id) {
            user.reputation = reputation;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Topics and subscriptions
// ---------------------------------------------------------------------------

#[async_trait]
impl TopicStore for MemoryStore {
    async fn insert_topic(&self, topic: Topic) -> StoreResult<()> {
        self.inner.write().await.topics.insert(topic.id, topic);
        Ok(())
    }

    async fn topic_by_id(&self, id: TopicId) -> StoreResult<Option<Topic>> {
        Ok(self.inner.read().await.topics.get(&id).cloned())
    }

    async fn insert_subscription(&self, subscription: TopicSubscription) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let key = (subscription.user_id, subscription.topic_id);
        if inner.subscriptions.contains_key(&key) {
            return Ok(false);
        }
        let topic_id = subscription.topic_id;
        inner.subscriptions.insert(key, subscription);
        if let Some(topic) = inner.topics.get_mut(&topic_id) {
            topic.subscriber_count = topic.subscriber_count.saturating_add(1);
        }
        Ok(true)
    }

    async fn delete_subscription(&self, user_id: UserId, topic_id: TopicId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.subscriptions.remove(&(user_id, topic_id)).is_none() {
            return Ok(false);
        }
        if let Some(topic) = inner.topics.get_mut(&topic_id) {
            topic.subscriber_count = topic.subscriber_count.saturating_sub(1);
        }
        Ok(true)
    }

    async fn subscriptions_by_keys(
        &self,
        keys: &[(UserId, TopicId)],
    ) -> StoreResult<Vec<TopicSubscription>> {
        let inner = self.inner.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| inner.subscriptions.get(key).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: Post) -> StoreResult<()> {
        self.inner.write().await.posts.insert(post.id, post);
        Ok(())
    }

    async fn post_by_id(&self, id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.inner.read().await.live_post(id).cloned())
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.live_post(*id).cloned())
            .collect())
    }

    async fn update_post(&self, post: &Post) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.posts.get_mut(&post.id) {
            if existing.is_live() {
                existing.title = post.title.clone();
                existing.body = post.body.clone();
                existing.pinned = post.pinned;
                existing.locked = post.locked;
                existing.updated_at = post.updated_at;
            }
        }
        Ok(())
    }

    async fn soft_delete_post(&self, id: PostId, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.posts.get_mut(&id) {
            Some(post) if post.is_live() => {
                post.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_view_count(&self, id: PostId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(post) = inner.posts.get_mut(&id) {
            post.view_count = post.view_count.saturating_add(1);
        }
        Ok(())
    }

    async fn page_posts(
        &self,
        order: PostOrder,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Post> = inner
            .posts
            .values()
            .filter(|post| post.is_live())
            .cloned()
            .collect();

        match order {
            PostOrder::Newest => {
                rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
                if let Some(cursor) = cursor {
                    rows.retain(|post| after_desc(post.created_at, post.id.into_inner(), cursor));
                }
            }
            PostOrder::Oldest => {
                rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
                if let Some(cursor) = cursor {
                    rows.retain(|post| after_asc(post.created_at, post.id.into_inner(), cursor));
                }
            }
            PostOrder::Top => {
                let scores: HashMap<PostId, i64> = rows
                    .iter()
                    .map(|post| {
                        (post.id, inner.score_of(post.id.into_inner(), TargetKind::Post))
                    })
                    .collect();
                let score = |post: &Post| scores.get(&post.id).copied().unwrap_or(0);
                rows.sort_by(|a, b| (score(b), b.id).cmp(&(score(a), a.id)));
                if let Some(cursor) = cursor {
                    rows.retain(|post| {
                        after_score_desc(score(post), post.id.into_inner(), cursor)
                    });
                }
            }
        }
        Ok(truncate(rows, limit))
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: Comment) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .comments
            .insert(comment.id, comment);
        Ok(())
    }

    async fn comment_by_id(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        Ok(self.inner.read().await.live_comment(id).cloned())
    }

    async fn comments_by_ids(&self, ids: &[CommentId]) -> StoreResult<Vec<Comment>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.live_comment(*id).cloned())
            .collect())
    }

    async fn soft_delete_comment(&self, id: CommentId, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.comments.get_mut(&id) {
            Some(comment) if comment.is_live() => {
                comment.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn page_comments(
        &self,
        post_id: PostId,
        order: CommentOrder,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Comment>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Comment> = inner
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id && comment.is_live())
            .cloned()
            .collect();

        match order {
            CommentOrder::Oldest => {
                rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
                if let Some(cursor) = cursor {
                    rows.retain(|c| after_asc(c.created_at, c.id.into_inner(), cursor));
                }
            }
            CommentOrder::Newest => {
                rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
                if let Some(cursor) = cursor {
                    rows.retain(|c| after_desc(c.created_at, c.id.into_inner(), cursor));
                }
            }
            CommentOrder::Top => {
                // Shallow first, then newest, then id -- the exact
                // tie-break the listing contract fixes.
                rows.sort_by(|a, b| {
                    (a.depth, b.created_at, b.id).cmp(&(b.depth, a.created_at, a.id))
                });
                if let Some(cursor) = cursor {
                    rows.retain(|c| {
                        after_depth_time(c.depth, c.created_at, c.id.into_inner(), cursor)
                    });
                }
            }
        }
        Ok(truncate(rows, limit))
    }

    async fn subtree_comments(&self, post_id: PostId, path: &str) -> StoreResult<Vec<Comment>> {
        let inner = self.inner.read().await;
        let child_prefix = format!("{path}.");
        let mut rows: Vec<Comment> = inner
            .comments
            .values()
            .filter(|comment| {
                comment.post_id == post_id
                    && comment.is_live()
                    && (comment.path == path || comment.path.starts_with(&child_prefix))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[async_trait]
impl VoteStore for MemoryStore {
    async fn vote_by_key(
        &self,
        user_id: UserId,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<Option<Vote>> {
        Ok(self
            .inner
            .read()
            .await
            .votes
            .get(&(user_id, target_id, target_kind))
            .cloned())
    }

    async fn votes_by_keys(
        &self,
        keys: &[(UserId, Uuid, TargetKind)],
    ) -> StoreResult<Vec<Vote>> {
        let inner = self.inner.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| inner.votes.get(key).cloned())
            .collect())
    }

    async fn upsert_vote(&self, vote: Vote) -> StoreResult<()> {
        // One write lock covers the whole upsert: the map key is the
        // unique constraint, so a concurrent cast for the same (user,
        // target) overwrites rather than duplicating.
        self.inner
            .write()
            .await
            .votes
            .insert((vote.user_id, vote.target_id, vote.target_kind), vote);
        Ok(())
    }

    async fn delete_vote(
        &self,
        user_id: UserId,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .votes
            .remove(&(user_id, target_id, target_kind))
            .is_some())
    }

    async fn vote_sum_for_target(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<i64> {
        Ok(self.inner.read().await.score_of(target_id, target_kind))
    }

    async fn vote_counts_for_targets(
        &self,
        keys: &[(Uuid, TargetKind)],
    ) -> StoreResult<HashMap<(Uuid, TargetKind), i64>> {
        let inner = self.inner.read().await;
        let mut counts = HashMap::new();
        for vote in inner.votes.values() {
            let key = (vote.target_id, vote.target_kind);
            if keys.contains(&key) {
                let entry = counts.entry(key).or_insert(0_i64);
                *entry = entry.saturating_add(vote.direction.score());
            }
        }
        Ok(counts)
    }

    async fn vote_sum_for_author(&self, author_id: UserId) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        let sum = inner
            .votes
            .values()
            .filter(|vote| match vote.target_kind {
                TargetKind::Post => inner
                    .live_post(PostId::from(vote.target_id))
                    .is_some_and(|post| post.author_id == author_id),
                TargetKind::Comment => inner
                    .live_comment(CommentId::from(vote.target_id))
                    .is_some_and(|comment| comment.author_id == author_id),
            })
            .map(|vote| vote.direction.score())
            .sum();
        Ok(sum)
    }
}

// ---------------------------------------------------------------------------
// Bookmarks
// ---------------------------------------------------------------------------

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn insert_bookmark(&self, bookmark: Bookmark) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let key = (bookmark.user_id, bookmark.post_id);
        if inner.bookmarks.contains_key(&key) {
            return Ok(false);
        }
        inner.bookmarks.insert(key, bookmark);
        Ok(true)
    }

    async fn delete_bookmark(&self, user_id: UserId, post_id: PostId) -> StoreResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .bookmarks
            .remove(&(user_id, post_id))
            .is_some())
    }

    async fn bookmarks_by_keys(&self, keys: &[(UserId, PostId)]) -> StoreResult<Vec<Bookmark>> {
        let inner = self.inner.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| inner.bookmarks.get(key).cloned())
            .collect())
    }

    async fn page_bookmarked_posts(
        &self,
        user_id: UserId,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<(Bookmark, Post)>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<(Bookmark, Post)> = inner
            .bookmarks
            .values()
            .filter(|bookmark| bookmark.user_id == user_id)
            .filter_map(|bookmark| {
                inner
                    .live_post(bookmark.post_id)
                    .map(|post| (bookmark.clone(), post.clone()))
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        if let Some(cursor) = cursor {
            rows.retain(|(bookmark, _)| {
                after_desc(bookmark.created_at, bookmark.id.into_inner(), cursor)
            });
        }
        Ok(truncate(rows, limit))
    }
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

#[async_trait]
impl FollowStore for MemoryStore {
    async fn insert_follow(&self, follow: Follow) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let key = (follow.follower_id, follow.followee_id);
        if inner.follows.contains_key(&key) {
            return Ok(false);
        }
        inner.follows.insert(key, follow);
        Ok(true)
    }

    async fn delete_follow(&self, follower_id: UserId, followee_id: UserId) -> StoreResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .follows
            .remove(&(follower_id, followee_id))
            .is_some())
    }

    async fn follows_by_keys(&self, keys: &[(UserId, UserId)]) -> StoreResult<Vec<Follow>> {
        let inner = self.inner.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| inner.follows.get(key).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: Notification) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .notifications
            .insert(notification.id, notification);
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(truncate(rows, limit))
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.notifications.get_mut(&id) {
            Some(notification) if notification.user_id == user_id => {
                notification.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
