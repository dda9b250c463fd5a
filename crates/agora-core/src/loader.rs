//! Per-request batching and memoization of entity lookups.
//!
//! Rendering one feed page fans out into many lookups: each post needs its
//! author, the caller's vote, the caller's bookmark state, and a net score.
//! Issued naively that is N queries per entity kind per page. A
//! [`BatchLoader`] collapses them: `load_many` issues exactly one grouped
//! store call for the keys not already memoized, and `load` never fetches a
//! key twice within the loader's lifetime.
//!
//! A [`Loaders`] bundle is constructed **per inbound request** and dropped
//! with it. Memoized state must not leak between unrelated callers, so
//! nothing here is shared across requests -- correctness over
//! micro-optimization. Mutation handlers call `invalidate` for the keys
//! they change so later loads in the same request observe fresh state.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use agora_types::{
    Bookmark, Comment, CommentId, Follow, Post, PostId, TargetKind, TopicId, TopicSubscription,
    User, UserId, Vote,
};

use crate::store::{Store, StoreResult};

// ---------------------------------------------------------------------------
// The generic loader
// ---------------------------------------------------------------------------

/// A grouped fetch of values by key.
///
/// Implementations issue one storage query for the whole key slice and
/// return only the keys that exist; absence is expressed by omission.
#[async_trait]
pub trait BatchFetch: Send + Sync {
    /// The lookup key.
    type Key: Clone + Eq + Hash + Send + Sync;
    /// The loaded entity.
    type Value: Clone + Send + Sync;

    /// Fetch all of `keys` in one grouped call.
    async fn fetch_batch(
        &self,
        keys: &[Self::Key],
    ) -> StoreResult<HashMap<Self::Key, Self::Value>>;
}

/// A memoizing, key-grouping loader over one [`BatchFetch`].
///
/// Misses are memoized too (`None`), so a key known to be absent is never
/// re-fetched. `load` never fails for "not found" -- absence is `None`.
pub struct BatchLoader<F: BatchFetch> {
    fetcher: F,
    cache: Mutex<HashMap<F::Key, Option<F::Value>>>,
}

impl<F: BatchFetch> BatchLoader<F> {
    /// Wrap a fetcher in a fresh, empty loader.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load one key, memoized. Returns `None` for an absent entity.
    pub async fn load(&self, key: F::Key) -> StoreResult<Option<F::Value>> {
        let mut found = self.load_many(std::slice::from_ref(&key)).await?;
        Ok(found.remove(&key))
    }

    /// Load many keys with at most one grouped store call for the subset
    /// not already memoized. Returns only the keys that exist.
    pub async fn load_many(
        &self,
        keys: &[F::Key],
    ) -> StoreResult<HashMap<F::Key, F::Value>> {
        // The memo table stays locked across the fetch so a second caller
        // inside the same request cannot race a duplicate query for the
        // same keys.
        let mut cache = self.cache.lock().await;

        let mut missing: Vec<F::Key> = Vec::new();
        for key in keys {
            if !cache.contains_key(key) && !missing.contains(key) {
                missing.push(key.clone());
            }
        }

        if !missing.is_empty() {
            let fetched = self.fetcher.fetch_batch(&missing).await?;
            for key in missing {
                let value = fetched.get(&key).cloned();
                cache.insert(key, value);
            }
        }

        let mut found = HashMap::new();
        for key in keys {
            if let Some(Some(value)) = cache.get(key) {
                found.insert(key.clone(), value.clone());
            }
        }
        Ok(found)
    }

    /// Forget one memoized key so the next load observes fresh state.
    /// Used by mutations that change the underlying row.
    pub async fn invalidate(&self, key: &F::Key) {
        self.cache.lock().await.remove(key);
    }

    /// Seed the memo table with a value obtained elsewhere (e.g. the row a
    /// mutation just wrote), skipping the fetch for later loads.
    pub async fn prime(&self, key: F::Key, value: F::Value) {
        self.cache.lock().await.insert(key, Some(value));
    }
}

// ---------------------------------------------------------------------------
// Concrete fetchers
// ---------------------------------------------------------------------------

/// Composite key for vote lookups: `(voter, target id, target kind)`.
pub type VoteKey = (UserId, Uuid, TargetKind);

/// Composite key for bookmark lookups: `(user, post)`.
pub type BookmarkKey = (UserId, PostId);

/// Composite key for subscription lookups: `(user, topic)`.
pub type SubscriptionKey = (UserId, TopicId);

/// Composite key for follow lookups: `(follower, followee)`.
pub type FollowKey = (UserId, UserId);

/// Composite key for net-score lookups: `(target id, target kind)`.
pub type VoteCountKey = (Uuid, TargetKind);

/// Grouped user lookups.
pub struct UserFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for UserFetcher {
    type Key = UserId;
    type Value = User;

    async fn fetch_batch(&self, keys: &[UserId]) -> StoreResult<HashMap<UserId, User>> {
        let rows = self.0.users_by_ids(keys).await?;
        Ok(rows.into_iter().map(|user| (user.id, user)).collect())
    }
}

/// Grouped live-post lookups.
pub struct PostFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for PostFetcher {
    type Key = PostId;
    type Value = Post;

    async fn fetch_batch(&self, keys: &[PostId]) -> StoreResult<HashMap<PostId, Post>> {
        let rows = self.0.posts_by_ids(keys).await?;
        Ok(rows.into_iter().map(|post| (post.id, post)).collect())
    }
}

/// Grouped live-comment lookups.
pub struct CommentFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for CommentFetcher {
    type Key = CommentId;
    type Value = Comment;

    async fn fetch_batch(
        &self,
        keys: &[CommentId],
    ) -> StoreResult<HashMap<CommentId, Comment>> {
        let rows = self.0.comments_by_ids(keys).await?;
        Ok(rows.into_iter().map(|comment| (comment.id, comment)).collect())
    }
}

/// Grouped vote-row lookups by `(voter, target)`.
pub struct VoteFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for VoteFetcher {
    type Key = VoteKey;
    type Value = Vote;

    async fn fetch_batch(&self, keys: &[VoteKey]) -> StoreResult<HashMap<VoteKey, Vote>> {
        let rows = self.0.votes_by_keys(keys).await?;
        Ok(rows
            .into_iter()
            .map(|vote| ((vote.user_id, vote.target_id, vote.target_kind), vote))
            .collect())
    }
}

/// Grouped bookmark lookups by `(user, post)`.
pub struct BookmarkFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for BookmarkFetcher {
    type Key = BookmarkKey;
    type Value = Bookmark;

    async fn fetch_batch(
        &self,
        keys: &[BookmarkKey],
    ) -> StoreResult<HashMap<BookmarkKey, Bookmark>> {
        let rows = self.0.bookmarks_by_keys(keys).await?;
        Ok(rows
            .into_iter()
            .map(|bookmark| ((bookmark.user_id, bookmark.post_id), bookmark))
            .collect())
    }
}

/// Grouped subscription lookups by `(user, topic)`.
pub struct SubscriptionFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for SubscriptionFetcher {
    type Key = SubscriptionKey;
    type Value = TopicSubscription;

    async fn fetch_batch(
        &self,
        keys: &[SubscriptionKey],
    ) -> StoreResult<HashMap<SubscriptionKey, TopicSubscription>> {
        let rows = self.0.subscriptions_by_keys(keys).await?;
        Ok(rows
            .into_iter()
            .map(|sub| ((sub.user_id, sub.topic_id), sub))
            .collect())
    }
}

/// Grouped follow lookups by `(follower, followee)`.
pub struct FollowFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for FollowFetcher {
    type Key = FollowKey;
    type Value = Follow;

    async fn fetch_batch(&self, keys: &[FollowKey]) -> StoreResult<HashMap<FollowKey, Follow>> {
        let rows = self.0.follows_by_keys(keys).await?;
        Ok(rows
            .into_iter()
            .map(|follow| ((follow.follower_id, follow.followee_id), follow))
            .collect())
    }
}

/// Grouped net-score lookups.
///
/// Targets with no votes are absent from the result; callers read that as
/// zero via [`Loaders::vote_count_or_zero`].
pub struct VoteCountFetcher(Arc<dyn Store>);

#[async_trait]
impl BatchFetch for VoteCountFetcher {
    type Key = VoteCountKey;
    type Value = i64;

    async fn fetch_batch(
        &self,
        keys: &[VoteCountKey],
    ) -> StoreResult<HashMap<VoteCountKey, i64>> {
        self.0.vote_counts_for_targets(keys).await
    }
}

// ---------------------------------------------------------------------------
// The per-request bundle
// ---------------------------------------------------------------------------

/// Every loader one request needs, built together and dropped together.
pub struct Loaders {
    /// Users by id.
    pub users: BatchLoader<UserFetcher>,
    /// Live posts by id.
    pub posts: BatchLoader<PostFetcher>,
    /// Live comments by id.
    pub comments: BatchLoader<CommentFetcher>,
    /// Vote rows by `(voter, target)`.
    pub votes: BatchLoader<VoteFetcher>,
    /// Bookmarks by `(user, post)`.
    pub bookmarks: BatchLoader<BookmarkFetcher>,
    /// Topic subscriptions by `(user, topic)`.
    pub subscriptions: BatchLoader<SubscriptionFetcher>,
    /// Follow edges by `(follower, followee)`.
    pub follows: BatchLoader<FollowFetcher>,
    /// Net scores by `(target id, target kind)`.
    pub vote_counts: BatchLoader<VoteCountFetcher>,
}

impl Loaders {
    /// Build a fresh bundle for one request.
    pub fn new(store: &Arc<dyn Store>) -> Self {
        Self {
            users: BatchLoader::new(UserFetcher(Arc::clone(store))),
            posts: BatchLoader::new(PostFetcher(Arc::clone(store))),
            comments: BatchLoader::new(CommentFetcher(Arc::clone(store))),
            votes: BatchLoader::new(VoteFetcher(Arc::clone(store))),
            bookmarks: BatchLoader::new(BookmarkFetcher(Arc::clone(store))),
            subscriptions: BatchLoader::new(SubscriptionFetcher(Arc::clone(store))),
            follows: BatchLoader::new(FollowFetcher(Arc::clone(store))),
            vote_counts: BatchLoader::new(VoteCountFetcher(Arc::clone(store))),
        }
    }

    /// A target's memoized net score, with "no votes" read as zero.
    pub async fn vote_count_or_zero(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<i64> {
        Ok(self
            .vote_counts
            .load((target_id, target_kind))
            .await?
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fetcher stub that records every grouped call it serves.
    struct Recording {
        calls: AtomicUsize,
        rows: HashMap<u32, &'static str>,
    }

    impl Recording {
        fn with_rows(rows: &[(u32, &'static str)]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                rows: rows.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl BatchFetch for Recording {
        type Key = u32;
        type Value = &'static str;

        async fn fetch_batch(
            &self,
            keys: &[u32],
        ) -> StoreResult<HashMap<u32, &'static str>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(keys
                .iter()
                .filter_map(|key| self.rows.get(key).map(|value| (*key, *value)))
                .collect())
        }
    }

    #[tokio::test]
    async fn repeated_loads_fetch_once() {
        let loader = BatchLoader::new(Recording::with_rows(&[(1, "one")]));
        assert_eq!(loader.load(1).await.ok().flatten(), Some("one"));
        assert_eq!(loader.load(1).await.ok().flatten(), Some("one"));
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_many_issues_one_grouped_call() {
        let loader = BatchLoader::new(Recording::with_rows(&[(1, "one"), (2, "two")]));
        let found = loader.load_many(&[1, 2, 2, 3]).await.unwrap_or_default();
        assert_eq!(found.len(), 2);
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_are_memoized_as_absent() {
        let loader = BatchLoader::new(Recording::with_rows(&[]));
        assert_eq!(loader.load(9).await.ok().flatten(), None);
        assert_eq!(loader.load(9).await.ok().flatten(), None);
        // The second load answers from the memoized miss.
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn only_uncached_keys_hit_the_store() {
        let loader = BatchLoader::new(Recording::with_rows(&[(1, "one"), (2, "two")]));
        let _ = loader.load(1).await;
        let _ = loader.load_many(&[1, 2]).await;
        // Key 1 was memoized, so the second call fetched only key 2.
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_a_refetch() {
        let loader = BatchLoader::new(Recording::with_rows(&[(1, "one")]));
        let _ = loader.load(1).await;
        loader.invalidate(&1).await;
        let _ = loader.load(1).await;
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn primed_keys_never_fetch() {
        let loader = BatchLoader::new(Recording::with_rows(&[(1, "stale")]));
        loader.prime(1, "fresh").await;
        assert_eq!(loader.load(1).await.ok().flatten(), Some("fresh"));
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
