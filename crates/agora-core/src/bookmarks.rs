//! Presence-only post bookmarks.
//!
//! The removal semantics are deliberately asymmetric with votes:
//! unbookmarking a post that was never bookmarked is an idempotent success
//! (`true`), while removing a nonexistent vote is a not-found failure.
//! Both behaviors are load-bearing for the surrounding API's retry story.

use std::sync::Arc;

use chrono::Utc;

use agora_types::{Bookmark, BookmarkId, PostId, UserId};

use crate::error::CoreError;
use crate::store::Store;

/// Creates and removes bookmarks.
pub struct BookmarkService {
    store: Arc<dyn Store>,
}

impl BookmarkService {
    /// Build the service over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Bookmark a post. Duplicate bookmarks are a conflict.
    pub async fn bookmark_post(&self, user_id: UserId, post_id: PostId) -> Result<(), CoreError> {
        if self.store.post_by_id(post_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("post {post_id}")));
        }
        let inserted = self
            .store
            .insert_bookmark(Bookmark {
                id: BookmarkId::new(),
                user_id,
                post_id,
                created_at: Utc::now(),
            })
            .await?;
        if inserted {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "post {post_id} is already bookmarked"
            )))
        }
    }

    /// Remove a bookmark. Succeeds whether or not the bookmark existed.
    pub async fn unbookmark_post(
        &self,
        user_id: UserId,
        post_id: PostId,
    ) -> Result<bool, CoreError> {
        // The store reports whether a row was deleted; the API contract
        // deliberately does not care.
        let _ = self.store.delete_bookmark(user_id, post_id).await?;
        Ok(true)
    }
}
