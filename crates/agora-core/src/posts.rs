//! Post lifecycle: create, read (with view counting), edit, pin/lock,
//! tombstone.
//!
//! Posts are never physically removed while comments, votes, or bookmarks
//! reference them; deletion sets the `deleted_at` tombstone and every store
//! read filters it out.

use std::sync::Arc;

use chrono::Utc;

use agora_types::{
    ForumEvent, Post, PostId, TopicId, User, UserId, events::PostChanged,
};

use crate::bus::EventBus;
use crate::error::CoreError;
use crate::store::Store;

/// Maximum accepted title length, in characters.
const MAX_TITLE_CHARS: usize = 300;

/// Maximum accepted body length, in characters.
const MAX_BODY_CHARS: usize = 40_000;

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct PostDraft {
    /// The topic the post is classified under.
    pub topic_id: TopicId,
    /// Post title.
    pub title: String,
    /// Post body.
    pub body: String,
}

/// Partial update applied to an existing post.
///
/// Title and body edits require ownership (or admin); the pin and lock
/// flags are admin-only moderation state.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    /// New title, if changing.
    pub title: Option<String>,
    /// New body, if changing.
    pub body: Option<String>,
    /// New pinned flag, if changing (admin only).
    pub pinned: Option<bool>,
    /// New locked flag, if changing (admin only).
    pub locked: Option<bool>,
}

impl PostPatch {
    const fn touches_content(&self) -> bool {
        self.title.is_some() || self.body.is_some()
    }

    const fn touches_moderation(&self) -> bool {
        self.pinned.is_some() || self.locked.is_some()
    }
}

/// Creates and mutates posts.
pub struct PostService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl PostService {
    /// Build the service over a store and the shared bus.
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Create a post in a topic.
    pub async fn create_post(&self, author: &User, draft: PostDraft) -> Result<Post, CoreError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation(String::from(
                "post title must not be empty",
            )));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(CoreError::Validation(format!(
                "post title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        if draft.body.chars().count() > MAX_BODY_CHARS {
            return Err(CoreError::Validation(format!(
                "post body exceeds {MAX_BODY_CHARS} characters"
            )));
        }
        if self.store.topic_by_id(draft.topic_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("topic {}", draft.topic_id)));
        }

        let now = Utc::now();
        let post = Post {
            id: PostId::new(),
            author_id: author.id,
            topic_id: draft.topic_id,
            title: title.to_owned(),
            body: draft.body,
            pinned: false,
            locked: false,
            view_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_post(post.clone()).await?;

        self.bus.publish(ForumEvent::PostCreated(PostChanged {
            post: post.clone(),
        }));
        Ok(post)
    }

    /// Fetch one post for display and count the view.
    pub async fn post_detail(&self, id: PostId) -> Result<Post, CoreError> {
        let mut post = self
            .store
            .post_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("post {id}")))?;
        self.store.increment_view_count(id).await?;
        post.view_count = post.view_count.saturating_add(1);
        Ok(post)
    }

    /// Apply a partial update to a post.
    pub async fn update_post(
        &self,
        caller: &User,
        id: PostId,
        patch: PostPatch,
    ) -> Result<Post, CoreError> {
        let mut post = self
            .store
            .post_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("post {id}")))?;

        if patch.touches_content() {
            ensure_owner_or_admin(caller, post.author_id, "post")?;
        }
        if patch.touches_moderation() && !caller.admin {
            return Err(CoreError::Authorization(String::from(
                "only admins may pin or lock posts",
            )));
        }

        if let Some(title) = patch.title {
            let title = title.trim().to_owned();
            if title.is_empty() {
                return Err(CoreError::Validation(String::from(
                    "post title must not be empty",
                )));
            }
            if title.chars().count() > MAX_TITLE_CHARS {
                return Err(CoreError::Validation(format!(
                    "post title exceeds {MAX_TITLE_CHARS} characters"
                )));
            }
            post.title = title;
        }
        if let Some(body) = patch.body {
            if body.chars().count() > MAX_BODY_CHARS {
                return Err(CoreError::Validation(format!(
                    "post body exceeds {MAX_BODY_CHARS} characters"
                )));
            }
            post.body = body;
        }
        if let Some(pinned) = patch.pinned {
            post.pinned = pinned;
        }
        if let Some(locked) = patch.locked {
            post.locked = locked;
        }
        post.updated_at = Utc::now();

        self.store.update_post(&post).await?;
        self.bus.publish(ForumEvent::PostUpdated(PostChanged {
            post: post.clone(),
        }));
        Ok(post)
    }

    /// Tombstone a post. The row (and its comments, votes, and bookmarks)
    /// stays in the store; reads simply stop returning it.
    pub async fn delete_post(&self, caller: &User, id: PostId) -> Result<(), CoreError> {
        let mut post = self
            .store
            .post_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("post {id}")))?;
        ensure_owner_or_admin(caller, post.author_id, "post")?;

        let now = Utc::now();
        if !self.store.soft_delete_post(id, now).await? {
            return Err(CoreError::NotFound(format!("post {id}")));
        }

        post.deleted_at = Some(now);
        self.bus
            .publish(ForumEvent::PostUpdated(PostChanged { post }));
        Ok(())
    }
}

fn ensure_owner_or_admin(caller: &User, owner: UserId, what: &str) -> Result<(), CoreError> {
    if caller.id == owner || caller.admin {
        Ok(())
    } else {
        Err(CoreError::Authorization(format!(
            "only the author or an admin may modify this {what}"
        )))
    }
}
