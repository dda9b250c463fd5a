//! Bounded-depth comment hierarchy with materialized ancestor paths.
//!
//! Comments nest at most [`MAX_COMMENT_DEPTH`] levels deep; exceeding the
//! bound is a validation failure, never a silent truncation. Each comment
//! carries a materialized path -- its ancestors' segments joined by `.`,
//! ending in its own segment -- so subtree listings are a single prefix
//! query against the store's path-addressable column.
//!
//! Path segments must be syntactically valid ltree labels, which UUIDs are
//! not (hyphens are illegal). [`path_segment`] transliterates losslessly:
//! the hyphens are stripped (the 32 hex digits remain) and a `c` tag is
//! prefixed so the label never starts with a digit.

use std::sync::Arc;

use chrono::Utc;

use agora_types::{
    Comment, CommentId, ForumEvent, Notification, NotificationId, NotificationKind, PostId, User,
    UserId,
    events::{CommentAdded, CommentDeleted, NotificationReceived},
    models::MAX_COMMENT_DEPTH,
};

use crate::bus::EventBus;
use crate::error::CoreError;
use crate::store::Store;

/// Maximum accepted comment length, in characters.
const MAX_CONTENT_CHARS: usize = 10_000;

/// Encode a comment id as an ltree-legal path label.
///
/// Lossless: the simple (hyphen-free) UUID form preserves all 128 bits, and
/// stripping the `c` tag plus re-hyphenating recovers the original id.
pub fn path_segment(id: CommentId) -> String {
    format!("c{}", id.into_inner().simple())
}

/// The materialized path for a comment: the parent's path extended with the
/// comment's own segment, or the segment alone for top-level comments.
pub fn child_path(parent_path: Option<&str>, id: CommentId) -> String {
    match parent_path {
        Some(parent) => format!("{parent}.{}", path_segment(id)),
        None => path_segment(id),
    }
}

/// Creates, deletes, and lists nested comments.
pub struct CommentService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl CommentService {
    /// Build the service over a store and the shared bus.
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Create a comment, optionally nested under `parent_id`.
    ///
    /// Validation, in order: non-empty bounded content; the post exists,
    /// is not tombstoned, and is not locked; the parent (when given)
    /// belongs to the same post; the resulting depth stays within
    /// [`MAX_COMMENT_DEPTH`].
    pub async fn create_comment(
        &self,
        author: &User,
        post_id: PostId,
        parent_id: Option<CommentId>,
        content: &str,
    ) -> Result<Comment, CoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::Validation(String::from(
                "comment content must not be empty",
            )));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CoreError::Validation(format!(
                "comment content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }

        let post = self
            .store
            .post_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("post {post_id}")))?;
        if post.locked {
            return Err(CoreError::Conflict(format!("post {post_id} is locked")));
        }

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .comment_by_id(parent_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::NotFound(format!("parent comment {parent_id}"))
                    })?;
                if parent.post_id != post_id {
                    return Err(CoreError::Validation(format!(
                        "parent comment {parent_id} belongs to post {}, not post {post_id}",
                        parent.post_id
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        let depth = parent
            .as_ref()
            .map_or(0, |parent| parent.depth.saturating_add(1));
        if depth > MAX_COMMENT_DEPTH {
            return Err(CoreError::Validation(format!(
                "comment nesting is limited to {MAX_COMMENT_DEPTH} levels"
            )));
        }

        let id = CommentId::new();
        let comment = Comment {
            id,
            post_id,
            author_id: author.id,
            parent_id,
            content: content.to_owned(),
            depth,
            path: child_path(parent.as_ref().map(|p| p.path.as_str()), id),
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.store.insert_comment(comment.clone()).await?;

        // Reply notification: the parent comment's author, or the post's
        // author for top-level comments. Never the commenter themselves.
        let recipient = parent
            .as_ref()
            .map_or(post.author_id, |parent| parent.author_id);
        if recipient != author.id {
            self.notify_reply(author, &comment, recipient).await?;
        }

        self.bus.publish(ForumEvent::CommentAdded(CommentAdded {
            post_id,
            comment: comment.clone(),
        }));

        Ok(comment)
    }

    /// Tombstone a comment. Children remain addressable -- deletion does
    /// not cascade; how orphaned subtrees render is the frontend's call.
    pub async fn delete_comment(&self, caller: &User, id: CommentId) -> Result<(), CoreError> {
        let comment = self
            .store
            .comment_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("comment {id}")))?;
        ensure_owner_or_admin(caller, comment.author_id, "comment")?;

        if !self.store.soft_delete_comment(id, Utc::now()).await? {
            return Err(CoreError::NotFound(format!("comment {id}")));
        }

        self.bus
            .publish(ForumEvent::CommentDeleted(CommentDeleted {
                post_id: comment.post_id,
                comment_id: id,
            }));
        Ok(())
    }

    /// The live subtree rooted at a comment (the root included), ordered by
    /// creation time ascending.
    pub async fn subtree(&self, id: CommentId) -> Result<Vec<Comment>, CoreError> {
        let root = self
            .store
            .comment_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("comment {id}")))?;
        Ok(self
            .store
            .subtree_comments(root.post_id, &root.path)
            .await?)
    }

    async fn notify_reply(
        &self,
        author: &User,
        comment: &Comment,
        recipient: UserId,
    ) -> Result<(), CoreError> {
        let notification = Notification {
            id: NotificationId::new(),
            user_id: recipient,
            kind: NotificationKind::Reply,
            payload: serde_json::json!({
                "postId": comment.post_id,
                "commentId": comment.id,
                "parentId": comment.parent_id,
                "authorId": author.id,
                "authorName": author.display_name,
            }),
            read: false,
            created_at: Utc::now(),
        };
        self.store.insert_notification(notification.clone()).await?;
        self.bus
            .publish(ForumEvent::NotificationReceived(NotificationReceived {
                notification,
            }));
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

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn segments_are_ltree_legal() {
        let segment = path_segment(CommentId::new());
        assert!(segment.starts_with('c'));
        assert_eq!(segment.len(), 33);
        assert!(segment.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn segment_encoding_is_lossless() {
        let id = CommentId::new();
        let segment = path_segment(id);
        let stripped = segment.trim_start_matches('c');
        let recovered = Uuid::parse_str(stripped).ok();
        assert_eq!(recovered, Some(id.into_inner()));
    }

    #[test]
    fn child_paths_extend_the_parent() {
        let parent = CommentId::new();
        let child = CommentId::new();
        let parent_path = child_path(None, parent);
        let nested = child_path(Some(&parent_path), child);
        assert_eq!(
            nested,
            format!("{}.{}", path_segment(parent), path_segment(child))
        );
        assert_eq!(child_path(None, child), path_segment(child));
    }
}
