//! Cursor-paginated feeds over posts, comments, and bookmarks.
//!
//! This is the query-side counterpart of [`pagination`](crate::pagination):
//! it clamps page sizes, decodes cursors order-aware, asks the store for
//! one row more than the page, and assembles the [`Connection`]. The store
//! applies the compound keyset predicate; this module never re-filters.

use std::sync::Arc;

use agora_types::{
    Bookmark, Comment, CommentOrder, Post, PostId, PostOrder, TargetKind, UserId,
};

use crate::error::CoreError;
use crate::pagination::{Connection, Cursor, clamp_page_size};
use crate::store::Store;

/// Read-side service for the three cursor-paginated feeds.
pub struct FeedService {
    store: Arc<dyn Store>,
}

impl FeedService {
    /// Build the service over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// One page of the global post feed.
    pub async fn posts(
        &self,
        order: PostOrder,
        first: Option<i64>,
        after: Option<&str>,
    ) -> Result<Connection<Post>, CoreError> {
        let page = clamp_page_size(first);
        let cursor = match after {
            Some(token) => Some(match order {
                PostOrder::Newest | PostOrder::Oldest => Cursor::decode_time(token)?,
                PostOrder::Top => Cursor::decode_score(token)?,
            }),
            None => None,
        };

        let rows = self
            .store
            .page_posts(order, page.saturating_add(1), cursor.as_ref())
            .await?;

        match order {
            PostOrder::Newest | PostOrder::Oldest => Ok(Connection::assemble(
                rows,
                page,
                after.is_some(),
                |post| Cursor::at_time(post.created_at, post.id.into_inner()),
            )),
            PostOrder::Top => {
                // Edge cursors in the top feed carry the score, which the
                // page query ordered by; fetch the returned rows' scores in
                // one grouped call.
                let keys: Vec<_> = rows
                    .iter()
                    .map(|post| (post.id.into_inner(), TargetKind::Post))
                    .collect();
                let scores = self.store.vote_counts_for_targets(&keys).await?;
                Ok(Connection::assemble(rows, page, after.is_some(), |post| {
                    let score = scores
                        .get(&(post.id.into_inner(), TargetKind::Post))
                        .copied()
                        .unwrap_or(0);
                    Cursor::at_score(score, post.id.into_inner())
                }))
            }
        }
    }

    /// One page of a post's comments.
    pub async fn comments(
        &self,
        post_id: PostId,
        order: CommentOrder,
        first: Option<i64>,
        after: Option<&str>,
    ) -> Result<Connection<Comment>, CoreError> {
        if self.store.post_by_id(post_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("post {post_id}")));
        }

        let page = clamp_page_size(first);
        let cursor = match after {
            Some(token) => Some(match order {
                CommentOrder::Newest | CommentOrder::Oldest => Cursor::decode_time(token)?,
                CommentOrder::Top => Cursor::decode_depth_time(token)?,
            }),
            None => None,
        };

        let rows = self
            .store
            .page_comments(post_id, order, page.saturating_add(1), cursor.as_ref())
            .await?;

        Ok(Connection::assemble(
            rows,
            page,
            after.is_some(),
            |comment| match order {
                CommentOrder::Newest | CommentOrder::Oldest => {
                    Cursor::at_time(comment.created_at, comment.id.into_inner())
                }
                CommentOrder::Top => Cursor::at_depth_time(
                    comment.depth,
                    comment.created_at,
                    comment.id.into_inner(),
                ),
            },
        ))
    }

    /// One page of the caller's bookmarked posts, newest bookmark first.
    ///
    /// Nodes pair the bookmark row with its post: the cursor belongs to the
    /// bookmark (its creation orders the feed), the post is what renders.
    pub async fn bookmarks(
        &self,
        user_id: UserId,
        first: Option<i64>,
        after: Option<&str>,
    ) -> Result<Connection<(Bookmark, Post)>, CoreError> {
        let page = clamp_page_size(first);
        let cursor = match after {
            Some(token) => Some(Cursor::decode_time(token)?),
            None => None,
        };

        let rows = self
            .store
            .page_bookmarked_posts(user_id, page.saturating_add(1), cursor.as_ref())
            .await?;

        Ok(Connection::assemble(
            rows,
            page,
            after.is_some(),
            |(bookmark, _)| Cursor::at_time(bookmark.created_at, bookmark.id.into_inner()),
        ))
    }
}
