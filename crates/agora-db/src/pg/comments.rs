//! Comment operations against `PostgreSQL`, including the ltree subtree
//! query and the keyset-paginated listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_core::pagination::{Cursor, CursorKey};
use agora_core::store::{CommentStore, StoreResult};
use agora_types::{Comment, CommentId, CommentOrder, PostId, UserId};

use super::{LIVE, PgStore};
use crate::error::store_err;

/// A row from the `comments` table. The ltree `path` column is selected
/// as text.
#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    content: String,
    depth: i16,
    path: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::from(row.id),
            post_id: PostId::from(row.post_id),
            author_id: UserId::from(row.author_id),
            parent_id: row.parent_id.map(CommentId::from),
            content: row.content,
            depth: row.depth,
            path: row.path,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, author_id, parent_id, content, depth, path::TEXT AS path, created_at, deleted_at";

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: Comment) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO comments (id, post_id, author_id, parent_id, content, depth, path, created_at, deleted_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7::ltree, $8, $9)",
        )
        .bind(comment.id.into_inner())
        .bind(comment.post_id.into_inner())
        .bind(comment.author_id.into_inner())
        .bind(comment.parent_id.map(CommentId::into_inner))
        .bind(&comment.content)
        .bind(comment.depth)
        .bind(&comment.path)
        .bind(comment.created_at)
        .bind(comment.deleted_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn comment_by_id(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND {LIVE}"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(store_err)?;
        Ok(row.map(Comment::from))
    }

    async fn comments_by_ids(&self, ids: &[CommentId]) -> StoreResult<Vec<Comment>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ANY($1) AND {LIVE}"
        ))
        .bind(&uuids)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn soft_delete_comment(&self, id: CommentId, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE comments SET deleted_at = $2 WHERE id = $1 AND {LIVE}"
        ))
        .bind(id.into_inner())
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn page_comments(
        &self,
        post_id: PostId,
        order: CommentOrder,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Comment>> {
        let rows = match order {
            CommentOrder::Oldest => {
                self.page_comments_by_time(post_id, limit, cursor, false)
                    .await?
            }
            CommentOrder::Newest => {
                self.page_comments_by_time(post_id, limit, cursor, true)
                    .await?
            }
            CommentOrder::Top => self.page_comments_top(post_id, limit, cursor).await?,
        };
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn subtree_comments(&self, post_id: PostId, path: &str) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE post_id = $1 AND {LIVE} AND path <@ $2::ltree
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(post_id.into_inner())
        .bind(path)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

impl PgStore {
    /// Time-ordered listing with the compound `(created_at, id)` predicate.
    async fn page_comments_by_time(
        &self,
        post_id: PostId,
        limit: i64,
        cursor: Option<&Cursor>,
        descending: bool,
    ) -> StoreResult<Vec<CommentRow>> {
        let (comparison, direction) = if descending {
            ("<", "DESC")
        } else {
            (">", "ASC")
        };

        let resume = cursor.and_then(|cursor| match cursor.key {
            CursorKey::Time(at) => Some((at, cursor.id)),
            CursorKey::Score(_) | CursorKey::DepthTime(..) => None,
        });

        let query = match resume {
            Some(_) => format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE post_id = $1 AND {LIVE}
                   AND (created_at {comparison} $3 OR (created_at = $3 AND id {comparison} $4))
                 ORDER BY created_at {direction}, id {direction}
                 LIMIT $2"
            ),
            None => format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE post_id = $1 AND {LIVE}
                 ORDER BY created_at {direction}, id {direction}
                 LIMIT $2"
            ),
        };

        let mut fetch = sqlx::query_as::<_, CommentRow>(&query)
            .bind(post_id.into_inner())
            .bind(limit);
        if let Some((at, id)) = resume {
            fetch = fetch.bind(at).bind(id);
        }
        fetch.fetch_all(self.pool()).await.map_err(store_err)
    }

    /// The "top" listing: depth ascending, then creation time descending,
    /// then id descending (shallow, newest-first), with the three-key
    /// compound predicate.
    async fn page_comments_top(
        &self,
        post_id: PostId,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<CommentRow>> {
        let resume = cursor.and_then(|cursor| match cursor.key {
            CursorKey::DepthTime(depth, at) => Some((depth, at, cursor.id)),
            CursorKey::Time(_) | CursorKey::Score(_) => None,
        });

        let query = match resume {
            Some(_) => format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE post_id = $1 AND {LIVE}
                   AND (depth > $3
                        OR (depth = $3 AND created_at < $4)
                        OR (depth = $3 AND created_at = $4 AND id < $5))
                 ORDER BY depth ASC, created_at DESC, id DESC
                 LIMIT $2"
            ),
            None => format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE post_id = $1 AND {LIVE}
                 ORDER BY depth ASC, created_at DESC, id DESC
                 LIMIT $2"
            ),
        };

        let mut fetch = sqlx::query_as::<_, CommentRow>(&query)
            .bind(post_id.into_inner())
            .bind(limit);
        if let Some((depth, at, id)) = resume {
            fetch = fetch.bind(depth).bind(at).bind(id);
        }
        fetch.fetch_all(self.pool()).await.map_err(store_err)
    }
}
