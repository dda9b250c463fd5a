//! Post operations against `PostgreSQL`, including the keyset-paginated
//! feed queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_core::pagination::{Cursor, CursorKey};
use agora_core::store::{PostStore, StoreResult};
use agora_types::{Post, PostId, PostOrder, TopicId, UserId};

use super::{LIVE, PgStore};
use crate::error::store_err;

/// A row from the `posts` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) author_id: Uuid,
    pub(crate) topic_id: Uuid,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) pinned: bool,
    pub(crate) locked: bool,
    pub(crate) view_count: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::from(row.id),
            author_id: UserId::from(row.author_id),
            topic_id: TopicId::from(row.topic_id),
            title: row.title,
            body: row.body,
            pinned: row.pinned,
            locked: row.locked,
            view_count: row.view_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

pub(crate) const POST_COLUMNS: &str = "id, author_id, topic_id, title, body, pinned, locked, view_count, created_at, updated_at, deleted_at";

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: Post) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO posts (id, author_id, topic_id, title, body, pinned, locked, view_count, created_at, updated_at, deleted_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(post.id.into_inner())
        .bind(post.author_id.into_inner())
        .bind(post.topic_id.into_inner())
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.pinned)
        .bind(post.locked)
        .bind(post.view_count)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.deleted_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn post_by_id(&self, id: PostId) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND {LIVE}"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(store_err)?;
        Ok(row.map(Post::from))
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> StoreResult<Vec<Post>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1) AND {LIVE}"
        ))
        .bind(&uuids)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn update_post(&self, post: &Post) -> StoreResult<()> {
        sqlx::query(&format!(
            "UPDATE posts SET title = $2, body = $3, pinned = $4, locked = $5, updated_at = $6
             WHERE id = $1 AND {LIVE}"
        ))
        .bind(post.id.into_inner())
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.pinned)
        .bind(post.locked)
        .bind(post.updated_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn soft_delete_post(&self, id: PostId, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE posts SET deleted_at = $2 WHERE id = $1 AND {LIVE}"
        ))
        .bind(id.into_inner())
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_view_count(&self, id: PostId) -> StoreResult<()> {
        sqlx::query(&format!(
            "UPDATE posts SET view_count = view_count + 1 WHERE id = $1 AND {LIVE}"
        ))
        .bind(id.into_inner())
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn page_posts(
        &self,
        order: PostOrder,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<Post>> {
        let rows = match order {
            PostOrder::Newest => self.page_posts_by_time(limit, cursor, true).await?,
            PostOrder::Oldest => self.page_posts_by_time(limit, cursor, false).await?,
            PostOrder::Top => self.page_posts_by_score(limit, cursor).await?,
        };
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

impl PgStore {
    /// Time-ordered page with the compound `(created_at, id)` predicate.
    async fn page_posts_by_time(
        &self,
        limit: i64,
        cursor: Option<&Cursor>,
        descending: bool,
    ) -> StoreResult<Vec<PostRow>> {
        let (comparison, direction) = if descending {
            ("<", "DESC")
        } else {
            (">", "ASC")
        };

        // Only a time-shaped cursor participates; the feed layer decodes
        // order-aware so any other shape cannot reach this query.
        let resume = cursor.and_then(|cursor| match cursor.key {
            CursorKey::Time(at) => Some((at, cursor.id)),
            CursorKey::Score(_) | CursorKey::DepthTime(..) => None,
        });

        let query = match resume {
            Some(_) => format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE {LIVE}
                   AND (created_at {comparison} $2 OR (created_at = $2 AND id {comparison} $3))
                 ORDER BY created_at {direction}, id {direction}
                 LIMIT $1"
            ),
            None => format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE {LIVE}
                 ORDER BY created_at {direction}, id {direction}
                 LIMIT $1"
            ),
        };

        let mut fetch = sqlx::query_as::<_, PostRow>(&query).bind(limit);
        if let Some((at, id)) = resume {
            fetch = fetch.bind(at).bind(id);
        }
        fetch.fetch_all(self.pool()).await.map_err(store_err)
    }

    /// Score-ordered page. The score is computed from vote rows in the
    /// query itself so the ordering and the compound predicate agree.
    async fn page_posts_by_score(
        &self,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<PostRow>> {
        const SCORED: &str = r"
            FROM posts p
            LEFT JOIN (
                SELECT target_id,
                       SUM(CASE direction WHEN 'up' THEN 1 ELSE -1 END)::BIGINT AS score
                FROM votes
                WHERE target_kind = 'post'
                GROUP BY target_id
            ) s ON s.target_id = p.id";

        let resume = cursor.and_then(|cursor| match cursor.key {
            CursorKey::Score(score) => Some((score, cursor.id)),
            CursorKey::Time(_) | CursorKey::DepthTime(..) => None,
        });

        let columns = "p.id, p.author_id, p.topic_id, p.title, p.body, p.pinned, p.locked, p.view_count, p.created_at, p.updated_at, p.deleted_at";
        let query = match resume {
            Some(_) => format!(
                "SELECT {columns} {SCORED}
                 WHERE p.{LIVE}
                   AND (COALESCE(s.score, 0) < $2
                        OR (COALESCE(s.score, 0) = $2 AND p.id < $3))
                 ORDER BY COALESCE(s.score, 0) DESC, p.id DESC
                 LIMIT $1"
            ),
            None => format!(
                "SELECT {columns} {SCORED}
                 WHERE p.{LIVE}
                 ORDER BY COALESCE(s.score, 0) DESC, p.id DESC
                 LIMIT $1"
            ),
        };

        let mut fetch = sqlx::query_as::<_, PostRow>(&query).bind(limit);
        if let Some((score, id)) = resume {
            fetch = fetch.bind(score).bind(id);
        }
        fetch.fetch_all(self.pool()).await.map_err(store_err)
    }
}
