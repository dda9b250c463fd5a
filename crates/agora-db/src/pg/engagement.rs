//! Bookmark, follow, and notification operations against `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_core::pagination::{Cursor, CursorKey};
use agora_core::store::{BookmarkStore, FollowStore, NotificationStore, StoreResult};
use agora_types::{
    Bookmark, BookmarkId, Follow, FollowId, Notification, NotificationId, Post, PostId, UserId,
};

use super::{PgStore, parse_notification_kind};
use crate::error::store_err;
use crate::pg::posts::PostRow;

/// A row from the `bookmarks` table.
#[derive(Debug, sqlx::FromRow)]
struct BookmarkRow {
    id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<BookmarkRow> for Bookmark {
    fn from(row: BookmarkRow) -> Self {
        Self {
            id: BookmarkId::from(row.id),
            user_id: UserId::from(row.user_id),
            post_id: PostId::from(row.post_id),
            created_at: row.created_at,
        }
    }
}

/// A bookmark joined with its (live) post, for the bookmark feed.
#[derive(Debug, sqlx::FromRow)]
struct BookmarkedPostRow {
    id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    created_at: DateTime<Utc>,
    p_id: Uuid,
    p_author_id: Uuid,
    p_topic_id: Uuid,
    p_title: String,
    p_body: String,
    p_pinned: bool,
    p_locked: bool,
    p_view_count: i64,
    p_created_at: DateTime<Utc>,
    p_updated_at: DateTime<Utc>,
    p_deleted_at: Option<DateTime<Utc>>,
}

impl From<BookmarkedPostRow> for (Bookmark, Post) {
    fn from(row: BookmarkedPostRow) -> Self {
        (
            Bookmark {
                id: BookmarkId::from(row.id),
                user_id: UserId::from(row.user_id),
                post_id: PostId::from(row.post_id),
                created_at: row.created_at,
            },
            Post::from(PostRow {
                id: row.p_id,
                author_id: row.p_author_id,
                topic_id: row.p_topic_id,
                title: row.p_title,
                body: row.p_body,
                pinned: row.p_pinned,
                locked: row.p_locked,
                view_count: row.p_view_count,
                created_at: row.p_created_at,
                updated_at: row.p_updated_at,
                deleted_at: row.p_deleted_at,
            }),
        )
    }
}

/// A row from the `follows` table.
#[derive(Debug, sqlx::FromRow)]
struct FollowRow {
    id: Uuid,
    follower_id: Uuid,
    followee_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<FollowRow> for Follow {
    fn from(row: FollowRow) -> Self {
        Self {
            id: FollowId::from(row.id),
            follower_id: UserId::from(row.follower_id),
            followee_id: UserId::from(row.followee_id),
            created_at: row.created_at,
        }
    }
}

/// A row from the `notifications` table.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    payload: serde_json::Value,
    read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> StoreResult<Notification> {
        Ok(Notification {
            id: NotificationId::from(self.id),
            user_id: UserId::from(self.user_id),
            kind: parse_notification_kind(&self.kind)?,
            payload: self.payload,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl BookmarkStore for PgStore {
    async fn insert_bookmark(&self, bookmark: Bookmark) -> StoreResult<bool> {
        let result = sqlx::query(
            r"INSERT INTO bookmarks (id, user_id, post_id, created_at)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(bookmark.id.into_inner())
        .bind(bookmark.user_id.into_inner())
        .bind(bookmark.post_id.into_inner())
        .bind(bookmark.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_bookmark(&self, user_id: UserId, post_id: PostId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id.into_inner())
            .bind(post_id.into_inner())
            .execute(self.pool())
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn bookmarks_by_keys(&self, keys: &[(UserId, PostId)]) -> StoreResult<Vec<Bookmark>> {
        let users: Vec<Uuid> = keys.iter().map(|(user, _)| user.into_inner()).collect();
        let posts: Vec<Uuid> = keys.iter().map(|(_, post)| post.into_inner()).collect();
        let rows = sqlx::query_as::<_, BookmarkRow>(
            r"SELECT b.id, b.user_id, b.post_id, b.created_at
              FROM bookmarks b
              JOIN UNNEST($1::UUID[], $2::UUID[]) AS k(user_id, post_id)
                ON b.user_id = k.user_id AND b.post_id = k.post_id",
        )
        .bind(&users)
        .bind(&posts)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Bookmark::from).collect())
    }

    async fn page_bookmarked_posts(
        &self,
        user_id: UserId,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Vec<(Bookmark, Post)>> {
        let resume = cursor.and_then(|cursor| match cursor.key {
            CursorKey::Time(at) => Some((at, cursor.id)),
            CursorKey::Score(_) | CursorKey::DepthTime(..) => None,
        });

        const COLUMNS: &str = r"
            b.id, b.user_id, b.post_id, b.created_at,
            p.id AS p_id, p.author_id AS p_author_id, p.topic_id AS p_topic_id,
            p.title AS p_title, p.body AS p_body, p.pinned AS p_pinned,
            p.locked AS p_locked, p.view_count AS p_view_count,
            p.created_at AS p_created_at, p.updated_at AS p_updated_at,
            p.deleted_at AS p_deleted_at";

        let query = match resume {
            Some(_) => format!(
                "SELECT {COLUMNS}
                 FROM bookmarks b
                 JOIN posts p ON p.id = b.post_id AND p.deleted_at IS NULL
                 WHERE b.user_id = $1
                   AND (b.created_at < $3 OR (b.created_at = $3 AND b.id < $4))
                 ORDER BY b.created_at DESC, b.id DESC
                 LIMIT $2"
            ),
            None => format!(
                "SELECT {COLUMNS}
                 FROM bookmarks b
                 JOIN posts p ON p.id = b.post_id AND p.deleted_at IS NULL
                 WHERE b.user_id = $1
                 ORDER BY b.created_at DESC, b.id DESC
                 LIMIT $2"
            ),
        };

        let mut fetch = sqlx::query_as::<_, BookmarkedPostRow>(&query)
            .bind(user_id.into_inner())
            .bind(limit);
        if let Some((at, id)) = resume {
            fetch = fetch.bind(at).bind(id);
        }
        let rows = fetch.fetch_all(self.pool()).await.map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FollowStore for PgStore {
    async fn insert_follow(&self, follow: Follow) -> StoreResult<bool> {
        let result = sqlx::query(
            r"INSERT INTO follows (id, follower_id, followee_id, created_at)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (follower_id, followee_id) DO NOTHING",
        )
        .bind(follow.id.into_inner())
        .bind(follow.follower_id.into_inner())
        .bind(follow.followee_id.into_inner())
        .bind(follow.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_follow(&self, follower_id: UserId, followee_id: UserId) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(follower_id.into_inner())
                .bind(followee_id.into_inner())
                .execute(self.pool())
                .await
                .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn follows_by_keys(&self, keys: &[(UserId, UserId)]) -> StoreResult<Vec<Follow>> {
        let followers: Vec<Uuid> = keys.iter().map(|(follower, _)| follower.into_inner()).collect();
        let followees: Vec<Uuid> = keys.iter().map(|(_, followee)| followee.into_inner()).collect();
        let rows = sqlx::query_as::<_, FollowRow>(
            r"SELECT f.id, f.follower_id, f.followee_id, f.created_at
              FROM follows f
              JOIN UNNEST($1::UUID[], $2::UUID[]) AS k(follower_id, followee_id)
                ON f.follower_id = k.follower_id AND f.followee_id = k.followee_id",
        )
        .bind(&followers)
        .bind(&followees)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Follow::from).collect())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: Notification) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO notifications (id, user_id, kind, payload, read, created_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(notification.id.into_inner())
        .bind(notification.user_id.into_inner())
        .bind(notification.kind.as_str())
        .bind(&notification.payload)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"SELECT id, user_id, kind, payload, read, created_at
              FROM notifications
              WHERE user_id = $1
              ORDER BY created_at DESC, id DESC
              LIMIT $2",
        )
        .bind(user_id.into_inner())
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id.into_inner())
                .bind(user_id.into_inner())
                .execute(self.pool())
                .await
                .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }
}
