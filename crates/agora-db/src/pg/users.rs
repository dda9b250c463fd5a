//! User and topic operations against `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_core::store::{StoreResult, TopicStore, UserStore};
use agora_types::{
    SubscriptionId, Topic, TopicId, TopicSubscription, User, UserId,
};

use super::PgStore;
use crate::error::store_err;

/// A row from the `users` table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: String,
    reputation: i64,
    verified: bool,
    admin: bool,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from(row.id),
            username: row.username,
            display_name: row.display_name,
            reputation: row.reputation,
            verified: row.verified,
            admin: row.admin,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

/// A row from the `topics` table.
#[derive(Debug, sqlx::FromRow)]
struct TopicRow {
    id: Uuid,
    slug: String,
    name: String,
    subscriber_count: i64,
    created_at: DateTime<Utc>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Self {
            id: TopicId::from(row.id),
            slug: row.slug,
            name: row.name,
            subscriber_count: row.subscriber_count,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, display_name, reputation, verified, admin, active, created_at";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO users (id, username, display_name, reputation, verified, admin, active, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.into_inner())
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.reputation)
        .bind(user.verified)
        .bind(user.admin)
        .bind(user.active)
        .bind(user.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(store_err)?;
        Ok(row.map(User::from))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn set_reputation(&self, id: UserId, reputation: i64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET reputation = $2 WHERE id = $1")
            .bind(id.into_inner())
            .bind(reputation)
            .execute(self.pool())
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl TopicStore for PgStore {
    async fn insert_topic(&self, topic: Topic) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO topics (id, slug, name, subscriber_count, created_at)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(topic.id.into_inner())
        .bind(&topic.slug)
        .bind(&topic.name)
        .bind(topic.subscriber_count)
        .bind(topic.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn topic_by_id(&self, id: TopicId) -> StoreResult<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, slug, name, subscriber_count, created_at FROM topics WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(store_err)?;
        Ok(row.map(Topic::from))
    }

    async fn insert_subscription(&self, subscription: TopicSubscription) -> StoreResult<bool> {
        // The subscriber-count trigger fires only on an actual insert;
        // ON CONFLICT DO NOTHING leaves the counter untouched.
        let result = sqlx::query(
            r"INSERT INTO topic_subscriptions (id, user_id, topic_id, created_at)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (user_id, topic_id) DO NOTHING",
        )
        .bind(subscription.id.into_inner())
        .bind(subscription.user_id.into_inner())
        .bind(subscription.topic_id.into_inner())
        .bind(subscription.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_subscription(&self, user_id: UserId, topic_id: TopicId) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM topic_subscriptions WHERE user_id = $1 AND topic_id = $2",
        )
        .bind(user_id.into_inner())
        .bind(topic_id.into_inner())
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn subscriptions_by_keys(
        &self,
        keys: &[(UserId, TopicId)],
    ) -> StoreResult<Vec<TopicSubscription>> {
        let users: Vec<Uuid> = keys.iter().map(|(user, _)| user.into_inner()).collect();
        let topics: Vec<Uuid> = keys.iter().map(|(_, topic)| topic.into_inner()).collect();
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r"SELECT s.id, s.user_id, s.topic_id, s.created_at
              FROM topic_subscriptions s
              JOIN UNNEST($1::UUID[], $2::UUID[]) AS k(user_id, topic_id)
                ON s.user_id = k.user_id AND s.topic_id = k.topic_id",
        )
        .bind(&users)
        .bind(&topics)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(TopicSubscription::from).collect())
    }
}

/// A row from the `topic_subscriptions` table.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    topic_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for TopicSubscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: SubscriptionId::from(row.id),
            user_id: UserId::from(row.user_id),
            topic_id: TopicId::from(row.topic_id),
            created_at: row.created_at,
        }
    }
}
