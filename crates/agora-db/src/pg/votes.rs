//! Vote operations against `PostgreSQL`.
//!
//! The `votes_user_target_key` unique constraint is the actual correctness
//! guarantee for concurrent casts: [`upsert_vote`] resolves them with
//! `ON CONFLICT ... DO UPDATE`, so two racing casts for the same
//! `(user, target)` can never produce two rows.
//!
//! [`upsert_vote`]: agora_core::store::VoteStore::upsert_vote

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_core::store::{StoreResult, VoteStore};
use agora_types::{TargetKind, UserId, Vote, VoteId};

use super::{PgStore, parse_direction, parse_target_kind};
use crate::error::store_err;

/// A row from the `votes` table.
#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    user_id: Uuid,
    target_id: Uuid,
    target_kind: String,
    direction: String,
    created_at: DateTime<Utc>,
}

impl VoteRow {
    fn into_vote(self) -> StoreResult<Vote> {
        Ok(Vote {
            id: VoteId::from(self.id),
            user_id: UserId::from(self.user_id),
            target_id: self.target_id,
            target_kind: parse_target_kind(&self.target_kind)?,
            direction: parse_direction(&self.direction)?,
            created_at: self.created_at,
        })
    }
}

const VOTE_COLUMNS: &str = "id, user_id, target_id, target_kind, direction, created_at";

/// A `(target, score)` aggregation row.
#[derive(Debug, sqlx::FromRow)]
struct ScoreRow {
    target_id: Uuid,
    target_kind: String,
    score: i64,
}

#[async_trait]
impl VoteStore for PgStore {
    async fn vote_by_key(
        &self,
        user_id: UserId,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes
             WHERE user_id = $1 AND target_id = $2 AND target_kind = $3"
        ))
        .bind(user_id.into_inner())
        .bind(target_id)
        .bind(target_kind.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(store_err)?;
        row.map(VoteRow::into_vote).transpose()
    }

    async fn votes_by_keys(
        &self,
        keys: &[(UserId, Uuid, TargetKind)],
    ) -> StoreResult<Vec<Vote>> {
        let users: Vec<Uuid> = keys.iter().map(|(user, _, _)| user.into_inner()).collect();
        let targets: Vec<Uuid> = keys.iter().map(|(_, target, _)| *target).collect();
        let kinds: Vec<String> = keys
            .iter()
            .map(|(_, _, kind)| kind.as_str().to_owned())
            .collect();

        let rows = sqlx::query_as::<_, VoteRow>(
            r"SELECT v.id, v.user_id, v.target_id, v.target_kind, v.direction, v.created_at
              FROM votes v
              JOIN UNNEST($1::UUID[], $2::UUID[], $3::TEXT[]) AS k(user_id, target_id, target_kind)
                ON v.user_id = k.user_id
               AND v.target_id = k.target_id
               AND v.target_kind = k.target_kind",
        )
        .bind(&users)
        .bind(&targets)
        .bind(&kinds)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;
        rows.into_iter().map(VoteRow::into_vote).collect()
    }

    async fn upsert_vote(&self, vote: Vote) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO votes (id, user_id, target_id, target_kind, direction, created_at)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (user_id, target_id, target_kind)
              DO UPDATE SET direction = EXCLUDED.direction",
        )
        .bind(vote.id.into_inner())
        .bind(vote.user_id.into_inner())
        .bind(vote.target_id)
        .bind(vote.target_kind.as_str())
        .bind(vote.direction.as_str())
        .bind(vote.created_at)
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_vote(
        &self,
        user_id: UserId,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM votes WHERE user_id = $1 AND target_id = $2 AND target_kind = $3",
        )
        .bind(user_id.into_inner())
        .bind(target_id)
        .bind(target_kind.as_str())
        .execute(self.pool())
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn vote_sum_for_target(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> StoreResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r"SELECT COALESCE(SUM(CASE direction WHEN 'up' THEN 1 ELSE -1 END), 0)::BIGINT
              FROM votes
              WHERE target_id = $1 AND target_kind = $2",
        )
        .bind(target_id)
        .bind(target_kind.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(store_err)?;
        Ok(sum)
    }

    async fn vote_counts_for_targets(
        &self,
        keys: &[(Uuid, TargetKind)],
    ) -> StoreResult<HashMap<(Uuid, TargetKind), i64>> {
        let targets: Vec<Uuid> = keys.iter().map(|(target, _)| *target).collect();
        let kinds: Vec<String> = keys
            .iter()
            .map(|(_, kind)| kind.as_str().to_owned())
            .collect();

        let rows = sqlx::query_as::<_, ScoreRow>(
            r"SELECT v.target_id, v.target_kind,
                     SUM(CASE v.direction WHEN 'up' THEN 1 ELSE -1 END)::BIGINT AS score
              FROM votes v
              JOIN UNNEST($1::UUID[], $2::TEXT[]) AS k(target_id, target_kind)
                ON v.target_id = k.target_id AND v.target_kind = k.target_kind
              GROUP BY v.target_id, v.target_kind",
        )
        .bind(&targets)
        .bind(&kinds)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        let mut counts = HashMap::new();
        for row in rows {
            counts.insert((row.target_id, parse_target_kind(&row.target_kind)?), row.score);
        }
        Ok(counts)
    }

    async fn vote_sum_for_author(&self, author_id: UserId) -> StoreResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r"SELECT COALESCE(SUM(CASE v.direction WHEN 'up' THEN 1 ELSE -1 END), 0)::BIGINT
              FROM votes v
              WHERE (v.target_kind = 'post' AND EXISTS (
                        SELECT 1 FROM posts p
                        WHERE p.id = v.target_id
                          AND p.author_id = $1
                          AND p.deleted_at IS NULL))
                 OR (v.target_kind = 'comment' AND EXISTS (
                        SELECT 1 FROM comments c
                        WHERE c.id = v.target_id
                          AND c.author_id = $1
                          AND c.deleted_at IS NULL))",
        )
        .bind(author_id.into_inner())
        .fetch_one(self.pool())
        .await
        .map_err(store_err)?;
        Ok(sum)
    }
}
