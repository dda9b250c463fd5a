//! `PostgreSQL` implementations of the `agora-core` store ports.
//!
//! All queries are runtime-constructed and parameterized. Grouped lookups
//! bind arrays (`= ANY($1)` or `UNNEST` joins) so each batch is one
//! round-trip. The live-row predicate is the shared [`LIVE`] fragment --
//! soft-delete filtering lives here, never at call sites.

mod comments;
mod engagement;
mod posts;
mod users;
mod votes;

use sqlx::PgPool;

use agora_core::StoreError;
use agora_types::{NotificationKind, TargetKind, VoteDirection};

use crate::error::bad_row;
use crate::postgres::PostgresPool;

/// The centralized soft-delete predicate appended to every post and
/// comment read.
pub(crate) const LIVE: &str = "deleted_at IS NULL";

/// The `PostgreSQL` implementation of every store port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build a store over an established pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Parse a `target_kind` column value.
pub(crate) fn parse_target_kind(value: &str) -> Result<TargetKind, StoreError> {
    match value {
        "post" => Ok(TargetKind::Post),
        "comment" => Ok(TargetKind::Comment),
        other => Err(bad_row("target_kind", other)),
    }
}

/// Parse a `direction` column value.
pub(crate) fn parse_direction(value: &str) -> Result<VoteDirection, StoreError> {
    match value {
        "up" => Ok(VoteDirection::Up),
        "down" => Ok(VoteDirection::Down),
        other => Err(bad_row("direction", other)),
    }
}

/// Parse a notification `kind` column value.
pub(crate) fn parse_notification_kind(value: &str) -> Result<NotificationKind, StoreError> {
    match value {
        "reply" => Ok(NotificationKind::Reply),
        "vote" => Ok(NotificationKind::Vote),
        "follow" => Ok(NotificationKind::Follow),
        other => Err(bad_row("notification kind", other)),
    }
}
