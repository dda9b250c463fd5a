//! Vote casting, removal, and aggregate consistency.
//!
//! The invariant this module guards: **at most one vote row per
//! `(user, target)`**, with the net score always equal to the live sum over
//! that target's rows. The uniqueness itself is enforced by the storage
//! layer's upsert (the contract on [`VoteStore::upsert_vote`]) -- two
//! concurrent casts for the same pair resolve there, not through
//! application locks.
//!
//! After every insert/update/delete the aggregate is recomputed by summing
//! rows. No incremental counter is trusted as source of truth; summing
//! fresh makes replayed mutations harmless. The target author's reputation
//! is recomputed the same way, across everything they authored.
//!
//! [`VoteStore::upsert_vote`]: crate::store::VoteStore::upsert_vote

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use agora_types::{
    ForumEvent, Notification, NotificationId, NotificationKind, PostId, TargetKind, User, UserId,
    Vote, VoteDirection, VoteId,
    events::{NotificationReceived, VoteUpdated},
};

use crate::bus::EventBus;
use crate::error::CoreError;
use crate::store::Store;

/// The state a vote mutation leaves behind, as the API reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    /// The target's recomputed net score.
    pub vote_count: i64,
    /// The caller's vote after the mutation (`None` after removal).
    pub user_vote: Option<VoteDirection>,
}

/// A resolved vote target: who authored it and which post scopes it.
struct TargetInfo {
    author_id: UserId,
    post_scope: PostId,
}

/// Casts and removes votes and keeps the derived aggregates consistent.
pub struct VoteService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl VoteService {
    /// Build the service over a store and the shared bus.
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Cast a vote on a post or comment.
    ///
    /// - absent vote: insert
    /// - present with a different direction: overwrite in place
    /// - present with the same direction: **no-op** (not a toggle -- the
    ///   surrounding API relies on idempotent retries)
    ///
    /// Always returns the fresh aggregate.
    pub async fn cast_vote(
        &self,
        caller: &User,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, CoreError> {
        let target = self.resolve_target(target_id, target_kind).await?;
        let existing = self
            .store
            .vote_by_key(caller.id, target_id, target_kind)
            .await?;

        if let Some(vote) = &existing {
            if vote.direction == direction {
                // Same direction twice: row and aggregate stay as they are.
                let vote_count = self
                    .store
                    .vote_sum_for_target(target_id, target_kind)
                    .await?;
                return Ok(VoteOutcome {
                    vote_count,
                    user_vote: Some(direction),
                });
            }
        }

        let row = match &existing {
            Some(vote) => Vote {
                direction,
                ..vote.clone()
            },
            None => Vote {
                id: VoteId::new(),
                user_id: caller.id,
                target_id,
                target_kind,
                direction,
                created_at: Utc::now(),
            },
        };
        self.store.upsert_vote(row).await?;

        let vote_count = self
            .recompute_and_publish(target_id, target_kind, &target)
            .await?;

        if existing.is_none() && target.author_id != caller.id {
            self.notify_author(caller, target_id, target_kind, direction, target.author_id)
                .await?;
        }

        Ok(VoteOutcome {
            vote_count,
            user_vote: Some(direction),
        })
    }

    /// Remove the caller's vote from a target.
    ///
    /// Removing a vote that does not exist is a [`CoreError::NotFound`] --
    /// deliberately asymmetric with unbookmarking, which succeeds.
    pub async fn remove_vote(
        &self,
        caller: &User,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> Result<VoteOutcome, CoreError> {
        let target = self.resolve_target(target_id, target_kind).await?;

        let removed = self
            .store
            .delete_vote(caller.id, target_id, target_kind)
            .await?;
        if !removed {
            return Err(CoreError::NotFound(format!(
                "no vote by {} on {} {target_id}",
                caller.id,
                target_kind.as_str()
            )));
        }

        let vote_count = self
            .recompute_and_publish(target_id, target_kind, &target)
            .await?;

        Ok(VoteOutcome {
            vote_count,
            user_vote: None,
        })
    }

    /// The current aggregate plus the given user's direction, for reads.
    pub async fn vote_summary(
        &self,
        user_id: Option<UserId>,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> Result<VoteOutcome, CoreError> {
        let vote_count = self
            .store
            .vote_sum_for_target(target_id, target_kind)
            .await?;
        let user_vote = match user_id {
            Some(user_id) => self
                .store
                .vote_by_key(user_id, target_id, target_kind)
                .await?
                .map(|vote| vote.direction),
            None => None,
        };
        Ok(VoteOutcome {
            vote_count,
            user_vote,
        })
    }

    /// Look up the target, rejecting absent or tombstoned rows.
    async fn resolve_target(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> Result<TargetInfo, CoreError> {
        let info = match target_kind {
            TargetKind::Post => self
                .store
                .post_by_id(PostId::from(target_id))
                .await?
                .map(|post| TargetInfo {
                    author_id: post.author_id,
                    post_scope: post.id,
                }),
            TargetKind::Comment => self
                .store
                .comment_by_id(agora_types::CommentId::from(target_id))
                .await?
                .map(|comment| TargetInfo {
                    author_id: comment.author_id,
                    post_scope: comment.post_id,
                }),
        };
        info.ok_or_else(|| {
            CoreError::NotFound(format!("{} {target_id}", target_kind.as_str()))
        })
    }

    /// Recompute the target aggregate and the author's reputation from
    /// rows, then publish the change. Both recomputations are idempotent
    /// under replay. Returns the fresh aggregate.
    async fn recompute_and_publish(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
        target: &TargetInfo,
    ) -> Result<i64, CoreError> {
        let vote_count = self
            .store
            .vote_sum_for_target(target_id, target_kind)
            .await?;

        let reputation = self.store.vote_sum_for_author(target.author_id).await?;
        self.store
            .set_reputation(target.author_id, reputation)
            .await?;

        self.bus.publish(ForumEvent::VoteUpdated(VoteUpdated {
            target_id,
            target_kind,
            post_id: target.post_scope,
            vote_count,
        }));

        Ok(vote_count)
    }

    /// Write a `vote` notification for the target's author and push it to
    /// their live connections. Called only when a vote row is first
    /// inserted -- direction changes and self-votes notify nobody.
    async fn notify_author(
        &self,
        voter: &User,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
        author_id: UserId,
    ) -> Result<(), CoreError> {
        let notification = Notification {
            id: NotificationId::new(),
            user_id: author_id,
            kind: NotificationKind::Vote,
            payload: serde_json::json!({
                "targetId": target_id,
                "targetKind": target_kind,
                "direction": direction,
                "voterId": voter.id,
                "voterName": voter.display_name,
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
