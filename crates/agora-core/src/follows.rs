//! Directed follow edges between users.

use std::sync::Arc;

use chrono::Utc;

use agora_types::{
    Follow, FollowId, ForumEvent, Notification, NotificationId, NotificationKind, User, UserId,
    events::NotificationReceived,
};

use crate::bus::EventBus;
use crate::error::CoreError;
use crate::store::Store;

/// Creates and removes follow edges and notifies followees.
pub struct FollowService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl FollowService {
    /// Build the service over a store and the shared bus.
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Follow another user. Self-follows are invalid, duplicates conflict,
    /// and the followee receives a `follow` notification.
    pub async fn follow(&self, caller: &User, followee_id: UserId) -> Result<(), CoreError> {
        if caller.id == followee_id {
            return Err(CoreError::Validation(String::from(
                "users cannot follow themselves",
            )));
        }
        let followee = self
            .store
            .user_by_id(followee_id)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| CoreError::NotFound(format!("user {followee_id}")))?;

        let inserted = self
            .store
            .insert_follow(Follow {
                id: FollowId::new(),
                follower_id: caller.id,
                followee_id,
                created_at: Utc::now(),
            })
            .await?;
        if !inserted {
            return Err(CoreError::Conflict(format!(
                "already following user {followee_id}"
            )));
        }

        let notification = Notification {
            id: NotificationId::new(),
            user_id: followee.id,
            kind: NotificationKind::Follow,
            payload: serde_json::json!({
                "followerId": caller.id,
                "followerName": caller.display_name,
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

    /// Remove a follow edge. Unfollowing someone never followed is a
    /// not-found failure.
    pub async fn unfollow(&self, caller: &User, followee_id: UserId) -> Result<(), CoreError> {
        let removed = self.store.delete_follow(caller.id, followee_id).await?;
        if removed {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!(
                "not following user {followee_id}"
            )))
        }
    }
}
