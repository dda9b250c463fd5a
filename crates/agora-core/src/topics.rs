//! Topics and topic subscriptions.
//!
//! The topic row carries a denormalized `subscriber_count` that must stay
//! equal to the number of subscription rows. The store maintains the
//! counter inside the same mutation that touches the rows (a trigger in
//! `PostgreSQL`, an inline update in the memory store), so this service
//! never adjusts it by hand.

use std::sync::Arc;

use chrono::Utc;

use agora_types::{SubscriptionId, Topic, TopicId, TopicSubscription, User, UserId};

use crate::error::CoreError;
use crate::store::Store;

/// Maximum accepted topic name length, in characters.
const MAX_NAME_CHARS: usize = 100;

/// Creates topics and manages subscriptions.
pub struct TopicService {
    store: Arc<dyn Store>,
}

impl TopicService {
    /// Build the service over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a topic. Admin-only.
    pub async fn create_topic(
        &self,
        caller: &User,
        slug: &str,
        name: &str,
    ) -> Result<Topic, CoreError> {
        if !caller.admin {
            return Err(CoreError::Authorization(String::from(
                "only admins may create topics",
            )));
        }
        let slug = slug.trim();
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(CoreError::Validation(String::from(
                "topic slug must be lowercase alphanumerics and dashes",
            )));
        }
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(CoreError::Validation(format!(
                "topic name must be 1 to {MAX_NAME_CHARS} characters"
            )));
        }

        let topic = Topic {
            id: TopicId::new(),
            slug: slug.to_owned(),
            name: name.to_owned(),
            subscriber_count: 0,
            created_at: Utc::now(),
        };
        self.store.insert_topic(topic.clone()).await?;
        Ok(topic)
    }

    /// Fetch one topic.
    pub async fn topic(&self, id: TopicId) -> Result<Topic, CoreError> {
        self.store
            .topic_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("topic {id}")))
    }

    /// Subscribe a user to a topic. Duplicates are a conflict; the
    /// subscriber counter moves with the row insert.
    pub async fn subscribe(&self, user_id: UserId, topic_id: TopicId) -> Result<(), CoreError> {
        if self.store.topic_by_id(topic_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("topic {topic_id}")));
        }
        let inserted = self
            .store
            .insert_subscription(TopicSubscription {
                id: SubscriptionId::new(),
                user_id,
                topic_id,
                created_at: Utc::now(),
            })
            .await?;
        if inserted {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "already subscribed to topic {topic_id}"
            )))
        }
    }

    /// Remove a subscription. Unsubscribing without a subscription is a
    /// not-found failure (unlike unbookmarking, which succeeds).
    pub async fn unsubscribe(&self, user_id: UserId, topic_id: TopicId) -> Result<(), CoreError> {
        let removed = self.store.delete_subscription(user_id, topic_id).await?;
        if removed {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!(
                "no subscription to topic {topic_id}"
            )))
        }
    }
}
