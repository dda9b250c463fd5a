//! Reading and acknowledging notifications.
//!
//! Notification rows are written by the vote, comment, and follow services
//! as side effects of their mutations; this service only serves the
//! recipient-facing reads and the read-flag update.

use std::sync::Arc;

use agora_types::{Notification, NotificationId, UserId};

use crate::error::CoreError;
use crate::pagination::clamp_page_size;
use crate::store::Store;

/// Recipient-facing notification reads and acknowledgements.
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    /// Build the service over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The recipient's notifications, newest first.
    pub async fn list(
        &self,
        user_id: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, CoreError> {
        Ok(self
            .store
            .list_notifications(user_id, clamp_page_size(limit))
            .await?)
    }

    /// Mark one of the recipient's notifications as read.
    ///
    /// A notification that does not exist -- or belongs to someone else --
    /// is reported as not found rather than leaking whose it is.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), CoreError> {
        let updated = self.store.mark_notification_read(id, user_id).await?;
        if updated {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("notification {id}")))
        }
    }
}
