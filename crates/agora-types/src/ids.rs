//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity has a strongly-typed ID to prevent accidental mixing of
//! identifiers at compile time. All IDs use UUID v7 (time-ordered) so that
//! id comparison agrees with insertion order -- the cursor pagination
//! tie-break relies on this.
//!
//! The `new()` constructors exist for app-side generation (mutations, tests,
//! seed data); rows read back from the store carry whatever id they were
//! written with.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a registered user.
    UserId
}

define_id! {
    /// Unique identifier for a topic (thread classification).
    TopicId
}

define_id! {
    /// Unique identifier for a post.
    PostId
}

define_id! {
    /// Unique identifier for a comment.
    CommentId
}

define_id! {
    /// Unique identifier for a vote row.
    VoteId
}

define_id! {
    /// Unique identifier for a bookmark row.
    BookmarkId
}

define_id! {
    /// Unique identifier for a topic subscription row.
    SubscriptionId
}

define_id! {
    /// Unique identifier for a follow edge between two users.
    FollowId
}

define_id! {
    /// Unique identifier for a notification.
    NotificationId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let user = UserId::new();
        let post = PostId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(user.into_inner(), Uuid::nil());
        assert_ne!(post.into_inner(), Uuid::nil());
    }

    #[test]
    fn v7_ids_order_by_creation() {
        let first = PostId::new();
        let second = PostId::new();
        assert!(first <= second);
    }

    #[test]
    fn display_matches_inner_uuid() {
        let id = CommentId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
