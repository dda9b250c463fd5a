//! Shared type definitions for the Agora forum backend.
//!
//! This crate holds everything the other crates agree on: strongly-typed
//! identifiers, enumerations, entity structs, and the tagged event union
//! published on the fan-out bus. All wire-facing types derive [`ts_rs::TS`]
//! so the frontend gets generated TypeScript bindings.
//!
//! # Modules
//!
//! - [`ids`] -- UUID v7 newtype identifiers
//! - [`enums`] -- vote directions, target kinds, feed orders, notification kinds
//! - [`models`] -- entity structs (users, posts, comments, votes, ...)
//! - [`events`] -- the tagged event union and subscriber filters

pub mod enums;
pub mod events;
pub mod ids;
pub mod models;

pub use enums::{CommentOrder, NotificationKind, PostOrder, TargetKind, VoteDirection};
pub use events::{EventFilter, ForumEvent};
pub use ids::{
    BookmarkId, CommentId, FollowId, NotificationId, PostId, SubscriptionId, TopicId, UserId,
    VoteId,
};
pub use models::{
    Bookmark, Comment, Follow, Notification, Post, Topic, TopicSubscription, TypingUser, User,
    Vote,
};
