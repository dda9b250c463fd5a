//! Real-time consistency and delivery core for the Agora forum backend.
//!
//! This crate is the heart of the system: everything between the HTTP
//! surface and the storage backends that has to be *correct* lives here.
//!
//! # Architecture
//!
//! ```text
//! agora-api (Axum handlers, WebSocket, SSE)
//!     |
//!     +-- services ----> VoteService / CommentService / PostService / ...
//!     |                      |
//!     |                      +-- Arc<dyn Store> (port traits, this crate)
//!     |                      +-- Arc<EventBus>  (fan-out, this crate)
//!     |
//!     +-- per-request --> Loaders (batch loader cache, this crate)
//!
//! agora-db (PgStore / MemoryStore) implements the port traits.
//! ```
//!
//! # Modules
//!
//! - [`store`] -- async port traits the data layer implements
//! - [`loader`] -- per-request batching and memoization of lookups
//! - [`pagination`] -- cursor codec and connection assembly
//! - [`votes`] -- vote casting/removal and aggregate consistency
//! - [`comments`] -- bounded-depth hierarchy with materialized paths
//! - [`posts`] -- post lifecycle (create, edit, pin/lock, tombstone)
//! - [`feeds`] -- cursor-paginated feeds over posts, comments, bookmarks
//! - [`bookmarks`] / [`topics`] / [`follows`] / [`notifications`] --
//!   engagement services
//! - [`presence`] -- ephemeral typing tracker with TTL sweep
//! - [`bus`] -- topic-keyed publish/subscribe fan-out
//! - [`error`] -- the [`CoreError`](error::CoreError) taxonomy

pub mod bookmarks;
pub mod bus;
pub mod comments;
pub mod error;
pub mod feeds;
pub mod follows;
pub mod loader;
pub mod notifications;
pub mod pagination;
pub mod posts;
pub mod presence;
pub mod store;
pub mod topics;
pub mod votes;

pub use bus::EventBus;
pub use error::CoreError;
pub use loader::Loaders;
pub use presence::TypingTracker;
pub use store::{Store, StoreError};
