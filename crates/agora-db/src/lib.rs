//! Data layer for the Agora forum backend.
//!
//! Two implementations of the `agora-core` store ports live here:
//!
//! - [`PgStore`] -- `PostgreSQL` via [`sqlx`] with runtime query
//!   construction (no live database at build time) and embedded
//!   migrations. The schema carries the invariants the services rely on:
//!   the unique `(user, target)` vote index, the ltree comment path, the
//!   subscriber-count trigger, and the soft-delete tombstones.
//! - [`MemoryStore`] -- a single `RwLock` over in-memory maps, used by the
//!   test suites and by small single-process deployments. Its write lock
//!   gives the same read-modify-write atomicity the `PostgreSQL` unique
//!   constraint gives.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool, configuration, migrations
//! - [`pg`] -- the `PostgreSQL` port implementations
//! - [`memory`] -- the in-memory port implementations
//! - [`error`] -- data-layer error types

pub mod error;
pub mod memory;
pub mod pg;
pub mod postgres;

pub use error::DbError;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use postgres::{PostgresConfig, PostgresPool};
