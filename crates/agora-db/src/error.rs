//! Error types for the data layer.

use agora_core::StoreError;

/// Errors that can occur while setting up or talking to `PostgreSQL`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Map an [`sqlx::Error`] into the backend-agnostic [`StoreError`] the
/// core ports speak.
pub(crate) fn store_err(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// A row carried a value the domain enums do not know (corrupt data or a
/// schema drift); surfaced as a backend error, never a panic.
pub(crate) fn bad_row(what: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unexpected {what} value in row: {value:?}"))
}
