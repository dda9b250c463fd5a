//! Error taxonomy for the core services.
//!
//! Every failure a caller can act on maps to one of five stable kinds
//! (validation, authentication, authorization, not-found, conflict);
//! unexpected storage failures propagate as [`CoreError::Storage`] and are
//! logged by the API layer with full context -- never swallowed into a
//! default result. Retry policy belongs to the caller; nothing here retries.

use crate::store::StoreError;

/// Errors surfaced by the core services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Bad input shape or range (empty title, depth exceeded, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// No or invalid caller identity.
    #[error("authentication required: {0}")]
    Authentication(String),

    /// The caller lacks ownership or admin rights for the operation.
    #[error("not allowed: {0}")]
    Authorization(String),

    /// A referenced entity is absent or tombstoned.
    #[error("not found: {0}")]
    NotFound(String),

    /// Disallowed duplication (bookmark, subscription) or a state conflict
    /// (commenting on a locked post).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage layer failed unexpectedly.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CoreError {
    /// Stable machine-readable kind string for API responses and logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication(_) => "authentication",
            Self::Authorization(_) => "authorization",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(CoreError::Validation(String::new()).kind(), "validation");
        assert_eq!(CoreError::NotFound(String::new()).kind(), "not_found");
        assert_eq!(
            CoreError::Storage(StoreError::Backend(String::new())).kind(),
            "internal"
        );
    }
}
