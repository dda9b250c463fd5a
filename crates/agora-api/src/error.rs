//! Error types for the API layer.
//!
//! [`ApiError`] carries the core taxonomy to the wire: every response body
//! is `{"error": <message>, "kind": <stable kind>, "status": <code>}` so
//! callers can branch on the kind without parsing messages. Storage
//! failures are logged here with full context and surfaced as an opaque
//! internal error -- never silently swallowed into an empty result.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use agora_core::error::CoreError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A core service rejected or failed the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The request body failed schema validation.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// Stable machine-readable kind string.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Core(core) => core.kind(),
            Self::InvalidUuid(_) | Self::InvalidBody(_) => "validation",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Core(CoreError::Validation(_)) | Self::InvalidUuid(_) | Self::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Core(CoreError::Authentication(_)) => StatusCode::UNAUTHORIZED,
            Self::Core(CoreError::Authorization(_)) => StatusCode::FORBIDDEN,
            Self::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(CoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Core(CoreError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidBody(errors.to_string())
    }
}

impl From<agora_core::StoreError> for ApiError {
    fn from(error: agora_core::StoreError) -> Self {
        Self::Core(CoreError::Storage(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if let Self::Core(CoreError::Storage(inner)) = &self {
            // Full context goes to the log; the caller gets an opaque
            // internal failure.
            error!(error = %inner, "storage failure while handling request");
            String::from("internal error")
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Core(CoreError::Validation(String::new())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Core(CoreError::Authentication(String::new())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Core(CoreError::Authorization(String::new())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Core(CoreError::NotFound(String::new())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Core(CoreError::Conflict(String::new())).status(),
            StatusCode::CONFLICT
        );
    }
}
