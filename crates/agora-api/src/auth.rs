//! Bearer-identity extraction.
//!
//! Credential issuance is out of scope for this service: the bearer token
//! is an opaque session id (the user's UUID, minted by the surrounding
//! platform) resolved against the user store. A missing, malformed, or
//! unknown token -- or a deactivated account -- is an authentication
//! failure.
//!
//! The live transports cannot always send headers (browser `EventSource`
//! and `WebSocket` clients), so they accept the same token as a `token`
//! query parameter via [`resolve_stream_user`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use agora_core::error::CoreError;
use agora_types::{User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated caller, resolved from the `Authorization` header.
pub struct AuthUser(pub User);

/// An optional caller: anonymous requests succeed with `None`, but a
/// present-and-invalid token still fails.
pub struct MaybeAuthUser(pub Option<User>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Resolve a session token to an active user.
pub async fn resolve_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let user_id = Uuid::parse_str(token)
        .map(UserId::from)
        .map_err(|_| CoreError::Authentication(String::from("malformed bearer token")))?;
    let user = state
        .store
        .user_by_id(user_id)
        .await
        .map_err(|e| ApiError::Core(CoreError::Storage(e)))?
        .filter(|user| user.active)
        .ok_or_else(|| CoreError::Authentication(String::from("unknown or inactive user")))?;
    Ok(user)
}

/// Resolve the optional `token` query parameter used by the live
/// transports.
pub async fn resolve_stream_user(
    state: &AppState,
    token: Option<&str>,
) -> Result<Option<User>, ApiError> {
    match token {
        Some(token) => Ok(Some(resolve_user(state, token).await?)),
        None => Ok(None),
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Core(CoreError::Authentication(String::from(
                "missing Authorization header",
            )))
        })?;
        let token = token.to_owned();
        Ok(Self(resolve_user(state, &token).await?))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts).map(str::to_owned) {
            Some(token) => Ok(Self(Some(resolve_user(state, &token).await?))),
            None => Ok(Self(None)),
        }
    }
}
