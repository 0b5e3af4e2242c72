//! Caller identity extraction.
//!
//! The caller is named by the `x-user-id` header. No authentication or
//! authorization happens here; an upstream gateway is expected to set it.

use axum::{extract::FromRequestParts, http::request::Parts};
use nexus_tournaments::{TournamentError, tournament::UserId};
use uuid::Uuid;

use super::error::ApiError;

/// Header carrying the caller's user ID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the user issuing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub UserId);

impl CallerId {
    /// Caller used when no identity header is sent
    pub const ANONYMOUS: CallerId = CallerId(Uuid::nil());
}

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CallerId::ANONYMOUS);
        };

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(CallerId)
            .ok_or_else(|| {
                ApiError(TournamentError::InvalidInput(format!(
                    "{USER_ID_HEADER} must be a UUID"
                )))
            })
    }
}
