//! Request extractors for the session and caller identity headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::OwnerId;

use crate::error::ApiError;

pub const SESSION_HEADER: &str = "x-session-id";
pub const OWNER_HEADER: &str = "x-owner-id";
pub const ROLE_HEADER: &str = "x-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// The shopping session a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header(parts, SESSION_HEADER)
            .map(|id| SessionId(id.to_string()))
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {SESSION_HEADER} header")))
    }
}

/// The caller as asserted by the authentication layer in front of the API.
///
/// The owner is optional here; routes decide whether they need one.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub owner: Option<OwnerId>,
    pub is_admin: bool,
}

impl Identity {
    /// Returns the owner or rejects the request as unauthenticated.
    pub fn require_owner(&self) -> Result<&OwnerId, ApiError> {
        self.owner
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {OWNER_HEADER} header")))
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin role required".to_string()))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity {
            owner: header(parts, OWNER_HEADER).map(OwnerId::new),
            is_admin: header(parts, ROLE_HEADER)
                .is_some_and(|role| role.eq_ignore_ascii_case("admin")),
        })
    }
}
