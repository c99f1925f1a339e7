//! The authentication seam: an owner id is extracted directly from the
//! `Authorization: Bearer <token>` header. Token verification against an
//! identity provider is out of scope (§1) — the token's value itself
//! stands in for the owner id it names.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rocketdocs_core::error::CoreError;

use crate::error::ApiError;

pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(CoreError::Unauthenticated)?;

        let token = header.strip_prefix("Bearer ").ok_or(CoreError::Unauthenticated)?.trim();
        if token.is_empty() {
            return Err(CoreError::Unauthenticated.into());
        }
        Ok(OwnerId(token.to_string()))
    }
}
