//! Request extractors: caller identity, idempotency key and JSON bodies.

use crate::{api::error::ApiError, errors::Error};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

/// Header carrying the calling member's id.
pub const MEMBER_HEADER: &str = "x-member-id";
/// Header carrying a client-chosen idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// The member making the request, taken from `X-Member-Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentMember(pub i64);

impl<S> FromRequestParts<S> for CurrentMember
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(MEMBER_HEADER)
            .ok_or_else(|| Error::validation(MEMBER_HEADER, "header is required"))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::validation(MEMBER_HEADER, "must be a positive integer"))?;
        Ok(Self(id))
    }
}

/// Optional `Idempotency-Key` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdempotencyKey(pub Option<String>);

impl IdempotencyKey {
    /// The key, if the client sent one.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(IDEMPOTENCY_HEADER) else {
            return Ok(Self(None));
        };
        let key = raw
            .to_str()
            .map_err(|_| Error::validation("idempotency_key", "must be visible ASCII"))?;
        Ok(Self(Some(key.trim().to_string())))
    }
}

/// `Json` whose rejections use the service's error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections use the service's error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
