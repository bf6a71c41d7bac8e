//! Mapping of service errors onto HTTP responses.

use crate::{
    core::money,
    errors::{Error, ErrorKind},
};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, warn};

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A service error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::validation("body", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(Error::validation("id", rejection.body_text()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_possible: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<Decimal>,
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::CapExceeded => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Concurrency => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);

        let message = match kind {
            ErrorKind::Internal => {
                error!("Request failed: {}", self.0);
                "Internal server error".to_string()
            }
            ErrorKind::Concurrency => {
                warn!("Request gave up after retries: {}", self.0);
                self.0.to_string()
            }
            _ => self.0.to_string(),
        };

        let mut body = ErrorBody {
            error: kind.as_str(),
            message,
            field: None,
            max_possible: None,
            remaining: None,
        };
        match self.0 {
            Error::Validation { field, .. } => body.field = Some(field),
            Error::CapExceeded {
                max_possible_cents,
                remaining_cents,
                ..
            }
            | Error::ContributionUnavailable {
                max_possible_cents,
                remaining_cents,
            } => {
                body.max_possible = Some(money::from_cents(max_possible_cents));
                body.remaining = Some(money::from_cents(remaining_cents));
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::StateConflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::CapExceeded),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorKind::Concurrency),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_cap_exceeded_response_status() {
        let response = ApiError(Error::CapExceeded {
            attempted_cents: 800,
            max_possible_cents: 500,
            remaining_cents: 10_000,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ApiError(Error::InvariantViolation {
            message: "funded 200 / requested 100".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
