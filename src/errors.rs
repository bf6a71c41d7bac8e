//! Unified error type for the pool service.
//!
//! Every variant belongs to one [`ErrorKind`], which is what callers (and the HTTP
//! layer) use to decide how to surface the failure. Only [`ErrorKind::Concurrency`]
//! is retried internally.

use crate::core::money;
use sea_orm::DbErr;
use thiserror::Error;

/// Coarse error category used for propagation and HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    Validation,
    /// Unknown member, request, contribution or goal
    NotFound,
    /// Operation invalid for the current state of the resource
    StateConflict,
    /// Amount exceeds the savings cap or what is left to fund
    CapExceeded,
    /// Serialization failure or lock timeout, safe to retry
    Concurrency,
    /// Anything else (database faults, broken invariants, configuration)
    Internal,
}

impl ErrorKind {
    /// Stable identifier used in API error bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::StateConflict => "state_conflict",
            Self::CapExceeded => "cap_exceeded",
            Self::Concurrency => "concurrency_error",
            Self::Internal => "internal_error",
        }
    }
}

/// Every failure the service can report.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Member {id} not found")]
    MemberNotFound { id: i64 },

    #[error("Pool request {id} not found")]
    RequestNotFound { id: i64 },

    #[error("Goal {id} not found")]
    GoalNotFound { id: i64 },

    #[error("{message}")]
    InvalidState { message: String },

    #[error("Member {member_id} does not own pool request {request_id}")]
    NotRequestOwner { request_id: i64, member_id: i64 },

    #[error(
        "Contribution of ${} exceeds the allowed maximum (max ${}, remaining ${})",
        money::format_cents(*attempted_cents),
        money::format_cents(*max_possible_cents),
        money::format_cents(*remaining_cents)
    )]
    CapExceeded {
        attempted_cents: i64,
        max_possible_cents: i64,
        remaining_cents: i64,
    },

    #[error(
        "Contribution not possible: maximum allowed is ${} (remaining ${})",
        money::format_cents(*max_possible_cents),
        money::format_cents(*remaining_cents)
    )]
    ContributionUnavailable {
        max_possible_cents: i64,
        remaining_cents: i64,
    },

    #[error(
        "Insufficient savings: ${} available, ${} required",
        money::format_cents(*available_cents),
        money::format_cents(*required_cents)
    )]
    InsufficientSavings {
        available_cents: i64,
        required_cents: i64,
    },

    #[error("Concurrent update conflict: {message}")]
    Concurrency { message: String },

    #[error("Ledger invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a state conflict.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Category this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::MemberNotFound { .. } | Self::RequestNotFound { .. } | Self::GoalNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::InvalidState { .. } | Self::NotRequestOwner { .. } => ErrorKind::StateConflict,
            Self::CapExceeded { .. }
            | Self::ContributionUnavailable { .. }
            | Self::InsufficientSavings { .. } => ErrorKind::CapExceeded,
            Self::Concurrency { .. } => ErrorKind::Concurrency,
            Self::InvariantViolation { .. } | Self::Config { .. } | Self::Database(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the operation that produced this error may be replayed as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Concurrency)
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if is_contention(&err) {
            Self::Concurrency {
                message: err.to_string(),
            }
        } else {
            Self::Database(err)
        }
    }
}

/// `SQLite` reports writer contention as "database is locked"/"busy"; pool
/// acquisition timeouts mean another transaction held the connection too long.
fn is_contention(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return true;
    }
    let text = err.to_string().to_ascii_lowercase();
    text.contains("database is locked") || text.contains("database is busy")
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
