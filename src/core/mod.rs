//! Core business logic - framework-agnostic ledger, allocation and request lifecycle.
//!
//! Free functions take any `ConnectionTrait` so they compose inside a caller's
//! database transaction. [`PoolService`] owns the pieces that need shared state
//! (per-request/per-member locks and retry policy) and exposes the mutating
//! operations.

/// Contribution Allocator - caps, quotes and proportional shares
pub mod allocator;
/// Balance Calculator - savings derived from the ledger
pub mod balance;
/// Goal creation and completion
pub mod goal;
/// Client supplied idempotency keys
pub mod idempotency;
/// Logging savings events
pub mod kambio;
/// Ledger Store - append-only signed entries
pub mod ledger;
/// Keyed async locks
pub mod locks;
/// Member registration and lookups
pub mod member;
/// Currency conversion at the boundary
pub mod money;
/// Refund/Reversal Engine
pub mod refund;
/// Request Lifecycle Manager
pub mod request;
/// Bounded retry for concurrency conflicts
pub mod retry;
/// Monthly savings aggregates
pub mod savings;
/// Service handle shared by every caller
pub mod service;
/// Pool overview for the client home screen
pub mod snapshot;

pub use service::{PoolRules, PoolService};
