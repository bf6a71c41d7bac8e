//! axum router over [`PoolService`].
//!
//! Handlers stay thin: extract, call the service, convert to a view. The caller is
//! identified by the `X-Member-Id` header.

mod dto;
/// Error to response mapping
pub mod error;
/// Request extractors
pub mod extract;
mod goals;
mod kambios;
mod members;
mod pools;

use std::sync::Arc;

use crate::core::PoolService;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The pool service every handler calls into
    pub service: PoolService,
}

impl AppState {
    /// Wraps `service` for use as router state.
    #[must_use]
    pub fn new(service: PoolService) -> Arc<Self> {
        Arc::new(Self { service })
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(pools::router())
        .merge(members::router())
        .merge(kambios::router())
        .merge(goals::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
