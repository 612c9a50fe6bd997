//! API routes for the trip planning server.

pub mod error;
pub mod request_id;
pub mod trips;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router with middleware applied.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/trips/plan", post(trips::plan_trip_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::ensure_request_id))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests;
