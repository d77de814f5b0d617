//! HTTP API for route generation and segment storage.

pub mod error;
pub mod request_id;
mod routes;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub use error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    routes::create_router()
}

/// Full application: API routes, health check, and the middleware stack.
pub fn app(state: Arc<AppState>) -> Router {
    routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::ensure_request_id))
        .layer(CorsLayer::permissive())
}
