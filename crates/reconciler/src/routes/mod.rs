//! HTTP route handlers for the reconciler.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness check
//! GET  /health/ready                            - Readiness check (database)
//!
//! # Shopify webhooks (pre-verified upstream)
//! POST /webhooks/shopify/inventory-levels       - inventory_levels/update
//! POST /webhooks/shopify/products/create        - products/create
//! POST /webhooks/shopify/products/update        - products/update
//! POST /webhooks/shopify/products/delete        - products/delete
//! POST /webhooks/shopify/variants/delete        - variant removed
//! ```

pub mod webhooks;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the service router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(webhooks::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1")
        .fetch_one(state.reconciler().store().pool())
        .await
    {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
