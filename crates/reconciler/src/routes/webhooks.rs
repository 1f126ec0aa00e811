//! Shopify webhook handlers.
//!
//! Payloads arrive pre-verified (signature checking happens at the edge
//! before requests reach this service) and deliveries are at-least-once and
//! unordered, so every handler is a thin shim over an idempotent engine
//! entry point. A 5xx here tells Shopify to redeliver; anything the engine
//! can degrade around answers 200.

use axum::{Json, Router, extract::State, routing::post};
use tracing::instrument;

use crate::engine::{ProductDeleteSummary, ProductUpsertSummary, UpdateSummary, VariantRemoval};
use crate::error::AppError;
use crate::shopify::types::{
    InventoryLevelEvent, ProductDeletedEvent, ProductPayload, VariantDeletedEvent,
};
use crate::state::AppState;

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/webhooks/shopify/inventory-levels",
            post(inventory_levels_update),
        )
        .route("/webhooks/shopify/products/create", post(product_upsert))
        .route("/webhooks/shopify/products/update", post(product_upsert))
        .route("/webhooks/shopify/products/delete", post(product_delete))
        .route("/webhooks/shopify/variants/delete", post(variant_delete))
}

/// Handle `inventory_levels/update`.
#[instrument(skip_all, fields(inventory_item_id = %event.inventory_item_id))]
async fn inventory_levels_update(
    State(state): State<AppState>,
    Json(event): Json<InventoryLevelEvent>,
) -> Result<Json<UpdateSummary>, AppError> {
    let summary = state
        .reconciler()
        .apply_inventory_level_update(&event)
        .await?;
    Ok(Json(summary))
}

/// Handle `products/create` and `products/update`.
///
/// Create and update share a handler: the engine's upsert derives whether
/// the staging entry existed, which also absorbs out-of-order deliveries
/// (an update racing ahead of its create simply creates).
#[instrument(skip_all, fields(shopify_product_id = %payload.id))]
async fn product_upsert(
    State(state): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<ProductUpsertSummary>, AppError> {
    let summary = state.reconciler().apply_product_upsert(&payload).await?;
    Ok(Json(summary))
}

/// Handle `products/delete`.
#[instrument(skip_all, fields(shopify_product_id = %event.id))]
async fn product_delete(
    State(state): State<AppState>,
    Json(event): Json<ProductDeletedEvent>,
) -> Result<Json<ProductDeleteSummary>, AppError> {
    let summary = state.reconciler().apply_product_delete(event.id).await?;
    Ok(Json(summary))
}

/// Handle a variant-removed delivery.
#[instrument(skip_all, fields(variant_id = %event.variant_id))]
async fn variant_delete(
    State(state): State<AppState>,
    Json(event): Json<VariantDeletedEvent>,
) -> Result<Json<Vec<VariantRemoval>>, AppError> {
    let removals = state.reconciler().apply_variant_delete(&event).await?;
    Ok(Json(removals))
}
