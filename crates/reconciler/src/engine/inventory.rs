//! Inventory level synchronizer.
//!
//! Applies a per-location stock update to the staging copy and to every
//! storefront copy of the affected variant. The incoming level is an upsert
//! keyed by location id - a single-location update never drops other
//! locations' data - and the variant's total stock is re-derived as the sum
//! across all known locations after every merge.

use tracing::{instrument, warn};

use crate::catalog::{CatalogStore, InventoryLevel, StoreError};
use crate::shopify::ShopifyGateway;
use crate::shopify::types::InventoryLevelEvent;

use super::{EngineError, Reconciler};

/// Outcome of one inventory-level update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpdateSummary {
    /// Whether the staging entry was updated.
    pub staging_updated: bool,
    /// Storefront variant documents updated.
    pub variants_updated: u32,
}

impl UpdateSummary {
    /// Total documents rewritten by this update.
    #[must_use]
    pub const fn documents_updated(&self) -> u32 {
        self.variants_updated + if self.staging_updated { 1 } else { 0 }
    }
}

/// Upsert `incoming` levels into `existing`, keyed by location id. Levels
/// for locations not mentioned by `incoming` are left untouched.
pub fn merge_levels(existing: &mut Vec<InventoryLevel>, incoming: &[InventoryLevel]) {
    for level in incoming {
        match existing
            .iter_mut()
            .find(|l| l.location_id == level.location_id)
        {
            Some(slot) => *slot = level.clone(),
            None => existing.push(level.clone()),
        }
    }
}

/// Total stock across all known locations.
#[must_use]
pub fn level_sum(levels: &[InventoryLevel]) -> i64 {
    levels.iter().map(|l| l.available).sum()
}

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// Apply a per-location stock update from Shopify.
    ///
    /// Prefers the full level set fetched from the gateway (more complete
    /// than the single-location payload); when that call fails the update
    /// degrades to the one location from the webhook rather than failing.
    #[instrument(skip(self), fields(inventory_item_id = %event.inventory_item_id, location_id = %event.location_id))]
    pub async fn apply_inventory_level_update(
        &self,
        event: &InventoryLevelEvent,
    ) -> Result<UpdateSummary, EngineError> {
        let incoming = self.resolve_incoming_levels(event).await;
        let mut summary = UpdateSummary {
            staging_updated: self.sync_staging_levels(event, &incoming).await,
            variants_updated: 0,
        };

        let copies = self
            .find_variant_copies(None, Some(event.inventory_item_id))
            .await?;
        for copy in copies {
            let mut variant = copy.variant;
            merge_levels(&mut variant.inventory_levels, &incoming);
            variant.stock = level_sum(&variant.inventory_levels);

            let written: Result<(), StoreError> = async {
                self.store
                    .put_variant(&copy.storefront, &copy.product_id, &variant)
                    .await?;
                self.refresh_product_aggregates(&copy.storefront, &copy.product_id, None)
                    .await
            }
            .await;

            match written {
                Ok(()) => summary.variants_updated += 1,
                Err(error) => {
                    warn!(
                        storefront = %copy.storefront,
                        product_id = %copy.product_id,
                        error = %error,
                        "Inventory update failed for storefront copy, continuing with the rest"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// The level batch to merge: the upstream's full set when obtainable,
    /// else just the webhook's single location.
    async fn resolve_incoming_levels(&self, event: &InventoryLevelEvent) -> Vec<InventoryLevel> {
        let fallback = || {
            vec![InventoryLevel {
                location_id: event.location_id,
                location_name: None,
                available: event.available.unwrap_or(0),
                updated_at: event.updated_at,
            }]
        };

        match self.gateway.inventory_levels(event.inventory_item_id).await {
            Ok(levels) if !levels.is_empty() => levels,
            Ok(_) => fallback(),
            Err(error) => {
                warn!(
                    inventory_item_id = %event.inventory_item_id,
                    error = %error,
                    "Full inventory-level fetch failed, degrading to webhook payload"
                );
                fallback()
            }
        }
    }

    /// Merge the level batch into the staging variant carrying this
    /// inventory item. Best effort: staging is one fan-out target among
    /// many, and a failure here must not block the storefront copies.
    async fn sync_staging_levels(
        &self,
        event: &InventoryLevelEvent,
        incoming: &[InventoryLevel],
    ) -> bool {
        let staging = match self
            .find_staging_copy(None, Some(event.inventory_item_id))
            .await
        {
            Ok(Some(staging)) => staging,
            Ok(None) => return false,
            Err(error) => {
                warn!(error = %error, "Staging lookup failed during inventory update");
                return false;
            }
        };

        let mut staging = staging;
        let Some(variant) = staging
            .variants
            .iter_mut()
            .find(|v| v.inventory_item_id == Some(event.inventory_item_id))
        else {
            return false;
        };
        merge_levels(&mut variant.inventory_levels, incoming);
        variant.inventory_quantity = Some(level_sum(&variant.inventory_levels));
        staging.updated_at = chrono::Utc::now();

        match self.store.put_staging_product(&staging).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    shopify_product_id = %staging.shopify_product_id,
                    error = %error,
                    "Failed to write staging entry during inventory update"
                );
                false
            }
        }
    }
}
