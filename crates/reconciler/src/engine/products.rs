//! Product create/update orchestration.
//!
//! A product webhook carries the full current variant set, which makes it
//! the reconciliation point for everything except per-location stock:
//! the staging entry is upserted, markets re-synced, vanished variants
//! routed through cascading deletion, surviving copies refreshed, and new
//! variants appended to every storefront copy.

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use lunera_core::{CurrencyCode, DocumentId, Price, StorefrontName};

use crate::catalog::{CatalogStore, StagingProduct, StagingVariant, StoreError, Variant};
use crate::shopify::ShopifyGateway;
use crate::shopify::types::{ProductPayload, VariantPayload};

use super::locator::VariantCopy;
use super::{EngineError, Reconciler};

/// Outcome of a product create/update run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ProductUpsertSummary {
    /// Whether this webhook created the staging entry.
    pub staging_created: bool,
    /// Variant copies removed because the payload no longer carries them.
    pub variants_removed: u32,
    /// Storefront products deleted because their last variant vanished.
    pub products_deleted: u32,
    /// Storefront copies whose variants and aggregates were refreshed.
    pub copies_refreshed: u32,
}

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// Handle a `products/create` or `products/update` webhook.
    #[instrument(skip(self, payload), fields(shopify_product_id = %payload.id))]
    pub async fn apply_product_upsert(
        &self,
        payload: &ProductPayload,
    ) -> Result<ProductUpsertSummary, EngineError> {
        let existing = self.store.staging_product(payload.id).await?;
        let mut summary = ProductUpsertSummary {
            staging_created: existing.is_none(),
            ..ProductUpsertSummary::default()
        };

        let staging = self.build_staging(payload, existing).await;
        self.store.put_staging_product(&staging).await?;

        // Markets are enrichment; a failed sync leaves previous availability
        // in place and never aborts the upsert.
        self.sync_markets_and_publication(payload.id).await?;

        for storefront in self.list_storefronts().await {
            match self.reconcile_storefront_copies(&storefront, payload).await {
                Ok(stats) => {
                    summary.variants_removed += stats.variants_removed;
                    summary.products_deleted += stats.products_deleted;
                    summary.copies_refreshed += stats.copies_refreshed;
                }
                Err(error) => {
                    warn!(
                        storefront = %storefront,
                        error = %error,
                        "Product upsert failed for storefront, continuing with the rest"
                    );
                }
            }
        }

        info!(
            staging_created = summary.staging_created,
            variants_removed = summary.variants_removed,
            products_deleted = summary.products_deleted,
            copies_refreshed = summary.copies_refreshed,
            "Product upsert complete"
        );
        Ok(summary)
    }

    /// Build the staging entry for a payload, carrying forward state the
    /// webhook cannot know: processing flags, markets, and the per-location
    /// levels inventory webhooks have merged in.
    async fn build_staging(
        &self,
        payload: &ProductPayload,
        existing: Option<StagingProduct>,
    ) -> StagingProduct {
        let variants = payload
            .variants
            .iter()
            .map(|vp| {
                let carried = existing.as_ref().and_then(|staging| {
                    staging
                        .variants
                        .iter()
                        .find(|v| v.shopify_variant_id == vp.id)
                });
                StagingVariant {
                    shopify_variant_id: vp.id,
                    inventory_item_id: vp.inventory_item_id,
                    title: vp.title.clone(),
                    sku: vp.sku.clone(),
                    price: vp.price,
                    position: vp.position,
                    inventory_policy: vp.inventory_policy,
                    inventory_quantity: vp
                        .inventory_quantity
                        .or_else(|| carried.and_then(|v| v.inventory_quantity)),
                    inventory_levels: carried
                        .map(|v| v.inventory_levels.clone())
                        .unwrap_or_default(),
                }
            })
            .collect();

        let suggested_category = match existing
            .as_ref()
            .and_then(|staging| staging.suggested_category.clone())
        {
            Some(category) => Some(category),
            None => self.suggest_category(payload).await,
        };

        StagingProduct {
            shopify_product_id: payload.id,
            title: payload.title.clone(),
            handle: payload.handle.clone(),
            status: payload.status,
            variants,
            markets: existing
                .as_ref()
                .map(|s| s.markets.clone())
                .unwrap_or_default(),
            published_to_online_store: existing
                .as_ref()
                .is_some_and(|s| s.published_to_online_store),
            suggested_category,
            processed_storefronts: existing
                .as_ref()
                .map(|s| s.processed_storefronts.clone())
                .unwrap_or_default(),
            auto_process: existing.as_ref().is_some_and(|s| s.auto_process),
            updated_at: Utc::now(),
        }
    }

    /// Best-guess category: match the payload's product type and tags
    /// against existing category names/slugs in the default storefront.
    async fn suggest_category(&self, payload: &ProductPayload) -> Option<String> {
        let categories = match self
            .store
            .categories(&self.options.default_storefront)
            .await
        {
            Ok(categories) => categories,
            Err(error) => {
                warn!(error = %error, "Category listing failed, skipping suggestion");
                return None;
            }
        };

        let mut hints: Vec<String> = Vec::new();
        if let Some(product_type) = &payload.product_type {
            hints.push(product_type.trim().to_lowercase());
        }
        if let Some(tags) = &payload.tags {
            hints.extend(tags.split(',').map(|t| t.trim().to_lowercase()));
        }

        categories
            .iter()
            .find(|category| {
                let name = category.name.to_lowercase();
                let slug = category.slug.to_lowercase();
                hints.iter().any(|hint| *hint == name || *hint == slug)
            })
            .map(|category| category.name.clone())
    }

    async fn reconcile_storefront_copies(
        &self,
        storefront: &StorefrontName,
        payload: &ProductPayload,
    ) -> Result<ProductUpsertSummary, StoreError> {
        let mut stats = ProductUpsertSummary::default();

        let copies: Vec<_> = self
            .store
            .products(storefront)
            .await?
            .into_iter()
            .filter(|p| p.shopify_product_id == Some(payload.id))
            .collect();

        for product in copies {
            let variants = self.store.variants(storefront, &product.id).await?;

            // Variants absent from the payload were deleted upstream; route
            // them through the cascade state machine.
            let vanished: Vec<Variant> = variants
                .into_iter()
                .filter(|v| !payload.variants.iter().any(|vp| vp.id == v.shopify_variant_id))
                .collect();

            let mut product_deleted = false;
            for variant in vanished {
                let removal = self
                    .remove_variant_copy(storefront, &product.id, &variant)
                    .await?;
                stats.variants_removed += 1;
                if removal.product_deleted {
                    stats.products_deleted += 1;
                    product_deleted = true;
                    break;
                }
            }
            if product_deleted {
                continue;
            }

            self.refresh_copy_variants(storefront, &product.id, payload)
                .await?;
            self.refresh_product_aggregates(storefront, &product.id, None)
                .await?;
            stats.copies_refreshed += 1;
        }

        Ok(stats)
    }

    /// Bring a copy's variant set in line with the payload: update the
    /// Shopify-owned fields on survivors and append variants the copy has
    /// never seen. Storefront price overrides are never touched.
    async fn refresh_copy_variants(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        payload: &ProductPayload,
    ) -> Result<(), StoreError> {
        let current = self.store.variants(storefront, product_id).await?;

        for vp in &payload.variants {
            match current
                .iter()
                .find(|v| v.shopify_variant_id == vp.id)
            {
                Some(existing) => {
                    let mut variant = existing.clone();
                    variant.title = vp.title.clone();
                    variant.sku = vp.sku.clone();
                    variant.position = vp.position;
                    variant.inventory_policy = vp.inventory_policy;
                    if variant.shopify_inventory_item_id.is_none() {
                        variant.shopify_inventory_item_id = vp.inventory_item_id;
                    }
                    // Per-location levels are the stock authority once known;
                    // the payload total only seeds variants without them.
                    if variant.inventory_levels.is_empty()
                        && let Some(quantity) = vp.inventory_quantity
                    {
                        variant.stock = quantity;
                    }
                    self.store
                        .put_variant(storefront, product_id, &variant)
                        .await?;
                    self.index_variant(&VariantCopy {
                        storefront: storefront.clone(),
                        product_id: product_id.clone(),
                        variant,
                    })
                    .await;
                }
                None => {
                    let variant = variant_from_payload(vp);
                    self.store
                        .put_variant(storefront, product_id, &variant)
                        .await?;
                    self.index_variant(&VariantCopy {
                        storefront: storefront.clone(),
                        product_id: product_id.clone(),
                        variant,
                    })
                    .await;
                }
            }
        }

        Ok(())
    }
}

fn variant_from_payload(vp: &VariantPayload) -> Variant {
    Variant {
        id: DocumentId::new(Uuid::new_v4().to_string()),
        title: vp.title.clone(),
        size: vp.option1.clone(),
        color: vp.option2.clone(),
        kind: vp.option3.clone(),
        sku: vp.sku.clone(),
        stock: vp.inventory_quantity.unwrap_or(0),
        price: vp.price.map(|amount| Price::new(amount, CurrencyCode::USD)),
        default_photo: None,
        images: Vec::new(),
        image_url: None,
        image: None,
        shopify_variant_id: vp.id,
        shopify_inventory_item_id: vp.inventory_item_id,
        inventory_policy: vp.inventory_policy,
        inventory_levels: Vec::new(),
        position: vp.position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunera_core::{InventoryPolicy, ShopifyVariantId};
    use rust_decimal::Decimal;

    #[test]
    fn test_variant_from_payload_maps_options_and_price() {
        let vp = VariantPayload {
            id: ShopifyVariantId::new(7),
            title: "M / Emerald".to_string(),
            option1: Some("M".to_string()),
            option2: Some("Emerald".to_string()),
            option3: None,
            sku: Some("SCARF-M-EM".to_string()),
            price: Some(Decimal::new(4900, 2)),
            position: 2,
            inventory_item_id: Some(lunera_core::InventoryItemId::new(70)),
            inventory_quantity: Some(4),
            inventory_policy: InventoryPolicy::Continue,
        };

        let variant = variant_from_payload(&vp);
        assert_eq!(variant.size.as_deref(), Some("M"));
        assert_eq!(variant.color.as_deref(), Some("Emerald"));
        assert_eq!(variant.stock, 4);
        assert_eq!(variant.position, 2);
        assert_eq!(
            variant.price,
            Some(Price::new(Decimal::new(4900, 2), CurrencyCode::USD))
        );
        assert_eq!(variant.inventory_policy, InventoryPolicy::Continue);
        assert!(!variant.id.as_str().is_empty());
    }
}
