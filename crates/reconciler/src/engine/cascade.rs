//! Cascading deletion.
//!
//! A variant delete that empties a product deletes the product; a product
//! delete that empties a category deletes the category (after stripping the
//! product from curated preview lists). Deletions are hard - no "inactive"
//! flags - and the member recount sees inactive products, because "no
//! products" and "no visible products" are different conditions and only
//! the former cascades.

use tracing::{info, instrument, warn};

use lunera_core::{DocumentId, ShopifyProductId, StorefrontName};

use crate::catalog::{CatalogStore, StoreError, Variant, VariantLocation};
use crate::shopify::ShopifyGateway;
use crate::shopify::types::VariantDeletedEvent;

use super::{EngineError, Reconciler};

/// Outcome of removing one variant copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct VariantRemoval {
    /// Whether the removal emptied the product and deleted it.
    pub product_deleted: bool,
}

/// Outcome of category cleanup after a product delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CategoryCleanup {
    /// Categories deleted because the product was their last member.
    pub deleted_categories: Vec<DocumentId>,
    /// Categories that survived with an updated preview list.
    pub updated_categories: Vec<DocumentId>,
}

/// Outcome of a top-level product delete fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ProductDeleteSummary {
    /// Whether a staging entry existed and was deleted.
    pub staging_deleted: bool,
    /// Storefront product documents deleted.
    pub products_deleted: u32,
    /// Categories deleted by the cascade.
    pub categories_deleted: u32,
}

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// Handle a variant-deleted event: remove every storefront copy and the
    /// staging record of the variant, cascading where a product empties.
    #[instrument(skip(self), fields(variant_id = %event.variant_id))]
    pub async fn apply_variant_delete(
        &self,
        event: &VariantDeletedEvent,
    ) -> Result<Vec<VariantRemoval>, EngineError> {
        self.remove_staging_variant(event).await;

        let copies = self
            .find_variant_copies(Some(event.variant_id), event.inventory_item_id)
            .await?;

        let mut removals = Vec::with_capacity(copies.len());
        for copy in copies {
            match self
                .remove_variant_copy(&copy.storefront, &copy.product_id, &copy.variant)
                .await
            {
                Ok(removal) => removals.push(removal),
                Err(error) => {
                    warn!(
                        storefront = %copy.storefront,
                        product_id = %copy.product_id,
                        error = %error,
                        "Failed to remove variant copy, continuing with remaining storefronts"
                    );
                }
            }
        }

        Ok(removals)
    }

    /// Remove one variant copy and run the cascade state machine:
    /// variants remaining > 0 - product survives, aggregates refresh;
    /// variants remaining == 0 - product document is deleted and category
    /// cleanup runs.
    pub async fn remove_variant_copy(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant: &Variant,
    ) -> Result<VariantRemoval, StoreError> {
        let existed = self
            .store
            .delete_variant(storefront, product_id, &variant.id)
            .await?;
        self.unindex_location(&VariantLocation {
            storefront: storefront.clone(),
            product_id: product_id.clone(),
            variant_id: variant.id.clone(),
        })
        .await;
        if !existed {
            // Already gone (out-of-order or repeated delivery); recompute
            // anyway so a half-applied previous run still converges.
            info!(
                storefront = %storefront,
                variant_id = %variant.id,
                "Variant already absent, treating delete as no-op"
            );
        }

        let remaining = self.store.variants(storefront, product_id).await?;
        if remaining.is_empty() {
            let category_ids = match self.store.product(storefront, product_id).await? {
                Some(product) => product.category_ids,
                None => Vec::new(),
            };
            let deleted = self.store.delete_product(storefront, product_id).await?;
            if deleted {
                info!(
                    storefront = %storefront,
                    product_id = %product_id,
                    "Deleted product after its last variant was removed"
                );
            }
            self.cleanup_categories(storefront, product_id, &category_ids)
                .await;
            return Ok(VariantRemoval {
                product_deleted: deleted,
            });
        }

        self.refresh_product_aggregates(storefront, product_id, Some(variant))
            .await?;
        Ok(VariantRemoval {
            product_deleted: false,
        })
    }

    /// Handle a top-level product delete: drop the staging entry, then for
    /// every storefront delete the product's variants and document and run
    /// category cleanup per (storefront, product) pair.
    #[instrument(skip(self), fields(shopify_product_id = %shopify_product_id))]
    pub async fn apply_product_delete(
        &self,
        shopify_product_id: ShopifyProductId,
    ) -> Result<ProductDeleteSummary, EngineError> {
        let mut summary = ProductDeleteSummary {
            staging_deleted: self.store.delete_staging_product(shopify_product_id).await?,
            ..ProductDeleteSummary::default()
        };

        for storefront in self.list_storefronts().await {
            match self
                .delete_product_copies(&storefront, shopify_product_id)
                .await
            {
                Ok((products, categories)) => {
                    summary.products_deleted += products;
                    summary.categories_deleted += categories;
                }
                Err(error) => {
                    warn!(
                        storefront = %storefront,
                        error = %error,
                        "Product delete failed for storefront, continuing with the rest"
                    );
                }
            }
        }

        info!(
            staging_deleted = summary.staging_deleted,
            products_deleted = summary.products_deleted,
            categories_deleted = summary.categories_deleted,
            "Product delete fan-out complete"
        );
        Ok(summary)
    }

    async fn delete_product_copies(
        &self,
        storefront: &StorefrontName,
        shopify_product_id: ShopifyProductId,
    ) -> Result<(u32, u32), StoreError> {
        let mut products_deleted = 0;
        let mut categories_deleted = 0;

        let copies: Vec<_> = self
            .store
            .products(storefront)
            .await?
            .into_iter()
            .filter(|p| p.shopify_product_id == Some(shopify_product_id))
            .collect();

        for product in copies {
            for variant in self.store.variants(storefront, &product.id).await? {
                self.store
                    .delete_variant(storefront, &product.id, &variant.id)
                    .await?;
                self.unindex_location(&VariantLocation {
                    storefront: storefront.clone(),
                    product_id: product.id.clone(),
                    variant_id: variant.id,
                })
                .await;
            }

            if self.store.delete_product(storefront, &product.id).await? {
                products_deleted += 1;
            }
            let cleanup = self
                .cleanup_categories(storefront, &product.id, &product.category_ids)
                .await;
            categories_deleted += u32::try_from(cleanup.deleted_categories.len()).unwrap_or(0);
        }

        Ok((products_deleted, categories_deleted))
    }

    /// Strip a deleted product from each category's preview list, then
    /// delete categories left with zero members. Per-category failures are
    /// logged and skipped so one bad category never blocks the rest.
    pub async fn cleanup_categories(
        &self,
        storefront: &StorefrontName,
        deleted_product_id: &DocumentId,
        category_ids: &[DocumentId],
    ) -> CategoryCleanup {
        let mut cleanup = CategoryCleanup::default();

        for category_id in category_ids {
            match self
                .cleanup_category(storefront, deleted_product_id, category_id)
                .await
            {
                Ok(Some(true)) => cleanup.deleted_categories.push(category_id.clone()),
                Ok(Some(false)) => cleanup.updated_categories.push(category_id.clone()),
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        storefront = %storefront,
                        category_id = %category_id,
                        error = %error,
                        "Category cleanup failed, continuing with remaining categories"
                    );
                }
            }
        }

        cleanup
    }

    /// Returns `Some(true)` when the category was deleted, `Some(false)`
    /// when it survived with an updated preview list, `None` when it did not
    /// exist.
    async fn cleanup_category(
        &self,
        storefront: &StorefrontName,
        deleted_product_id: &DocumentId,
        category_id: &DocumentId,
    ) -> Result<Option<bool>, StoreError> {
        let Some(mut category) = self.store.category(storefront, category_id).await? else {
            return Ok(None);
        };

        category
            .preview_product_ids
            .retain(|id| id != deleted_product_id);

        // Membership lives on product documents, so emptiness needs a
        // recount, not a field read. The count includes inactive products:
        // a hidden product still keeps its category alive.
        let remaining = self
            .store
            .count_products_in_category(storefront, category_id)
            .await?;

        if remaining == 0 {
            self.store.delete_category(storefront, category_id).await?;
            info!(
                storefront = %storefront,
                category_id = %category_id,
                "Deleted category after its last product was removed"
            );
            return Ok(Some(true));
        }

        self.store.put_category(storefront, &category).await?;
        Ok(Some(false))
    }

    /// Drop a deleted variant from the staging entry's raw variant array.
    async fn remove_staging_variant(&self, event: &VariantDeletedEvent) {
        let staging = match self
            .find_staging_copy(Some(event.variant_id), event.inventory_item_id)
            .await
        {
            Ok(staging) => staging,
            Err(error) => {
                warn!(error = %error, "Staging lookup failed during variant delete");
                return;
            }
        };
        let Some(mut staging) = staging else {
            return;
        };

        staging
            .variants
            .retain(|v| v.shopify_variant_id != event.variant_id);
        staging.updated_at = chrono::Utc::now();
        if let Err(error) = self.store.put_staging_product(&staging).await {
            warn!(
                shopify_product_id = %staging.shopify_product_id,
                error = %error,
                "Failed to update staging entry during variant delete"
            );
        }
    }
}
