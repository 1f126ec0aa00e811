//! Variant locator.
//!
//! Finds every denormalized copy of a variant across all storefront
//! partitions, plus the canonical staging copy. The secondary lookup index
//! is consulted first; the full scan remains both the fallback and the
//! repair path that re-seeds the index.

use tracing::{debug, instrument, warn};

use lunera_core::{DocumentId, InventoryItemId, ShopifyVariantId, StorefrontName};

use crate::catalog::{
    CatalogStore, StagingProduct, StoreError, Variant, VariantKey, VariantLocation,
};
use crate::shopify::ShopifyGateway;

use super::{EngineError, Reconciler};

/// One denormalized copy of a variant.
#[derive(Debug, Clone)]
pub struct VariantCopy {
    /// Storefront partition the copy lives in.
    pub storefront: StorefrontName,
    /// Owning product document id.
    pub product_id: DocumentId,
    /// The variant document.
    pub variant: Variant,
}

impl VariantCopy {
    fn location(&self) -> VariantLocation {
        VariantLocation {
            storefront: self.storefront.clone(),
            product_id: self.product_id.clone(),
            variant_id: self.variant.id.clone(),
        }
    }
}

/// Index keys under which a variant copy is filed.
pub fn index_keys(variant: &Variant) -> Vec<VariantKey> {
    let mut keys = vec![VariantKey::Variant(variant.shopify_variant_id)];
    if let Some(item) = variant.shopify_inventory_item_id {
        keys.push(VariantKey::InventoryItem(item));
    }
    keys
}

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// Find every storefront copy of a variant.
    ///
    /// Matches on the Shopify variant id when given; products with no match
    /// are retried against the inventory item id, because inventory-level
    /// webhooks carry only the latter. Zero matches is a valid outcome (the
    /// product was never launched into any storefront), never an error.
    #[instrument(skip(self))]
    pub async fn find_variant_copies(
        &self,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> Result<Vec<VariantCopy>, EngineError> {
        let keys = query_keys(variant_id, inventory_item_id);
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        match self.lookup_via_index(&keys).await {
            Ok(copies) if !copies.is_empty() => return Ok(copies),
            Ok(_) => {}
            Err(error) => {
                warn!(error = %error, "Variant index lookup failed, falling back to scan");
            }
        }

        self.scan_for_copies(variant_id, inventory_item_id).await
    }

    /// The canonical staging copy for a variant, when one exists.
    #[instrument(skip(self))]
    pub async fn find_staging_copy(
        &self,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> Result<Option<StagingProduct>, EngineError> {
        Ok(self
            .store
            .staging_product_for_variant(variant_id, inventory_item_id)
            .await?)
    }

    /// File a variant copy in the lookup index. Index maintenance is best
    /// effort; a failed write only costs a future scan.
    pub(crate) async fn index_variant(&self, copy: &VariantCopy) {
        let keys = index_keys(&copy.variant);
        if let Err(error) = self.store.index_put(&keys, &copy.location()).await {
            warn!(error = %error, "Failed to index variant copy");
        }
    }

    /// Drop a location from the lookup index.
    pub(crate) async fn unindex_location(&self, location: &VariantLocation) {
        if let Err(error) = self.store.index_remove(location).await {
            warn!(error = %error, "Failed to remove variant index entry");
        }
    }

    async fn lookup_via_index(
        &self,
        keys: &[VariantKey],
    ) -> Result<Vec<VariantCopy>, StoreError> {
        let mut copies: Vec<VariantCopy> = Vec::new();

        for key in keys {
            for location in self.store.index_lookup(key).await? {
                if copies.iter().any(|copy| copy.location() == location) {
                    continue;
                }
                // Verify the hit; entries go stale when a crash interrupts a
                // delete between the document write and the index write.
                let variant = self
                    .store
                    .variant(&location.storefront, &location.product_id, &location.variant_id)
                    .await?;
                match variant {
                    Some(variant) => copies.push(VariantCopy {
                        storefront: location.storefront,
                        product_id: location.product_id,
                        variant,
                    }),
                    None => {
                        debug!(?location, "Pruning stale variant index entry");
                        self.unindex_location(&location).await;
                    }
                }
            }
        }

        Ok(copies)
    }

    /// Full scan across every storefront. O(storefronts x products x
    /// variants); fine at catalog scale and kept as the repair path that
    /// re-seeds the index.
    async fn scan_for_copies(
        &self,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> Result<Vec<VariantCopy>, EngineError> {
        let mut copies = Vec::new();

        for storefront in self.list_storefronts().await {
            match self
                .scan_storefront(&storefront, variant_id, inventory_item_id)
                .await
            {
                Ok(mut found) => copies.append(&mut found),
                Err(error) => {
                    warn!(
                        storefront = %storefront,
                        error = %error,
                        "Variant scan failed for storefront, continuing with the rest"
                    );
                }
            }
        }

        for copy in &copies {
            self.index_variant(copy).await;
        }

        Ok(copies)
    }

    async fn scan_storefront(
        &self,
        storefront: &StorefrontName,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> Result<Vec<VariantCopy>, StoreError> {
        let mut copies = Vec::new();

        for product in self.store.products(storefront).await? {
            if product.shopify_product_id.is_none() {
                // Manually-authored products have no Shopify source and can
                // never match a webhook.
                continue;
            }
            let variants = self.store.variants(storefront, &product.id).await?;

            let mut matches: Vec<&Variant> = variants
                .iter()
                .filter(|v| variant_id.is_some_and(|id| v.shopify_variant_id == id))
                .collect();
            if matches.is_empty() && inventory_item_id.is_some() {
                matches = variants
                    .iter()
                    .filter(|v| v.shopify_inventory_item_id == inventory_item_id)
                    .collect();
            }

            for variant in matches {
                copies.push(VariantCopy {
                    storefront: storefront.clone(),
                    product_id: product.id.clone(),
                    variant: variant.clone(),
                });
            }
        }

        Ok(copies)
    }
}

fn query_keys(
    variant_id: Option<ShopifyVariantId>,
    inventory_item_id: Option<InventoryItemId>,
) -> Vec<VariantKey> {
    let mut keys = Vec::new();
    if let Some(id) = variant_id {
        keys.push(VariantKey::Variant(id));
    }
    if let Some(id) = inventory_item_id {
        keys.push(VariantKey::InventoryItem(id));
    }
    keys
}
