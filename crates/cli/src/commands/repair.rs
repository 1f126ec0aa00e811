//! Catalog repair commands.
//!
//! Both repairs are full scans, the same shape the reconciler's locator
//! falls back to; running them is always safe because every derived value
//! is recomputed from current document state.

use lunera_core::StorefrontName;
use lunera_reconciler::catalog::{CatalogStore, PgCatalog, VariantLocation};
use lunera_reconciler::engine::aggregates;
use lunera_reconciler::engine::directory::SYSTEM_PARTITIONS;
use lunera_reconciler::engine::locator::index_keys;

use super::{CommandError, connect};

/// Rebuild the variant lookup index from a full catalog scan.
///
/// # Errors
///
/// Returns an error if the scan or an index write fails.
pub async fn index() -> Result<(), CommandError> {
    let store = PgCatalog::new(connect().await?);
    let mut entries = 0_u64;

    for storefront in storefronts(&store).await? {
        for product in store.products(&storefront).await? {
            for variant in store.variants(&storefront, &product.id).await? {
                let keys = index_keys(&variant);
                let location = VariantLocation {
                    storefront: storefront.clone(),
                    product_id: product.id.clone(),
                    variant_id: variant.id.clone(),
                };
                store.index_put(&keys, &location).await?;
                entries += 1;
            }
        }
    }

    tracing::info!(entries, "Variant index rebuilt");
    Ok(())
}

/// Recompute aggregates for every storefront product.
///
/// # Errors
///
/// Returns an error if the scan or a product write fails.
pub async fn aggregates() -> Result<(), CommandError> {
    let store = PgCatalog::new(connect().await?);
    let mut repaired = 0_u64;

    for storefront in storefronts(&store).await? {
        for mut product in store.products(&storefront).await? {
            let variants = store.variants(&storefront, &product.id).await?;
            let recomputed =
                aggregates::recompute(&variants, product.default_variant.as_ref(), None);
            aggregates::apply(&mut product, &recomputed);
            store.put_product(&storefront, &product).await?;
            repaired += 1;
        }
    }

    tracing::info!(products = repaired, "Product aggregates recomputed");
    Ok(())
}

/// Registry first, probe fallback - the same discovery order the engine
/// uses, minus the fail-soft default (repairs should fail loudly).
async fn storefronts(store: &PgCatalog) -> Result<Vec<StorefrontName>, CommandError> {
    let registry = store.registered_storefronts().await?;
    if registry.is_empty() {
        return Ok(store.probe_storefronts(SYSTEM_PARTITIONS).await?);
    }
    Ok(registry.into_iter().map(|record| record.name).collect())
}
