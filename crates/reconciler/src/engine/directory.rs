//! Storefront directory.
//!
//! Discovers the set of active storefront partitions. The explicit registry
//! is the primary source; partition probing remains as a fallback for
//! deployments that predate it. Every component that fans a mutation out
//! across storefronts starts here.

use tracing::{instrument, warn};

use lunera_core::StorefrontName;

use crate::catalog::{CatalogStore, StoreError};
use crate::shopify::ShopifyGateway;

use super::Reconciler;

/// Partitions that are never storefronts: order ledgers, cart state, user
/// records, staging, and the engine's own bookkeeping.
pub const SYSTEM_PARTITIONS: &[&str] = &[
    "orders",
    "carts",
    "users",
    "staging_products",
    "storefronts",
    "variant_index",
];

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// The storefronts reconciliation fans out to.
    ///
    /// Fails soft: on any store error this returns just the default
    /// storefront, because partial reconciliation beats a crash-looping
    /// webhook handler.
    #[instrument(skip(self))]
    pub async fn list_storefronts(&self) -> Vec<StorefrontName> {
        match self.try_list_storefronts().await {
            Ok(storefronts) => storefronts,
            Err(error) => {
                warn!(
                    error = %error,
                    fallback = %self.options.default_storefront,
                    "Storefront directory listing failed, degrading to default storefront"
                );
                vec![self.options.default_storefront.clone()]
            }
        }
    }

    async fn try_list_storefronts(&self) -> Result<Vec<StorefrontName>, StoreError> {
        let registry = self.store.registered_storefronts().await?;

        let mut storefronts: Vec<StorefrontName> = if registry.is_empty() {
            self.store.probe_storefronts(SYSTEM_PARTITIONS).await?
        } else {
            registry.into_iter().map(|record| record.name).collect()
        };

        // The default storefront is always part of the directory, even while
        // it has no products.
        if !storefronts.contains(&self.options.default_storefront) {
            storefronts.push(self.options.default_storefront.clone());
        }

        Ok(storefronts)
    }
}
