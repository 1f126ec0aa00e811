//! Market/publication synchronizer.
//!
//! Queries Shopify for per-market publication flags and Online Store
//! channel status in one request, self-heals products that were never
//! exposed to the storefront API, and persists the availability matrix onto
//! the staging entry and every storefront copy derived from it.

use tracing::{info, instrument, warn};

use lunera_core::{ShopifyProductId, StorefrontName};

use crate::catalog::{CatalogStore, StoreError};
use crate::shopify::types::MarketPublication;
use crate::shopify::{ONLINE_STORE_CHANNEL, ShopifyGateway};

use super::{EngineError, Reconciler};

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// Sync a product's market availability and Online Store publication.
    ///
    /// Returns `None` when the upstream query failed; nothing is persisted
    /// in that case and the triggering webhook carries on with stale market
    /// data (the next delivery retries).
    #[instrument(skip(self), fields(shopify_product_id = %shopify_product_id))]
    pub async fn sync_markets_and_publication(
        &self,
        shopify_product_id: ShopifyProductId,
    ) -> Result<Option<MarketPublication>, EngineError> {
        let mut publication = match self.gateway.market_publication(shopify_product_id).await {
            Ok(publication) => publication,
            Err(error) => {
                warn!(
                    error = %error,
                    "Market publication query failed, keeping previous availability"
                );
                return Ok(None);
            }
        };

        // Deployments that pin a market list ignore channels outside it.
        if !self.options.markets.is_empty() {
            publication.markets.retain(|market| {
                self.options
                    .markets
                    .iter()
                    .any(|configured| configured.eq_ignore_ascii_case(market))
            });
        }

        if !publication.published_to_online_store {
            match self.gateway.publish_to_online_store(shopify_product_id).await {
                Ok(()) => {
                    info!(
                        channel = ONLINE_STORE_CHANNEL,
                        "Auto-published product that was missing from the storefront channel"
                    );
                    publication.published_to_online_store = true;
                }
                Err(error) => {
                    // Non-fatal: the product stays invisible until the next
                    // webhook retries the publish.
                    warn!(error = %error, "Auto-publish failed");
                }
            }
        }

        if let Some(mut staging) = self.store.staging_product(shopify_product_id).await? {
            staging.markets = publication.markets.clone();
            staging.published_to_online_store = publication.published_to_online_store;
            staging.updated_at = chrono::Utc::now();
            self.store.put_staging_product(&staging).await?;
        }

        for storefront in self.list_storefronts().await {
            if let Err(error) = self
                .refresh_copy_markets(&storefront, shopify_product_id, &publication.markets)
                .await
            {
                warn!(
                    storefront = %storefront,
                    error = %error,
                    "Market refresh failed for storefront, continuing with the rest"
                );
            }
        }

        Ok(Some(publication))
    }

    async fn refresh_copy_markets(
        &self,
        storefront: &StorefrontName,
        shopify_product_id: ShopifyProductId,
        markets: &[String],
    ) -> Result<(), StoreError> {
        let copies: Vec<_> = self
            .store
            .products(storefront)
            .await?
            .into_iter()
            .filter(|p| p.shopify_product_id == Some(shopify_product_id))
            .collect();

        for mut product in copies {
            if product.markets == markets {
                continue;
            }
            product.markets = markets.to_vec();
            self.store.put_product(storefront, &product).await?;
        }

        Ok(())
    }
}
