//! Test harness for exercising the reconciliation engine end-to-end.
//!
//! Flows run against [`MemoryCatalog`] and a [`StubGateway`], the same
//! seams the production binary wires to Postgres and the Shopify Admin
//! API. Fixture builders live here so the test files read as scenarios.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;

use lunera_core::{
    CurrencyCode, DocumentId, InventoryItemId, InventoryPolicy, LocationId, Price, ProductStatus,
    ShopifyProductId, ShopifyVariantId, StorefrontName,
};
use lunera_reconciler::catalog::{
    CatalogStore, Category, InventoryLevel, StagingProduct, StagingVariant, StorefrontProduct,
    Variant,
};
use lunera_reconciler::engine::{Reconciler, ReconcilerOptions};
use lunera_reconciler::shopify::types::MarketPublication;
use lunera_reconciler::shopify::{ShopifyError, ShopifyGateway};

pub use lunera_reconciler::catalog::MemoryCatalog;

/// A configurable stand-in for the Shopify Admin API.
#[derive(Default)]
pub struct StubGateway {
    /// Full level sets served by inventory item id.
    pub levels: Mutex<HashMap<i64, Vec<InventoryLevel>>>,
    /// Publication state served by product id.
    pub publications: Mutex<HashMap<i64, MarketPublication>>,
    /// Product ids that received a publish command.
    pub publish_calls: Mutex<Vec<i64>>,
    /// Make the level fetch fail (exercises degraded merges).
    pub fail_levels: AtomicBool,
    /// Make the publish command fail (exercises non-fatal auto-publish).
    pub fail_publish: AtomicBool,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_levels(&self, item: InventoryItemId, levels: Vec<InventoryLevel>) {
        self.levels.lock().unwrap().insert(item.as_i64(), levels);
    }

    pub fn set_publication(&self, product: ShopifyProductId, publication: MarketPublication) {
        self.publications
            .lock()
            .unwrap()
            .insert(product.as_i64(), publication);
    }

    #[must_use]
    pub fn publish_calls(&self) -> Vec<i64> {
        self.publish_calls.lock().unwrap().clone()
    }
}

impl ShopifyGateway for StubGateway {
    async fn inventory_levels(
        &self,
        inventory_item_id: InventoryItemId,
    ) -> Result<Vec<InventoryLevel>, ShopifyError> {
        if self.fail_levels.load(Ordering::SeqCst) {
            return Err(ShopifyError::RateLimited);
        }
        Ok(self
            .levels
            .lock()
            .unwrap()
            .get(&inventory_item_id.as_i64())
            .cloned()
            .unwrap_or_default())
    }

    async fn market_publication(
        &self,
        product_id: ShopifyProductId,
    ) -> Result<MarketPublication, ShopifyError> {
        self.publications
            .lock()
            .unwrap()
            .get(&product_id.as_i64())
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(format!("product {product_id}")))
    }

    async fn publish_to_online_store(
        &self,
        product_id: ShopifyProductId,
    ) -> Result<(), ShopifyError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ShopifyError::UserError("channel unavailable".to_string()));
        }
        self.publish_calls.lock().unwrap().push(product_id.as_i64());
        Ok(())
    }
}

// =============================================================================
// Engine + Fixture Builders
// =============================================================================

/// Engine over a fresh in-memory catalog and stub gateway.
#[must_use]
pub fn engine() -> Reconciler<MemoryCatalog, StubGateway> {
    engine_with(MemoryCatalog::new(), StubGateway::new())
}

/// Engine over the given store and gateway.
#[must_use]
pub fn engine_with(
    store: MemoryCatalog,
    gateway: StubGateway,
) -> Reconciler<MemoryCatalog, StubGateway> {
    Reconciler::new(
        store,
        gateway,
        ReconcilerOptions {
            default_storefront: storefront("LUNERA"),
            markets: vec!["US".to_string(), "EU".to_string()],
            low_stock_display_threshold: None,
        },
    )
}

#[must_use]
pub fn storefront(name: &str) -> StorefrontName {
    StorefrontName::parse(name).expect("valid storefront name")
}

#[must_use]
pub fn usd(cents: i64) -> Price {
    Price::new(Decimal::new(cents, 2), CurrencyCode::USD)
}

#[must_use]
pub fn level(location: i64, available: i64) -> InventoryLevel {
    InventoryLevel {
        location_id: LocationId::new(location),
        location_name: None,
        available,
        updated_at: None,
    }
}

#[must_use]
pub fn product(id: &str, shopify_id: i64, category_ids: &[&str]) -> StorefrontProduct {
    StorefrontProduct {
        id: DocumentId::new(id),
        name: id.to_string(),
        slug: id.to_string(),
        category_ids: category_ids.iter().map(|id| DocumentId::new(*id)).collect(),
        base_price: None,
        has_in_stock_variants: false,
        in_stock_variant_count: 0,
        total_variant_count: 0,
        total_stock: 0,
        default_variant: None,
        main_image: None,
        default_variant_price: None,
        markets: Vec::new(),
        published: true,
        active: true,
        displayable: true,
        shopify_product_id: Some(ShopifyProductId::new(shopify_id)),
    }
}

#[must_use]
pub fn variant(id: &str, shopify_id: i64, item_id: i64, position: i64, stock: i64) -> Variant {
    Variant {
        id: DocumentId::new(id),
        title: id.to_string(),
        size: None,
        color: None,
        kind: None,
        sku: None,
        stock,
        price: None,
        default_photo: None,
        images: Vec::new(),
        image_url: None,
        image: None,
        shopify_variant_id: ShopifyVariantId::new(shopify_id),
        shopify_inventory_item_id: Some(InventoryItemId::new(item_id)),
        inventory_policy: InventoryPolicy::Deny,
        inventory_levels: Vec::new(),
        position,
    }
}

#[must_use]
pub fn category(id: &str, name: &str, preview: &[&str]) -> Category {
    Category {
        id: DocumentId::new(id),
        name: name.to_string(),
        slug: id.to_string(),
        preview_product_ids: preview.iter().map(|id| DocumentId::new(*id)).collect(),
    }
}

#[must_use]
pub fn staging(shopify_id: i64, variants: Vec<StagingVariant>) -> StagingProduct {
    StagingProduct {
        shopify_product_id: ShopifyProductId::new(shopify_id),
        title: format!("product-{shopify_id}"),
        handle: format!("product-{shopify_id}"),
        status: ProductStatus::Active,
        variants,
        markets: Vec::new(),
        published_to_online_store: false,
        suggested_category: None,
        processed_storefronts: Vec::new(),
        auto_process: false,
        updated_at: Utc::now(),
    }
}

#[must_use]
pub fn staging_variant(shopify_id: i64, item_id: i64) -> StagingVariant {
    StagingVariant {
        shopify_variant_id: ShopifyVariantId::new(shopify_id),
        inventory_item_id: Some(InventoryItemId::new(item_id)),
        title: format!("variant-{shopify_id}"),
        sku: None,
        price: None,
        position: 1,
        inventory_policy: InventoryPolicy::Deny,
        inventory_quantity: None,
        inventory_levels: Vec::new(),
    }
}

/// Seed one storefront with a product and its variants.
pub async fn seed_product(
    store: &MemoryCatalog,
    storefront_name: &StorefrontName,
    product_doc: &StorefrontProduct,
    variants: &[Variant],
) {
    store
        .put_product(storefront_name, product_doc)
        .await
        .expect("seed product");
    for v in variants {
        store
            .put_variant(storefront_name, &product_doc.id, v)
            .await
            .expect("seed variant");
    }
}
