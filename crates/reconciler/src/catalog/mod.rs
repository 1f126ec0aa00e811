//! Catalog document store.
//!
//! The reconciliation engine reads and writes catalog state through the
//! [`CatalogStore`] trait. Two implementations exist:
//!
//! - [`PgCatalog`] - Postgres-backed, one JSONB row per document
//! - [`MemoryCatalog`] - in-memory, used by tests and local experiments
//!
//! # Document paths
//!
//! - `staging_products/{shopifyProductId}` - canonical pre-launch copies
//! - `{storefront}/products/{productId}` - per-storefront product copies
//! - `{storefront}/products/{productId}/variants/{variantId}` - variant
//!   sub-documents
//! - `{storefront}/categories/{categoryId}` - curated categories
//! - `storefronts/{name}` - the storefront registry
//! - `variant_index` - secondary lookup index from Shopify variant /
//!   inventory-item ids to document locations
//!
//! Every method is atomic at the single-document level. Nothing here spans
//! documents; cross-document consistency is the engine's job.

pub mod docs;
pub mod memory;
pub mod pg;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use lunera_core::{
    DocumentId, InventoryItemId, ShopifyProductId, ShopifyVariantId, StorefrontName,
};

pub use docs::{
    Category, DefaultVariantRef, InventoryLevel, StagingProduct, StagingVariant, StorefrontProduct,
    StorefrontRecord, Variant, VariantKey, VariantLocation,
};
pub use memory::MemoryCatalog;
pub use pg::PgCatalog;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document failed to (de)serialize.
    #[error("document corruption: {0}")]
    Corruption(#[from] serde_json::Error),
}

/// Access to catalog documents.
///
/// Implementations must keep each method atomic with respect to the single
/// document it touches and must return variants in stable original order
/// (ascending `position`, ties broken by document id).
pub trait CatalogStore: Send + Sync {
    // -- storefront directory ------------------------------------------------

    /// All entries in the storefront registry.
    fn registered_storefronts(
        &self,
    ) -> impl Future<Output = Result<Vec<StorefrontRecord>, StoreError>> + Send;

    /// Create or replace a registry entry.
    fn put_storefront_record(
        &self,
        record: &StorefrontRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Distinct storefront partitions containing at least one product,
    /// excluding the given system partitions. Fallback path for deployments
    /// without a populated registry.
    fn probe_storefronts(
        &self,
        excluded: &[&str],
    ) -> impl Future<Output = Result<Vec<StorefrontName>, StoreError>> + Send;

    // -- staging products ----------------------------------------------------

    /// Fetch the staging entry for a Shopify product.
    fn staging_product(
        &self,
        id: ShopifyProductId,
    ) -> impl Future<Output = Result<Option<StagingProduct>, StoreError>> + Send;

    /// Create or replace a staging entry.
    fn put_staging_product(
        &self,
        doc: &StagingProduct,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a staging entry. Returns whether it existed.
    fn delete_staging_product(
        &self,
        id: ShopifyProductId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Find the staging entry carrying a variant with the given Shopify
    /// variant id, falling back to the inventory item id. Inventory-level
    /// webhooks know only the latter.
    fn staging_product_for_variant(
        &self,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> impl Future<Output = Result<Option<StagingProduct>, StoreError>> + Send;

    // -- storefront products -------------------------------------------------

    /// All product documents in a storefront partition.
    fn products(
        &self,
        storefront: &StorefrontName,
    ) -> impl Future<Output = Result<Vec<StorefrontProduct>, StoreError>> + Send;

    /// Fetch one product document.
    fn product(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<StorefrontProduct>, StoreError>> + Send;

    /// Create or replace a product document.
    fn put_product(
        &self,
        storefront: &StorefrontName,
        doc: &StorefrontProduct,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a product document. Returns whether it existed.
    fn delete_product(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    // -- variants ------------------------------------------------------------

    /// A product's variants in stable original order.
    fn variants(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<Variant>, StoreError>> + Send;

    /// Fetch one variant sub-document.
    fn variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant_id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Variant>, StoreError>> + Send;

    /// Create or replace a variant sub-document.
    fn put_variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        doc: &Variant,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a variant sub-document. Returns whether it existed.
    fn delete_variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant_id: &DocumentId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    // -- categories ----------------------------------------------------------

    /// All category documents in a storefront partition.
    fn categories(
        &self,
        storefront: &StorefrontName,
    ) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send;

    /// Fetch one category document.
    fn category(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Category>, StoreError>> + Send;

    /// Create or replace a category document.
    fn put_category(
        &self,
        storefront: &StorefrontName,
        doc: &Category,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a category document. Returns whether it existed.
    fn delete_category(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Count products referencing a category, including inactive ones.
    ///
    /// "No products" and "no visible products" are different conditions;
    /// category cascades run on the former, so the count must see products
    /// that are merely hidden from display.
    fn count_products_in_category(
        &self,
        storefront: &StorefrontName,
        category_id: &DocumentId,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    // -- variant lookup index ------------------------------------------------

    /// Locations recorded for a lookup key. May contain stale entries; the
    /// locator verifies every hit against the documents themselves.
    fn index_lookup(
        &self,
        key: &VariantKey,
    ) -> impl Future<Output = Result<Vec<VariantLocation>, StoreError>> + Send;

    /// Record a location under each of the given keys.
    fn index_put(
        &self,
        keys: &[VariantKey],
        location: &VariantLocation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Drop every index entry pointing at a location.
    fn index_remove(
        &self,
        location: &VariantLocation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
