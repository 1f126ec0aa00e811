//! Catalog document types.
//!
//! These are the shapes persisted in the document store. Writes are atomic
//! per document; reconciliation flows that touch several documents are not
//! transactional as a whole (each document is independently recoverable on
//! the next webhook delivery).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lunera_core::{
    DocumentId, InventoryItemId, InventoryPolicy, LocationId, Price, ProductStatus,
    ShopifyProductId, ShopifyVariantId, StorefrontName,
};

// =============================================================================
// Storefront Registry
// =============================================================================

/// An entry in the storefront registry.
///
/// The registry is the primary source for storefront discovery; partition
/// probing remains as a fallback for deployments that predate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontRecord {
    /// Partition name (e.g. `LUNERA`).
    pub name: StorefrontName,
    /// Human-readable name shown in admin tooling.
    pub display_name: String,
    /// Whether this is the default storefront (always included in the
    /// directory, even when it has no products yet).
    #[serde(default)]
    pub is_default: bool,
    /// When the storefront was registered.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Per-location stock figure for one variant, keyed by `location_id` within
/// the variant's level list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    /// Shopify fulfillment location id.
    pub location_id: LocationId,
    /// Location name, when known.
    pub location_name: Option<String>,
    /// Units available at this location.
    pub available: i64,
    /// When Shopify last updated this level.
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Variants
// =============================================================================

/// A variant sub-document of a storefront product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Document id within the parent product's variant sub-collection.
    pub id: DocumentId,
    /// Variant title (combination of option values).
    pub title: String,
    /// Size option value.
    pub size: Option<String>,
    /// Color option value.
    pub color: Option<String>,
    /// Type/style option value.
    pub kind: Option<String>,
    /// SKU code.
    pub sku: Option<String>,
    /// Stock across all locations. Invariant: equals the sum of
    /// `inventory_levels[].available` after every merge.
    pub stock: i64,
    /// Storefront price override, when set.
    pub price: Option<Price>,
    /// Explicit default photo, preferred over `images` for display.
    pub default_photo: Option<String>,
    /// Image URLs for this variant.
    #[serde(default)]
    pub images: Vec<String>,
    /// Legacy single-image field.
    pub image_url: Option<String>,
    /// Older legacy single-image field.
    pub image: Option<String>,
    /// Shopify variant id (back-reference).
    pub shopify_variant_id: ShopifyVariantId,
    /// Shopify inventory item id, when known. Inventory-level webhooks carry
    /// only this id, so it is the fallback match key.
    pub shopify_inventory_item_id: Option<InventoryItemId>,
    /// What happens when stock reaches zero.
    #[serde(default)]
    pub inventory_policy: InventoryPolicy,
    /// Per-location stock levels.
    #[serde(default)]
    pub inventory_levels: Vec<InventoryLevel>,
    /// Position within the parent product (stable original order).
    pub position: i64,
}

impl Variant {
    /// Stock for aggregation: the stored total when present and consistent,
    /// otherwise the sum of per-location levels.
    #[must_use]
    pub fn effective_stock(&self) -> i64 {
        if self.inventory_levels.is_empty() {
            self.stock
        } else {
            self.inventory_levels.iter().map(|l| l.available).sum()
        }
    }

    /// The image that represents this variant in listings, checked in
    /// priority order: explicit default photo, first of the images array,
    /// the legacy `image_url` field, the legacy `image` field.
    #[must_use]
    pub fn display_image(&self) -> Option<String> {
        self.default_photo
            .clone()
            .or_else(|| self.images.first().cloned())
            .or_else(|| self.image_url.clone())
            .or_else(|| self.image.clone())
    }
}

// =============================================================================
// Default Variant Pointer
// =============================================================================

/// Pointer to the variant whose image and price represent the parent product
/// in catalog listings.
///
/// Historically the pointer was stored either as the variant's document id or
/// as its Shopify variant id. The two forms are modeled explicitly; writes
/// normalize to [`DefaultVariantRef::Local`], reads accept both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultVariantRef {
    /// Variant document id within the parent product.
    Local(DocumentId),
    /// Shopify variant id (legacy form).
    Shopify(ShopifyVariantId),
}

impl DefaultVariantRef {
    /// Whether this pointer designates the given variant, in either id space.
    #[must_use]
    pub fn matches(&self, variant: &Variant) -> bool {
        match self {
            Self::Local(id) => *id == variant.id,
            Self::Shopify(id) => *id == variant.shopify_variant_id,
        }
    }
}

// =============================================================================
// Storefront Products
// =============================================================================

/// A denormalized, per-storefront copy of a product.
///
/// Multiple storefront copies of the same underlying Shopify product are
/// independent documents; reconciliation keeps their inventory truth
/// consistent while prices and curation diverge per storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontProduct {
    /// Document id within the storefront's product collection.
    pub id: DocumentId,
    /// Display name.
    pub name: String,
    /// URL slug, unique within the storefront.
    pub slug: String,
    /// Categories this product belongs to (by reference, not containment).
    #[serde(default)]
    pub category_ids: Vec<DocumentId>,
    /// Minimum positive variant price.
    pub base_price: Option<Price>,
    /// Whether any variant is sellable.
    pub has_in_stock_variants: bool,
    /// Number of sellable variants.
    pub in_stock_variant_count: u32,
    /// Number of variants.
    pub total_variant_count: u32,
    /// Stock summed across variants and locations.
    pub total_stock: i64,
    /// Pointer to the representative variant.
    pub default_variant: Option<DefaultVariantRef>,
    /// Image representing the product in listings, derived from the default
    /// variant.
    pub main_image: Option<String>,
    /// Price of the default variant.
    pub default_variant_price: Option<Price>,
    /// Market codes this product is available in.
    #[serde(default)]
    pub markets: Vec<String>,
    /// Whether the product is published on this storefront.
    pub published: bool,
    /// Whether the product is active. Inactive products are hidden from
    /// display but still count as category members.
    pub active: bool,
    /// Whether listings should display the product, given the configured
    /// low-stock threshold. Display-only; never drives cascades.
    #[serde(default = "default_true")]
    pub displayable: bool,
    /// Source Shopify product id (back-reference, not ownership).
    pub shopify_product_id: Option<ShopifyProductId>,
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Staging Products
// =============================================================================

/// Raw variant data carried on a staging product, straight from the Shopify
/// payload plus per-location levels merged in by inventory webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingVariant {
    /// Shopify variant id.
    pub shopify_variant_id: ShopifyVariantId,
    /// Shopify inventory item id.
    pub inventory_item_id: Option<InventoryItemId>,
    /// Variant title.
    pub title: String,
    /// SKU code.
    pub sku: Option<String>,
    /// Price as reported by Shopify.
    pub price: Option<rust_decimal::Decimal>,
    /// Position within the product.
    pub position: i64,
    /// What happens when stock reaches zero.
    #[serde(default)]
    pub inventory_policy: InventoryPolicy,
    /// Total stock as reported by Shopify.
    pub inventory_quantity: Option<i64>,
    /// Per-location stock levels.
    #[serde(default)]
    pub inventory_levels: Vec<InventoryLevel>,
}

/// Canonical pre-launch representation of a Shopify product.
///
/// Invariant: exactly one staging entry per Shopify product id. Created on
/// product-create, updated on every product/inventory webhook, deleted when
/// the Shopify product is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingProduct {
    /// Shopify product id (document key).
    pub shopify_product_id: ShopifyProductId,
    /// Product title.
    pub title: String,
    /// URL handle.
    pub handle: String,
    /// Product status.
    pub status: ProductStatus,
    /// Raw variant array.
    #[serde(default)]
    pub variants: Vec<StagingVariant>,
    /// Market codes the product is published in.
    #[serde(default)]
    pub markets: Vec<String>,
    /// Whether the product is published to the Online Store channel.
    #[serde(default)]
    pub published_to_online_store: bool,
    /// Best-guess category name, matched from product type/tags.
    pub suggested_category: Option<String>,
    /// Storefronts this product has been launched into.
    #[serde(default)]
    pub processed_storefronts: Vec<StorefrontName>,
    /// Whether the product should be launched without manual review.
    #[serde(default)]
    pub auto_process: bool,
    /// Last time a webhook touched this entry.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Categories
// =============================================================================

/// Per-storefront product grouping with a curated preview ordering.
///
/// Categories are never auto-created; they are auto-deleted when their last
/// member product goes away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Document id within the storefront's category collection.
    pub id: DocumentId,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Curated ordering of product ids shown in category previews.
    #[serde(default)]
    pub preview_product_ids: Vec<DocumentId>,
}

// =============================================================================
// Variant Lookup Index
// =============================================================================

/// Key into the secondary variant lookup index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariantKey {
    /// Lookup by Shopify variant id.
    Variant(ShopifyVariantId),
    /// Lookup by Shopify inventory item id.
    InventoryItem(InventoryItemId),
}

/// Where a denormalized variant copy lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantLocation {
    /// Storefront partition.
    pub storefront: StorefrontName,
    /// Product document id.
    pub product_id: DocumentId,
    /// Variant document id.
    pub variant_id: DocumentId,
}
