//! Shopify payload types consumed by the reconciler.
//!
//! Webhook payloads arrive pre-verified from the transport layer; these
//! types describe only the fields reconciliation consumes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lunera_core::{
    InventoryItemId, InventoryPolicy, LocationId, ProductStatus, ShopifyProductId,
    ShopifyVariantId,
};

// =============================================================================
// Webhook Events
// =============================================================================

/// `inventory_levels/update` webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLevelEvent {
    /// Inventory item the level belongs to.
    pub inventory_item_id: InventoryItemId,
    /// Fulfillment location.
    pub location_id: LocationId,
    /// Units available at the location. Shopify sends `null` for untracked
    /// items; those merge as zero.
    pub available: Option<i64>,
    /// When Shopify recorded the change.
    pub updated_at: Option<DateTime<Utc>>,
}

/// `products/create` and `products/update` webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayload {
    /// Shopify product id.
    pub id: ShopifyProductId,
    /// Product title.
    pub title: String,
    /// URL handle.
    pub handle: String,
    /// Product status.
    #[serde(default)]
    pub status: ProductStatus,
    /// Product type/category hint.
    #[serde(default)]
    pub product_type: Option<String>,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: Option<String>,
    /// Variant array (full set; an absent variant means it was removed).
    #[serde(default)]
    pub variants: Vec<VariantPayload>,
}

/// One variant inside a product payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantPayload {
    /// Shopify variant id.
    pub id: ShopifyVariantId,
    /// Variant title (combination of option values).
    #[serde(default)]
    pub title: String,
    /// First option value (typically size).
    #[serde(default)]
    pub option1: Option<String>,
    /// Second option value (typically color).
    #[serde(default)]
    pub option2: Option<String>,
    /// Third option value.
    #[serde(default)]
    pub option3: Option<String>,
    /// SKU code.
    #[serde(default)]
    pub sku: Option<String>,
    /// Price as a decimal string.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Position within the product (1-based).
    #[serde(default = "default_position")]
    pub position: i64,
    /// Inventory item id for inventory operations.
    #[serde(default)]
    pub inventory_item_id: Option<InventoryItemId>,
    /// Total stock across locations as reported by Shopify.
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    /// What happens when stock reaches zero.
    #[serde(default)]
    pub inventory_policy: InventoryPolicy,
}

const fn default_position() -> i64 {
    1
}

/// `products/delete` webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDeletedEvent {
    /// Shopify product id.
    pub id: ShopifyProductId,
}

/// Variant-removed event (delivered alongside product webhooks when a single
/// variant disappears).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDeletedEvent {
    /// Shopify variant id.
    pub variant_id: ShopifyVariantId,
    /// Inventory item id, when the transport knows it.
    #[serde(default)]
    pub inventory_item_id: Option<InventoryItemId>,
}

// =============================================================================
// Admin API Responses
// =============================================================================

/// Per-market and sales-channel publication state for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPublication {
    /// Market codes the product is published in.
    pub markets: Vec<String>,
    /// Whether the product is published to the Online Store channel.
    pub published_to_online_store: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_level_event_deserializes_webhook_shape() {
        let payload = serde_json::json!({
            "inventory_item_id": 271_878_346_596_884_000_i64,
            "location_id": 24_826_418,
            "available": 6,
            "updated_at": "2026-01-09T11:23:44-05:00"
        });
        let event: InventoryLevelEvent =
            serde_json::from_value(payload).expect("deserialize");
        assert_eq!(event.location_id, LocationId::new(24_826_418));
        assert_eq!(event.available, Some(6));
    }

    #[test]
    fn test_inventory_level_event_tolerates_null_available() {
        let payload = serde_json::json!({
            "inventory_item_id": 1,
            "location_id": 2,
            "available": null
        });
        let event: InventoryLevelEvent =
            serde_json::from_value(payload).expect("deserialize");
        assert_eq!(event.available, None);
        assert_eq!(event.updated_at, None);
    }

    #[test]
    fn test_product_payload_deserializes_price_string() {
        let payload = serde_json::json!({
            "id": 788_032_119_674_292_900_i64,
            "title": "Silk Scarf",
            "handle": "silk-scarf",
            "status": "active",
            "product_type": "Accessories",
            "tags": "scarves, silk",
            "variants": [{
                "id": 642_667_041_472_713_900_i64,
                "title": "M / Emerald",
                "option1": "M",
                "option2": "Emerald",
                "sku": "SCARF-M-EM",
                "price": "49.00",
                "position": 1,
                "inventory_item_id": 271_878_346,
                "inventory_quantity": 5,
                "inventory_policy": "deny"
            }]
        });
        let product: ProductPayload = serde_json::from_value(payload).expect("deserialize");
        assert_eq!(product.variants.len(), 1);
        let variant = &product.variants[0];
        assert_eq!(
            variant.price,
            Some(Decimal::new(4900, 2))
        );
        assert_eq!(variant.inventory_policy, InventoryPolicy::Deny);
    }

    #[test]
    fn test_product_payload_defaults_for_sparse_webhooks() {
        // Deletion-adjacent webhooks can be sparse; defaults keep them parseable.
        let payload = serde_json::json!({
            "id": 1,
            "title": "Gone",
            "handle": "gone"
        });
        let product: ProductPayload = serde_json::from_value(payload).expect("deserialize");
        assert!(product.variants.is_empty());
        assert_eq!(product.status, ProductStatus::Active);
    }
}
