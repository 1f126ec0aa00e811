//! Status enums shared across the platform.

use serde::{Deserialize, Serialize};

/// Product status as reported by Shopify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Product is visible on the storefront.
    #[default]
    Active,
    /// Product is not visible (work in progress).
    Draft,
    /// Product is hidden/archived.
    Archived,
}

/// What Shopify does when a variant's stock reaches zero.
///
/// `Continue` means backorders are allowed, so the variant still counts as
/// sellable with zero stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InventoryPolicy {
    /// Stop selling when stock reaches zero.
    #[default]
    Deny,
    /// Keep selling (backorder-allowed).
    Continue,
}

impl InventoryPolicy {
    /// Whether a variant with this policy is sellable at the given stock.
    #[must_use]
    pub const fn is_sellable(self, stock: i64) -> bool {
        stock > 0 || matches!(self, Self::Continue)
    }
}
