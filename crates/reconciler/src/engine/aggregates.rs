//! Aggregate recomputation for storefront products.
//!
//! Everything here is pure: given the remaining variant set it derives the
//! product's aggregate fields. The engine wrapper persists the result.
//!
//! The ordering of the rules matters: stock and price aggregates are always
//! derived from the remaining set before the default-variant fields are
//! considered, so a stale default never survives a stock change.

use lunera_core::Price;

use crate::catalog::{DefaultVariantRef, StorefrontProduct, Variant};

/// What happened to the default-variant pointer during recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultVariantOutcome {
    /// The current pointer still resolves; nothing changed.
    Unchanged,
    /// A new default was elected.
    Elected {
        /// Normalized pointer to the new default (always the local id form).
        default_variant: DefaultVariantRef,
        /// Display image derived from the new default.
        main_image: Option<String>,
        /// Price of the new default.
        default_variant_price: Option<Price>,
    },
    /// No variants remain; pointer, image, and price are all cleared.
    Cleared,
}

/// Recomputed aggregate fields for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAggregates {
    /// Stock summed across variants and locations.
    pub total_stock: i64,
    /// Number of sellable variants.
    pub in_stock_variant_count: u32,
    /// Whether any variant is sellable.
    pub has_in_stock_variants: bool,
    /// Number of remaining variants.
    pub total_variant_count: u32,
    /// Minimum positive variant price. `None` means no variant carries a
    /// usable price and the stored value must be left alone.
    pub base_price: Option<Price>,
    /// Default-variant disposition.
    pub default_variant: DefaultVariantOutcome,
}

/// Recompute a product's aggregates from its remaining variants.
///
/// `current_default` is the product's pointer before the change;
/// `removed` is the variant a delete just took away, when the trigger was a
/// removal. Re-election happens when the removed variant was the default
/// (matched in either id space) or when the pointer no longer resolves to
/// any remaining variant - the latter repairs historically inconsistent
/// pointers instead of leaving them dangling.
#[must_use]
pub fn recompute(
    remaining: &[Variant],
    current_default: Option<&DefaultVariantRef>,
    removed: Option<&Variant>,
) -> ProductAggregates {
    let total_stock: i64 = remaining.iter().map(Variant::effective_stock).sum();

    let in_stock_variant_count = remaining
        .iter()
        .filter(|v| v.inventory_policy.is_sellable(v.effective_stock()))
        .count();

    let base_price = remaining
        .iter()
        .filter_map(|v| v.price)
        .filter(Price::is_positive)
        .min();

    let default_variant = elect_default(remaining, current_default, removed);

    ProductAggregates {
        total_stock,
        in_stock_variant_count: u32::try_from(in_stock_variant_count).unwrap_or(u32::MAX),
        has_in_stock_variants: in_stock_variant_count > 0,
        total_variant_count: u32::try_from(remaining.len()).unwrap_or(u32::MAX),
        base_price,
        default_variant,
    }
}

fn elect_default(
    remaining: &[Variant],
    current_default: Option<&DefaultVariantRef>,
    removed: Option<&Variant>,
) -> DefaultVariantOutcome {
    if remaining.is_empty() {
        return DefaultVariantOutcome::Cleared;
    }

    let removed_was_default =
        matches!((current_default, removed), (Some(default), Some(gone)) if default.matches(gone));
    let resolves = current_default
        .is_some_and(|default| remaining.iter().any(|v| default.matches(v)));

    if !removed_was_default && resolves {
        return DefaultVariantOutcome::Unchanged;
    }

    // First remaining variant by stable original order - deterministic, not
    // "most stock" or "lowest price". Callers pass variants already ordered.
    let elected = &remaining[0];
    DefaultVariantOutcome::Elected {
        default_variant: DefaultVariantRef::Local(elected.id.clone()),
        main_image: elected.display_image(),
        default_variant_price: elected.price,
    }
}

/// Apply recomputed aggregates to a product document in place.
///
/// Returns the updated `displayable` flag input: callers combine
/// `total_stock` with the configured low-stock threshold separately because
/// the threshold is engine configuration, not variant state.
pub fn apply(product: &mut StorefrontProduct, aggregates: &ProductAggregates) {
    product.total_stock = aggregates.total_stock;
    product.in_stock_variant_count = aggregates.in_stock_variant_count;
    product.has_in_stock_variants = aggregates.has_in_stock_variants;
    product.total_variant_count = aggregates.total_variant_count;
    if aggregates.base_price.is_some() {
        product.base_price = aggregates.base_price;
    }

    match &aggregates.default_variant {
        DefaultVariantOutcome::Unchanged => {}
        DefaultVariantOutcome::Elected {
            default_variant,
            main_image,
            default_variant_price,
        } => {
            product.default_variant = Some(default_variant.clone());
            product.main_image = main_image.clone();
            product.default_variant_price = *default_variant_price;
        }
        DefaultVariantOutcome::Cleared => {
            product.default_variant = None;
            product.main_image = None;
            product.default_variant_price = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunera_core::{CurrencyCode, DocumentId, InventoryPolicy, ShopifyVariantId};
    use rust_decimal::Decimal;

    use crate::catalog::InventoryLevel;

    fn usd(cents: i64) -> Price {
        Price::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    fn variant(id: &str, shopify_id: i64, position: i64, stock: i64) -> Variant {
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
            shopify_inventory_item_id: None,
            inventory_policy: InventoryPolicy::Deny,
            inventory_levels: Vec::new(),
            position,
        }
    }

    #[test]
    fn test_total_stock_sums_levels_over_stored_totals() {
        let mut a = variant("a", 1, 1, 99);
        a.inventory_levels = vec![InventoryLevel {
            location_id: lunera_core::LocationId::new(1),
            location_name: None,
            available: 5,
            updated_at: None,
        }];
        let b = variant("b", 2, 2, 3);

        let aggregates = recompute(&[a, b], None, None);
        assert_eq!(aggregates.total_stock, 8);
    }

    #[test]
    fn test_backorder_variant_counts_as_in_stock() {
        let mut backorder = variant("a", 1, 1, 0);
        backorder.inventory_policy = InventoryPolicy::Continue;
        let empty = variant("b", 2, 2, 0);

        let aggregates = recompute(&[backorder, empty], None, None);
        assert_eq!(aggregates.in_stock_variant_count, 1);
        assert!(aggregates.has_in_stock_variants);
        assert_eq!(aggregates.total_variant_count, 2);
    }

    #[test]
    fn test_base_price_is_minimum_positive_price() {
        let mut a = variant("a", 1, 1, 1);
        a.price = Some(usd(4900));
        let mut b = variant("b", 2, 2, 1);
        b.price = Some(usd(2500));
        let mut c = variant("c", 3, 3, 1);
        c.price = Some(usd(0)); // zero is not a usable price

        let aggregates = recompute(&[a, b, c], None, None);
        assert_eq!(aggregates.base_price, Some(usd(2500)));
    }

    #[test]
    fn test_base_price_never_overwritten_without_positive_price() {
        let aggregates = recompute(&[variant("a", 1, 1, 1)], None, None);
        assert_eq!(aggregates.base_price, None);

        let mut product = sample_product();
        product.base_price = Some(usd(1800));
        apply(&mut product, &aggregates);
        assert_eq!(product.base_price, Some(usd(1800)));
    }

    #[test]
    fn test_default_untouched_when_removed_variant_was_not_default() {
        let a = variant("a", 1, 1, 1);
        let b = variant("b", 2, 2, 1);
        let removed = variant("c", 3, 3, 0);

        let aggregates = recompute(
            &[a, b],
            Some(&DefaultVariantRef::Local(DocumentId::new("b"))),
            Some(&removed),
        );
        assert_eq!(aggregates.default_variant, DefaultVariantOutcome::Unchanged);
    }

    #[test]
    fn test_reelection_when_default_removed_by_document_id() {
        let removed = variant("a", 1, 1, 0);
        let mut b = variant("b", 2, 2, 1);
        b.images = vec!["b.jpg".to_string()];
        b.price = Some(usd(2500));
        let c = variant("c", 3, 3, 1);

        let aggregates = recompute(
            &[b, c],
            Some(&DefaultVariantRef::Local(DocumentId::new("a"))),
            Some(&removed),
        );
        assert_eq!(
            aggregates.default_variant,
            DefaultVariantOutcome::Elected {
                default_variant: DefaultVariantRef::Local(DocumentId::new("b")),
                main_image: Some("b.jpg".to_string()),
                default_variant_price: Some(usd(2500)),
            }
        );
    }

    #[test]
    fn test_reelection_when_default_removed_by_shopify_id() {
        // Legacy pointers store the Shopify variant id instead of the
        // document id; both forms must trigger re-election.
        let removed = variant("a", 71, 1, 0);
        let b = variant("b", 72, 2, 1);

        let aggregates = recompute(
            &[b],
            Some(&DefaultVariantRef::Shopify(ShopifyVariantId::new(71))),
            Some(&removed),
        );
        assert!(matches!(
            aggregates.default_variant,
            DefaultVariantOutcome::Elected { .. }
        ));
    }

    #[test]
    fn test_new_default_is_first_by_stable_order_not_stock_or_price() {
        let removed = variant("z", 9, 1, 0);
        let mut first = variant("first", 1, 2, 0);
        first.price = Some(usd(9900));
        let mut richer = variant("richer", 2, 3, 50);
        richer.price = Some(usd(100));

        let aggregates = recompute(
            &[first, richer],
            Some(&DefaultVariantRef::Local(DocumentId::new("z"))),
            Some(&removed),
        );
        let DefaultVariantOutcome::Elected {
            default_variant, ..
        } = aggregates.default_variant
        else {
            panic!("expected re-election");
        };
        assert_eq!(
            default_variant,
            DefaultVariantRef::Local(DocumentId::new("first"))
        );
    }

    #[test]
    fn test_dangling_default_pointer_is_repaired() {
        let a = variant("a", 1, 1, 1);

        let aggregates = recompute(
            &[a],
            Some(&DefaultVariantRef::Local(DocumentId::new("vanished"))),
            None,
        );
        assert!(matches!(
            aggregates.default_variant,
            DefaultVariantOutcome::Elected { .. }
        ));
    }

    #[test]
    fn test_missing_default_is_elected_for_nonempty_set() {
        let aggregates = recompute(&[variant("a", 1, 1, 1)], None, None);
        assert!(matches!(
            aggregates.default_variant,
            DefaultVariantOutcome::Elected { .. }
        ));
    }

    #[test]
    fn test_zero_variants_clears_default_fields() {
        let aggregates = recompute(
            &[],
            Some(&DefaultVariantRef::Local(DocumentId::new("a"))),
            None,
        );
        assert_eq!(aggregates.default_variant, DefaultVariantOutcome::Cleared);
        assert_eq!(aggregates.total_stock, 0);
        assert!(!aggregates.has_in_stock_variants);

        let mut product = sample_product();
        product.main_image = Some("stale.jpg".to_string());
        product.default_variant_price = Some(usd(100));
        apply(&mut product, &aggregates);
        assert_eq!(product.default_variant, None);
        assert_eq!(product.main_image, None);
        assert_eq!(product.default_variant_price, None);
    }

    // Scenario A from the acceptance checklist: deleting the only stocked
    // variant of a two-variant product zeroes every stock aggregate.
    #[test]
    fn test_deleting_last_stocked_variant_clears_stock_flags() {
        let remaining = variant("b", 2, 2, 0);
        let removed = variant("a", 1, 1, 3);

        let aggregates = recompute(
            &[remaining],
            Some(&DefaultVariantRef::Local(DocumentId::new("b"))),
            Some(&removed),
        );
        assert!(!aggregates.has_in_stock_variants);
        assert_eq!(aggregates.total_stock, 0);
        assert_eq!(aggregates.in_stock_variant_count, 0);
    }

    fn sample_product() -> StorefrontProduct {
        StorefrontProduct {
            id: DocumentId::new("p1"),
            name: "Silk Scarf".to_string(),
            slug: "silk-scarf".to_string(),
            category_ids: Vec::new(),
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
            shopify_product_id: None,
        }
    }
}
