//! End-to-end product create/update webhook flows.

use lunera_core::{DocumentId, ShopifyProductId, ShopifyVariantId};
use lunera_reconciler::catalog::CatalogStore;
use lunera_reconciler::shopify::types::{MarketPublication, ProductPayload, VariantPayload};

use lunera_integration_tests::{
    MemoryCatalog, StubGateway, category, engine, engine_with, product, seed_product, storefront,
    variant,
};

fn payload(id: i64, variants: Vec<VariantPayload>) -> ProductPayload {
    ProductPayload {
        id: ShopifyProductId::new(id),
        title: "Silk Scarf".to_string(),
        handle: "silk-scarf".to_string(),
        status: lunera_core::ProductStatus::Active,
        product_type: Some("Scarves".to_string()),
        tags: Some("silk, accessories".to_string()),
        variants,
    }
}

fn variant_payload(id: i64, item_id: i64, position: i64) -> VariantPayload {
    VariantPayload {
        id: ShopifyVariantId::new(id),
        title: format!("variant-{id}"),
        option1: None,
        option2: None,
        option3: None,
        sku: None,
        price: None,
        position,
        inventory_item_id: Some(lunera_core::InventoryItemId::new(item_id)),
        inventory_quantity: Some(3),
        inventory_policy: lunera_core::InventoryPolicy::Deny,
    }
}

// A create webhook materializes exactly one staging entry, with the
// category suggestion matched against the default storefront's categories.
#[tokio::test]
async fn test_product_create_builds_staging_entry() {
    let reconciler = engine();
    let lunera = storefront("LUNERA");
    reconciler
        .store()
        .put_category(&lunera, &category("scarves", "Scarves", &[]))
        .await
        .expect("seed category");

    let summary = reconciler
        .apply_product_upsert(&payload(10, vec![variant_payload(100, 500, 1)]))
        .await
        .expect("product create");

    assert!(summary.staging_created);
    let staged = reconciler
        .store()
        .staging_product(ShopifyProductId::new(10))
        .await
        .expect("get staging")
        .expect("staging present");
    assert_eq!(staged.handle, "silk-scarf");
    assert_eq!(staged.variants.len(), 1);
    assert_eq!(staged.suggested_category.as_deref(), Some("Scarves"));
}

#[tokio::test]
async fn test_repeated_create_keeps_single_staging_entry() {
    let reconciler = engine();

    let event = payload(10, vec![variant_payload(100, 500, 1)]);
    let first = reconciler
        .apply_product_upsert(&event)
        .await
        .expect("first delivery");
    let second = reconciler
        .apply_product_upsert(&event)
        .await
        .expect("second delivery");

    assert!(first.staging_created);
    assert!(!second.staging_created);
}

// A product that is not on the Online Store channel gets auto-published,
// and the resulting availability lands on the staging entry.
#[tokio::test]
async fn test_market_sync_auto_publishes_missing_channel() {
    let gateway = StubGateway::new();
    gateway.set_publication(
        ShopifyProductId::new(10),
        MarketPublication {
            markets: vec!["EU".to_string(), "JP".to_string()],
            published_to_online_store: false,
        },
    );
    let reconciler = engine_with(MemoryCatalog::new(), gateway);

    reconciler
        .apply_product_upsert(&payload(10, vec![variant_payload(100, 500, 1)]))
        .await
        .expect("product create");

    assert_eq!(reconciler.gateway().publish_calls(), vec![10]);

    let staged = reconciler
        .store()
        .staging_product(ShopifyProductId::new(10))
        .await
        .expect("get staging")
        .expect("staging present");
    assert!(staged.published_to_online_store);
    // JP is outside the configured market list and is dropped.
    assert_eq!(staged.markets, vec!["EU".to_string()]);
}

#[tokio::test]
async fn test_failed_publish_is_non_fatal() {
    let gateway = StubGateway::new();
    gateway.set_publication(
        ShopifyProductId::new(10),
        MarketPublication {
            markets: vec!["US".to_string()],
            published_to_online_store: false,
        },
    );
    gateway
        .fail_publish
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let reconciler = engine_with(MemoryCatalog::new(), gateway);

    reconciler
        .apply_product_upsert(&payload(10, vec![variant_payload(100, 500, 1)]))
        .await
        .expect("upsert must survive publish failure");

    let staged = reconciler
        .store()
        .staging_product(ShopifyProductId::new(10))
        .await
        .expect("get staging")
        .expect("staging present");
    assert!(!staged.published_to_online_store);
    assert_eq!(staged.markets, vec!["US".to_string()]);
}

// An update whose payload dropped a variant routes the vanished variant
// through cascading deletion on every storefront copy.
#[tokio::test]
async fn test_update_removes_vanished_variants_from_copies() {
    let reconciler = engine();
    let lunera = storefront("LUNERA");
    seed_product(
        reconciler.store(),
        &lunera,
        &product("p1", 10, &[]),
        &[
            variant("v1", 100, 500, 1, 2),
            variant("v2", 101, 501, 2, 2),
        ],
    )
    .await;

    let summary = reconciler
        .apply_product_upsert(&payload(10, vec![variant_payload(101, 501, 1)]))
        .await
        .expect("product update");

    assert_eq!(summary.variants_removed, 1);
    assert_eq!(summary.products_deleted, 0);

    let variants = reconciler
        .store()
        .variants(&lunera, &DocumentId::new("p1"))
        .await
        .expect("list variants");
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].shopify_variant_id, ShopifyVariantId::new(101));
}

// An update that drops every variant deletes the storefront copy outright.
#[tokio::test]
async fn test_update_dropping_all_variants_deletes_copy() {
    let reconciler = engine();
    let lunera = storefront("LUNERA");
    seed_product(
        reconciler.store(),
        &lunera,
        &product("p1", 10, &[]),
        &[variant("v1", 100, 500, 1, 2)],
    )
    .await;

    let summary = reconciler
        .apply_product_upsert(&payload(10, Vec::new()))
        .await
        .expect("product update");

    assert_eq!(summary.products_deleted, 1);
    assert!(reconciler
        .store()
        .product(&lunera, &DocumentId::new("p1"))
        .await
        .expect("get")
        .is_none());
}

// A variant new to the payload is appended to every storefront copy and
// picked up by the aggregates.
#[tokio::test]
async fn test_update_appends_new_variants_to_copies() {
    let reconciler = engine();
    let lunera = storefront("LUNERA");
    seed_product(
        reconciler.store(),
        &lunera,
        &product("p1", 10, &[]),
        &[variant("v1", 100, 500, 1, 2)],
    )
    .await;

    reconciler
        .apply_product_upsert(&payload(
            10,
            vec![variant_payload(100, 500, 1), variant_payload(102, 502, 2)],
        ))
        .await
        .expect("product update");

    let variants = reconciler
        .store()
        .variants(&lunera, &DocumentId::new("p1"))
        .await
        .expect("list variants");
    assert_eq!(variants.len(), 2);

    let updated = reconciler
        .store()
        .product(&lunera, &DocumentId::new("p1"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(updated.total_variant_count, 2);
    // Both variants carry the payload quantity of 3: the survivor has no
    // per-location levels yet, so the payload total reseeds its stock.
    assert_eq!(updated.total_stock, 6);
}
