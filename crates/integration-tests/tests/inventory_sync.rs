//! End-to-end inventory level synchronization flows.

use lunera_core::{DocumentId, InventoryItemId, LocationId};
use lunera_reconciler::catalog::CatalogStore;
use lunera_reconciler::shopify::types::InventoryLevelEvent;

use lunera_integration_tests::{
    engine, engine_with, level, product, seed_product, staging, staging_variant, storefront,
    variant, MemoryCatalog, StubGateway,
};

fn event(item: i64, location: i64, available: i64) -> InventoryLevelEvent {
    InventoryLevelEvent {
        inventory_item_id: InventoryItemId::new(item),
        location_id: LocationId::new(location),
        available: Some(available),
        updated_at: None,
    }
}

// Scenario D: a second location's level merges alongside the first; total
// stock becomes the sum, not the latest payload.
#[tokio::test]
async fn test_second_location_merges_without_replacing_first() {
    let reconciler = engine();
    let lunera = storefront("LUNERA");

    let mut v = variant("v1", 100, 500, 1, 5);
    v.inventory_levels = vec![level(1, 5)];
    seed_product(reconciler.store(), &lunera, &product("p1", 10, &[]), &[v]).await;

    let summary = reconciler
        .apply_inventory_level_update(&event(500, 2, 3))
        .await
        .expect("inventory update");
    assert_eq!(summary.variants_updated, 1);

    let updated = reconciler
        .store()
        .variant(&lunera, &DocumentId::new("p1"), &DocumentId::new("v1"))
        .await
        .expect("get variant")
        .expect("variant present");
    assert_eq!(
        updated.inventory_levels,
        vec![level(1, 5), level(2, 3)]
    );
    assert_eq!(updated.stock, 8);

    let owner = reconciler
        .store()
        .product(&lunera, &DocumentId::new("p1"))
        .await
        .expect("get product")
        .expect("product present");
    assert_eq!(owner.total_stock, 8);
    assert!(owner.has_in_stock_variants);
}

#[tokio::test]
async fn test_applying_same_event_twice_is_idempotent() {
    let reconciler = engine();
    let lunera = storefront("LUNERA");
    seed_product(
        reconciler.store(),
        &lunera,
        &product("p1", 10, &[]),
        &[variant("v1", 100, 500, 1, 0)],
    )
    .await;

    let update = event(500, 1, 7);
    reconciler
        .apply_inventory_level_update(&update)
        .await
        .expect("first apply");
    let after_once = reconciler
        .store()
        .variant(&lunera, &DocumentId::new("p1"), &DocumentId::new("v1"))
        .await
        .expect("get")
        .expect("present");

    reconciler
        .apply_inventory_level_update(&update)
        .await
        .expect("second apply");
    let after_twice = reconciler
        .store()
        .variant(&lunera, &DocumentId::new("p1"), &DocumentId::new("v1"))
        .await
        .expect("get")
        .expect("present");

    assert_eq!(after_once.inventory_levels, after_twice.inventory_levels);
    assert_eq!(after_once.stock, after_twice.stock);
}

// Staging and every storefront copy must converge on the same inventory
// truth, even though the copies are independent documents.
#[tokio::test]
async fn test_update_fans_out_to_staging_and_all_storefronts() {
    let store = MemoryCatalog::new();
    let gateway = StubGateway::new();
    let reconciler = engine_with(store, gateway);

    let lunera = storefront("LUNERA");
    let health = storefront("HEALTH");
    seed_product(
        reconciler.store(),
        &lunera,
        &product("p1", 10, &[]),
        &[variant("v1", 100, 500, 1, 0)],
    )
    .await;
    seed_product(
        reconciler.store(),
        &health,
        &product("p9", 10, &[]),
        &[variant("v9", 100, 500, 1, 0)],
    )
    .await;
    reconciler
        .store()
        .put_staging_product(&staging(10, vec![staging_variant(100, 500)]))
        .await
        .expect("seed staging");

    let summary = reconciler
        .apply_inventory_level_update(&event(500, 1, 4))
        .await
        .expect("inventory update");

    assert!(summary.staging_updated);
    assert_eq!(summary.variants_updated, 2);
    assert_eq!(summary.documents_updated(), 3);

    let staged = reconciler
        .store()
        .staging_product(lunera_core::ShopifyProductId::new(10))
        .await
        .expect("get staging")
        .expect("staging present");
    assert_eq!(staged.variants[0].inventory_quantity, Some(4));

    for (sf, pid, vid) in [(&lunera, "p1", "v1"), (&health, "p9", "v9")] {
        let copy = reconciler
            .store()
            .variant(sf, &DocumentId::new(pid), &DocumentId::new(vid))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(copy.stock, 4, "storefront {sf} copy should see stock 4");
    }
}

// The gateway's full level set is preferred over the single-location
// payload when it is available.
#[tokio::test]
async fn test_full_level_set_from_gateway_is_preferred() {
    let gateway = StubGateway::new();
    gateway.set_levels(
        InventoryItemId::new(500),
        vec![level(1, 2), level(2, 6), level(3, 1)],
    );
    let reconciler = engine_with(MemoryCatalog::new(), gateway);

    let lunera = storefront("LUNERA");
    seed_product(
        reconciler.store(),
        &lunera,
        &product("p1", 10, &[]),
        &[variant("v1", 100, 500, 1, 0)],
    )
    .await;

    reconciler
        .apply_inventory_level_update(&event(500, 2, 6))
        .await
        .expect("inventory update");

    let updated = reconciler
        .store()
        .variant(&lunera, &DocumentId::new("p1"), &DocumentId::new("v1"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(updated.inventory_levels.len(), 3);
    assert_eq!(updated.stock, 9);
}

// A failed enrichment call degrades to the webhook's single location and
// never fails the update.
#[tokio::test]
async fn test_gateway_failure_degrades_to_single_location() {
    let gateway = StubGateway::new();
    gateway
        .fail_levels
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let reconciler = engine_with(MemoryCatalog::new(), gateway);

    let lunera = storefront("LUNERA");
    let mut v = variant("v1", 100, 500, 1, 5);
    v.inventory_levels = vec![level(1, 5)];
    seed_product(reconciler.store(), &lunera, &product("p1", 10, &[]), &[v]).await;

    let summary = reconciler
        .apply_inventory_level_update(&event(500, 2, 3))
        .await
        .expect("update must not fail on gateway error");

    assert_eq!(summary.variants_updated, 1);
    let updated = reconciler
        .store()
        .variant(&lunera, &DocumentId::new("p1"), &DocumentId::new("v1"))
        .await
        .expect("get")
        .expect("present");
    // Existing location survives; only the webhook's location was applied.
    assert_eq!(updated.inventory_levels, vec![level(1, 5), level(2, 3)]);
    assert_eq!(updated.stock, 8);
}

// A level update for a product never launched anywhere is a clean no-op.
#[tokio::test]
async fn test_unknown_inventory_item_is_a_noop() {
    let reconciler = engine();

    let summary = reconciler
        .apply_inventory_level_update(&event(999, 1, 5))
        .await
        .expect("update");
    assert!(!summary.staging_updated);
    assert_eq!(summary.variants_updated, 0);
    assert_eq!(summary.documents_updated(), 0);
}
