//! In-memory catalog store.
//!
//! Backs tests and local experiments. Mirrors the Postgres implementation's
//! semantics: per-document atomicity, variants in stable original order,
//! stale index entries possible until pruned.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use lunera_core::{
    DocumentId, InventoryItemId, ShopifyProductId, ShopifyVariantId, StorefrontName,
};

use super::{
    Category, CatalogStore, StagingProduct, StoreError, StorefrontProduct, StorefrontRecord,
    Variant, VariantKey, VariantLocation,
};

type ProductKey = (String, String);
type VariantMapKey = (String, String, String);

#[derive(Default)]
struct Inner {
    storefronts: BTreeMap<String, StorefrontRecord>,
    staging: BTreeMap<i64, StagingProduct>,
    products: BTreeMap<ProductKey, StorefrontProduct>,
    variants: BTreeMap<VariantMapKey, Variant>,
    categories: BTreeMap<ProductKey, Category>,
    index: HashMap<VariantKey, HashSet<VariantLocation>>,
}

/// In-memory implementation of [`CatalogStore`].
#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::unwrap_used)] // poisoned lock is unrecoverable in-process state
    fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&self.inner.read().unwrap())
    }

    #[allow(clippy::unwrap_used)]
    fn write<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.write().unwrap())
    }
}

impl CatalogStore for MemoryCatalog {
    async fn registered_storefronts(&self) -> Result<Vec<StorefrontRecord>, StoreError> {
        Ok(self.read(|inner| inner.storefronts.values().cloned().collect()))
    }

    async fn put_storefront_record(&self, record: &StorefrontRecord) -> Result<(), StoreError> {
        self.write(|inner| {
            inner
                .storefronts
                .insert(record.name.as_str().to_string(), record.clone());
        });
        Ok(())
    }

    async fn probe_storefronts(
        &self,
        excluded: &[&str],
    ) -> Result<Vec<StorefrontName>, StoreError> {
        Ok(self.read(|inner| {
            let mut seen: Vec<&str> = inner
                .products
                .keys()
                .map(|(storefront, _)| storefront.as_str())
                .filter(|storefront| !excluded.contains(storefront))
                .collect();
            seen.dedup();
            seen.into_iter()
                .filter_map(|name| StorefrontName::parse(name).ok())
                .collect()
        }))
    }

    async fn staging_product(
        &self,
        id: ShopifyProductId,
    ) -> Result<Option<StagingProduct>, StoreError> {
        Ok(self.read(|inner| inner.staging.get(&id.as_i64()).cloned()))
    }

    async fn put_staging_product(&self, doc: &StagingProduct) -> Result<(), StoreError> {
        self.write(|inner| {
            inner
                .staging
                .insert(doc.shopify_product_id.as_i64(), doc.clone());
        });
        Ok(())
    }

    async fn delete_staging_product(&self, id: ShopifyProductId) -> Result<bool, StoreError> {
        Ok(self.write(|inner| inner.staging.remove(&id.as_i64()).is_some()))
    }

    async fn staging_product_for_variant(
        &self,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> Result<Option<StagingProduct>, StoreError> {
        Ok(self.read(|inner| {
            inner
                .staging
                .values()
                .find(|staging| {
                    staging.variants.iter().any(|v| {
                        variant_id.is_some_and(|id| v.shopify_variant_id == id)
                            || (inventory_item_id.is_some()
                                && v.inventory_item_id == inventory_item_id)
                    })
                })
                .cloned()
        }))
    }

    async fn products(
        &self,
        storefront: &StorefrontName,
    ) -> Result<Vec<StorefrontProduct>, StoreError> {
        let prefix = storefront.as_str().to_string();
        Ok(self.read(|inner| {
            inner
                .products
                .iter()
                .filter(|((s, _), _)| *s == prefix)
                .map(|(_, p)| p.clone())
                .collect()
        }))
    }

    async fn product(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<Option<StorefrontProduct>, StoreError> {
        let key = (storefront.as_str().to_string(), id.as_str().to_string());
        Ok(self.read(|inner| inner.products.get(&key).cloned()))
    }

    async fn put_product(
        &self,
        storefront: &StorefrontName,
        doc: &StorefrontProduct,
    ) -> Result<(), StoreError> {
        let key = (storefront.as_str().to_string(), doc.id.as_str().to_string());
        self.write(|inner| {
            inner.products.insert(key, doc.clone());
        });
        Ok(())
    }

    async fn delete_product(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<bool, StoreError> {
        let key = (storefront.as_str().to_string(), id.as_str().to_string());
        Ok(self.write(|inner| inner.products.remove(&key).is_some()))
    }

    async fn variants(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
    ) -> Result<Vec<Variant>, StoreError> {
        let s = storefront.as_str().to_string();
        let p = product_id.as_str().to_string();
        Ok(self.read(|inner| {
            let mut variants: Vec<Variant> = inner
                .variants
                .iter()
                .filter(|((vs, vp, _), _)| *vs == s && *vp == p)
                .map(|(_, v)| v.clone())
                .collect();
            variants.sort_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then_with(|| a.id.as_str().cmp(b.id.as_str()))
            });
            variants
        }))
    }

    async fn variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant_id: &DocumentId,
    ) -> Result<Option<Variant>, StoreError> {
        let key = (
            storefront.as_str().to_string(),
            product_id.as_str().to_string(),
            variant_id.as_str().to_string(),
        );
        Ok(self.read(|inner| inner.variants.get(&key).cloned()))
    }

    async fn put_variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        doc: &Variant,
    ) -> Result<(), StoreError> {
        let key = (
            storefront.as_str().to_string(),
            product_id.as_str().to_string(),
            doc.id.as_str().to_string(),
        );
        self.write(|inner| {
            inner.variants.insert(key, doc.clone());
        });
        Ok(())
    }

    async fn delete_variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant_id: &DocumentId,
    ) -> Result<bool, StoreError> {
        let key = (
            storefront.as_str().to_string(),
            product_id.as_str().to_string(),
            variant_id.as_str().to_string(),
        );
        Ok(self.write(|inner| inner.variants.remove(&key).is_some()))
    }

    async fn categories(
        &self,
        storefront: &StorefrontName,
    ) -> Result<Vec<Category>, StoreError> {
        let prefix = storefront.as_str().to_string();
        Ok(self.read(|inner| {
            inner
                .categories
                .iter()
                .filter(|((s, _), _)| *s == prefix)
                .map(|(_, c)| c.clone())
                .collect()
        }))
    }

    async fn category(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<Option<Category>, StoreError> {
        let key = (storefront.as_str().to_string(), id.as_str().to_string());
        Ok(self.read(|inner| inner.categories.get(&key).cloned()))
    }

    async fn put_category(
        &self,
        storefront: &StorefrontName,
        doc: &Category,
    ) -> Result<(), StoreError> {
        let key = (storefront.as_str().to_string(), doc.id.as_str().to_string());
        self.write(|inner| {
            inner.categories.insert(key, doc.clone());
        });
        Ok(())
    }

    async fn delete_category(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<bool, StoreError> {
        let key = (storefront.as_str().to_string(), id.as_str().to_string());
        Ok(self.write(|inner| inner.categories.remove(&key).is_some()))
    }

    async fn count_products_in_category(
        &self,
        storefront: &StorefrontName,
        category_id: &DocumentId,
    ) -> Result<u64, StoreError> {
        let s = storefront.as_str().to_string();
        Ok(self.read(|inner| {
            inner
                .products
                .iter()
                .filter(|((ps, _), p)| *ps == s && p.category_ids.contains(category_id))
                .count() as u64
        }))
    }

    async fn index_lookup(&self, key: &VariantKey) -> Result<Vec<VariantLocation>, StoreError> {
        Ok(self.read(|inner| {
            inner
                .index
                .get(key)
                .map(|locations| locations.iter().cloned().collect())
                .unwrap_or_default()
        }))
    }

    async fn index_put(
        &self,
        keys: &[VariantKey],
        location: &VariantLocation,
    ) -> Result<(), StoreError> {
        self.write(|inner| {
            for key in keys {
                inner
                    .index
                    .entry(*key)
                    .or_default()
                    .insert(location.clone());
            }
        });
        Ok(())
    }

    async fn index_remove(&self, location: &VariantLocation) -> Result<(), StoreError> {
        self.write(|inner| {
            inner.index.retain(|_, locations| {
                locations.remove(location);
                !locations.is_empty()
            });
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lunera_core::{InventoryPolicy, ProductStatus, ShopifyVariantId};

    fn storefront(name: &str) -> StorefrontName {
        StorefrontName::parse(name).expect("valid storefront name")
    }

    fn product(id: &str) -> StorefrontProduct {
        StorefrontProduct {
            id: DocumentId::new(id),
            name: id.to_string(),
            slug: id.to_string(),
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
            shopify_product_id: Some(ShopifyProductId::new(1)),
        }
    }

    fn variant(id: &str, position: i64) -> Variant {
        Variant {
            id: DocumentId::new(id),
            title: id.to_string(),
            size: None,
            color: None,
            kind: None,
            sku: None,
            stock: 0,
            price: None,
            default_photo: None,
            images: Vec::new(),
            image_url: None,
            image: None,
            shopify_variant_id: ShopifyVariantId::new(position),
            shopify_inventory_item_id: None,
            inventory_policy: InventoryPolicy::Deny,
            inventory_levels: Vec::new(),
            position,
        }
    }

    #[tokio::test]
    async fn test_product_round_trip_and_delete() {
        let store = MemoryCatalog::new();
        let lunera = storefront("LUNERA");

        store.put_product(&lunera, &product("p1")).await.expect("put");
        let fetched = store
            .product(&lunera, &DocumentId::new("p1"))
            .await
            .expect("get");
        assert!(fetched.is_some());

        assert!(store.delete_product(&lunera, &DocumentId::new("p1")).await.expect("delete"));
        assert!(!store.delete_product(&lunera, &DocumentId::new("p1")).await.expect("delete"));
    }

    #[tokio::test]
    async fn test_variants_returned_in_position_order() {
        let store = MemoryCatalog::new();
        let lunera = storefront("LUNERA");
        let pid = DocumentId::new("p1");

        store.put_variant(&lunera, &pid, &variant("b", 2)).await.expect("put");
        store.put_variant(&lunera, &pid, &variant("a", 3)).await.expect("put");
        store.put_variant(&lunera, &pid, &variant("c", 1)).await.expect("put");

        let ordered: Vec<String> = store
            .variants(&lunera, &pid)
            .await
            .expect("list")
            .into_iter()
            .map(|v| v.id.as_str().to_string())
            .collect();
        assert_eq!(ordered, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_probe_skips_excluded_partitions() {
        let store = MemoryCatalog::new();
        store
            .put_product(&storefront("LUNERA"), &product("p1"))
            .await
            .expect("put");
        store
            .put_product(&storefront("orders"), &product("p2"))
            .await
            .expect("put");

        let probed = store.probe_storefronts(&["orders"]).await.expect("probe");
        assert_eq!(probed, vec![storefront("LUNERA")]);
    }

    #[tokio::test]
    async fn test_category_member_count_includes_inactive() {
        let store = MemoryCatalog::new();
        let lunera = storefront("LUNERA");
        let cat = DocumentId::new("scarves");

        let mut active = product("p1");
        active.category_ids = vec![cat.clone()];
        let mut inactive = product("p2");
        inactive.category_ids = vec![cat.clone()];
        inactive.active = false;

        store.put_product(&lunera, &active).await.expect("put");
        store.put_product(&lunera, &inactive).await.expect("put");

        let count = store
            .count_products_in_category(&lunera, &cat)
            .await
            .expect("count");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_index_remove_drops_all_keys_for_location() {
        let store = MemoryCatalog::new();
        let location = VariantLocation {
            storefront: storefront("LUNERA"),
            product_id: DocumentId::new("p1"),
            variant_id: DocumentId::new("v1"),
        };
        let keys = [
            VariantKey::Variant(ShopifyVariantId::new(100)),
            VariantKey::InventoryItem(lunera_core::InventoryItemId::new(200)),
        ];

        store.index_put(&keys, &location).await.expect("put");
        assert_eq!(store.index_lookup(&keys[0]).await.expect("lookup").len(), 1);

        store.index_remove(&location).await.expect("remove");
        assert!(store.index_lookup(&keys[0]).await.expect("lookup").is_empty());
        assert!(store.index_lookup(&keys[1]).await.expect("lookup").is_empty());
    }

    #[tokio::test]
    async fn test_staging_product_round_trip() {
        let store = MemoryCatalog::new();
        let doc = StagingProduct {
            shopify_product_id: ShopifyProductId::new(42),
            title: "Silk Scarf".to_string(),
            handle: "silk-scarf".to_string(),
            status: ProductStatus::Active,
            variants: Vec::new(),
            markets: vec!["US".to_string()],
            published_to_online_store: true,
            suggested_category: None,
            processed_storefronts: Vec::new(),
            auto_process: false,
            updated_at: Utc::now(),
        };

        store.put_staging_product(&doc).await.expect("put");
        let fetched = store
            .staging_product(ShopifyProductId::new(42))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.handle, "silk-scarf");

        assert!(store
            .delete_staging_product(ShopifyProductId::new(42))
            .await
            .expect("delete"));
    }
}
