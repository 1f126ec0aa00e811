//! Postgres-backed catalog store.
//!
//! One JSONB row per document. Row-level upserts and deletes give the
//! per-document atomicity the engine relies on; nothing here opens a
//! multi-statement transaction.
//!
//! # Tables
//!
//! - `storefronts` - registry, one row per storefront
//! - `staging_products` - keyed by Shopify product id
//! - `storefront_products` - keyed by (storefront, product id)
//! - `storefront_variants` - keyed by (storefront, product id, variant id),
//!   with `position` denormalized for ordered listing
//! - `storefront_categories` - keyed by (storefront, category id)
//! - `variant_index` - secondary lookup index rows

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use lunera_core::{
    DocumentId, InventoryItemId, ShopifyProductId, ShopifyVariantId, StorefrontName,
};

use super::{
    Category, CatalogStore, StagingProduct, StoreError, StorefrontProduct, StorefrontRecord,
    Variant, VariantKey, VariantLocation,
};

/// Postgres implementation of [`CatalogStore`].
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (for health checks and the repair CLI).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode<T: serde::de::DeserializeOwned>(doc: JsonValue) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

fn encode<T: serde::Serialize>(doc: &T) -> Result<JsonValue, StoreError> {
    Ok(serde_json::to_value(doc)?)
}

const fn key_parts(key: &VariantKey) -> (&'static str, i64) {
    match key {
        VariantKey::Variant(id) => ("variant", id.as_i64()),
        VariantKey::InventoryItem(id) => ("inventory_item", id.as_i64()),
    }
}

impl CatalogStore for PgCatalog {
    async fn registered_storefronts(&self) -> Result<Vec<StorefrontRecord>, StoreError> {
        let rows = sqlx::query_scalar::<_, JsonValue>(
            "SELECT doc FROM storefronts ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode).collect()
    }

    async fn put_storefront_record(&self, record: &StorefrontRecord) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO storefronts (name, doc)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET doc = EXCLUDED.doc
            ",
        )
        .bind(record.name.as_str())
        .bind(encode(record)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn probe_storefronts(
        &self,
        excluded: &[&str],
    ) -> Result<Vec<StorefrontName>, StoreError> {
        let excluded: Vec<String> = excluded.iter().map(ToString::to_string).collect();
        let names = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT storefront FROM storefront_products
            WHERE storefront <> ALL($1)
            ORDER BY storefront
            ",
        )
        .bind(&excluded)
        .fetch_all(&self.pool)
        .await?;

        Ok(names
            .into_iter()
            .filter_map(|name| StorefrontName::parse(name).ok())
            .collect())
    }

    async fn staging_product(
        &self,
        id: ShopifyProductId,
    ) -> Result<Option<StagingProduct>, StoreError> {
        let doc = sqlx::query_scalar::<_, JsonValue>(
            "SELECT doc FROM staging_products WHERE shopify_product_id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    async fn put_staging_product(&self, doc: &StagingProduct) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO staging_products (shopify_product_id, doc, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (shopify_product_id)
            DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            ",
        )
        .bind(doc.shopify_product_id.as_i64())
        .bind(encode(doc)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_staging_product(&self, id: ShopifyProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM staging_products WHERE shopify_product_id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn staging_product_for_variant(
        &self,
        variant_id: Option<ShopifyVariantId>,
        inventory_item_id: Option<InventoryItemId>,
    ) -> Result<Option<StagingProduct>, StoreError> {
        let by_variant = variant_id
            .map(|id| serde_json::json!([{ "shopify_variant_id": id.as_i64() }]));
        let by_item = inventory_item_id
            .map(|id| serde_json::json!([{ "inventory_item_id": id.as_i64() }]));

        for matcher in [by_variant, by_item].into_iter().flatten() {
            let doc = sqlx::query_scalar::<_, JsonValue>(
                "SELECT doc FROM staging_products WHERE doc->'variants' @> $1 LIMIT 1",
            )
            .bind(matcher)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(doc) = doc {
                return Ok(Some(decode(doc)?));
            }
        }
        Ok(None)
    }

    async fn products(
        &self,
        storefront: &StorefrontName,
    ) -> Result<Vec<StorefrontProduct>, StoreError> {
        let rows = sqlx::query_scalar::<_, JsonValue>(
            "SELECT doc FROM storefront_products WHERE storefront = $1 ORDER BY product_id",
        )
        .bind(storefront.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode).collect()
    }

    async fn product(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<Option<StorefrontProduct>, StoreError> {
        let doc = sqlx::query_scalar::<_, JsonValue>(
            "SELECT doc FROM storefront_products WHERE storefront = $1 AND product_id = $2",
        )
        .bind(storefront.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    async fn put_product(
        &self,
        storefront: &StorefrontName,
        doc: &StorefrontProduct,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO storefront_products (storefront, product_id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (storefront, product_id) DO UPDATE SET doc = EXCLUDED.doc
            ",
        )
        .bind(storefront.as_str())
        .bind(doc.id.as_str())
        .bind(encode(doc)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_product(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM storefront_products WHERE storefront = $1 AND product_id = $2",
        )
        .bind(storefront.as_str())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn variants(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
    ) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query_scalar::<_, JsonValue>(
            r"
            SELECT doc FROM storefront_variants
            WHERE storefront = $1 AND product_id = $2
            ORDER BY position, variant_id
            ",
        )
        .bind(storefront.as_str())
        .bind(product_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode).collect()
    }

    async fn variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant_id: &DocumentId,
    ) -> Result<Option<Variant>, StoreError> {
        let doc = sqlx::query_scalar::<_, JsonValue>(
            r"
            SELECT doc FROM storefront_variants
            WHERE storefront = $1 AND product_id = $2 AND variant_id = $3
            ",
        )
        .bind(storefront.as_str())
        .bind(product_id.as_str())
        .bind(variant_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    async fn put_variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        doc: &Variant,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO storefront_variants (storefront, product_id, variant_id, position, doc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (storefront, product_id, variant_id)
            DO UPDATE SET position = EXCLUDED.position, doc = EXCLUDED.doc
            ",
        )
        .bind(storefront.as_str())
        .bind(product_id.as_str())
        .bind(doc.id.as_str())
        .bind(doc.position)
        .bind(encode(doc)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_variant(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        variant_id: &DocumentId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront_variants
            WHERE storefront = $1 AND product_id = $2 AND variant_id = $3
            ",
        )
        .bind(storefront.as_str())
        .bind(product_id.as_str())
        .bind(variant_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn categories(
        &self,
        storefront: &StorefrontName,
    ) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_scalar::<_, JsonValue>(
            "SELECT doc FROM storefront_categories WHERE storefront = $1 ORDER BY category_id",
        )
        .bind(storefront.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode).collect()
    }

    async fn category(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<Option<Category>, StoreError> {
        let doc = sqlx::query_scalar::<_, JsonValue>(
            "SELECT doc FROM storefront_categories WHERE storefront = $1 AND category_id = $2",
        )
        .bind(storefront.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    async fn put_category(
        &self,
        storefront: &StorefrontName,
        doc: &Category,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO storefront_categories (storefront, category_id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (storefront, category_id) DO UPDATE SET doc = EXCLUDED.doc
            ",
        )
        .bind(storefront.as_str())
        .bind(doc.id.as_str())
        .bind(encode(doc)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_category(
        &self,
        storefront: &StorefrontName,
        id: &DocumentId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM storefront_categories WHERE storefront = $1 AND category_id = $2",
        )
        .bind(storefront.as_str())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_products_in_category(
        &self,
        storefront: &StorefrontName,
        category_id: &DocumentId,
    ) -> Result<u64, StoreError> {
        // Membership lives on the product documents, so this is a scan of the
        // partition, not a field read on the category.
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM storefront_products
            WHERE storefront = $1 AND doc->'category_ids' @> $2
            ",
        )
        .bind(storefront.as_str())
        .bind(serde_json::json!([category_id.as_str()]))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.unsigned_abs())
    }

    async fn index_lookup(&self, key: &VariantKey) -> Result<Vec<VariantLocation>, StoreError> {
        let (kind, value) = key_parts(key);
        let rows = sqlx::query(
            r"
            SELECT storefront, product_id, variant_id FROM variant_index
            WHERE key_kind = $1 AND key_value = $2
            ",
        )
        .bind(kind)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        let mut locations = Vec::with_capacity(rows.len());
        for row in rows {
            let storefront: String = row.try_get("storefront")?;
            let Ok(storefront) = StorefrontName::parse(storefront) else {
                continue;
            };
            locations.push(VariantLocation {
                storefront,
                product_id: DocumentId::new(row.try_get::<String, _>("product_id")?),
                variant_id: DocumentId::new(row.try_get::<String, _>("variant_id")?),
            });
        }
        Ok(locations)
    }

    async fn index_put(
        &self,
        keys: &[VariantKey],
        location: &VariantLocation,
    ) -> Result<(), StoreError> {
        for key in keys {
            let (kind, value) = key_parts(key);
            sqlx::query(
                r"
                INSERT INTO variant_index (key_kind, key_value, storefront, product_id, variant_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(kind)
            .bind(value)
            .bind(location.storefront.as_str())
            .bind(location.product_id.as_str())
            .bind(location.variant_id.as_str())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn index_remove(&self, location: &VariantLocation) -> Result<(), StoreError> {
        sqlx::query(
            r"
            DELETE FROM variant_index
            WHERE storefront = $1 AND product_id = $2 AND variant_id = $3
            ",
        )
        .bind(location.storefront.as_str())
        .bind(location.product_id.as_str())
        .bind(location.variant_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
