//! The catalog reconciliation engine.
//!
//! Invoked synchronously from webhook handlers. Given a stream of
//! inventory/product change events it (a) locates every denormalized copy of
//! the affected variant/product across all storefronts, (b) recomputes
//! derived aggregate state, and (c) cascades deletes of products and
//! categories whose last child disappeared.
//!
//! # Consistency model
//!
//! Each invocation is one single-threaded unit of work; steps run strictly
//! sequentially (locate, recompute, write). Writes are atomic per document
//! only - a crash mid-run can leave some storefront copies stale, and the
//! next webhook delivery repairs them because every recomputation derives
//! from current remaining state, never from a delta. There is no locking,
//! no debouncing, and no dedup of repeated deliveries.
//!
//! # Failure policy
//!
//! Failures inside per-storefront and per-category loops are logged and
//! skipped so one partition's failure never blocks the rest. Upstream
//! enrichment failures degrade to best-available data. Only store access
//! for the triggering entity itself propagates as [`EngineError`].

pub mod aggregates;
pub mod cascade;
pub mod directory;
pub mod inventory;
pub mod locator;
pub mod markets;
pub mod products;

use thiserror::Error;

use lunera_core::{DocumentId, StorefrontName};

use crate::catalog::{CatalogStore, StoreError, Variant};
use crate::shopify::ShopifyGateway;

pub use aggregates::{DefaultVariantOutcome, ProductAggregates};
pub use cascade::{CategoryCleanup, ProductDeleteSummary, VariantRemoval};
pub use inventory::UpdateSummary;
pub use locator::VariantCopy;
pub use products::ProductUpsertSummary;

/// Errors that abort an entire reconciliation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The document store failed on the triggering entity itself.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Tunables for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Storefront that is always part of the directory, and the fail-soft
    /// answer when directory listing breaks.
    pub default_storefront: StorefrontName,
    /// Market codes this deployment sells into. Empty means "accept whatever
    /// Shopify reports".
    pub markets: Vec<String>,
    /// Products with total stock below this are marked non-displayable.
    /// Display-only; cascades never consult it.
    pub low_stock_display_threshold: Option<i64>,
}

/// The reconciliation engine.
///
/// Generic over the document store and the Shopify gateway so tests can run
/// against [`crate::catalog::MemoryCatalog`] and a stub upstream.
pub struct Reconciler<S, G> {
    store: S,
    gateway: G,
    options: ReconcilerOptions,
}

impl<S: CatalogStore, G: ShopifyGateway> Reconciler<S, G> {
    /// Assemble an engine.
    pub const fn new(store: S, gateway: G, options: ReconcilerOptions) -> Self {
        Self {
            store,
            gateway,
            options,
        }
    }

    /// The underlying document store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The upstream gateway.
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Engine tunables.
    pub const fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Re-derive and persist one product's aggregates from its remaining
    /// variants. `removed` is the variant a delete just took away, when the
    /// trigger was a removal. A missing product is a no-op, not an error.
    pub(crate) async fn refresh_product_aggregates(
        &self,
        storefront: &StorefrontName,
        product_id: &DocumentId,
        removed: Option<&Variant>,
    ) -> Result<(), StoreError> {
        let Some(mut product) = self.store.product(storefront, product_id).await? else {
            return Ok(());
        };
        let variants = self.store.variants(storefront, product_id).await?;

        let recomputed = aggregates::recompute(&variants, product.default_variant.as_ref(), removed);
        aggregates::apply(&mut product, &recomputed);
        product.displayable = self
            .options
            .low_stock_display_threshold
            .is_none_or(|threshold| product.total_stock >= threshold);

        self.store.put_product(storefront, &product).await
    }
}
