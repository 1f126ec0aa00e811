//! Storefront registry management.

use chrono::Utc;

use lunera_core::StorefrontName;
use lunera_reconciler::catalog::{CatalogStore, PgCatalog, StorefrontRecord};

use super::{CommandError, connect};

/// Register a storefront, or update its registry entry.
///
/// # Errors
///
/// Returns an error if the name is invalid or the write fails.
pub async fn add(name: &str, display_name: &str, default: bool) -> Result<(), CommandError> {
    let store = PgCatalog::new(connect().await?);

    let record = StorefrontRecord {
        name: StorefrontName::parse(name)?,
        display_name: display_name.to_string(),
        is_default: default,
        created_at: Utc::now(),
    };
    store.put_storefront_record(&record).await?;

    tracing::info!(storefront = %record.name, default = default, "Storefront registered");
    Ok(())
}

/// List registered storefronts.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
pub async fn list() -> Result<(), CommandError> {
    let store = PgCatalog::new(connect().await?);

    let records = store.registered_storefronts().await?;
    if records.is_empty() {
        tracing::info!("No storefronts registered (directory will fall back to probing)");
        return Ok(());
    }

    for record in records {
        tracing::info!(
            storefront = %record.name,
            display_name = %record.display_name,
            default = record.is_default,
            registered_at = %record.created_at,
            "storefront"
        );
    }
    Ok(())
}
