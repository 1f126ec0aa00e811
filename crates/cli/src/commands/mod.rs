//! CLI command implementations.

pub mod migrate;
pub mod repair;
pub mod storefront;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use lunera_reconciler::catalog;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error: {0}")]
    Store(#[from] lunera_reconciler::catalog::StoreError),

    #[error("Invalid storefront name: {0}")]
    InvalidStorefront(#[from] lunera_core::StorefrontNameError),
}

/// Connect to the reconciler database using the same environment variables
/// as the service itself.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("RECONCILER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("RECONCILER_DATABASE_URL"))?;

    Ok(catalog::create_pool(&SecretString::from(database_url)).await?)
}
