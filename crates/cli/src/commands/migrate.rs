//! Database migration command.
//!
//! # Environment Variables
//!
//! - `RECONCILER_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! Migration files live in `crates/reconciler/migrations/`.

use super::{CommandError, connect};

/// Run reconciler database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running reconciler migrations...");
    sqlx::migrate!("../reconciler/migrations").run(&pool).await?;

    tracing::info!("Reconciler migrations complete");
    Ok(())
}
