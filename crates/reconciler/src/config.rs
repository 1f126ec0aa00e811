//! Reconciler configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RECONCILER_DATABASE_URL` - `PostgreSQL` connection string
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_TOKEN` - Shopify Admin API access token (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `RECONCILER_HOST` - Bind address (default: 127.0.0.1)
//! - `RECONCILER_PORT` - Listen port (default: 3002)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `DEFAULT_STOREFRONT` - Storefront always present in the directory
//!   (default: LUNERA)
//! - `MARKETS` - Comma-separated market codes (default: US); empty accepts
//!   whatever Shopify reports
//! - `LOW_STOCK_DISPLAY_THRESHOLD` - Products with less total stock are
//!   marked non-displayable; unset disables the rule
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use lunera_core::StorefrontName;

const DEFAULT_API_VERSION: &str = "2026-01";
const DEFAULT_STOREFRONT: &str = "LUNERA";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shopify Admin API configuration.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Store domain (e.g., your-store.myshopify.com).
    pub store: String,
    /// Admin API access token.
    pub admin_token: SecretString,
    /// Admin API version.
    pub api_version: String,
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            admin_token: get_required_secret("SHOPIFY_ADMIN_TOKEN")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
        })
    }
}

/// Reconciler application configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin API configuration
    pub shopify: ShopifyConfig,
    /// Storefront always included in the directory
    pub default_storefront: StorefrontName,
    /// Market codes this deployment sells into
    pub markets: Vec<String>,
    /// Minimum total stock before a product is marked displayable
    pub low_stock_display_threshold: Option<i64>,
    /// Sentry DSN (optional)
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (optional)
    pub sentry_environment: Option<String>,
}

impl ReconcilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RECONCILER_DATABASE_URL")?;
        let host = get_env_or_default("RECONCILER_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("RECONCILER_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("RECONCILER_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("RECONCILER_PORT".to_string(), e.to_string())
            })?;

        let shopify = ShopifyConfig::from_env()?;

        let default_storefront = StorefrontName::parse(get_env_or_default(
            "DEFAULT_STOREFRONT",
            DEFAULT_STOREFRONT,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("DEFAULT_STOREFRONT".to_string(), e.to_string()))?;

        let markets = parse_markets(&get_env_or_default("MARKETS", "US"));

        let low_stock_display_threshold = get_optional_env("LOW_STOCK_DISPLAY_THRESHOLD")
            .map(|raw| {
                raw.parse::<i64>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "LOW_STOCK_DISPLAY_THRESHOLD".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            default_storefront,
            markets,
            low_stock_display_threshold,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Socket address to bind the server to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Split a comma-separated market list, dropping empty entries.
fn parse_markets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_uppercase)
        .collect()
}

// =============================================================================
// Environment Helpers
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
