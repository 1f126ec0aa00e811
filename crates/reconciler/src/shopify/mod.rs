//! Shopify Admin API gateway.
//!
//! The engine talks to Shopify through the [`ShopifyGateway`] trait so tests
//! can stub the upstream. The production implementation,
//! [`AdminApiClient`], issues the one REST call and two GraphQL documents
//! reconciliation needs with `reqwest` directly.
//!
//! Upstream calls are enrichment only: every caller degrades gracefully
//! when they fail, so the client keeps a short timeout and no retry loop
//! (retry is delegated to Shopify re-delivering the webhook).

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

use lunera_core::{InventoryItemId, LocationId, ShopifyProductId};

use crate::catalog::InventoryLevel;
use crate::config::ShopifyConfig;

pub use types::MarketPublication;

/// Name of the sales channel whose publication state gates storefront API
/// visibility.
pub const ONLINE_STORE_CHANNEL: &str = "Online Store";

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from a mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

/// Upstream queries the reconciliation engine makes.
///
/// All three operations are idempotent on the Shopify side; callers treat
/// failures as degraded data, never as reasons to abort a reconciliation.
pub trait ShopifyGateway: Send + Sync {
    /// Full set of per-location inventory levels for one inventory item.
    fn inventory_levels(
        &self,
        inventory_item_id: InventoryItemId,
    ) -> impl Future<Output = Result<Vec<InventoryLevel>, ShopifyError>> + Send;

    /// Per-market publication flags plus Online Store channel status, in a
    /// single request.
    fn market_publication(
        &self,
        product_id: ShopifyProductId,
    ) -> impl Future<Output = Result<MarketPublication, ShopifyError>> + Send;

    /// Publish a product to the Online Store channel. Safe to call when
    /// already published.
    fn publish_to_online_store(
        &self,
        product_id: ShopifyProductId,
    ) -> impl Future<Output = Result<(), ShopifyError>> + Send;
}

// =============================================================================
// Admin API Client
// =============================================================================

/// Shopify Admin API client backed by `reqwest`.
#[derive(Clone)]
pub struct AdminApiClient {
    http: reqwest::Client,
    base_url: String,
    /// Publication id of the Online Store channel, resolved lazily and
    /// cached for the process lifetime.
    online_store_publication: Arc<RwLock<Option<String>>>,
}

impl AdminApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut token = HeaderValue::from_str(config.admin_token.expose_secret())
            .map_err(|_| ShopifyError::Unauthorized("invalid admin token".to_string()))?;
        token.set_sensitive(true);
        headers.insert(ACCESS_TOKEN_HEADER, token);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: format!(
                "https://{}/admin/api/{}",
                config.store, config.api_version
            ),
            online_store_publication: Arc::new(RwLock::new(None)),
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ShopifyError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ShopifyError::Unauthorized(
                "admin token rejected".to_string(),
            )),
            StatusCode::TOO_MANY_REQUESTS => Err(ShopifyError::RateLimited),
            StatusCode::NOT_FOUND => Err(ShopifyError::NotFound(response.url().to_string())),
            _ => Ok(response.error_for_status()?),
        }
    }

    /// Execute a GraphQL document and deserialize its `data` field.
    #[instrument(skip_all)]
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: JsonValue,
    ) -> Result<T, ShopifyError> {
        let response = self
            .http
            .post(format!("{}/graphql.json", self.base_url))
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: GraphQLResponse<T> = response.json().await?;
        if let Some(errors) = body.errors
            && !errors.is_empty()
        {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ShopifyError::GraphQL(messages.join("; ")));
        }
        body.data
            .ok_or_else(|| ShopifyError::GraphQL("response carried no data".to_string()))
    }

    /// Resolve (and cache) the publication id of the Online Store channel.
    async fn online_store_publication_id(&self) -> Result<String, ShopifyError> {
        if let Some(id) = self.online_store_publication.read().await.clone() {
            return Ok(id);
        }

        let data: PublicationsData = self
            .execute(PUBLICATIONS_QUERY, serde_json::json!({}))
            .await?;
        let id = data
            .publications
            .nodes
            .into_iter()
            .find(|p| p.name == ONLINE_STORE_CHANNEL)
            .map(|p| p.id)
            .ok_or_else(|| ShopifyError::NotFound(format!("{ONLINE_STORE_CHANNEL} channel")))?;

        *self.online_store_publication.write().await = Some(id.clone());
        Ok(id)
    }
}

impl ShopifyGateway for AdminApiClient {
    #[instrument(skip(self), fields(inventory_item_id = %inventory_item_id))]
    async fn inventory_levels(
        &self,
        inventory_item_id: InventoryItemId,
    ) -> Result<Vec<InventoryLevel>, ShopifyError> {
        let response = self
            .http
            .get(format!("{}/inventory_levels.json", self.base_url))
            .query(&[
                ("inventory_item_ids", inventory_item_id.to_string()),
                ("limit", "250".to_string()),
            ])
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: InventoryLevelsResponse = response.json().await?;
        Ok(body
            .inventory_levels
            .into_iter()
            .map(|level| InventoryLevel {
                location_id: level.location_id,
                location_name: None,
                available: level.available.unwrap_or(0),
                updated_at: level.updated_at,
            })
            .collect())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn market_publication(
        &self,
        product_id: ShopifyProductId,
    ) -> Result<MarketPublication, ShopifyError> {
        let data: ProductPublicationsData = self
            .execute(
                PRODUCT_PUBLICATIONS_QUERY,
                serde_json::json!({ "id": product_gid(product_id) }),
            )
            .await?;
        let product = data
            .product
            .ok_or_else(|| ShopifyError::NotFound(format!("product {product_id}")))?;

        let mut markets = Vec::new();
        let mut published_to_online_store = false;
        for node in product.resource_publications_v2.nodes {
            if !node.is_published {
                continue;
            }
            if node.publication.name == ONLINE_STORE_CHANNEL {
                published_to_online_store = true;
            } else {
                markets.push(node.publication.name.to_uppercase());
            }
        }

        Ok(MarketPublication {
            markets,
            published_to_online_store,
        })
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn publish_to_online_store(
        &self,
        product_id: ShopifyProductId,
    ) -> Result<(), ShopifyError> {
        let publication_id = self.online_store_publication_id().await?;
        let data: PublishablePublishData = self
            .execute(
                PUBLISHABLE_PUBLISH_MUTATION,
                serde_json::json!({
                    "id": product_gid(product_id),
                    "input": [{ "publicationId": publication_id }],
                }),
            )
            .await?;

        let user_errors = data
            .publishable_publish
            .map(|p| p.user_errors)
            .unwrap_or_default();
        if let Some(first) = user_errors.into_iter().next() {
            return Err(ShopifyError::UserError(first.message));
        }
        Ok(())
    }
}

fn product_gid(id: ShopifyProductId) -> String {
    format!("gid://shopify/Product/{id}")
}

// =============================================================================
// GraphQL Documents
// =============================================================================

const PRODUCT_PUBLICATIONS_QUERY: &str = r"
query ProductPublications($id: ID!) {
  product(id: $id) {
    resourcePublicationsV2(first: 50) {
      nodes {
        isPublished
        publication { id name }
      }
    }
  }
}
";

const PUBLICATIONS_QUERY: &str = r"
query Publications {
  publications(first: 50) {
    nodes { id name }
  }
}
";

const PUBLISHABLE_PUBLISH_MUTATION: &str = r"
mutation PublishablePublish($id: ID!, $input: [PublicationInput!]!) {
  publishablePublish(id: $id, input: $input) {
    userErrors { field message }
  }
}
";

// =============================================================================
// Response Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorBody>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct InventoryLevelsResponse {
    inventory_levels: Vec<RestInventoryLevel>,
}

#[derive(Debug, Deserialize)]
struct RestInventoryLevel {
    location_id: LocationId,
    available: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ProductPublicationsData {
    product: Option<ProductPublications>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPublications {
    resource_publications_v2: NodeList<ResourcePublication>,
}

#[derive(Debug, Deserialize)]
struct NodeList<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourcePublication {
    is_published: bool,
    publication: PublicationRef,
}

#[derive(Debug, Deserialize)]
struct PublicationRef {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PublicationsData {
    publications: NodeList<PublicationRef>,
}

#[derive(Debug, Deserialize)]
struct PublishablePublishData {
    #[serde(rename = "publishablePublish")]
    publishable_publish: Option<MutationUserErrors>,
}

#[derive(Debug, Deserialize)]
struct MutationUserErrors {
    #[serde(rename = "userErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct UserError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_errors_are_surfaced() {
        let body: GraphQLResponse<PublicationsData> = serde_json::from_value(serde_json::json!({
            "errors": [{ "message": "Throttled" }]
        }))
        .expect("deserialize");
        assert!(body.data.is_none());
        assert_eq!(body.errors.expect("errors")[0].message, "Throttled");
    }

    #[test]
    fn test_publication_nodes_deserialize() {
        let data: ProductPublicationsData = serde_json::from_value(serde_json::json!({
            "product": {
                "resourcePublicationsV2": {
                    "nodes": [
                        { "isPublished": true, "publication": { "id": "gid://shopify/Publication/1", "name": "Online Store" } },
                        { "isPublished": false, "publication": { "id": "gid://shopify/Publication/2", "name": "EU" } }
                    ]
                }
            }
        }))
        .expect("deserialize");
        let product = data.product.expect("product");
        assert_eq!(product.resource_publications_v2.nodes.len(), 2);
        assert!(product.resource_publications_v2.nodes[0].is_published);
    }

    #[test]
    fn test_rest_inventory_levels_deserialize() {
        let body: InventoryLevelsResponse = serde_json::from_value(serde_json::json!({
            "inventory_levels": [
                { "inventory_item_id": 1, "location_id": 10, "available": 4, "updated_at": null },
                { "inventory_item_id": 1, "location_id": 11, "available": null }
            ]
        }))
        .expect("deserialize");
        assert_eq!(body.inventory_levels.len(), 2);
        assert_eq!(body.inventory_levels[1].available, None);
    }

    #[test]
    fn test_product_gid_format() {
        assert_eq!(
            product_gid(ShopifyProductId::new(42)),
            "gid://shopify/Product/42"
        );
    }
}
