//! Unified error handling for the reconciler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::StoreError;
use crate::engine::EngineError;
use crate::shopify::ShopifyError;

/// Application-level error type for the reconciler service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A reconciliation run aborted.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Store(_) | Self::Engine(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Reconciler request error"
            );
        }

        let status = match &self {
            Self::Store(_) | Self::Engine(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Engine(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Shopify(_) => "External service error".to_string(),
            Self::BadRequest(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("missing topic header".to_string());
        assert_eq!(err.to_string(), "Bad request: missing topic header");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::BadRequest("nope".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Shopify(ShopifyError::RateLimited)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_errors_are_not_exposed() {
        let response = AppError::Internal("database password leaked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
