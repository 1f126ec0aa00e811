//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::PgCatalog;
use crate::config::ReconcilerConfig;
use crate::engine::Reconciler;
use crate::shopify::AdminApiClient;

/// The engine wired to its production backends.
pub type ProductionReconciler = Reconciler<PgCatalog, AdminApiClient>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ReconcilerConfig,
    reconciler: ProductionReconciler,
}

impl AppState {
    /// Assemble application state.
    #[must_use]
    pub fn new(config: ReconcilerConfig, reconciler: ProductionReconciler) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, reconciler }),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.inner.config
    }

    /// The reconciliation engine.
    #[must_use]
    pub fn reconciler(&self) -> &ProductionReconciler {
        &self.inner.reconciler
    }
}
