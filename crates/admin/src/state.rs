//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::OrderSyncService;
use crate::shopify::{AdminClient, AdminShopifyError};
use crate::sync::PgOrderStore;

/// Application state shared across all handlers.
///
/// Cheap to clone; all clones share the same inner state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    order_sync: OrderSyncService,
}

impl AppState {
    /// Wire the Shopify client and the `PostgreSQL` store into the sync service.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError` if the Shopify client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, AdminShopifyError> {
        let client = AdminClient::new(config.shopify())?;
        let order_sync = OrderSyncService::new(
            Arc::new(client),
            Arc::new(PgOrderStore::new(pool.clone())),
            config.sync.clone(),
        );
        Ok(Self::with_order_sync(config, pool, order_sync))
    }

    /// Build state around an already-wired sync service.
    #[must_use]
    pub fn with_order_sync(config: AdminConfig, pool: PgPool, order_sync: OrderSyncService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                order_sync,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn order_sync(&self) -> &OrderSyncService {
        &self.inner.order_sync
    }
}
