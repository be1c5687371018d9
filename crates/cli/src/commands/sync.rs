//! Manual order sync.
//!
//! Runs the same service as `POST /api/orders/sync`, authorized as an
//! existing admin user instead of a browser session.
//!
//! # Usage
//!
//! ```bash
//! pkh sync orders --admin-email admin@example.com
//! ```
//!
//! Reads the full admin server configuration (database, Shopify credentials,
//! `ORDER_SYNC_*` tuning) from the environment.

use packhouse_admin::config::{AdminConfig, ConfigError};
use packhouse_admin::db::{self, AdminUserRepository, RepositoryError};
use packhouse_admin::error::AppError;
use packhouse_admin::models::CurrentAdmin;
use packhouse_admin::services::{SyncStatus, SyncSummary};
use packhouse_admin::shopify::AdminShopifyError;
use packhouse_admin::state::AppState;
use packhouse_core::Email;
use thiserror::Error;

/// Errors that can stop a manual sync.
#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Shopify client error: {0}")]
    Shopify(#[from] AdminShopifyError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No admin user with email: {0}")]
    UnknownAdmin(String),

    #[error(transparent)]
    Sync(#[from] AppError),
}

/// Sync all Shopify orders as the admin identified by `admin_email`.
pub async fn orders(admin_email: &str) -> Result<SyncSummary, SyncCommandError> {
    let email = Email::parse(admin_email)
        .map_err(|e| SyncCommandError::InvalidEmail(format!("{admin_email}: {e}")))?;

    let config = AdminConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let admin: CurrentAdmin = AdminUserRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| SyncCommandError::UnknownAdmin(email.to_string()))?
        .into();

    let state = AppState::new(config, pool)?;

    tracing::info!("Syncing orders from {} as {}", state.config().shopify().store, admin.email);
    let summary = state.order_sync().trigger(&admin).await?;

    match summary.status {
        SyncStatus::Completed => tracing::info!("{}", summary.message),
        SyncStatus::Paused => {
            tracing::warn!("{}", summary.message);
            if let Some(cursor) = &summary.resume_cursor {
                tracing::warn!("Feed stopped at {cursor}; run the sync again to continue");
            }
        }
    }

    Ok(summary)
}
