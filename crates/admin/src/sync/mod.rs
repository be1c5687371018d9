//! Shopify order synchronization.
//!
//! A sync run pages through the Shopify order feed and mirrors every order
//! into `shop.order`:
//!
//! ```text
//! OrderSyncJob ──fetch──▶ OrderFeed (AdminClient)
//!      │
//!      └──each order──▶ OrderReconciler ──▶ OrderStore (PgOrderStore)
//! ```
//!
//! Runs are idempotent: an order already mirrored is updated in place, never
//! duplicated. A record that cannot be reconciled is logged and skipped; a
//! page that cannot be fetched is retried with backoff and, past the attempt
//! ceiling, ends the run as [`SyncOutcome::Paused`].
//!
//! [`OrderFeed`] and [`OrderStore`] are the seams the job is tested through.

pub mod job;
pub mod reconcile;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use packhouse_core::{Email, ExternalOrderId, OrderId};

use crate::db::RepositoryError;
use crate::models::{NewOrder, NewUser, Order, OrderUpdate, User};
use crate::shopify::{AdminClient, AdminShopifyError, OrderPage, PageRequest};

pub use job::{OrderSyncJob, SyncSettings};
pub use reconcile::{OrderReconciler, ReconcileError, ReconcileOutcome, Reconciled};
pub use store::PgOrderStore;

/// Source of upstream order pages.
#[async_trait]
pub trait OrderFeed: Send + Sync {
    /// Fetch a single page. Implementations make one attempt and do not retry.
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrderPage, AdminShopifyError>;
}

#[async_trait]
impl OrderFeed for AdminClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrderPage, AdminShopifyError> {
        self.fetch_order_page(request).await
    }
}

/// Persistence used by the reconciler.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_order_by_external_id(
        &self,
        external_id: ExternalOrderId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Insert an order with its items atomically.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError>;

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Create a user. Fails with `RepositoryError::Conflict` if the email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError>;
}

/// Position in the order feed. Lives only for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCursor {
    /// Orders with an id greater than this one.
    SinceId(ExternalOrderId),
    /// Opaque continuation token from the previous page.
    PageToken(String),
}

impl SyncCursor {
    /// The beginning of the feed.
    #[must_use]
    pub const fn start() -> Self {
        Self::SinceId(ExternalOrderId::new(0))
    }

    /// Request for the page at this cursor.
    #[must_use]
    pub fn to_request(&self, page_size: u16) -> PageRequest {
        match self {
            Self::SinceId(id) => PageRequest {
                page_size,
                since_id: Some(*id),
                page_info: None,
            },
            Self::PageToken(token) => PageRequest {
                page_size,
                since_id: None,
                page_info: Some(token.clone()),
            },
        }
    }
}

impl Default for SyncCursor {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinceId(id) => write!(f, "since_id={id}"),
            Self::PageToken(token) => write!(f, "page_info={token}"),
        }
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Orders created or updated.
    pub total_synced: u64,
    pub total_created: u64,
    pub total_updated: u64,
    /// Orders skipped because they could not be reconciled.
    pub total_failed: u64,
    pub pages_fetched: u64,
    /// Failed fetch attempts that were retried.
    pub fetch_retries: u64,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The feed was read to the end.
    Completed,
    /// A page could not be fetched within the attempt ceiling.
    Paused {
        /// Where a later run would resume.
        cursor: SyncCursor,
        attempts: u32,
        last_error: String,
    },
}

/// Result of a run that was not aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub stats: SyncStats,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Paused { .. })
    }
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The database stopped answering. Every further record would fail too.
    #[error("order store unavailable: {0}")]
    Store(#[source] RepositoryError),

    /// Not a single page could be fetched.
    #[error("order feed unavailable after {attempts} attempts: {last_error}")]
    FeedUnavailable { attempts: u32, last_error: String },
}
