//! Integration tests for Packhouse.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p packhouse-integration-tests
//! ```
//!
//! The tests drive the real sync job, reconciler and entry point against the
//! in-memory feed and store from `packhouse_admin::sync::testing`, so they
//! need neither a database nor Shopify credentials.
//!
//! # Test Categories
//!
//! - `order_sync` - Properties of a full sync run
//! - `sync_trigger` - The admin-facing entry point

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use rust_decimal::Decimal;

use packhouse_admin::models::CurrentAdmin;
use packhouse_admin::services::OrderSyncService;
use packhouse_admin::shopify::{ExternalOrder, OrderPage};
use packhouse_admin::sync::testing::{MemoryOrderStore, ScriptedFeed, page, sample_order};
use packhouse_admin::sync::{OrderSyncJob, SyncSettings};
use packhouse_core::{AdminRole, AdminUserId, Email, FinancialStatus, FulfillmentStatus};

pub use packhouse_admin::sync::testing;

/// A scripted feed and an in-memory store wired into one job.
pub struct Harness {
    pub feed: Arc<ScriptedFeed>,
    pub store: Arc<MemoryOrderStore>,
    pub job: OrderSyncJob,
}

impl Harness {
    /// Job over `feed` with no delays between pages or retries.
    #[must_use]
    pub fn new(feed: ScriptedFeed) -> Self {
        Self::with_store(feed, Arc::default(), SyncSettings::immediate())
    }

    /// Job over `feed` writing into an existing `store`.
    #[must_use]
    pub fn with_store(
        feed: ScriptedFeed,
        store: Arc<MemoryOrderStore>,
        settings: SyncSettings,
    ) -> Self {
        let feed = Arc::new(feed);
        let job = OrderSyncJob::new(feed.clone(), store.clone(), settings);
        Self { feed, store, job }
    }

    /// Job over a feed that serves `pages` once each.
    #[must_use]
    pub fn pages(pages: impl IntoIterator<Item = OrderPage>) -> Self {
        Self::new(ScriptedFeed::pages(pages))
    }
}

/// [`sample_order`] with the given payment and fulfillment states.
#[must_use]
pub fn order_with_status(
    id: i64,
    name: &str,
    financial: Option<FinancialStatus>,
    fulfillment: Option<FulfillmentStatus>,
) -> ExternalOrder {
    ExternalOrder {
        financial_status: financial,
        fulfillment_status: fulfillment,
        ..sample_order(id, name)
    }
}

/// [`sample_order`] placed by `email`.
#[must_use]
pub fn order_from(id: i64, name: &str, email: &str) -> ExternalOrder {
    let mut order = sample_order(id, name);
    if let Some(customer) = order.customer.as_mut() {
        customer.email = Some(email.to_string());
    }
    order
}

/// The three-order feed used across the scenario tests:
/// `#1001` paid/unfulfilled, `#1002` paid/fulfilled, `#1003` voided.
#[must_use]
pub fn three_order_page() -> OrderPage {
    let mut voided = order_with_status(3, "#1003", Some(FinancialStatus::Voided), None);
    voided.total_price = Decimal::new(4500, 2);

    page(
        vec![
            order_with_status(1, "#1001", Some(FinancialStatus::Paid), None),
            order_with_status(
                2,
                "#1002",
                Some(FinancialStatus::Paid),
                Some(FulfillmentStatus::Fulfilled),
            ),
            voided,
        ],
        None,
    )
}

/// A signed-in admin with `role`.
///
/// # Panics
///
/// Never; the email literal is valid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn admin(role: AdminRole) -> CurrentAdmin {
    CurrentAdmin {
        id: AdminUserId::new(1),
        email: Email::parse("ops@packhouse.shop").unwrap(),
        name: "Ops".to_string(),
        role,
    }
}

/// Entry point over `feed` and `store` with no delays.
#[must_use]
pub fn sync_service(feed: Arc<ScriptedFeed>, store: Arc<MemoryOrderStore>) -> OrderSyncService {
    OrderSyncService::new(feed, store, SyncSettings::immediate())
}
