//! Properties of a full order sync run.
//!
//! Each test drives `OrderSyncJob` over a scripted feed into the in-memory
//! store; no database or Shopify credentials are needed.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use packhouse_admin::shopify::{AdminShopifyError, OrderPage};
use packhouse_admin::sync::testing::{MemoryOrderStore, ScriptedFeed, page, sample_order};
use packhouse_admin::sync::{SyncCursor, SyncError, SyncOutcome, SyncSettings};
use packhouse_core::{ExternalOrderId, FinancialStatus, FulfillmentStatus, OrderStatus};
use packhouse_integration_tests::{Harness, order_from, order_with_status, three_order_page};

fn outage() -> AdminShopifyError {
    AdminShopifyError::Api {
        status: 502,
        message: "bad gateway".to_string(),
    }
}

// ============================================================================
// Example scenario
// ============================================================================

#[tokio::test]
async fn test_three_order_scenario() {
    let harness = Harness::pages([three_order_page()]);

    let report = harness.job.run().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.stats.total_synced, 3);
    assert_eq!(report.stats.total_created, 3);
    assert_eq!(report.stats.total_updated, 0);
    assert_eq!(report.stats.total_failed, 0);

    let status_of = |name: &str| harness.store.order_by_number(name).unwrap().status;
    assert_eq!(status_of("#1001"), OrderStatus::Confirmed);
    assert_eq!(status_of("#1002"), OrderStatus::Completed);
    assert_eq!(status_of("#1003"), OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_created_order_carries_items_and_buyer() {
    let harness = Harness::pages([page(vec![sample_order(42, "#1042")], None)]);
    harness.job.run().await.unwrap();

    let order = harness.store.order_by_number("#1042").unwrap();
    assert_eq!(order.external_id, Some(ExternalOrderId::new(42)));
    assert_eq!(order.payment_method.as_deref(), Some("shopify_payments"));

    let buyer = harness.store.user_by_email("buyer42@boxes.example").unwrap();
    assert_eq!(order.user_id, Some(buyer.id));
    assert_eq!(buyer.name, "Pat Buyer");

    let items = harness.store.items_of(order.id);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Mailer Box 12x9x4");
    assert_eq!(items[0].quantity, 1);
}

// ============================================================================
// Idempotence
// ============================================================================

#[tokio::test]
async fn test_second_run_updates_instead_of_duplicating() {
    let store = Arc::new(MemoryOrderStore::default());

    let first = Harness::with_store(
        ScriptedFeed::pages([three_order_page()]),
        store.clone(),
        SyncSettings::immediate(),
    );
    first.job.run().await.unwrap();

    let second = Harness::with_store(
        ScriptedFeed::pages([three_order_page()]),
        store.clone(),
        SyncSettings::immediate(),
    );
    let report = second.job.run().await.unwrap();

    assert_eq!(report.stats.total_synced, 3);
    assert_eq!(report.stats.total_created, 0);
    assert_eq!(report.stats.total_updated, 3);
    assert_eq!(store.order_count(), 3);
    assert_eq!(store.user_count(), 3);
}

#[tokio::test]
async fn test_rerun_picks_up_upstream_status_change() {
    let store = Arc::new(MemoryOrderStore::default());

    Harness::with_store(
        ScriptedFeed::pages([page(vec![sample_order(7, "#1007")], None)]),
        store.clone(),
        SyncSettings::immediate(),
    )
    .job
    .run()
    .await
    .unwrap();

    let shipped = order_with_status(
        7,
        "#1007",
        Some(FinancialStatus::Paid),
        Some(FulfillmentStatus::Fulfilled),
    );
    Harness::with_store(
        ScriptedFeed::pages([page(vec![shipped], None)]),
        store.clone(),
        SyncSettings::immediate(),
    )
    .job
    .run()
    .await
    .unwrap();

    let order = store.order_by_number("#1007").unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(store.items_of(order.id).len(), 1);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_one_bad_record_does_not_stop_the_run() {
    let mut orders: Vec<_> = (1..=5)
        .map(|id| sample_order(id, &format!("#{}", 1000 + id)))
        .collect();
    orders[2].line_items[0].quantity = -1;

    let harness = Harness::pages([page(orders, None)]);
    let report = harness.job.run().await.unwrap();

    assert_eq!(report.stats.total_synced, 4);
    assert_eq!(report.stats.total_failed, 1);
    assert!(harness.store.order_by_number("#1003").is_none());
    assert!(harness.store.order_by_number("#1005").is_some());
}

#[tokio::test]
async fn test_rejected_insert_is_counted_and_skipped() {
    let store = Arc::new(MemoryOrderStore::default());
    store.fail_create_for(2);

    let harness = Harness::with_store(
        ScriptedFeed::pages([three_order_page()]),
        store,
        SyncSettings::immediate(),
    );
    let report = harness.job.run().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.stats.total_synced, 2);
    assert_eq!(report.stats.total_failed, 1);
    assert_eq!(harness.store.order_count(), 2);
}

#[tokio::test]
async fn test_store_outage_aborts_the_run() {
    let store = Arc::new(MemoryOrderStore::default());
    store.set_unavailable(true);

    let harness = Harness::with_store(
        ScriptedFeed::pages([three_order_page()]),
        store,
        SyncSettings::immediate(),
    );
    let err = harness.job.run().await.unwrap_err();

    assert!(matches!(err, SyncError::Store(_)));
}

// ============================================================================
// Customers
// ============================================================================

#[tokio::test]
async fn test_repeat_buyer_is_created_once() {
    let harness = Harness::pages([page(
        vec![
            order_from(1, "#1001", "Repeat@Boxes.Example"),
            order_from(2, "#1002", " repeat@boxes.example"),
        ],
        None,
    )]);

    harness.job.run().await.unwrap();

    assert_eq!(harness.store.user_count(), 1);
    let first = harness.store.order_by_number("#1001").unwrap();
    let second = harness.store.order_by_number("#1002").unwrap();
    assert!(first.user_id.is_some());
    assert_eq!(first.user_id, second.user_id);
}

#[tokio::test]
async fn test_guest_checkout_has_no_buyer() {
    let mut guest = sample_order(9, "#1009");
    guest.customer = None;
    guest.email = None;

    let harness = Harness::pages([page(vec![guest], None)]);
    let report = harness.job.run().await.unwrap();

    assert_eq!(report.stats.total_created, 1);
    assert_eq!(harness.store.user_count(), 0);
    assert_eq!(harness.store.order_by_number("#1009").unwrap().user_id, None);
}

#[tokio::test]
async fn test_buyer_created_concurrently_is_reused() {
    let store = Arc::new(MemoryOrderStore::default());
    store.lose_user_race("buyer1@boxes.example");

    let harness = Harness::with_store(
        ScriptedFeed::pages([page(vec![sample_order(1, "#1001")], None)]),
        store,
        SyncSettings::immediate(),
    );
    let report = harness.job.run().await.unwrap();

    assert_eq!(report.stats.total_created, 1);
    assert_eq!(harness.store.user_count(), 1);
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_last_page_ends_after_one_fetch() {
    let harness = Harness::pages([three_order_page()]);
    harness.job.run().await.unwrap();

    assert_eq!(harness.feed.fetch_count(), 1);
}

#[tokio::test]
async fn test_follows_continuation_tokens() {
    let harness = Harness::pages([
        page(vec![sample_order(1, "#1001")], Some("cursor-2")),
        page(vec![sample_order(2, "#1002")], Some("cursor-3")),
        page(vec![sample_order(3, "#1003")], None),
    ]);

    let report = harness.job.run().await.unwrap();

    assert_eq!(report.stats.pages_fetched, 3);
    assert_eq!(report.stats.total_created, 3);

    let requests = harness.feed.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].since_id, Some(ExternalOrderId::new(0)));
    assert_eq!(requests[1].page_info.as_deref(), Some("cursor-2"));
    assert_eq!(requests[2].page_info.as_deref(), Some("cursor-3"));
}

#[tokio::test]
async fn test_more_pages_without_token_continue_by_id() {
    let first = OrderPage {
        orders: vec![sample_order(10, "#1010"), sample_order(12, "#1012")],
        has_more: true,
        next_page_token: None,
        call_limit: None,
    };
    let harness = Harness::pages([first, page(vec![sample_order(15, "#1015")], None)]);

    harness.job.run().await.unwrap();

    let requests = harness.feed.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].since_id, Some(ExternalOrderId::new(12)));
    assert_eq!(requests[1].page_info, None);
}

#[tokio::test]
async fn test_empty_feed_completes_with_zero_stats() {
    let harness = Harness::new(ScriptedFeed::default());
    let report = harness.job.run().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.stats.total_synced, 0);
    assert_eq!(report.stats.pages_fetched, 1);
}

// ============================================================================
// Retry and pause
// ============================================================================

#[tokio::test]
async fn test_transient_fetch_failure_retries_same_page() {
    let harness = Harness::new(ScriptedFeed::new([
        Err(outage()),
        Ok(three_order_page()),
    ]));

    let report = harness.job.run().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.stats.fetch_retries, 1);
    assert_eq!(report.stats.total_created, 3);

    let requests = harness.feed.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
}

#[tokio::test]
async fn test_persistent_outage_pauses_with_resume_cursor() {
    let settings = SyncSettings {
        max_fetch_attempts: 3,
        ..SyncSettings::immediate()
    };
    let harness = Harness::with_store(
        ScriptedFeed::new([
            Ok(page(vec![sample_order(1, "#1001")], Some("cursor-2"))),
            Err(outage()),
            Err(outage()),
            Err(outage()),
            Ok(page(vec![sample_order(2, "#1002")], None)),
        ]),
        Arc::default(),
        settings,
    );

    let report = harness.job.run().await.unwrap();

    assert!(report.is_paused());
    match report.outcome {
        SyncOutcome::Paused {
            cursor,
            attempts,
            last_error,
        } => {
            assert_eq!(cursor, SyncCursor::PageToken("cursor-2".to_string()));
            assert_eq!(attempts, 3);
            assert!(last_error.contains("502"));
        }
        SyncOutcome::Completed => panic!("expected the run to pause"),
    }
    assert_eq!(report.stats.total_created, 1);
    assert_eq!(report.stats.fetch_retries, 2);
    assert_eq!(harness.feed.fetch_count(), 4);
    assert!(harness.store.order_by_number("#1001").is_some());
}

// ============================================================================
// Status mapping
// ============================================================================

#[tokio::test]
async fn test_every_status_combination_syncs() {
    let financial = [
        None,
        Some(FinancialStatus::Pending),
        Some(FinancialStatus::Authorized),
        Some(FinancialStatus::PartiallyPaid),
        Some(FinancialStatus::Paid),
        Some(FinancialStatus::PartiallyRefunded),
        Some(FinancialStatus::Refunded),
        Some(FinancialStatus::Voided),
        Some(FinancialStatus::Expired),
        Some(FinancialStatus::Unknown),
    ];
    let fulfillment = [
        None,
        Some(FulfillmentStatus::Fulfilled),
        Some(FulfillmentStatus::Partial),
        Some(FulfillmentStatus::Restocked),
        Some(FulfillmentStatus::Unknown),
    ];

    let mut orders = Vec::new();
    let mut expected = Vec::new();
    for f in financial {
        for s in fulfillment {
            let id = i64::try_from(orders.len()).unwrap() + 1;
            let name = format!("#{}", 2000 + id);
            expected.push((name.clone(), OrderStatus::from_upstream(f, s)));
            orders.push(order_with_status(id, &name, f, s));
        }
    }

    let harness = Harness::pages([page(orders, None)]);
    let report = harness.job.run().await.unwrap();

    assert_eq!(report.stats.total_failed, 0);
    assert_eq!(report.stats.total_synced, 50);
    for (name, status) in expected {
        assert_eq!(harness.store.order_by_number(&name).unwrap().status, status);
    }
}
