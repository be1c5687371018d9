//! The admin-facing sync entry point.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use packhouse_admin::error::AppError;
use packhouse_admin::services::SyncStatus;
use packhouse_admin::shopify::AdminShopifyError;
use packhouse_admin::sync::testing::{MemoryOrderStore, ScriptedFeed};
use packhouse_core::AdminRole;
use packhouse_integration_tests::{admin, sync_service, three_order_page};

#[tokio::test]
async fn test_admin_sync_reports_three_created() {
    let feed = Arc::new(ScriptedFeed::pages([three_order_page()]));
    let store = Arc::new(MemoryOrderStore::default());

    let summary = sync_service(feed, store.clone())
        .trigger(&admin(AdminRole::Admin))
        .await
        .unwrap();

    assert_eq!(summary.status, SyncStatus::Completed);
    assert_eq!(summary.message, "Synced 3 orders (3 created, 0 updated).");
    assert_eq!(summary.stats.total_created, 3);
    assert_eq!(summary.resume_cursor, None);
    assert_eq!(store.order_count(), 3);
}

#[tokio::test]
async fn test_viewer_cannot_sync() {
    let feed = Arc::new(ScriptedFeed::pages([three_order_page()]));
    let store = Arc::new(MemoryOrderStore::default());

    let err = sync_service(feed.clone(), store.clone())
        .trigger(&admin(AdminRole::Viewer))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(feed.fetch_count(), 0);
    assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn test_unreachable_feed_is_reported_as_failure() {
    let feed = Arc::new(ScriptedFeed::new((0..5).map(|_| {
        Err(AdminShopifyError::Unauthorized(
            "Invalid API key or access token".to_string(),
        ))
    })));

    let err = sync_service(feed, Arc::default())
        .trigger(&admin(AdminRole::SuperAdmin))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Sync(_)));
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn test_repeated_triggers_are_idempotent() {
    let store = Arc::new(MemoryOrderStore::default());

    for expected_created in [3, 0] {
        let feed = Arc::new(ScriptedFeed::pages([three_order_page()]));
        let summary = sync_service(feed, store.clone())
            .trigger(&admin(AdminRole::Admin))
            .await
            .unwrap();
        assert_eq!(summary.stats.total_created, expected_created);
    }

    assert_eq!(store.order_count(), 3);
}

#[tokio::test]
async fn test_paused_run_is_a_summary_not_an_error() {
    let feed = Arc::new(ScriptedFeed::new(
        std::iter::once(Ok(packhouse_admin::sync::testing::page(
            three_order_page().orders,
            Some("cursor-2"),
        )))
        .chain((0..5).map(|_| {
            Err(AdminShopifyError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        })),
    ));

    let summary = sync_service(feed, Arc::default())
        .trigger(&admin(AdminRole::Admin))
        .await
        .unwrap();

    assert_eq!(summary.status, SyncStatus::Paused);
    assert_eq!(summary.stats.total_created, 3);
    assert!(summary.message.starts_with("Synced 3 orders"));
    assert!(summary.resume_cursor.is_some());
}
