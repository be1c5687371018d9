//! Entry point for order sync runs.
//!
//! Shared by the HTTP trigger and the CLI. Checks the caller's role, makes
//! sure only one run is active per process, and turns the job's report into
//! a summary for humans.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::models::CurrentAdmin;
use crate::sync::{
    OrderFeed, OrderStore, OrderSyncJob, SyncCursor, SyncError, SyncOutcome, SyncSettings,
    SyncStats,
};

/// How a run that returned a summary ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Completed,
    Paused,
}

/// Outcome of a triggered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub status: SyncStatus,
    pub message: String,
    pub stats: SyncStats,
    /// Where the feed stopped, for paused runs.
    pub resume_cursor: Option<SyncCursor>,
}

/// Runs order syncs on behalf of an admin.
pub struct OrderSyncService {
    job: OrderSyncJob,
    running: Mutex<()>,
}

impl OrderSyncService {
    #[must_use]
    pub fn new(
        feed: Arc<dyn OrderFeed>,
        store: Arc<dyn OrderStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            job: OrderSyncJob::new(feed, store, settings),
            running: Mutex::new(()),
        }
    }

    /// Run a full sync as `admin` and wait for it to finish.
    ///
    /// # Errors
    ///
    /// - `AppError::Forbidden` if the role may not manage the store; nothing
    ///   is fetched in that case
    /// - `AppError::Conflict` if a run is already in progress
    /// - `AppError::Sync` if the store became unavailable, or the feed could
    ///   not deliver even the first page
    #[instrument(skip(self, admin), fields(admin = %admin.email, role = %admin.role))]
    pub async fn trigger(&self, admin: &CurrentAdmin) -> Result<SyncSummary, AppError> {
        if !admin.role.can_manage_store() {
            warn!("Order sync refused for role");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        let Ok(_guard) = self.running.try_lock() else {
            return Err(AppError::Conflict(
                "An order sync is already running".to_string(),
            ));
        };

        info!("Order sync triggered");
        let report = self.job.run().await?;
        let stats = report.stats;

        match report.outcome {
            SyncOutcome::Completed => Ok(SyncSummary {
                status: SyncStatus::Completed,
                message: completed_message(&stats),
                stats,
                resume_cursor: None,
            }),
            SyncOutcome::Paused {
                attempts,
                last_error,
                ..
            } if stats.pages_fetched == 0 => Err(SyncError::FeedUnavailable {
                attempts,
                last_error,
            }
            .into()),
            SyncOutcome::Paused {
                cursor,
                last_error,
                ..
            } => Ok(SyncSummary {
                status: SyncStatus::Paused,
                message: format!(
                    "{} Paused before the end of the order feed: {last_error}",
                    completed_message(&stats)
                ),
                stats,
                resume_cursor: Some(cursor),
            }),
        }
    }
}

fn completed_message(stats: &SyncStats) -> String {
    let mut message = format!(
        "Synced {} orders ({} created, {} updated).",
        stats.total_synced, stats.total_created, stats.total_updated
    );
    if stats.total_failed > 0 {
        message.push_str(&format!(" {} orders failed.", stats.total_failed));
    }
    message
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use packhouse_core::{AdminRole, AdminUserId, Email};

    use super::*;
    use crate::shopify::AdminShopifyError;
    use crate::sync::testing::{MemoryOrderStore, ScriptedFeed, page, sample_order};

    fn admin(role: AdminRole) -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(1),
            email: Email::parse("ops@packhouse.shop").unwrap(),
            name: "Ops".to_string(),
            role,
        }
    }

    fn service(feed: &Arc<ScriptedFeed>) -> OrderSyncService {
        let settings = SyncSettings {
            max_fetch_attempts: 2,
            ..SyncSettings::immediate()
        };
        OrderSyncService::new(
            feed.clone(),
            Arc::new(MemoryOrderStore::default()),
            settings,
        )
    }

    #[tokio::test]
    async fn test_viewer_is_forbidden_before_any_fetch() {
        let feed = Arc::new(ScriptedFeed::default());
        let err = service(&feed)
            .trigger(&admin(AdminRole::Viewer))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(feed.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_run_returns_summary() {
        let feed = Arc::new(ScriptedFeed::pages([page(
            vec![sample_order(1, "#1001"), sample_order(2, "#1002")],
            None,
        )]));

        let summary = service(&feed)
            .trigger(&admin(AdminRole::Admin))
            .await
            .unwrap();

        assert_eq!(summary.status, SyncStatus::Completed);
        assert_eq!(summary.stats.total_created, 2);
        assert_eq!(summary.message, "Synced 2 orders (2 created, 0 updated).");
    }

    #[tokio::test]
    async fn test_concurrent_trigger_conflicts() {
        let feed = Arc::new(ScriptedFeed::default());
        let service = service(&feed);

        let _held = service.running.try_lock().unwrap();
        let err = service
            .trigger(&admin(AdminRole::SuperAdmin))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_an_error() {
        let feed = Arc::new(ScriptedFeed::new([
            Err(AdminShopifyError::Unauthorized("bad token".into())),
            Err(AdminShopifyError::Unauthorized("bad token".into())),
        ]));

        let err = service(&feed)
            .trigger(&admin(AdminRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Sync(SyncError::FeedUnavailable { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_pause_after_progress_is_reported() {
        let feed = Arc::new(ScriptedFeed::new([
            Ok(page(vec![sample_order(1, "#1001")], Some("p2"))),
            Err(AdminShopifyError::RateLimited(0)),
            Err(AdminShopifyError::RateLimited(0)),
        ]));

        let summary = service(&feed)
            .trigger(&admin(AdminRole::Admin))
            .await
            .unwrap();
        assert_eq!(summary.status, SyncStatus::Paused);
        assert_eq!(summary.stats.total_synced, 1);
        assert_eq!(
            summary.resume_cursor,
            Some(SyncCursor::PageToken("p2".into()))
        );
        assert!(summary.message.contains("Paused"));
    }
}
