//! The batch job driving a sync run.
//!
//! ```text
//! Fetching ──ok──▶ Processing ──has_more──▶ (batch delay) Fetching
//!    │  ▲                    └──otherwise──▶ Done
//!    └──┘ fetch failed: backoff, same cursor (at most max_fetch_attempts)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use super::{
    OrderFeed, OrderReconciler, OrderStore, ReconcileError, ReconcileOutcome, SyncCursor,
    SyncError, SyncOutcome, SyncReport, SyncStats,
};
use crate::shopify::{ExternalOrder, MAX_PAGE_SIZE, OrderPage};

/// Pacing and retry policy for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Orders requested per page, `1..=250`.
    pub page_size: u16,
    /// Orders reconciled between progress reports.
    pub chunk_size: usize,
    /// Pause between pages.
    pub batch_delay: Duration,
    /// Backoff after the first failed fetch; doubles per attempt.
    pub retry_base_delay: Duration,
    /// Backoff ceiling, unless the server asks for longer.
    pub retry_max_delay: Duration,
    /// Attempts per page before the run pauses.
    pub max_fetch_attempts: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            chunk_size: 50,
            batch_delay: Duration::from_secs(1),
            retry_base_delay: Duration::from_secs(2),
            retry_max_delay: Duration::from_secs(60),
            max_fetch_attempts: 5,
        }
    }
}

impl SyncSettings {
    /// Default settings without any delays.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            batch_delay: Duration::ZERO,
            retry_base_delay: Duration::ZERO,
            retry_max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn clamp_page_size(page_size: u16) -> u16 {
        page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Wait before retrying after failed attempt number `attempt` (1-based).
    ///
    /// `retry_base_delay * 2^(attempt-1)` capped at `retry_max_delay`, but
    /// never shorter than the server's `Retry-After`.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .retry_base_delay
            .saturating_mul(1 << exponent)
            .min(self.retry_max_delay);
        retry_after.map_or(backoff, |wait| backoff.max(wait))
    }
}

/// Pages through the feed and reconciles every order it returns.
pub struct OrderSyncJob {
    feed: Arc<dyn OrderFeed>,
    reconciler: OrderReconciler,
    settings: SyncSettings,
}

impl OrderSyncJob {
    #[must_use]
    pub fn new(
        feed: Arc<dyn OrderFeed>,
        store: Arc<dyn OrderStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            feed,
            reconciler: OrderReconciler::new(store),
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run from the start of the feed to the end.
    ///
    /// Returns a report even when the run pauses on a feed outage; records
    /// written before the pause stay written.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the database becomes unreachable.
    #[instrument(skip(self), fields(page_size = self.settings.page_size))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let mut stats = SyncStats::default();
        let mut cursor = SyncCursor::start();

        info!("Order sync started");

        loop {
            let page = match self.fetch(&cursor, &mut stats).await {
                Ok(page) => page,
                Err(paused) => {
                    error!(stats = ?stats, "Order sync paused, feed unavailable");
                    return Ok(SyncReport {
                        stats,
                        outcome: paused,
                    });
                }
            };
            stats.pages_fetched += 1;

            if page.orders.is_empty() {
                break;
            }

            self.process(&page.orders, &mut stats).await?;

            let Some(next) = next_cursor(&page) else {
                break;
            };
            cursor = next;

            if !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        info!(
            total_synced = stats.total_synced,
            total_created = stats.total_created,
            total_updated = stats.total_updated,
            total_failed = stats.total_failed,
            pages = stats.pages_fetched,
            "Order sync completed"
        );

        Ok(SyncReport {
            stats,
            outcome: SyncOutcome::Completed,
        })
    }

    /// Fetch the page at `cursor`, retrying with backoff.
    ///
    /// Gives up with [`SyncOutcome::Paused`] after `max_fetch_attempts`.
    async fn fetch(
        &self,
        cursor: &SyncCursor,
        stats: &mut SyncStats,
    ) -> Result<OrderPage, SyncOutcome> {
        let request = cursor.to_request(self.settings.page_size);
        let max_attempts = self.settings.max_fetch_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.feed.fetch_page(&request).await {
                Ok(page) => return Ok(page),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                warn!(%cursor, attempt, error = %err, "Giving up on order page");
                return Err(SyncOutcome::Paused {
                    cursor: cursor.clone(),
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = self.settings.retry_delay(attempt, err.retry_after());
            warn!(
                %cursor,
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "Order page fetch failed, retrying"
            );
            stats.fetch_retries += 1;
            tokio::time::sleep(delay).await;
        }
    }

    /// Reconcile a page chunk by chunk, one record at a time.
    async fn process(
        &self,
        orders: &[ExternalOrder],
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        for chunk in orders.chunks(self.settings.chunk_size.max(1)) {
            for order in chunk {
                match self.reconciler.reconcile(order).await {
                    Ok(reconciled) => {
                        stats.total_synced += 1;
                        match reconciled.outcome {
                            ReconcileOutcome::Created => stats.total_created += 1,
                            ReconcileOutcome::Updated => stats.total_updated += 1,
                        }
                    }
                    Err(err) if err.is_fatal() => {
                        error!(order = %order.name, error = %err, "Order store unavailable");
                        if let ReconcileError::Store(err) = err {
                            return Err(SyncError::Store(err));
                        }
                    }
                    Err(err) => {
                        stats.total_failed += 1;
                        warn!(
                            order = %order.name,
                            external_id = %order.id,
                            error = %err,
                            "Failed to sync order, skipping"
                        );
                    }
                }
            }

            debug!(
                chunk = chunk.len(),
                total_synced = stats.total_synced,
                total_failed = stats.total_failed,
                "Order chunk processed"
            );
        }

        Ok(())
    }
}

/// Where to continue after `page`, or `None` at the end of the feed.
///
/// Prefers the continuation token; a feed that reports more pages without
/// one is continued by id.
fn next_cursor(page: &OrderPage) -> Option<SyncCursor> {
    if !page.has_more {
        return None;
    }
    match &page.next_page_token {
        Some(token) => Some(SyncCursor::PageToken(token.clone())),
        None => page
            .orders
            .iter()
            .map(|o| o.id)
            .max()
            .map(SyncCursor::SinceId),
    }
}
