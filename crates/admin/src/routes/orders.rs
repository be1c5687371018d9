//! Order route handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::{AppError, set_sentry_user};
use crate::middleware::RequireAdminRole;
use crate::services::SyncStatus;
use crate::state::AppState;
use crate::sync::SyncStats;

/// Body of a successful sync response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOrdersResponse {
    pub success: bool,
    pub message: String,
    pub status: SyncStatus,
    pub stats: SyncStats,
}

/// Run a full order sync and report its counts.
///
/// POST /api/orders/sync
pub async fn sync_orders(
    State(state): State<AppState>,
    RequireAdminRole(admin): RequireAdminRole,
) -> Result<Json<SyncOrdersResponse>, AppError> {
    set_sentry_user(admin.id, Some(admin.email.as_str()));

    let summary = state.order_sync().trigger(&admin).await?;

    Ok(Json(SyncOrdersResponse {
        success: true,
        message: summary.message,
        status: summary.status,
        stats: summary.stats,
    }))
}
