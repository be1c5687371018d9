//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use packhouse_core::AdminUserId;

use crate::sync::SyncError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// An order sync run was aborted.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request collides with work already in progress.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// JSON error body: `{ "error": ..., "details": ... }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Sync(err) => ErrorBody {
                error: "Failed to sync orders".to_string(),
                details: Some(err.to_string()),
            },
            Self::Forbidden(msg) | Self::Conflict(msg) => ErrorBody {
                error: msg.clone(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Sync(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: AdminUserId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
