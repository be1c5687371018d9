//! Authorization extractors for admin API routes.
//!
//! The login flow stores a [`CurrentAdmin`] in the session. These extractors
//! read it back; they never authenticate anyone themselves.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentAdmin, session::keys};

/// Extractor that requires a logged-in admin allowed to manage the store.
///
/// Rejects with 403 and a JSON `{ "error": ... }` body both when no admin is
/// logged in and when the admin's role is read-only.
///
/// # Example
///
/// ```rust,ignore
/// async fn sync_orders(RequireAdminRole(admin): RequireAdminRole) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminRole(pub CurrentAdmin);

/// Error returned when the store-management role is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuthRejection {
    /// No admin in the session (or no session at all).
    NotLoggedIn,
    /// Logged in, but the role is read-only.
    InsufficientRole,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::NotLoggedIn => "Unauthorized",
            Self::InsufficientRole => "Admin access required",
        };
        AppError::Forbidden(message.to_string()).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAdminRole
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::NotLoggedIn)?;

        let admin: CurrentAdmin = session
            .get(keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::NotLoggedIn)?;

        if !admin.role.can_manage_store() {
            return Err(AdminAuthRejection::InsufficientRole);
        }

        Ok(Self(admin))
    }
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_ADMIN, admin).await
}
