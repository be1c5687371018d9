//! Session-related types for admin authentication.
//!
//! The login flow writes [`CurrentAdmin`] into the session; this crate only
//! reads it back to authorize requests.

use serde::{Deserialize, Serialize};

use packhouse_core::{AdminUserId, Email};

use super::admin_user::{AdminRole, AdminUser};

/// Session-stored admin identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's database ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
}

impl From<AdminUser> for CurrentAdmin {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
