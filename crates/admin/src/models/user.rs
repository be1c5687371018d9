//! Shop customers known to the back office.

use chrono::{DateTime, Utc};

use packhouse_core::{Email, UserId};

/// A customer account (`shop.user`).
///
/// Customers are created lazily the first time one of their orders is
/// synchronized and are never deleted by the sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Normalized (lowercase) email, unique across users.
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    /// Shopify customer id, when the account came from an order.
    pub external_customer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub external_customer_id: Option<i64>,
}
