//! Database operations for the back office `PostgreSQL`.
//!
//! ## Schemas
//!
//! - `shop.user` - Customers, created lazily by the order sync
//! - `shop.order` / `shop.order_item` - Orders mirrored from Shopify
//! - `admin.admin_user` - Back-office operators
//! - `admin.session` - Session storage (owned by `tower-sessions`)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p packhouse-cli -- migrate
//! ```

pub mod admin_users;
pub mod orders;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use orders::OrderRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether the database itself could not be reached.
    ///
    /// Pool exhaustion, a closed pool and socket failures affect every
    /// subsequent query, unlike errors tied to one row.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(RepositoryError::Database(sqlx::Error::PoolClosed).is_unavailable());
        assert!(!RepositoryError::Database(sqlx::Error::RowNotFound).is_unavailable());
        assert!(!RepositoryError::NotFound.is_unavailable());
        assert!(!RepositoryError::Conflict("email already exists".into()).is_unavailable());
    }

    #[test]
    fn test_conflict_on_unique_passes_other_errors_through() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "email");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
