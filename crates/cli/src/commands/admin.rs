//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! pkh admin create -e admin@example.com -n "Admin Name" -r super_admin
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use packhouse_admin::db::{self, AdminUserRepository, RepositoryError};
use packhouse_core::{AdminRole, AdminUserId, Email};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: ADMIN_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    /// Query error.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("Admin user already exists with email: {0}")]
    UserExists(String),
}

/// Create a new admin user and return its ID.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<AdminUserId, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(format!("{email}: {e}")))?;

    let database_url = super::database_url().ok_or(AdminError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating admin user: {} ({})", email, role);

    let user = match AdminUserRepository::new(&pool).create(&email, name, role).await {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AdminError::UserExists(email.into_inner()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}
