//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod sync;

use secrecy::SecretString;

/// Connection string for the Packhouse database.
///
/// Prefers `ADMIN_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
