//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_ACCESS_TOKEN` - Admin API access token (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling (0.0-1.0)
//!
//! ## Optional (order sync tuning)
//! - `ORDER_SYNC_PAGE_SIZE` - Orders per feed page (default: 250, max: 250)
//! - `ORDER_SYNC_CHUNK_SIZE` - Records reconciled per chunk (default: 50)
//! - `ORDER_SYNC_BATCH_DELAY_MS` - Pause between pages (default: 1000)
//! - `ORDER_SYNC_RETRY_DELAY_MS` - First backoff after a failed fetch (default: 2000)
//! - `ORDER_SYNC_RETRY_MAX_DELAY_MS` - Backoff ceiling (default: 60000)
//! - `ORDER_SYNC_MAX_FETCH_ATTEMPTS` - Attempts per page before pausing (default: 5)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::sync::SyncSettings;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SHOPIFY_API_VERSION: &str = "2026-01";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Shopify Admin API configuration
    pub shopify: ShopifyAdminConfig,
    /// Order sync pacing and retry policy
    pub sync: SyncSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Admin API configuration.
///
/// Injected into the order feed client; the client never reads the
/// environment itself. Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ShopifyAdminConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - full store access)
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopifyAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAdminConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl ShopifyAdminConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_SHOPIFY_API_VERSION),
            access_token: get_validated_secret("SHOPIFY_ADMIN_ACCESS_TOKEN")?,
        })
    }

    /// Base URL of the versioned REST Admin API for this store.
    #[must_use]
    pub fn rest_base_url(&self) -> String {
        format!("https://{}/admin/api/{}", self.store, self.api_version)
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("ADMIN_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("ADMIN_PORT", "3001")?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;

        let shopify = ShopifyAdminConfig::from_env()?;
        let sync = sync_settings_from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            shopify,
            sync,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the Shopify configuration.
    #[must_use]
    pub const fn shopify(&self) -> &ShopifyAdminConfig {
        &self.shopify
    }
}

/// Load order sync settings, falling back to [`SyncSettings::default`].
fn sync_settings_from_env() -> Result<SyncSettings, ConfigError> {
    let defaults = SyncSettings::default();

    let page_size = match get_optional_env("ORDER_SYNC_PAGE_SIZE") {
        Some(raw) => parse_value::<u16>("ORDER_SYNC_PAGE_SIZE", &raw)?,
        None => defaults.page_size,
    };
    let chunk_size = match get_optional_env("ORDER_SYNC_CHUNK_SIZE") {
        Some(raw) => parse_value::<usize>("ORDER_SYNC_CHUNK_SIZE", &raw)?,
        None => defaults.chunk_size,
    };
    if chunk_size == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "ORDER_SYNC_CHUNK_SIZE".to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    let max_fetch_attempts = match get_optional_env("ORDER_SYNC_MAX_FETCH_ATTEMPTS") {
        Some(raw) => parse_value::<u32>("ORDER_SYNC_MAX_FETCH_ATTEMPTS", &raw)?,
        None => defaults.max_fetch_attempts,
    };
    if max_fetch_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "ORDER_SYNC_MAX_FETCH_ATTEMPTS".to_string(),
            "must be at least 1".to_string(),
        ));
    }

    Ok(SyncSettings {
        page_size: SyncSettings::clamp_page_size(page_size),
        chunk_size,
        batch_delay: get_millis_or("ORDER_SYNC_BATCH_DELAY_MS", defaults.batch_delay)?,
        retry_base_delay: get_millis_or("ORDER_SYNC_RETRY_DELAY_MS", defaults.retry_base_delay)?,
        retry_max_delay: get_millis_or(
            "ORDER_SYNC_RETRY_MAX_DELAY_MS",
            defaults.retry_max_delay,
        )?,
        max_fetch_attempts,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw value, naming the variable in the error.
fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an environment variable, using `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

/// Read a millisecond duration, using `default` when unset.
fn get_millis_or(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        parse_value::<u64>(key, &raw).map(Duration::from_millis)
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real access tokens are random; low entropy means a hand-typed value
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued by Shopify."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Configuration used by unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_config() -> AdminConfig {
    AdminConfig {
        database_url: SecretString::from("postgres://localhost/packhouse_test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3001,
        base_url: "http://localhost:3001".to_string(),
        shopify: ShopifyAdminConfig {
            store: "test.myshopify.com".to_string(),
            api_version: DEFAULT_SHOPIFY_API_VERSION.to_string(),
            access_token: SecretString::from("shpat_9f8e7d6c5b4a39281706"),
        },
        sync: SyncSettings::immediate(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}
