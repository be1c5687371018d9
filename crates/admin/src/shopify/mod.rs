//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **This module holds the high-privilege Shopify Admin API token.** The
//! token is injected through [`ShopifyAdminConfig`](crate::config::ShopifyAdminConfig)
//! and never read from the environment here.
//!
//! # Architecture
//!
//! - REST `orders.json` endpoint, paginated with cursor-based `page_info`
//!   tokens taken from the `Link` response header
//! - One HTTP request per call; retrying is left to the caller
//! - Rate limit usage is read from `X-Shopify-Shop-Api-Call-Limit`
//!
//! # Example
//!
//! ```rust,ignore
//! use packhouse_admin::shopify::{AdminClient, PageRequest};
//!
//! let client = AdminClient::new(&config.shopify)?;
//! let page = client.fetch_order_page(&PageRequest::first(250)).await?;
//! ```

mod client;
pub mod types;

pub use client::AdminClient;
pub use types::*;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured store does not form a valid URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("Shopify API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        message: String,
    },
}

impl AdminShopifyError {
    /// Minimum wait requested by the server, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(seconds) => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }
}
