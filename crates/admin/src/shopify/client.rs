//! REST client for the Shopify order feed.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, LINK};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ShopifyAdminConfig;

use super::AdminShopifyError;
use super::types::{CallLimit, ExternalOrder, OrderPage, PageRequest};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const CALL_LIMIT_HEADER: &str = "X-Shopify-Shop-Api-Call-Limit";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Shopify asks REST clients to wait 2 seconds when it omits `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Order fields requested from the feed.
const ORDER_FIELDS: &[&str] = &[
    "id",
    "name",
    "order_number",
    "currency",
    "total_price",
    "financial_status",
    "fulfillment_status",
    "email",
    "phone",
    "customer",
    "shipping_address",
    "payment_gateway_names",
    "line_items",
    "created_at",
    "updated_at",
];

/// Shopify Admin API REST client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    store: String,
    orders_url: Url,
    access_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    orders: Vec<ExternalOrder>,
}

impl AdminClient {
    /// Create a client for the store named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::InvalidUrl` if the store domain or API
    /// version do not form a valid URL.
    pub fn new(config: &ShopifyAdminConfig) -> Result<Self, AdminShopifyError> {
        Self::with_base_url(config, &config.rest_base_url())
    }

    /// Create a client against an explicit API base URL, such as
    /// `http://127.0.0.1:9000/admin/api/2026-01`.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::InvalidUrl` if `base_url` is not a valid URL.
    pub fn with_base_url(
        config: &ShopifyAdminConfig,
        base_url: &str,
    ) -> Result<Self, AdminShopifyError> {
        let orders_url = Url::parse(&format!("{}/orders.json", base_url.trim_end_matches('/')))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                store: config.store.clone(),
                orders_url,
                access_token: config.access_token.clone(),
            }),
        })
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// Fetch one page of orders.
    ///
    /// Makes exactly one request. The next page, if any, is announced by a
    /// `rel="next"` entry in the `Link` header.
    ///
    /// # Errors
    ///
    /// - `RateLimited` on 429, carrying `Retry-After` in seconds
    /// - `Unauthorized` on 401 or 403
    /// - `Api` on any other non-success status
    /// - `Parse` if the body is not an orders listing
    /// - `Http` on transport failures
    #[instrument(skip(self, request), fields(store = %self.inner.store, limit = request.limit()))]
    pub async fn fetch_order_page(
        &self,
        request: &PageRequest,
    ) -> Result<OrderPage, AdminShopifyError> {
        let response = self
            .inner
            .client
            .get(self.page_url(request))
            .header(ACCESS_TOKEN_HEADER, self.inner.access_token.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_status(response).await?;

        let call_limit = parse_call_limit(response.headers());
        if let Some(limit) = call_limit {
            if limit.is_nearly_exhausted() {
                warn!(call_limit = %limit, "Shopify API bucket nearly exhausted");
            } else {
                debug!(call_limit = %limit, "Shopify API usage");
            }
        }

        let next_page_token = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_info);

        let body = response.text().await?;
        let OrdersResponse { orders } = serde_json::from_str(&body)?;

        debug!(
            count = orders.len(),
            has_more = next_page_token.is_some(),
            "Fetched order page"
        );

        Ok(OrderPage {
            orders,
            has_more: next_page_token.is_some(),
            next_page_token,
            call_limit,
        })
    }

    fn page_url(&self, request: &PageRequest) -> Url {
        let mut url = self.inner.orders_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &request.limit().to_string());

            query.append_pair("fields", &ORDER_FIELDS.join(","));

            // Shopify rejects filters alongside page_info
            if let Some(page_info) = &request.page_info {
                query.append_pair("page_info", page_info);
            } else {
                if let Some(since_id) = request.since_id {
                    query.append_pair("since_id", &since_id.to_string());
                }
                query
                    .append_pair("status", "any")
                    .append_pair("financial_status", "any")
                    .append_pair("fulfillment_status", "any");
            }
        }
        url
    }

    /// Pass successful responses through; map everything else to an error.
    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AdminShopifyError> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == 401 || status == 403 {
            return Err(AdminShopifyError::Unauthorized(message));
        }

        Err(AdminShopifyError::Api { status, message })
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("store", &self.inner.store)
            .field("orders_url", &self.inner.orders_url.as_str())
            .finish_non_exhaustive()
    }
}

fn parse_call_limit(headers: &HeaderMap) -> Option<CallLimit> {
    headers
        .get(CALL_LIMIT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

/// Shopify sends `Retry-After` as fractional seconds (`2.0`).
fn parse_retry_after(value: &str) -> Option<u64> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // checked non-negative and finite
    Some(seconds.ceil() as u64)
}

/// Extract the `page_info` of the `rel="next"` entry of a `Link` header.
///
/// ```text
/// <https://shop/admin/api/2026-01/orders.json?limit=2&page_info=abc>; rel="previous", <...page_info=def>; rel="next"
/// ```
fn next_page_info(header: &str) -> Option<String> {
    let mut rest = header;

    while let Some(start) = rest.find('<') {
        let after_open = rest.get(start + 1..)?;
        let end = after_open.find('>')?;
        let target = after_open.get(..end)?;
        let tail = after_open.get(end + 1..)?;
        let params_end = tail.find('<').unwrap_or(tail.len());
        let params = tail.get(..params_end)?;

        if params.split(';').any(is_rel_next) {
            let url = Url::parse(target.trim()).ok()?;
            return url
                .query_pairs()
                .find(|(key, _)| key == "page_info")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty());
        }

        rest = tail.get(params_end..)?;
    }

    None
}

fn is_rel_next(param: &str) -> bool {
    param
        .trim()
        .trim_end_matches(',')
        .strip_prefix("rel=")
        .is_some_and(|rel| {
            rel.trim_matches('"')
                .split_whitespace()
                .any(|r| r.eq_ignore_ascii_case("next"))
        })
}
