//! Paging types for the order feed.

use std::fmt;
use std::str::FromStr;

use packhouse_core::ExternalOrderId;

use super::ExternalOrder;

/// Largest `limit` the REST Admin API accepts.
pub const MAX_PAGE_SIZE: u16 = 250;

/// One request against the order feed.
///
/// A `page_info` token continues a previous listing and takes precedence
/// over `since_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: u16,
    pub since_id: Option<ExternalOrderId>,
    pub page_info: Option<String>,
}

impl PageRequest {
    /// The first page of the feed, starting after id 0.
    #[must_use]
    pub const fn first(page_size: u16) -> Self {
        Self {
            page_size,
            since_id: Some(ExternalOrderId::new(0)),
            page_info: None,
        }
    }

    /// `page_size` clamped to `1..=250`.
    #[must_use]
    pub fn limit(&self) -> u16 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of the order feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<ExternalOrder>,
    pub has_more: bool,
    /// `page_info` token for the next page when `has_more` is set.
    pub next_page_token: Option<String>,
    pub call_limit: Option<CallLimit>,
}

/// Leaky-bucket usage from `X-Shopify-Shop-Api-Call-Limit`, e.g. `32/40`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimit {
    pub used: u32,
    pub max: u32,
}

impl CallLimit {
    /// Requests left before the bucket is full.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }

    /// Whether fewer than a tenth of the bucket is left.
    #[must_use]
    pub const fn is_nearly_exhausted(&self) -> bool {
        self.remaining().saturating_mul(10) < self.max
    }
}

impl FromStr for CallLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (used, max) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("invalid call limit: {s}"))?;
        let used = used.parse().map_err(|_| format!("invalid call limit: {s}"))?;
        let max = max.parse().map_err(|_| format!("invalid call limit: {s}"))?;
        Ok(Self { used, max })
    }
}

impl fmt::Display for CallLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.used, self.max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        let mut request = PageRequest::first(0);
        assert_eq!(request.limit(), 1);
        request.page_size = 1000;
        assert_eq!(request.limit(), 250);
        request.page_size = 50;
        assert_eq!(request.limit(), 50);
    }

    #[test]
    fn test_call_limit_parse() {
        let limit: CallLimit = "32/40".parse().unwrap();
        assert_eq!(limit, CallLimit { used: 32, max: 40 });
        assert_eq!(limit.remaining(), 8);
        assert!(!limit.is_nearly_exhausted());

        let limit: CallLimit = "39/40".parse().unwrap();
        assert!(limit.is_nearly_exhausted());

        assert!("40".parse::<CallLimit>().is_err());
        assert!("a/b".parse::<CallLimit>().is_err());
    }

    #[test]
    fn test_call_limit_with_huge_bucket() {
        let empty: CallLimit = "0/4294967295".parse().unwrap();
        assert!(!empty.is_nearly_exhausted());

        let full: CallLimit = "4294967290/4294967295".parse().unwrap();
        assert!(full.is_nearly_exhausted());
    }
}
