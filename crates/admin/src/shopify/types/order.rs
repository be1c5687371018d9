//! Order resource as returned by `GET /admin/api/{version}/orders.json`.
//!
//! Fields the sync validates itself (currency, emails, quantities) are kept
//! loose here so that one malformed order fails on its own instead of
//! failing the whole page.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use packhouse_core::{ExternalOrderId, FinancialStatus, FulfillmentStatus};

/// A Shopify order. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOrder {
    pub id: ExternalOrderId,
    /// Display name, e.g. `#1001`.
    pub name: String,
    #[serde(default)]
    pub order_number: Option<i64>,
    pub currency: String,
    pub total_price: Decimal,
    #[serde(default)]
    pub financial_status: Option<FinancialStatus>,
    /// `None` while nothing has shipped.
    #[serde(default)]
    pub fulfillment_status: Option<FulfillmentStatus>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub customer: Option<ExternalCustomer>,
    #[serde(default)]
    pub shipping_address: Option<ExternalAddress>,
    #[serde(default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub line_items: Vec<ExternalLineItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExternalOrder {
    /// Email identifying the buyer: the customer's, else the order's.
    ///
    /// Blank strings count as absent.
    #[must_use]
    pub fn buyer_email(&self) -> Option<&str> {
        let from_customer = self
            .customer
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .filter(|e| !e.trim().is_empty());

        from_customer.or_else(|| self.email.as_deref().filter(|e| !e.trim().is_empty()))
    }

    /// First payment gateway used, e.g. `shopify_payments`.
    #[must_use]
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_gateway_names.first().map(String::as_str)
    }
}

/// The customer attached to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCustomer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ExternalCustomer {
    /// `"first last"` with blank parts skipped, or `None` when both are blank.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A line on a Shopify order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLineItem {
    pub id: i64,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Unit price in the order currency.
    pub price: Decimal,
    pub quantity: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORDER_JSON: &str = r##"{
        "id": 450789469,
        "name": "#1001",
        "order_number": 1001,
        "currency": "USD",
        "total_price": "199.65",
        "financial_status": "paid",
        "fulfillment_status": null,
        "email": "bob.norman@mail.example.com",
        "customer": {
            "id": 207119551,
            "email": "Bob.Norman@Mail.Example.com",
            "first_name": "Bob",
            "last_name": "Norman",
            "phone": null
        },
        "shipping_address": {
            "name": "Bob Norman",
            "address1": "Chestnut Street 92",
            "city": "Louisville",
            "province": "Kentucky",
            "zip": "40202",
            "country": "United States"
        },
        "payment_gateway_names": ["bogus"],
        "line_items": [
            {
                "id": 466157049,
                "product_id": 632910392,
                "variant_id": 39072856,
                "title": "Mailer Box 12x9x4",
                "sku": "MB-1294",
                "price": "199.00",
                "quantity": 1
            }
        ],
        "created_at": "2008-01-10T11:00:00-05:00",
        "updated_at": "2008-01-10T11:00:00-05:00"
    }"##;

    #[test]
    fn test_deserialize_rest_order() {
        let order: ExternalOrder = serde_json::from_str(ORDER_JSON).unwrap();
        assert_eq!(order.id, ExternalOrderId::new(450_789_469));
        assert_eq!(order.name, "#1001");
        assert_eq!(order.total_price, Decimal::new(19965, 2));
        assert_eq!(order.financial_status, Some(FinancialStatus::Paid));
        assert_eq!(order.fulfillment_status, None);
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.payment_method(), Some("bogus"));
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_buyer_email_prefers_customer() {
        let order: ExternalOrder = serde_json::from_str(ORDER_JSON).unwrap();
        assert_eq!(order.buyer_email(), Some("Bob.Norman@Mail.Example.com"));
    }

    #[test]
    fn test_buyer_email_falls_back_to_order_email() {
        let order = ExternalOrder {
            email: Some("guest@example.com".to_string()),
            customer: Some(ExternalCustomer {
                id: 1,
                email: Some("  ".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(order.buyer_email(), Some("guest@example.com"));
        assert_eq!(ExternalOrder::default().buyer_email(), None);
    }

    #[test]
    fn test_full_name() {
        let mut customer = ExternalCustomer {
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            ..Default::default()
        };
        assert_eq!(customer.full_name().as_deref(), Some("Ada Lovelace"));

        customer.last_name = Some(String::new());
        assert_eq!(customer.full_name().as_deref(), Some("Ada"));

        customer.first_name = None;
        assert_eq!(customer.full_name(), None);
    }

    #[test]
    fn test_unknown_statuses_do_not_fail_the_order() {
        let json = r##"{"id": 1, "name": "#1", "currency": "USD", "total_price": "0.00",
                       "financial_status": "pending_review", "fulfillment_status": "scheduled"}"##;
        let order: ExternalOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.financial_status, Some(FinancialStatus::Unknown));
        assert_eq!(order.fulfillment_status, Some(FulfillmentStatus::Unknown));
    }
}
