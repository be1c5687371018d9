//! Local order records (`shop.order`, `shop.order_item`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use packhouse_core::{ExternalOrderId, OrderId, OrderStatus, Price, UserId};

/// Shipping address copied onto the order at the time it was placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingSnapshot {
    pub name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// A local order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    /// Display number shown to staff and customers, e.g. `#1001`.
    pub order_number: String,
    /// Shopify order id. Unique when present.
    pub external_id: Option<ExternalOrderId>,
    pub status: OrderStatus,
    pub total: Price,
    pub payment_method: Option<String>,
    pub shipping: ShippingSnapshot,
    /// Owning customer. `None` for guest orders with no email.
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order to insert together with its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub external_id: ExternalOrderId,
    pub status: OrderStatus,
    pub total: Price,
    pub payment_method: Option<String>,
    pub shipping: ShippingSnapshot,
    pub user_id: Option<UserId>,
    /// When the customer placed the order upstream. Defaults to now.
    pub placed_at: Option<DateTime<Utc>>,
    pub items: Vec<NewOrderItem>,
}

/// A line item to insert with a [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub external_product_id: Option<i64>,
    pub external_variant_id: Option<i64>,
    pub title: String,
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Fields refreshed when an already-synced order is seen again.
///
/// Line items are written once, at creation, and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub total: Price,
}
