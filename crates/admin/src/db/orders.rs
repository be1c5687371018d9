//! Order repository (`shop.order`, `shop.order_item`).
//!
//! Orders mirrored from Shopify are keyed by `external_id`, which carries a
//! unique index. An order and its items are always inserted in a single
//! transaction so a failed item insert never leaves a half-written order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use packhouse_core::{
    CurrencyCode, ExternalOrderId, OrderId, OrderStatus, Price, UserId,
};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewOrder, Order, OrderUpdate, ShippingSnapshot};

const ORDER_COLUMNS: &str = "id, order_number, external_id, status, total, currency, \
     payment_method, shipping_name, shipping_address1, shipping_address2, shipping_city, \
     shipping_province, shipping_zip, shipping_country, shipping_phone, user_id, \
     created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    external_id: Option<i64>,
    status: OrderStatus,
    total: Decimal,
    currency: String,
    payment_method: Option<String>,
    shipping_name: Option<String>,
    shipping_address1: Option<String>,
    shipping_address2: Option<String>,
    shipping_city: Option<String>,
    shipping_province: Option<String>,
    shipping_zip: Option<String>,
    shipping_country: Option<String>,
    shipping_phone: Option<String>,
    user_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.order_number))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            external_id: row.external_id.map(ExternalOrderId::new),
            status: row.status,
            total: Price::new(row.total, currency),
            payment_method: row.payment_method,
            shipping: ShippingSnapshot {
                name: row.shipping_name,
                address1: row.shipping_address1,
                address2: row.shipping_address2,
                city: row.shipping_city,
                province: row.shipping_province,
                zip: row.shipping_zip,
                country: row.shipping_country,
                phone: row.shipping_phone,
            },
            user_id: row.user_id.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the local order mirroring a Shopify order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored currency is invalid.
    #[instrument(skip(self), fields(external_id = %external_id))]
    pub async fn get_by_external_id(
        &self,
        external_id: ExternalOrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert an order and all of its items in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an order with the same external id exists.
    /// Returns `RepositoryError::Database` for other database errors. Nothing
    /// is written when any statement fails.
    #[instrument(skip(self, order), fields(order = %order.order_number, external_id = %order.external_id))]
    pub async fn create_with_items(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO shop.order (order_number, external_id, status, total, currency, \
                 payment_method, shipping_name, shipping_address1, shipping_address2, \
                 shipping_city, shipping_province, shipping_zip, shipping_country, \
                 shipping_phone, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                 COALESCE($16, now()), now()) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.order_number)
        .bind(order.external_id)
        .bind(order.status)
        .bind(order.total.amount)
        .bind(&order.total.currency_code)
        .bind(order.payment_method.as_deref())
        .bind(order.shipping.name.as_deref())
        .bind(order.shipping.address1.as_deref())
        .bind(order.shipping.address2.as_deref())
        .bind(order.shipping.city.as_deref())
        .bind(order.shipping.province.as_deref())
        .bind(order.shipping.zip.as_deref())
        .bind(order.shipping.country.as_deref())
        .bind(order.shipping.phone.as_deref())
        .bind(order.user_id)
        .bind(order.placed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order"))?;

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "order {} has too many line items",
                    order.order_number
                ))
            })?;

            sqlx::query(
                "INSERT INTO shop.order_item (order_id, external_product_id, \
                     external_variant_id, title, sku, unit_price, quantity, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(row.id)
            .bind(item.external_product_id)
            .bind(item.external_variant_id)
            .bind(&item.title)
            .bind(item.sku.as_deref())
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.try_into()
    }

    /// Refresh status and totals of an existing order. Items are not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order no longer exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, update), fields(order_id = %id, status = %update.status))]
    pub async fn apply_update(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE shop.order \
             SET status = $2, total = $3, currency = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.total.amount)
        .bind(&update.total.currency_code)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
