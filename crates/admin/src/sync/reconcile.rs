//! Mapping of one upstream order onto local rows.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};

use packhouse_core::{CurrencyCode, Email, OrderStatus, Price};

use super::OrderStore;
use crate::db::RepositoryError;
use crate::models::{NewOrder, NewOrderItem, NewUser, Order, OrderUpdate, ShippingSnapshot, User};
use crate::shopify::ExternalOrder;

/// Errors for a single record. The run continues past them unless
/// [`ReconcileError::is_fatal`] says otherwise.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The upstream record cannot be stored as-is.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl ReconcileError {
    /// Whether the store itself is down, as opposed to this record being bad.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Store(err) => err.is_unavailable(),
            Self::InvalidRecord(_) => false,
        }
    }
}

/// Whether reconciling created a new local order or refreshed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
}

/// A reconciled order and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub order: Order,
    pub outcome: ReconcileOutcome,
}

/// Creates or updates the local mirror of upstream orders.
///
/// Idempotent per external id: reconciling the same order twice yields one
/// local order, created the first time and updated after that.
#[derive(Clone)]
pub struct OrderReconciler {
    store: Arc<dyn OrderStore>,
}

impl OrderReconciler {
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Reconcile one upstream order.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidRecord` for unusable input (bad
    /// currency, malformed buyer email, negative quantity) and
    /// `ReconcileError::Store` when persistence fails. Nothing is written for
    /// a failed record.
    #[instrument(skip(self, external), fields(order = %external.name, external_id = %external.id))]
    pub async fn reconcile(&self, external: &ExternalOrder) -> Result<Reconciled, ReconcileError> {
        if external.id.as_i64() <= 0 {
            return Err(ReconcileError::InvalidRecord(format!(
                "order id must be positive, got {}",
                external.id
            )));
        }

        let status = OrderStatus::from_upstream(external.financial_status, external.fulfillment_status);
        let total = order_total(external)?;

        if let Some(existing) = self.store.find_order_by_external_id(external.id).await? {
            return self.refresh(&existing, status, total).await;
        }

        let items = line_items(external)?;
        let buyer = match external.buyer_email() {
            Some(raw) => {
                let email = Email::parse(raw).map_err(|e| {
                    ReconcileError::InvalidRecord(format!("buyer email {raw:?}: {e}"))
                })?;
                Some(self.resolve_buyer(&email, external).await?)
            }
            None => None,
        };

        let new_order = NewOrder {
            order_number: order_number(external),
            external_id: external.id,
            status,
            total: total.clone(),
            payment_method: external.payment_method().map(String::from),
            shipping: shipping_snapshot(external),
            user_id: buyer.map(|user| user.id),
            placed_at: external.created_at,
            items,
        };

        match self.store.create_order(&new_order).await {
            Ok(order) => {
                debug!(order_id = %order.id, status = %order.status, "Created local order");
                Ok(Reconciled {
                    order,
                    outcome: ReconcileOutcome::Created,
                })
            }
            // Another writer mirrored this order first
            Err(RepositoryError::Conflict(_)) => {
                let existing = self
                    .store
                    .find_order_by_external_id(external.id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                self.refresh(&existing, status, total).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn refresh(
        &self,
        existing: &Order,
        status: OrderStatus,
        total: Price,
    ) -> Result<Reconciled, ReconcileError> {
        let order = self
            .store
            .update_order(existing.id, &OrderUpdate { status, total })
            .await?;
        debug!(order_id = %order.id, status = %order.status, "Updated local order");

        Ok(Reconciled {
            order,
            outcome: ReconcileOutcome::Updated,
        })
    }

    /// Find the buyer's account, creating it on their first order.
    async fn resolve_buyer(
        &self,
        email: &Email,
        external: &ExternalOrder,
    ) -> Result<User, ReconcileError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            return Ok(user);
        }

        let customer = external.customer.as_ref();
        let new_user = NewUser {
            email: email.clone(),
            name: customer
                .and_then(|c| c.full_name())
                .unwrap_or_else(|| email.local_part().to_string()),
            phone: customer
                .and_then(|c| c.phone.clone())
                .or_else(|| external.phone.clone()),
            external_customer_id: customer.map(|c| c.id),
        };

        match self.store.create_user(&new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "Created customer from first synced order");
                Ok(user)
            }
            // Lost a race with a concurrent first order from the same buyer
            Err(RepositoryError::Conflict(_)) => self
                .store
                .find_user_by_email(email)
                .await?
                .ok_or_else(|| RepositoryError::NotFound.into()),
            Err(err) => Err(err.into()),
        }
    }
}

fn order_total(external: &ExternalOrder) -> Result<Price, ReconcileError> {
    let currency = CurrencyCode::parse(&external.currency)
        .map_err(|e| ReconcileError::InvalidRecord(e.to_string()))?;
    Ok(Price::new(external.total_price, currency))
}

fn line_items(external: &ExternalOrder) -> Result<Vec<NewOrderItem>, ReconcileError> {
    external
        .line_items
        .iter()
        .map(|item| {
            let quantity = i32::try_from(item.quantity)
                .ok()
                .filter(|q| *q >= 0)
                .ok_or_else(|| {
                    ReconcileError::InvalidRecord(format!(
                        "line item {} has invalid quantity {}",
                        item.id, item.quantity
                    ))
                })?;

            Ok(NewOrderItem {
                external_product_id: item.product_id,
                external_variant_id: item.variant_id,
                title: item.title.clone(),
                sku: item.sku.clone().filter(|s| !s.is_empty()),
                unit_price: item.price,
                quantity,
            })
        })
        .collect()
}

fn order_number(external: &ExternalOrder) -> String {
    if !external.name.trim().is_empty() {
        return external.name.trim().to_string();
    }
    external
        .order_number
        .map_or_else(|| format!("#{}", external.id), |n| format!("#{n}"))
}

fn shipping_snapshot(external: &ExternalOrder) -> ShippingSnapshot {
    external
        .shipping_address
        .as_ref()
        .map_or_else(ShippingSnapshot::default, |address| ShippingSnapshot {
            name: address.name.clone(),
            address1: address.address1.clone(),
            address2: address.address2.clone(),
            city: address.city.clone(),
            province: address.province.clone(),
            zip: address.zip.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use packhouse_core::{ExternalOrderId, FinancialStatus, FulfillmentStatus};

    use super::*;
    use crate::shopify::{ExternalCustomer, ExternalLineItem};
    use crate::sync::testing::{MemoryOrderStore, sample_order};

    fn reconciler(store: &Arc<MemoryOrderStore>) -> OrderReconciler {
        OrderReconciler::new(store.clone())
    }

    #[tokio::test]
    async fn test_first_sight_creates_order_user_and_items() {
        let store = Arc::new(MemoryOrderStore::default());
        let mut external = sample_order(1, "#1001");
        external.line_items.push(ExternalLineItem {
            id: 11,
            title: "Kraft Tape".into(),
            price: Decimal::new(450, 2),
            quantity: 2,
            ..Default::default()
        });

        let result = reconciler(&store).reconcile(&external).await.unwrap();

        assert_eq!(result.outcome, ReconcileOutcome::Created);
        assert_eq!(result.order.status, OrderStatus::Confirmed);
        assert_eq!(result.order.order_number, "#1001");
        assert!(result.order.user_id.is_some());

        let items = store.items_of(result.order.id);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Mailer Box 12x9x4");
        assert_eq!(items[1].title, "Kraft Tape");

        let user = store.user_by_email("buyer1@boxes.example").unwrap();
        assert_eq!(user.name, "Pat Buyer");
    }

    #[tokio::test]
    async fn test_second_sight_updates_without_touching_items() {
        let store = Arc::new(MemoryOrderStore::default());
        let reconciler = reconciler(&store);
        let mut external = sample_order(1, "#1001");
        let first = reconciler.reconcile(&external).await.unwrap();

        external.fulfillment_status = Some(FulfillmentStatus::Fulfilled);
        external.total_price = Decimal::new(5000, 2);
        external.line_items.clear();
        let second = reconciler.reconcile(&external).await.unwrap();

        assert_eq!(second.outcome, ReconcileOutcome::Updated);
        assert_eq!(second.order.id, first.order.id);
        assert_eq!(second.order.status, OrderStatus::Completed);
        assert_eq!(second.order.total.amount, Decimal::new(5000, 2));
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.items_of(first.order.id).len(), 1);
    }

    #[tokio::test]
    async fn test_existing_user_is_reused() {
        let store = Arc::new(MemoryOrderStore::default());
        let reconciler = reconciler(&store);

        let mut a = sample_order(1, "#1001");
        let mut b = sample_order(2, "#1002");
        a.customer.as_mut().unwrap().email = Some("Same@Boxes.Example".into());
        b.customer.as_mut().unwrap().email = Some("same@boxes.example ".into());

        let a = reconciler.reconcile(&a).await.unwrap();
        let b = reconciler.reconcile(&b).await.unwrap();

        assert_eq!(a.order.user_id, b.order.user_id);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_guest_order_without_email_has_no_user() {
        let store = Arc::new(MemoryOrderStore::default());
        let mut external = sample_order(7, "#1007");
        external.customer = None;
        external.email = None;

        let result = reconciler(&store).reconcile(&external).await.unwrap();

        assert_eq!(result.outcome, ReconcileOutcome::Created);
        assert_eq!(result.order.user_id, None);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_local_part() {
        let store = Arc::new(MemoryOrderStore::default());
        let mut external = sample_order(3, "#1003");
        external.customer = Some(ExternalCustomer {
            id: 99,
            email: Some("warehouse.lead@boxes.example".into()),
            ..Default::default()
        });

        reconciler(&store).reconcile(&external).await.unwrap();

        let user = store.user_by_email("warehouse.lead@boxes.example").unwrap();
        assert_eq!(user.name, "warehouse.lead");
        assert_eq!(user.external_customer_id, Some(99));
    }

    #[tokio::test]
    async fn test_user_creation_race_rereads_user() {
        let store = Arc::new(MemoryOrderStore::default());
        store.lose_user_race("buyer1@boxes.example");

        let result = reconciler(&store)
            .reconcile(&sample_order(1, "#1001"))
            .await
            .unwrap();

        let user = store.user_by_email("buyer1@boxes.example").unwrap();
        assert_eq!(result.order.user_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_invalid_records_are_rejected_without_writes() {
        let store = Arc::new(MemoryOrderStore::default());
        let reconciler = reconciler(&store);

        let mut bad_currency = sample_order(1, "#1001");
        bad_currency.currency = "DOLLARS".into();

        let mut bad_email = sample_order(2, "#1002");
        bad_email.customer.as_mut().unwrap().email = Some("not-an-email".into());

        let mut bad_quantity = sample_order(3, "#1003");
        bad_quantity.line_items[0].quantity = -1;

        let mut bad_id = sample_order(4, "#1004");
        bad_id.id = ExternalOrderId::new(0);

        for external in [bad_currency, bad_email, bad_quantity, bad_id] {
            let err = reconciler.reconcile(&external).await.unwrap_err();
            assert!(matches!(err, ReconcileError::InvalidRecord(_)), "{err}");
            assert!(!err.is_fatal());
        }
        assert_eq!(store.order_count(), 0);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = Arc::new(MemoryOrderStore::default());
        store.set_unavailable(true);

        let err = reconciler(&store)
            .reconcile(&sample_order(1, "#1001"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_status_mapping_applies_on_create() {
        let store = Arc::new(MemoryOrderStore::default());
        let mut external = sample_order(5, "#1005");
        external.financial_status = Some(FinancialStatus::Voided);

        let result = reconciler(&store).reconcile(&external).await.unwrap();
        assert_eq!(result.order.status, OrderStatus::Cancelled);
    }
}
