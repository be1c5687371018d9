//! In-memory stand-ins for the feed and the store.
//!
//! Compiled for this crate's tests and, through the `test-support` feature,
//! for the integration test crate.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use packhouse_core::{
    Email, ExternalOrderId, FinancialStatus, OrderId, UserId,
};

use super::{OrderFeed, OrderStore};
use crate::db::RepositoryError;
use crate::models::{NewOrder, NewOrderItem, NewUser, Order, OrderUpdate, User};
use crate::shopify::{
    AdminShopifyError, ExternalCustomer, ExternalLineItem, ExternalOrder, OrderPage, PageRequest,
};

/// A paid, unfulfilled order from `buyer{id}@boxes.example` with one line item.
#[must_use]
pub fn sample_order(id: i64, name: &str) -> ExternalOrder {
    ExternalOrder {
        id: ExternalOrderId::new(id),
        name: name.to_string(),
        currency: "USD".to_string(),
        total_price: Decimal::new(1999, 2),
        financial_status: Some(FinancialStatus::Paid),
        fulfillment_status: None,
        customer: Some(ExternalCustomer {
            id: 500 + id,
            email: Some(format!("buyer{id}@boxes.example")),
            first_name: Some("Pat".to_string()),
            last_name: Some("Buyer".to_string()),
            phone: None,
        }),
        payment_gateway_names: vec!["shopify_payments".to_string()],
        line_items: vec![ExternalLineItem {
            id: 9000 + id,
            product_id: Some(700),
            variant_id: Some(701),
            title: "Mailer Box 12x9x4".to_string(),
            sku: Some("MB-1294".to_string()),
            price: Decimal::new(1999, 2),
            quantity: 1,
        }],
        ..ExternalOrder::default()
    }
}

/// A page holding `orders`, continued by `next` when given.
#[must_use]
pub fn page(orders: Vec<ExternalOrder>, next: Option<&str>) -> OrderPage {
    OrderPage {
        orders,
        has_more: next.is_some(),
        next_page_token: next.map(String::from),
        call_limit: None,
    }
}

// =============================================================================
// Feed
// =============================================================================

/// Feed that replays a fixed script of responses, then empty pages.
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<OrderPage, AdminShopifyError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedFeed {
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = Result<OrderPage, AdminShopifyError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    /// A feed that always succeeds with `pages`.
    #[must_use]
    pub fn pages(pages: impl IntoIterator<Item = OrderPage>) -> Self {
        Self::new(pages.into_iter().map(Ok))
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<PageRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl OrderFeed for ScriptedFeed {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrderPage, AdminShopifyError> {
        lock(&self.requests).push(request.clone());
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(OrderPage::default()))
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
struct State {
    next_id: i64,
    orders: Vec<Order>,
    items: Vec<(OrderId, NewOrderItem)>,
    users: Vec<User>,
    unavailable: bool,
    failing_orders: HashSet<ExternalOrderId>,
    user_races: HashSet<String>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn insert_user(&mut self, user: &NewUser) -> User {
        let now = Utc::now();
        let user = User {
            id: UserId::new(self.next_id()),
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            external_customer_id: user.external_customer_id,
            created_at: now,
            updated_at: now,
        };
        self.users.push(user.clone());
        user
    }
}

/// Store backed by vectors, with knobs for failure injection.
#[derive(Default)]
pub struct MemoryOrderStore {
    state: Mutex<State>,
}

impl MemoryOrderStore {
    /// Make every call fail as if the connection pool timed out.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Make inserting this order fail with a non-fatal database error.
    pub fn fail_create_for(&self, external_id: i64) {
        lock(&self.state)
            .failing_orders
            .insert(ExternalOrderId::new(external_id));
    }

    /// Simulate a concurrent writer creating this user first.
    pub fn lose_user_race(&self, email: &str) {
        lock(&self.state).user_races.insert(email.to_string());
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        lock(&self.state).orders.len()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        lock(&self.state).users.len()
    }

    #[must_use]
    pub fn order_by_number(&self, order_number: &str) -> Option<Order> {
        lock(&self.state)
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned()
    }

    /// Items written for an order, in upstream position order.
    #[must_use]
    pub fn items_of(&self, order_id: OrderId) -> Vec<NewOrderItem> {
        lock(&self.state)
            .items
            .iter()
            .filter(|(owner, _)| *owner == order_id)
            .map(|(_, item)| item.clone())
            .collect()
    }

    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<User> {
        lock(&self.state)
            .users
            .iter()
            .find(|u| u.email.as_str() == email)
            .cloned()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find_order_by_external_id(
        &self,
        external_id: ExternalOrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        Ok(state
            .orders
            .iter()
            .find(|o| o.external_id == Some(external_id))
            .cloned())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut state = lock(&self.state);
        state.check_available()?;

        if state.failing_orders.contains(&order.external_id) {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "insert rejected for order {}",
                order.order_number
            ))));
        }
        if state
            .orders
            .iter()
            .any(|o| o.external_id == Some(order.external_id))
        {
            return Err(RepositoryError::Conflict("order already exists".to_string()));
        }

        let now = Utc::now();
        let created = Order {
            id: OrderId::new(state.next_id()),
            order_number: order.order_number.clone(),
            external_id: Some(order.external_id),
            status: order.status,
            total: order.total.clone(),
            payment_method: order.payment_method.clone(),
            shipping: order.shipping.clone(),
            user_id: order.user_id,
            created_at: order.placed_at.unwrap_or(now),
            updated_at: now,
        };

        for item in &order.items {
            state.items.push((created.id, item.clone()));
        }
        state.orders.push(created.clone());
        Ok(created)
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        let mut state = lock(&self.state);
        state.check_available()?;

        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = update.status;
        order.total = update.total.clone();
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        Ok(state.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut state = lock(&self.state);
        state.check_available()?;

        if state.user_races.remove(user.email.as_str()) {
            state.insert_user(user);
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }
        Ok(state.insert_user(user))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
