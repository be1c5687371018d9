//! `PostgreSQL` implementation of [`OrderStore`].

use async_trait::async_trait;
use sqlx::PgPool;

use packhouse_core::{Email, ExternalOrderId, OrderId};

use super::OrderStore;
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::models::{NewOrder, NewUser, Order, OrderUpdate, User};

/// Order store backed by the `shop` schema.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_order_by_external_id(
        &self,
        external_id: ExternalOrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .get_by_external_id(external_id)
            .await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create_with_items(order).await
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).apply_update(id, update).await
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_email(email).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create(user).await
    }
}
