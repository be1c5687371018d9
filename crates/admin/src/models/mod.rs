//! Domain models for admin.
//!
//! Rows read from `PostgreSQL` are converted into these validated types by
//! the repositories in [`crate::db`].

pub mod admin_user;
pub mod order;
pub mod session;
pub mod user;

pub use admin_user::{AdminRole, AdminUser};
pub use order::{NewOrder, NewOrderItem, Order, OrderUpdate, ShippingSnapshot};
pub use session::CurrentAdmin;
pub use user::{NewUser, User};
