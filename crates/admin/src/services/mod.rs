//! Business logic services for admin.
//!
//! # Services
//!
//! - `order_sync` - Authorized, one-at-a-time Shopify order sync runs

pub mod order_sync;

pub use order_sync::{OrderSyncService, SyncStatus, SyncSummary};
