//! Wire types for the Shopify REST Admin API.

mod order;
mod page;

pub use order::{ExternalAddress, ExternalCustomer, ExternalLineItem, ExternalOrder};
pub use page::{CallLimit, MAX_PAGE_SIZE, OrderPage, PageRequest};
