//! Status enums for orders and admin users.
//!
//! Shopify describes an order with two independent axes, payment
//! ([`FinancialStatus`]) and fulfillment ([`FulfillmentStatus`]). The local
//! database collapses both into a single [`OrderStatus`] via
//! [`OrderStatus::from_upstream`].

use serde::{Deserialize, Serialize};

/// Payment state of a Shopify order (`financial_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStatus {
    Pending,
    Authorized,
    PartiallyPaid,
    Paid,
    PartiallyRefunded,
    Refunded,
    Voided,
    Expired,
    /// Any value this build does not know about.
    #[serde(other)]
    Unknown,
}

/// Fulfillment state of a Shopify order (`fulfillment_status`).
///
/// Shopify reports an unfulfilled order as `null`, which is modelled as
/// `Option::<FulfillmentStatus>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Fulfilled,
    Partial,
    Restocked,
    #[serde(other)]
    Unknown,
}

/// Lifecycle status of a local order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Nothing known yet about payment or fulfillment.
    #[default]
    Pending,
    /// Awaiting payment capture.
    PendingPayment,
    /// Paid, not yet shipped.
    Confirmed,
    /// Paid and partially shipped.
    Processing,
    /// Fully fulfilled.
    Completed,
    /// Payment refunded.
    Refunded,
    /// Payment voided.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::PendingPayment,
        Self::Confirmed,
        Self::Processing,
        Self::Completed,
        Self::Refunded,
        Self::Cancelled,
    ];

    /// Map Shopify's payment and fulfillment states to a local status.
    ///
    /// Rules are checked in order and the first match wins, so a fulfilled
    /// order is `Completed` even if it was later refunded.
    ///
    /// ```
    /// use packhouse_core::{FinancialStatus, FulfillmentStatus, OrderStatus};
    ///
    /// assert_eq!(
    ///     OrderStatus::from_upstream(Some(FinancialStatus::Paid), None),
    ///     OrderStatus::Confirmed,
    /// );
    /// assert_eq!(
    ///     OrderStatus::from_upstream(
    ///         Some(FinancialStatus::Refunded),
    ///         Some(FulfillmentStatus::Fulfilled),
    ///     ),
    ///     OrderStatus::Completed,
    /// );
    /// ```
    #[must_use]
    pub const fn from_upstream(
        financial: Option<FinancialStatus>,
        fulfillment: Option<FulfillmentStatus>,
    ) -> Self {
        match (financial, fulfillment) {
            (_, Some(FulfillmentStatus::Fulfilled)) => Self::Completed,
            (Some(FinancialStatus::Refunded), _) => Self::Refunded,
            (Some(FinancialStatus::Paid), Some(FulfillmentStatus::Partial)) => Self::Processing,
            (Some(FinancialStatus::Paid), _) => Self::Confirmed,
            (Some(FinancialStatus::Pending), _) => Self::PendingPayment,
            (Some(FinancialStatus::Voided), _) => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingPayment => "pending_payment",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access to all admin features including user management.
    SuperAdmin,
    /// Full access to store management features.
    Admin,
    /// Read-only access to store data.
    Viewer,
}

impl AdminRole {
    /// Whether this role may start jobs that write store data, such as the
    /// order sync.
    #[must_use]
    pub const fn can_manage_store(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}
