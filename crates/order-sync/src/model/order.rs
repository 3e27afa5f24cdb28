use super::position::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TenantId = String;
pub type OrderId = String;
pub type DriverId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Accepted,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::New,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced line. `unit_price` is in minor currency units and always comes from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: u32,
    pub unit_price: i64,
}

impl LineItem {
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

/// Sum of line totals, `None` on overflow.
pub fn items_total(items: &[LineItem]) -> Option<i64> {
    items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.line_total()?))
}

/// One requested line as sent by a client. Quantities are signed so that negative input is
/// caught at validation instead of at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub sku: String,
    pub quantity: i64,
}

impl ItemRequest {
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

/// Client payload for a new order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub items: Vec<ItemRequest>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    /// Whatever total the client displayed. Compared and logged, never stored.
    #[serde(default)]
    pub client_total: Option<i64>,
}

impl OrderPayload {
    pub fn new(items: Vec<ItemRequest>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn at_table(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub driver_id: DriverId,
    pub last_known_position: Option<GeoPoint>,
    /// Promised arrival, as given by the dispatcher on assignment.
    pub eta: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub code: String,
    pub tenant_id: TenantId,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub total: i64,
    pub customer_id: Option<String>,
    pub table_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
    pub delivery: Option<DeliveryInfo>,
}

impl Order {
    pub fn driver_id(&self) -> Option<&str> {
        self.delivery.as_ref().map(|d| d.driver_id.as_str())
    }
}
