use super::comanda::Comanda;
use super::order::{DriverId, Order, OrderId, OrderStatus, TenantId};
use super::position::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who asked for a transition. Recorded on the event; authorization happens upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Initiator {
    Staff(String),
    Customer(String),
    Driver(String),
    System,
}

impl fmt::Display for Initiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initiator::Staff(id) => write!(f, "staff:{id}"),
            Initiator::Customer(id) => write!(f, "customer:{id}"),
            Initiator::Driver(id) => write!(f, "driver:{id}"),
            Initiator::System => f.write_str("system"),
        }
    }
}

/// Produced by exactly one accepted transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub changed_by: Initiator,
}

/// What a connection subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriberKey {
    Tenant { tenant_id: TenantId },
    Customer { customer_id: String },
    Table { tenant_id: TenantId, table_id: String },
    Driver { driver_id: DriverId },
    Order { order_id: OrderId },
}

impl SubscriberKey {
    pub fn tenant(id: impl Into<String>) -> Self {
        SubscriberKey::Tenant {
            tenant_id: id.into(),
        }
    }

    pub fn customer(id: impl Into<String>) -> Self {
        SubscriberKey::Customer {
            customer_id: id.into(),
        }
    }

    pub fn table(tenant_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        SubscriberKey::Table {
            tenant_id: tenant_id.into(),
            table_id: table_id.into(),
        }
    }

    pub fn driver(id: impl Into<String>) -> Self {
        SubscriberKey::Driver {
            driver_id: id.into(),
        }
    }

    pub fn order(id: impl Into<String>) -> Self {
        SubscriberKey::Order { order_id: id.into() }
    }
}

impl fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberKey::Tenant { tenant_id } => write!(f, "tenant:{tenant_id}"),
            SubscriberKey::Customer { customer_id } => write!(f, "customer:{customer_id}"),
            SubscriberKey::Table {
                tenant_id,
                table_id,
            } => write!(f, "table:{tenant_id}/{table_id}"),
            SubscriberKey::Driver { driver_id } => write!(f, "driver:{driver_id}"),
            SubscriberKey::Order { order_id } => write!(f, "order:{order_id}"),
        }
    }
}

/// Everyone who should hear about an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    pub tenant_id: Option<TenantId>,
    pub order_id: Option<OrderId>,
    pub customer_id: Option<String>,
    pub table_id: Option<String>,
    pub driver_id: Option<DriverId>,
}

impl Audience {
    pub fn for_order(order: &Order) -> Self {
        Self {
            tenant_id: Some(order.tenant_id.clone()),
            order_id: Some(order.id.clone()),
            customer_id: order.customer_id.clone(),
            table_id: order.table_id.clone(),
            driver_id: order.driver_id().map(str::to_string),
        }
    }

    pub fn for_comanda(comanda: &Comanda) -> Self {
        Self {
            tenant_id: Some(comanda.tenant_id.clone()),
            table_id: comanda.table_id.clone(),
            ..Self::default()
        }
    }

    pub fn for_driver(driver_id: &str) -> Self {
        Self {
            driver_id: Some(driver_id.to_string()),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<SubscriberKey> {
        let mut keys = Vec::with_capacity(5);
        if let Some(tenant_id) = &self.tenant_id {
            keys.push(SubscriberKey::tenant(tenant_id.as_str()));
            if let Some(table_id) = &self.table_id {
                keys.push(SubscriberKey::table(tenant_id.as_str(), table_id.as_str()));
            }
        }
        if let Some(order_id) = &self.order_id {
            keys.push(SubscriberKey::order(order_id.as_str()));
        }
        if let Some(customer_id) = &self.customer_id {
            keys.push(SubscriberKey::customer(customer_id.as_str()));
        }
        if let Some(driver_id) = &self.driver_id {
            keys.push(SubscriberKey::driver(driver_id.as_str()));
        }
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    OrderCreated { order: Order },
    OrderStatusChanged(OrderStatusChanged),
    ComandaChanged { comanda: Comanda },
    DriverAssigned {
        order_id: OrderId,
        driver_id: DriverId,
    },
    /// `position` is the accepted fix. `smoothed` is where a map should draw the driver now.
    DriverLocation {
        driver_id: DriverId,
        position: GeoPoint,
        smoothed: GeoPoint,
        at: DateTime<Utc>,
    },
}

/// The unit the hub fans out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub audience: Audience,
    pub payload: EventPayload,
}

impl SyncEvent {
    pub fn order_created(order: &Order) -> Self {
        Self {
            audience: Audience::for_order(order),
            payload: EventPayload::OrderCreated {
                order: order.clone(),
            },
        }
    }

    pub fn status_changed(order: &Order, change: OrderStatusChanged) -> Self {
        Self {
            audience: Audience::for_order(order),
            payload: EventPayload::OrderStatusChanged(change),
        }
    }

    pub fn comanda_changed(comanda: &Comanda) -> Self {
        Self {
            audience: Audience::for_comanda(comanda),
            payload: EventPayload::ComandaChanged {
                comanda: comanda.clone(),
            },
        }
    }

    /// Goes to the order's audience, which now includes the driver.
    pub fn driver_assigned(order: &Order, driver_id: &str) -> Self {
        Self {
            audience: Audience::for_order(order),
            payload: EventPayload::DriverAssigned {
                order_id: order.id.clone(),
                driver_id: driver_id.to_string(),
            },
        }
    }

    pub fn driver_location(
        driver_id: &str,
        position: GeoPoint,
        smoothed: GeoPoint,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            audience: Audience::for_driver(driver_id),
            payload: EventPayload::DriverLocation {
                driver_id: driver_id.to_string(),
                position,
                smoothed,
                at,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            EventPayload::OrderCreated { .. } => "order_created",
            EventPayload::OrderStatusChanged(_) => "order_status_changed",
            EventPayload::ComandaChanged { .. } => "comanda_changed",
            EventPayload::DriverAssigned { .. } => "driver_assigned",
            EventPayload::DriverLocation { .. } => "driver_location",
        }
    }
}
