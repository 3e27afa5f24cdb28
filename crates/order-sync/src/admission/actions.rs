use crate::model::{
    Comanda, ComandaId, DriverId, GeoPoint, Initiator, Order, OrderId, OrderPayload, OrderStatus,
    OrderStatusChanged,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Requests handled by a [`TenantDesk`](super::TenantDesk).
#[derive(Debug)]
pub enum DeskAction {
    Admit {
        idempotency_key: String,
        payload: OrderPayload,
    },
    Transition {
        order_id: OrderId,
        to: OrderStatus,
        actor: Initiator,
        idempotency_key: Option<String>,
    },
    FetchOrder {
        order_id: OrderId,
    },
    AssignDriver {
        order_id: OrderId,
        driver_id: DriverId,
        eta: Option<DateTime<Utc>>,
    },
    RecordPosition {
        order_id: OrderId,
        driver_id: DriverId,
        position: GeoPoint,
    },
    /// `comanda_id: None` together with [`ComandaOp::AddItem`] opens a new comanda.
    Comanda {
        comanda_id: Option<ComandaId>,
        op: ComandaOp,
        idempotency_key: Option<String>,
    },
    FetchComanda {
        comanda_id: ComandaId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComandaOp {
    AddItem {
        sku: String,
        quantity: i64,
        table_id: Option<String>,
    },
    RemoveItem {
        sku: String,
    },
    Close,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeskReply {
    Admitted(Admission),
    Transitioned(TransitionOutcome),
    Order(Order),
    Comanda(ComandaUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmitOutcome {
    Created,
    DuplicateReturnedExisting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Admission {
    pub order: Order,
    pub outcome: AdmitOutcome,
}

impl Admission {
    /// Response code for the caller.
    pub fn code(&self) -> &'static str {
        match self.outcome {
            AdmitOutcome::Created => "created",
            AdmitOutcome::DuplicateReturnedExisting => "duplicate-returned-existing",
        }
    }
}

/// `change` is `None` when the request was a replay of an already-applied transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub order: Order,
    pub change: Option<OrderStatusChanged>,
}

impl TransitionOutcome {
    pub fn code(&self) -> &'static str {
        "applied"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComandaUpdate {
    pub comanda: Comanda,
    pub replayed: bool,
}
