use super::order::{OrderPayload, OrderStatus, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Order,
    Comanda,
}

/// Which entity a queued mutation touches.
///
/// `Local` names an entity created by an earlier mutation in the same queue, before the
/// server assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TargetRef {
    Local(String),
    Server(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateOrder {
        payload: OrderPayload,
    },
    TransitionOrder {
        to: OrderStatus,
    },
    /// Opens a new comanda when the mutation has no target.
    AddComandaItem {
        sku: String,
        quantity: i64,
        #[serde(default)]
        table_id: Option<String>,
    },
    RemoveComandaItem {
        sku: String,
    },
    CloseComanda,
    CancelComanda,
}

impl Operation {
    pub fn target_type(&self) -> TargetType {
        match self {
            Operation::CreateOrder { .. } | Operation::TransitionOrder { .. } => TargetType::Order,
            _ => TargetType::Comanda,
        }
    }

    /// True for operations that may run without a target and create one.
    pub fn creates_target(&self) -> bool {
        matches!(
            self,
            Operation::CreateOrder { .. } | Operation::AddComandaItem { .. }
        )
    }
}

/// A write made while offline, waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Client-generated, unique per device; doubles as the server idempotency key.
    pub local_id: String,
    pub tenant_id: TenantId,
    pub target_type: TargetType,
    pub target: Option<TargetRef>,
    pub operation: Operation,
    pub enqueued_at: DateTime<Utc>,
    pub attempt_count: u32,
}

impl QueuedMutation {
    pub fn new(
        local_id: impl Into<String>,
        tenant_id: impl Into<String>,
        target: Option<TargetRef>,
        operation: Operation,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            tenant_id: tenant_id.into(),
            target_type: operation.target_type(),
            target,
            operation,
            enqueued_at: Utc::now(),
            attempt_count: 0,
        }
    }
}

/// Why a mutation left the queue without being applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    Validation(String),
    InvalidTransition(String),
    NotFound(String),
    /// Sat in the queue longer than the retention window.
    Expired,
}

/// A permanently rejected mutation, kept until the user acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMutation {
    pub mutation: QueuedMutation,
    pub reason: RejectReason,
    pub rejected_at: DateTime<Utc>,
}
