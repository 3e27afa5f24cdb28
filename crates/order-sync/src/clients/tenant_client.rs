//! # Tenant Client
//!
//! High-level API for a single tenant's desk. Every write is sent with a bounded wait so a
//! saturated desk answers `Timeout` instead of queueing callers indefinitely.
use crate::admission::{
    Admission, ComandaOp, ComandaUpdate, DeskAction, DeskReply, TenantDesk, TransitionOutcome,
};
use crate::error::SyncError;
use crate::model::{ComandaId, DriverId, GeoPoint, Initiator, Order, OrderPayload, OrderStatus};
use actor_framework::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::instrument;

#[derive(Clone)]
pub struct TenantClient {
    inner: ResourceClient<TenantDesk>,
    wait: Duration,
}

#[async_trait]
impl ActorClient<TenantDesk> for TenantClient {
    type Error = SyncError;

    fn inner(&self) -> &ResourceClient<TenantDesk> {
        &self.inner
    }

    fn map_error(e: FrameworkError<SyncError>) -> SyncError {
        SyncError::from(e)
    }
}

impl TenantClient {
    pub fn new(inner: ResourceClient<TenantDesk>, wait: Duration) -> Self {
        Self { inner, wait }
    }

    pub fn tenant_id(&self) -> &str {
        self.inner.id()
    }

    #[instrument(skip(self, payload), fields(tenant_id = %self.tenant_id()))]
    pub async fn create_order(
        &self,
        idempotency_key: &str,
        payload: OrderPayload,
    ) -> Result<Admission, SyncError> {
        let action = DeskAction::Admit {
            idempotency_key: idempotency_key.to_string(),
            payload,
        };
        match self.request_within(action, self.wait).await? {
            DeskReply::Admitted(admission) => Ok(admission),
            other => unreachable!("Admit must return Admitted, got {other:?}"),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant_id()))]
    pub async fn transition_order(
        &self,
        order_id: &str,
        to: OrderStatus,
        actor: Initiator,
        idempotency_key: Option<String>,
    ) -> Result<TransitionOutcome, SyncError> {
        let action = DeskAction::Transition {
            order_id: order_id.to_string(),
            to,
            actor,
            idempotency_key,
        };
        match self.request_within(action, self.wait).await? {
            DeskReply::Transitioned(outcome) => Ok(outcome),
            other => unreachable!("Transition must return Transitioned, got {other:?}"),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant_id()))]
    pub async fn fetch_order(&self, order_id: &str) -> Result<Order, SyncError> {
        let action = DeskAction::FetchOrder {
            order_id: order_id.to_string(),
        };
        self.expect_order(self.request_within(action, self.wait).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant_id()))]
    pub async fn assign_driver(
        &self,
        order_id: &str,
        driver_id: &str,
        eta: Option<DateTime<Utc>>,
    ) -> Result<Order, SyncError> {
        let action = DeskAction::AssignDriver {
            order_id: order_id.to_string(),
            driver_id: driver_id.to_string(),
            eta,
        };
        self.expect_order(self.request_within(action, self.wait).await?)
    }

    /// Stores the driver's latest accepted fix on the order.
    pub async fn record_position(
        &self,
        order_id: &str,
        driver_id: &DriverId,
        position: GeoPoint,
    ) -> Result<Order, SyncError> {
        let action = DeskAction::RecordPosition {
            order_id: order_id.to_string(),
            driver_id: driver_id.clone(),
            position,
        };
        self.expect_order(self.request_within(action, self.wait).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant_id()))]
    pub async fn update_comanda(
        &self,
        comanda_id: Option<ComandaId>,
        op: ComandaOp,
        idempotency_key: Option<String>,
    ) -> Result<ComandaUpdate, SyncError> {
        let action = DeskAction::Comanda {
            comanda_id,
            op,
            idempotency_key,
        };
        self.expect_comanda(self.request_within(action, self.wait).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant_id()))]
    pub async fn fetch_comanda(&self, comanda_id: &str) -> Result<ComandaUpdate, SyncError> {
        let action = DeskAction::FetchComanda {
            comanda_id: comanda_id.to_string(),
        };
        self.expect_comanda(self.request_within(action, self.wait).await?)
    }

    fn expect_order(&self, reply: DeskReply) -> Result<Order, SyncError> {
        match reply {
            DeskReply::Order(order) => Ok(order),
            other => unreachable!("expected an order reply, got {other:?}"),
        }
    }

    fn expect_comanda(&self, reply: DeskReply) -> Result<ComandaUpdate, SyncError> {
        match reply {
            DeskReply::Comanda(update) => Ok(update),
            other => unreachable!("expected a comanda reply, got {other:?}"),
        }
    }
}
