use crate::admission::{
    Admission, ComandaOp, ComandaUpdate, DeskContext, DeskSettings, TenantDesk, TransitionOutcome,
};
use crate::clients::{TenantClient, TrackClient};
use crate::collab::{Catalog, OrderStore, SideEffects};
use crate::config::SyncConfig;
use crate::error::{QueueResult, SyncError, ValidationError};
use crate::hub::{ConnectionId, FanoutHub, Subscription};
use crate::model::{
    DriverId, Initiator, Operation, Order, OrderId, OrderPayload, OrderStatus, PositionSample,
    QueuedMutation, SmoothedPosition, SubscriberKey, SyncEvent, TenantId,
};
use crate::queue::{DrainReport, MutationApplier, OfflineQueue};
use crate::state_machine::TransitionHooks;
use crate::tracking::{DriverTrack, Ingestion};
use actor_framework::ActorRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The order a driver is currently delivering.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    tenant_id: TenantId,
    order_id: OrderId,
}

/// The runtime orchestrator of the synchronization engine.
///
/// `SyncSystem` is responsible for:
/// - **Lifecycle Management**: Spawning tenant desks and driver tracks on first use, stopping
///   them on shutdown
/// - **Dependency Wiring**: Handing every desk the shared store, catalog, effects and hub
/// - **Cross-actor Flows**: Driver assignment, location fan-out and offline replay, which
///   touch more than one actor
///
/// # Example
///
/// ```ignore
/// let system = SyncSystem::new(config, store, catalog, Arc::new(LoggingEffects));
///
/// let mut kitchen = system.subscribe(SubscriberKey::tenant("t-1"));
/// let admission = system.create_order("t-1", "req-1", payload).await?;
/// system
///     .transition_order("t-1", &admission.order.id, OrderStatus::Accepted, staff, None)
///     .await?;
///
/// system.shutdown().await;
/// ```
pub struct SyncSystem {
    config: SyncConfig,
    desks: ActorRegistry<TenantDesk>,
    tracks: ActorRegistry<DriverTrack>,
    hub: Arc<FanoutHub>,
    assignments: DashMap<DriverId, Assignment>,
    sweeper: JoinHandle<()>,
}

impl SyncSystem {
    /// Builds the system with the standard transition hooks. Must be called inside a Tokio
    /// runtime: the liveness sweeper is spawned immediately.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
        effects: Arc<dyn SideEffects>,
    ) -> Self {
        Self::with_hooks(config, store, catalog, effects, TransitionHooks::standard())
    }

    pub fn with_hooks(
        config: SyncConfig,
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
        effects: Arc<dyn SideEffects>,
        hooks: TransitionHooks,
    ) -> Self {
        let hub = Arc::new(FanoutHub::new(
            config.subscriber_buffer,
            config.liveness_window(),
        ));

        let desk_context = DeskContext {
            store,
            catalog,
            effects,
            hub: hub.clone(),
            hooks: Arc::new(hooks),
            settings: DeskSettings::from_config(&config),
        };
        let desks = ActorRegistry::new(desk_context, config.mailbox_size);
        let tracks = ActorRegistry::new(config.geo.clone(), config.mailbox_size);

        let sweeper = tokio::spawn(sweep_loop(hub.clone(), config.sweep_interval()));

        info!(
            mailbox_size = config.mailbox_size,
            admission_wait_ms = config.admission_wait_ms,
            "Sync system started"
        );
        Self {
            config,
            desks,
            tracks,
            hub,
            assignments: DashMap::new(),
            sweeper,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<FanoutHub> {
        &self.hub
    }

    /// Client for a tenant's desk, spawning the desk on first use.
    pub fn tenant(&self, tenant_id: &str) -> TenantClient {
        TenantClient::new(
            self.desks.client(&tenant_id.to_string()),
            self.config.admission_wait(),
        )
    }

    /// Client for a driver's track, spawning the track on first use.
    pub fn track(&self, driver_id: &str) -> TrackClient {
        TrackClient::new(self.tracks.client(&driver_id.to_string()))
    }

    // ========== Orders ==========

    pub async fn create_order(
        &self,
        tenant_id: &str,
        idempotency_key: &str,
        payload: OrderPayload,
    ) -> Result<Admission, SyncError> {
        self.tenant(tenant_id)
            .create_order(idempotency_key, payload)
            .await
    }

    pub async fn transition_order(
        &self,
        tenant_id: &str,
        order_id: &str,
        to: OrderStatus,
        actor: Initiator,
        idempotency_key: Option<String>,
    ) -> Result<TransitionOutcome, SyncError> {
        let outcome = self
            .tenant(tenant_id)
            .transition_order(order_id, to, actor, idempotency_key)
            .await?;
        if outcome.order.status.is_terminal() {
            if let Some(driver_id) = outcome.order.driver_id() {
                let released = self
                    .assignments
                    .remove_if(driver_id, |_, a| a.order_id == order_id)
                    .is_some();
                if released {
                    debug!(%driver_id, %order_id, "Driver released");
                }
            }
        }
        Ok(outcome)
    }

    pub async fn fetch_order(&self, tenant_id: &str, order_id: &str) -> Result<Order, SyncError> {
        self.tenant(tenant_id).fetch_order(order_id).await
    }

    // ========== Delivery ==========

    /// Puts `driver_id` on `order_id` with the arrival time the dispatcher promised, if any.
    /// The driver's track starts from scratch.
    pub async fn assign_driver(
        &self,
        tenant_id: &str,
        order_id: &str,
        driver_id: &str,
        eta: Option<DateTime<Utc>>,
    ) -> Result<Order, SyncError> {
        let order = self
            .tenant(tenant_id)
            .assign_driver(order_id, driver_id, eta)
            .await?;
        self.reset_track(driver_id).await?;
        self.assignments.insert(
            driver_id.to_string(),
            Assignment {
                tenant_id: tenant_id.to_string(),
                order_id: order_id.to_string(),
            },
        );
        Ok(order)
    }

    /// Feeds one raw fix. An accepted fix is fanned out together with the smoothed position
    /// and stored on the order the driver is delivering.
    pub async fn report_location(
        &self,
        driver_id: &str,
        sample: PositionSample,
    ) -> Result<Ingestion, SyncError> {
        let ingestion = self.track(driver_id).ingest(sample).await?;
        if !ingestion.accepted() {
            return Ok(ingestion);
        }

        // The smoother has not ticked toward the new fix yet, so the fix itself is the
        // latest known position.
        let fix = sample.point();
        let smoothed = ingestion.position.map_or(fix, |p| p.point());
        self.hub.publish(&SyncEvent::driver_location(
            driver_id,
            fix,
            smoothed,
            sample.timestamp,
        ));

        let assignment = self.assignments.get(driver_id).map(|a| a.value().clone());
        if let Some(Assignment {
            tenant_id,
            order_id,
        }) = assignment
        {
            let driver_id = driver_id.to_string();
            if let Err(e) = self
                .tenant(&tenant_id)
                .record_position(&order_id, &driver_id, fix)
                .await
            {
                warn!(%driver_id, %order_id, error = %e, "Could not store driver position");
            }
        }
        Ok(ingestion)
    }

    pub async fn current_position(
        &self,
        driver_id: &str,
    ) -> Result<Option<SmoothedPosition>, SyncError> {
        self.track(driver_id).current_position().await
    }

    /// Forgets the driver's last accepted fix so the next one bootstraps a fresh track.
    pub async fn reset_track(&self, driver_id: &str) -> Result<(), SyncError> {
        self.track(driver_id).reset().await
    }

    // ========== Comandas ==========

    pub async fn update_comanda(
        &self,
        tenant_id: &str,
        comanda_id: Option<String>,
        op: ComandaOp,
        idempotency_key: Option<String>,
    ) -> Result<ComandaUpdate, SyncError> {
        self.tenant(tenant_id)
            .update_comanda(comanda_id, op, idempotency_key)
            .await
    }

    pub async fn fetch_comanda(
        &self,
        tenant_id: &str,
        comanda_id: &str,
    ) -> Result<ComandaUpdate, SyncError> {
        self.tenant(tenant_id).fetch_comanda(comanda_id).await
    }

    // ========== Realtime ==========

    pub fn subscribe(&self, key: SubscriberKey) -> Subscription {
        self.hub.subscribe(key)
    }

    pub fn heartbeat(&self, id: &ConnectionId) -> bool {
        self.hub.heartbeat(id)
    }

    pub fn unsubscribe(&self, id: &ConnectionId) -> bool {
        self.hub.disconnect(id)
    }

    /// Runs a liveness sweep now instead of waiting for the next interval.
    pub fn sweep_now(&self) -> usize {
        self.hub.sweep(Instant::now())
    }

    // ========== Offline replay ==========

    /// One replay pass over `queue`.
    pub async fn replay(&self, queue: &OfflineQueue) -> QueueResult<DrainReport> {
        let applier = DeskApplier { system: self };
        queue
            .drain(&applier, self.config.queue_retention(), Utc::now())
            .await
    }

    /// Replays `queue` with backoff until it settles.
    pub async fn replay_until_settled(&self, queue: &OfflineQueue) -> QueueResult<DrainReport> {
        let applier = DeskApplier { system: self };
        queue
            .drain_until_settled(
                &applier,
                self.config.queue_retention(),
                &self.config.queue_retry(),
            )
            .await
    }

    /// Stops the sweeper and waits for every actor to drain its mailbox.
    ///
    /// Clients handed out by [`tenant`](Self::tenant) and [`track`](Self::track) must be
    /// dropped first.
    pub async fn shutdown(self) {
        self.sweeper.abort();
        let desks = self.desks.len();
        let tracks = self.tracks.len();
        self.desks.shutdown().await;
        self.tracks.shutdown().await;
        info!(desks, tracks, "Sync system stopped");
    }
}

async fn sweep_loop(hub: Arc<FanoutHub>, every: std::time::Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        hub.sweep(Instant::now());
    }
}

/// Replays queued mutations through the tenant desks, using each mutation's `local_id` as
/// the idempotency key.
struct DeskApplier<'a> {
    system: &'a SyncSystem,
}

fn require_target<'t>(
    mutation: &QueuedMutation,
    target: Option<&'t str>,
) -> Result<&'t str, SyncError> {
    target.ok_or_else(|| {
        ValidationError::Malformed(format!("mutation {} has no target", mutation.local_id)).into()
    })
}

impl DeskApplier<'_> {
    async fn comanda(
        &self,
        mutation: &QueuedMutation,
        comanda_id: Option<String>,
        op: ComandaOp,
    ) -> Result<String, SyncError> {
        let update = self
            .system
            .update_comanda(
                &mutation.tenant_id,
                comanda_id,
                op,
                Some(mutation.local_id.clone()),
            )
            .await?;
        Ok(update.comanda.id)
    }
}

#[async_trait]
impl<'a> MutationApplier for DeskApplier<'a> {
    async fn apply(
        &self,
        mutation: &QueuedMutation,
        target: Option<&str>,
    ) -> Result<String, SyncError> {
        let tenant_id = mutation.tenant_id.as_str();
        match &mutation.operation {
            Operation::CreateOrder { payload } => {
                let admission = self
                    .system
                    .create_order(tenant_id, &mutation.local_id, payload.clone())
                    .await?;
                Ok(admission.order.id)
            }
            Operation::TransitionOrder { to } => {
                let order_id = require_target(mutation, target)?;
                let outcome = self
                    .system
                    .transition_order(
                        tenant_id,
                        order_id,
                        *to,
                        Initiator::System,
                        Some(mutation.local_id.clone()),
                    )
                    .await?;
                Ok(outcome.order.id)
            }
            Operation::AddComandaItem {
                sku,
                quantity,
                table_id,
            } => {
                let op = ComandaOp::AddItem {
                    sku: sku.clone(),
                    quantity: *quantity,
                    table_id: table_id.clone(),
                };
                self.comanda(mutation, target.map(str::to_string), op).await
            }
            Operation::RemoveComandaItem { sku } => {
                let id = require_target(mutation, target)?.to_string();
                let op = ComandaOp::RemoveItem { sku: sku.clone() };
                self.comanda(mutation, Some(id), op).await
            }
            Operation::CloseComanda => {
                let id = require_target(mutation, target)?.to_string();
                self.comanda(mutation, Some(id), ComandaOp::Close).await
            }
            Operation::CancelComanda => {
                let id = require_target(mutation, target)?.to_string();
                self.comanda(mutation, Some(id), ComandaOp::Cancel).await
            }
        }
    }
}
