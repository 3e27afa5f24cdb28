use super::actions::{
    Admission, AdmitOutcome, ComandaOp, ComandaUpdate, DeskAction, DeskReply, TransitionOutcome,
};
use super::code::{generate_unique, random_code};
use super::context::DeskContext;
use super::dedup::{DedupTable, Recorded};
use crate::error::{SyncError, ValidationError};
use crate::model::{
    items_total, Comanda, DeliveryInfo, DriverId, GeoPoint, Initiator, ItemRequest, LineItem,
    Order, OrderId, OrderPayload, OrderStatus, SyncEvent, TenantId,
};
use crate::state_machine::{self, comanda};
use actor_framework::ActorEntity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Expired idempotency keys are swept every this many requests.
const PURGE_EVERY: u64 = 256;

/// The single serialization point for one tenant's orders and comandas.
///
/// Every write for the tenant goes through this entity, so the dedup check, the code
/// uniqueness check and the persist happen as one step with respect to other requests.
pub struct TenantDesk {
    tenant_id: TenantId,
    dedup: DedupTable,
    handled: u64,
    admitted: u64,
}

#[async_trait]
impl ActorEntity for TenantDesk {
    type Id = TenantId;
    type Action = DeskAction;
    type ActionResult = DeskReply;
    type Context = DeskContext;
    type Error = SyncError;

    fn from_id(id: TenantId, ctx: &DeskContext) -> Self {
        Self {
            tenant_id: id,
            dedup: DedupTable::new(ctx.settings.dedup_window),
            handled: 0,
            admitted: 0,
        }
    }

    async fn on_start(&mut self, _ctx: &DeskContext) -> Result<(), SyncError> {
        info!(tenant_id = %self.tenant_id, "Tenant desk open");
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: DeskAction,
        ctx: &DeskContext,
    ) -> Result<DeskReply, SyncError> {
        self.handled += 1;
        if self.handled % PURGE_EVERY == 0 {
            let purged = self.dedup.purge_expired(Instant::now());
            debug!(tenant_id = %self.tenant_id, purged, "Purged idempotency keys");
        }

        match action {
            DeskAction::Admit {
                idempotency_key,
                payload,
            } => self
                .admit(ctx, idempotency_key, payload)
                .await
                .map(DeskReply::Admitted),
            DeskAction::Transition {
                order_id,
                to,
                actor,
                idempotency_key,
            } => self
                .transition(ctx, order_id, to, actor, idempotency_key)
                .await
                .map(DeskReply::Transitioned),
            DeskAction::FetchOrder { order_id } => {
                self.load_order(ctx, &order_id).await.map(DeskReply::Order)
            }
            DeskAction::AssignDriver {
                order_id,
                driver_id,
                eta,
            } => self
                .assign_driver(ctx, &order_id, driver_id, eta)
                .await
                .map(DeskReply::Order),
            DeskAction::RecordPosition {
                order_id,
                driver_id,
                position,
            } => self
                .record_position(ctx, &order_id, &driver_id, position)
                .await
                .map(DeskReply::Order),
            DeskAction::Comanda {
                comanda_id,
                op,
                idempotency_key,
            } => self
                .comanda(ctx, comanda_id, op, idempotency_key)
                .await
                .map(DeskReply::Comanda),
            DeskAction::FetchComanda { comanda_id } => self
                .load_comanda(ctx, &comanda_id)
                .await
                .map(|comanda| {
                    DeskReply::Comanda(ComandaUpdate {
                        comanda,
                        replayed: false,
                    })
                }),
        }
    }

    async fn on_stop(&mut self, _ctx: &DeskContext) {
        info!(
            tenant_id = %self.tenant_id,
            admitted = self.admitted,
            remembered_keys = self.dedup.len(),
            "Tenant desk closed"
        );
    }
}

impl TenantDesk {
    async fn admit(
        &mut self,
        ctx: &DeskContext,
        idempotency_key: String,
        payload: OrderPayload,
    ) -> Result<Admission, SyncError> {
        if idempotency_key.trim().is_empty() {
            return Err(ValidationError::Malformed("idempotency key is empty".into()).into());
        }

        if let Some(recorded) = self.dedup.lookup(&idempotency_key, Instant::now()) {
            let Recorded::Order(order_id) = recorded else {
                return Err(key_reused(&idempotency_key));
            };
            let order = self.load_order(ctx, &order_id).await?;
            info!(tenant_id = %self.tenant_id, %order_id, "Duplicate admission");
            return Ok(Admission {
                order,
                outcome: AdmitOutcome::DuplicateReturnedExisting,
            });
        }

        if payload.items.is_empty() {
            return Err(ValidationError::EmptyItems.into());
        }
        for req in &payload.items {
            check_quantity(req)?;
        }
        let mut items = Vec::with_capacity(payload.items.len());
        for req in &payload.items {
            items.push(self.price(ctx, &req.sku, req.quantity).await?);
        }
        let total = items_total(&items).ok_or(ValidationError::TotalOverflow)?;
        if let Some(client_total) = payload.client_total {
            if client_total != total {
                warn!(
                    tenant_id = %self.tenant_id,
                    client_total,
                    total,
                    "Client total disagrees with catalog prices; using catalog"
                );
            }
        }

        let settings = ctx.settings;
        let code = generate_unique(
            ctx.store.as_ref(),
            &self.tenant_id,
            settings.code_attempts,
            &settings.persistence_retry,
            move || random_code(&mut rand::thread_rng(), settings.code_length),
        )
        .await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            code,
            tenant_id: self.tenant_id.clone(),
            status: OrderStatus::New,
            items,
            total,
            customer_id: payload.customer_id,
            table_id: payload.table_id,
            created_at: now,
            status_changed_at: now,
            delivery: None,
        };
        self.persist_order(ctx, &order).await?;
        self.dedup.record(
            idempotency_key,
            Recorded::Order(order.id.clone()),
            Instant::now(),
        );
        self.admitted += 1;

        info!(
            tenant_id = %self.tenant_id,
            order_id = %order.id,
            code = %order.code,
            total = order.total,
            "Order admitted"
        );
        ctx.hub.publish(&SyncEvent::order_created(&order));
        Ok(Admission {
            order,
            outcome: AdmitOutcome::Created,
        })
    }

    async fn transition(
        &mut self,
        ctx: &DeskContext,
        order_id: OrderId,
        to: OrderStatus,
        actor: Initiator,
        idempotency_key: Option<String>,
    ) -> Result<TransitionOutcome, SyncError> {
        if let Some(key) = idempotency_key.as_deref() {
            match self.dedup.lookup(key, Instant::now()) {
                Some(Recorded::Order(id)) if id == order_id => {
                    let order = self.load_order(ctx, &order_id).await?;
                    debug!(tenant_id = %self.tenant_id, %order_id, "Replayed transition");
                    return Ok(TransitionOutcome {
                        order,
                        change: None,
                    });
                }
                Some(_) => return Err(key_reused(key)),
                None => {}
            }
        }

        let order = self.load_order(ctx, &order_id).await?;
        let (next, change) = state_machine::apply(&order, to, &actor, Utc::now()).map_err(|e| {
            warn!(tenant_id = %self.tenant_id, %order_id, %actor, error = %e, "Transition refused");
            e
        })?;
        self.persist_order(ctx, &next).await?;
        if let Some(key) = idempotency_key {
            self.dedup
                .record(key, Recorded::Order(next.id.clone()), Instant::now());
        }

        for effect in ctx.hooks.effects_for(change.previous_status, change.new_status) {
            let result = ctx
                .settings
                .persistence_retry
                .run("side_effect", || ctx.effects.execute(effect, &next))
                .await;
            if let Err(e) = result {
                warn!(
                    tenant_id = %self.tenant_id,
                    %order_id,
                    ?effect,
                    error = %e,
                    "Side effect failed; transition stands"
                );
            }
        }

        info!(
            tenant_id = %self.tenant_id,
            %order_id,
            from = %change.previous_status,
            to = %change.new_status,
            by = %change.changed_by,
            "Order transitioned"
        );
        ctx.hub
            .publish(&SyncEvent::status_changed(&next, change.clone()));
        Ok(TransitionOutcome {
            order: next,
            change: Some(change),
        })
    }

    async fn assign_driver(
        &mut self,
        ctx: &DeskContext,
        order_id: &str,
        driver_id: DriverId,
        eta: Option<DateTime<Utc>>,
    ) -> Result<Order, SyncError> {
        let mut order = self.load_order(ctx, order_id).await?;
        if order.status.is_terminal() {
            return Err(ValidationError::OrderFinished(order.status).into());
        }
        order.delivery = Some(DeliveryInfo {
            driver_id: driver_id.clone(),
            last_known_position: None,
            eta,
        });
        self.persist_order(ctx, &order).await?;
        info!(tenant_id = %self.tenant_id, %order_id, %driver_id, "Driver assigned");
        ctx.hub
            .publish(&SyncEvent::driver_assigned(&order, &driver_id));
        Ok(order)
    }

    async fn record_position(
        &mut self,
        ctx: &DeskContext,
        order_id: &str,
        driver_id: &str,
        position: GeoPoint,
    ) -> Result<Order, SyncError> {
        let mut order = self.load_order(ctx, order_id).await?;
        if order.status.is_terminal() {
            return Err(ValidationError::OrderFinished(order.status).into());
        }
        match order.delivery.as_mut() {
            Some(delivery) if delivery.driver_id == driver_id => {
                delivery.last_known_position = Some(position);
            }
            _ => {
                return Err(ValidationError::Malformed(format!(
                    "driver {driver_id} is not assigned to order {order_id}"
                ))
                .into());
            }
        }
        self.persist_order(ctx, &order).await?;
        Ok(order)
    }

    async fn comanda(
        &mut self,
        ctx: &DeskContext,
        comanda_id: Option<String>,
        op: ComandaOp,
        idempotency_key: Option<String>,
    ) -> Result<ComandaUpdate, SyncError> {
        if let Some(key) = idempotency_key.as_deref() {
            match self.dedup.lookup(key, Instant::now()) {
                Some(Recorded::Comanda(id)) => {
                    let comanda = self.load_comanda(ctx, &id).await?;
                    return Ok(ComandaUpdate {
                        comanda,
                        replayed: true,
                    });
                }
                Some(Recorded::Order(_)) => return Err(key_reused(key)),
                None => {}
            }
        }

        let now = Utc::now();
        let current = match (comanda_id, &op) {
            (Some(id), _) => self.load_comanda(ctx, &id).await?,
            (None, ComandaOp::AddItem { table_id, .. }) => Comanda::open(
                Uuid::new_v4().to_string(),
                self.tenant_id.clone(),
                table_id.clone(),
                now,
            ),
            (None, _) => {
                return Err(ValidationError::Malformed("comanda id is required".into()).into())
            }
        };

        let next = match op {
            ComandaOp::AddItem { sku, quantity, .. } => {
                check_quantity(&ItemRequest::new(sku.as_str(), quantity))?;
                let item = self.price(ctx, &sku, quantity).await?;
                comanda::add_item(&current, item, now)?
            }
            ComandaOp::RemoveItem { sku } => comanda::remove_item(&current, &sku, now)?,
            ComandaOp::Close => comanda::close(&current, now)?,
            ComandaOp::Cancel => comanda::cancel(&current, now)?,
        };

        self.persist_comanda(ctx, &next).await?;
        if let Some(key) = idempotency_key {
            self.dedup
                .record(key, Recorded::Comanda(next.id.clone()), Instant::now());
        }
        debug!(
            tenant_id = %self.tenant_id,
            comanda_id = %next.id,
            status = %next.status,
            total = next.total,
            "Comanda updated"
        );
        ctx.hub.publish(&SyncEvent::comanda_changed(&next));
        Ok(ComandaUpdate {
            comanda: next,
            replayed: false,
        })
    }

    /// Resolves a sku against the catalog. Quantity must already be checked.
    async fn price(
        &self,
        ctx: &DeskContext,
        sku: &str,
        quantity: i64,
    ) -> Result<LineItem, SyncError> {
        let quantity = u32::try_from(quantity).map_err(|_| {
            ValidationError::Malformed(format!("quantity for {sku} is out of range"))
        })?;
        let info = ctx
            .settings
            .persistence_retry
            .run("resolve_sku", || ctx.catalog.resolve_sku(&self.tenant_id, sku))
            .await?
            .ok_or_else(|| ValidationError::UnknownSku(sku.to_string()))?;
        if !info.available {
            return Err(ValidationError::SkuUnavailable(sku.to_string()).into());
        }
        Ok(LineItem {
            sku: sku.to_string(),
            quantity,
            unit_price: info.unit_price,
        })
    }

    async fn load_order(&self, ctx: &DeskContext, order_id: &str) -> Result<Order, SyncError> {
        ctx.settings
            .persistence_retry
            .run("load_order", || ctx.store.load_order(&self.tenant_id, order_id))
            .await?
            .ok_or_else(|| SyncError::order_not_found(order_id))
    }

    async fn load_comanda(
        &self,
        ctx: &DeskContext,
        comanda_id: &str,
    ) -> Result<Comanda, SyncError> {
        ctx.settings
            .persistence_retry
            .run("load_comanda", || {
                ctx.store.load_comanda(&self.tenant_id, comanda_id)
            })
            .await?
            .ok_or_else(|| SyncError::comanda_not_found(comanda_id))
    }

    async fn persist_order(&self, ctx: &DeskContext, order: &Order) -> Result<(), SyncError> {
        ctx.settings
            .persistence_retry
            .run("save_order", || ctx.store.save_order(order))
            .await?;
        Ok(())
    }

    async fn persist_comanda(&self, ctx: &DeskContext, comanda: &Comanda) -> Result<(), SyncError> {
        ctx.settings
            .persistence_retry
            .run("save_comanda", || ctx.store.save_comanda(comanda))
            .await?;
        Ok(())
    }
}

fn check_quantity(req: &ItemRequest) -> Result<(), ValidationError> {
    if req.quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity {
            sku: req.sku.clone(),
            quantity: req.quantity,
        });
    }
    Ok(())
}

fn key_reused(key: &str) -> SyncError {
    ValidationError::Malformed(format!("idempotency key {key} was used for another target")).into()
}
