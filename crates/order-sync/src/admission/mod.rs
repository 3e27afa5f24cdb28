//! # Tenant Desk
//!
//! One [`TenantDesk`] actor per tenant owns every write to that tenant's orders and comandas.
//!
//! ## Admission Flow
//!
//! ```text
//!  Admit{key, payload}
//!     │
//!     ├─ key seen within the dedup window? ──yes──► load order ──► DuplicateReturnedExisting
//!     │
//!     ├─ validate items (non-empty, quantity > 0, known + available sku)
//!     ├─ price from the catalog, checked total
//!     ├─ draw a code unused by this tenant
//!     ├─ persist (bounded retry)
//!     ├─ remember key ──► publish OrderCreated
//!     ▼
//!  Created
//! ```
//!
//! The key is recorded only after a successful persist: a request that failed validation or
//! persistence can be retried with the same key and is evaluated from scratch.
//!
//! ## Transitions
//!
//! Transitions go through the same desk so that the state-machine check and the write are one
//! step. Side effects declared in [`TransitionHooks`](crate::state_machine::TransitionHooks)
//! run after the write; a failing effect is logged and the transition stands.

mod actions;
mod code;
mod context;
mod dedup;
mod entity;

pub use actions::{
    Admission, AdmitOutcome, ComandaOp, ComandaUpdate, DeskAction, DeskReply, TransitionOutcome,
};
pub use code::{generate_unique, random_code, ALPHABET};
pub use context::{DeskContext, DeskSettings};
pub use dedup::{DedupTable, Recorded};
pub use entity::TenantDesk;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{MemoryCatalog, MemoryStore, RecordingEffects};
    use crate::error::{SyncError, ValidationError};
    use crate::hub::FanoutHub;
    use crate::model::{
        EventPayload, Initiator, ItemRequest, OrderPayload, OrderStatus, SubscriberKey,
    };
    use crate::retry::RetryPolicy;
    use crate::state_machine::{SideEffect, TransitionHooks};
    use actor_framework::{FrameworkError, ResourceActor, ResourceClient};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        client: ResourceClient<TenantDesk>,
        store: Arc<MemoryStore>,
        effects: Arc<RecordingEffects>,
        hub: Arc<FanoutHub>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let effects = Arc::new(RecordingEffects::new());
        let hub = Arc::new(FanoutHub::new(32, Duration::from_secs(60)));
        let catalog = MemoryCatalog::new()
            .with_shared_sku("burger", 1_250)
            .with_shared_sku("soda", 500);
        let ctx = DeskContext {
            store: store.clone(),
            catalog: Arc::new(catalog),
            effects: effects.clone(),
            hub: hub.clone(),
            hooks: Arc::new(TransitionHooks::standard()),
            settings: DeskSettings {
                persistence_retry: RetryPolicy::new(
                    3,
                    Duration::from_millis(1),
                    Duration::from_millis(4),
                ),
                ..DeskSettings::default()
            },
        };
        let (actor, client) = ResourceActor::<TenantDesk>::new("t-1".to_string(), 64);
        tokio::spawn(actor.run(ctx));
        Fixture {
            client,
            store,
            effects,
            hub,
        }
    }

    async fn send(f: &Fixture, action: DeskAction) -> Result<DeskReply, SyncError> {
        f.client.perform_action(action).await.map_err(SyncError::from)
    }

    fn admit(key: &str, payload: OrderPayload) -> DeskAction {
        DeskAction::Admit {
            idempotency_key: key.to_string(),
            payload,
        }
    }

    fn burgers(n: i64) -> OrderPayload {
        OrderPayload::new(vec![ItemRequest::new("burger", n)])
    }

    fn admitted(reply: DeskReply) -> Admission {
        match reply {
            DeskReply::Admitted(a) => a,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    fn transition(order_id: &str, to: OrderStatus) -> DeskAction {
        DeskAction::Transition {
            order_id: order_id.to_string(),
            to,
            actor: Initiator::Staff("s-1".into()),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_admission_prices_from_catalog() {
        let f = fixture();
        let payload = OrderPayload {
            client_total: Some(1),
            ..OrderPayload::new(vec![
                ItemRequest::new("burger", 2),
                ItemRequest::new("soda", 1),
            ])
        };
        let a = admitted(send(&f, admit("k1", payload)).await.unwrap());
        assert_eq!(a.outcome, AdmitOutcome::Created);
        assert_eq!(a.code(), "created");
        assert_eq!(a.order.total, 3_000);
        assert_eq!(a.order.status, OrderStatus::New);
        assert_eq!(a.order.code.len(), 6);
        assert_eq!(f.store.order_count("t-1"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_key_returns_the_same_order() {
        let f = fixture();
        let first = admitted(send(&f, admit("k1", burgers(1))).await.unwrap());
        // Different payload, same key: still the original order.
        let second = admitted(send(&f, admit("k1", burgers(5))).await.unwrap());
        assert_eq!(second.outcome, AdmitOutcome::DuplicateReturnedExisting);
        assert_eq!(second.order, first.order);
        assert_eq!(f.store.order_count("t-1"), 1);
    }

    #[tokio::test]
    async fn test_failed_validation_does_not_consume_the_key() {
        let f = fixture();
        let err = send(&f, admit("k1", burgers(0))).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Validation(ValidationError::NonPositiveQuantity {
                sku: "burger".into(),
                quantity: 0,
            })
        );
        let err = send(&f, admit("k2", OrderPayload::new(vec![ItemRequest::new("caviar", 1)])))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::Validation(ValidationError::UnknownSku("caviar".into()))
        );

        let a = admitted(send(&f, admit("k1", burgers(1))).await.unwrap());
        assert_eq!(a.outcome, AdmitOutcome::Created);
    }

    #[tokio::test]
    async fn test_persistence_hiccup_is_retried() {
        let f = fixture();
        f.store.fail_next_writes(2);
        let a = admitted(send(&f, admit("k1", burgers(1))).await.unwrap());
        assert_eq!(a.outcome, AdmitOutcome::Created);

        f.store.fail_next_writes(10);
        let err = send(&f, admit("k2", burgers(1))).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.store.order_count("t-1"), 1);
    }

    #[tokio::test]
    async fn test_transition_runs_hooks_and_publishes() {
        let f = fixture();
        let mut kitchen = f.hub.subscribe(SubscriberKey::tenant("t-1"));
        let order = admitted(send(&f, admit("k1", burgers(1))).await.unwrap()).order;
        assert!(matches!(
            kitchen.recv().await.map(|e| e.payload),
            Some(EventPayload::OrderCreated { .. })
        ));

        let reply = send(&f, transition(&order.id, OrderStatus::Accepted))
            .await
            .unwrap();
        let DeskReply::Transitioned(outcome) = reply else {
            panic!("unexpected reply");
        };
        let change = outcome.change.unwrap();
        assert_eq!(change.previous_status, OrderStatus::New);
        assert_eq!(change.new_status, OrderStatus::Accepted);
        assert_eq!(
            f.effects.executed().await,
            vec![(SideEffect::DecrementStock, order.id.clone())]
        );
        match kitchen.recv().await.map(|e| e.payload) {
            Some(EventPayload::OrderStatusChanged(event)) => assert_eq!(event, change),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_side_effect_keeps_transition() {
        let f = fixture();
        let order = admitted(send(&f, admit("k1", burgers(1))).await.unwrap()).order;
        f.effects.set_failing(true);
        send(&f, transition(&order.id, OrderStatus::Accepted))
            .await
            .unwrap();
        let DeskReply::Order(stored) = send(
            &f,
            DeskAction::FetchOrder {
                order_id: order.id.clone(),
            },
        )
        .await
        .unwrap() else {
            panic!("unexpected reply");
        };
        assert_eq!(stored.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn test_illegal_and_terminal_transitions_are_refused() {
        let f = fixture();
        let order = admitted(send(&f, admit("k1", burgers(1))).await.unwrap()).order;
        for to in [OrderStatus::Accepted, OrderStatus::Preparing, OrderStatus::Ready] {
            send(&f, transition(&order.id, to)).await.unwrap();
        }
        let err = send(&f, transition(&order.id, OrderStatus::New))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid-transition");

        send(&f, transition(&order.id, OrderStatus::Delivered))
            .await
            .unwrap();
        for to in OrderStatus::ALL {
            assert!(send(&f, transition(&order.id, to)).await.is_err());
        }

        let err = send(&f, transition("missing", OrderStatus::Accepted))
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::order_not_found("missing"));
    }

    #[tokio::test]
    async fn test_keyed_transition_is_applied_once() {
        let f = fixture();
        let order = admitted(send(&f, admit("k1", burgers(1))).await.unwrap()).order;
        let keyed = || DeskAction::Transition {
            order_id: order.id.clone(),
            to: OrderStatus::Accepted,
            actor: Initiator::System,
            idempotency_key: Some("t-k1".into()),
        };
        send(&f, keyed()).await.unwrap();
        let DeskReply::Transitioned(replay) = send(&f, keyed()).await.unwrap() else {
            panic!("unexpected reply");
        };
        assert!(replay.change.is_none());
        assert_eq!(replay.order.status, OrderStatus::Accepted);
        assert_eq!(f.effects.executed().await.len(), 1);
    }

    #[tokio::test]
    async fn test_comanda_lifecycle() {
        let f = fixture();
        let add = |comanda_id: Option<String>, key: &str| DeskAction::Comanda {
            comanda_id,
            op: ComandaOp::AddItem {
                sku: "soda".into(),
                quantity: 2,
                table_id: Some("12".into()),
            },
            idempotency_key: Some(key.to_string()),
        };
        let DeskReply::Comanda(opened) = send(&f, add(None, "c-k1")).await.unwrap() else {
            panic!("unexpected reply");
        };
        assert_eq!(opened.comanda.total, 1_000);
        let id = opened.comanda.id.clone();

        // Replay of the opening add does not open a second tab.
        let DeskReply::Comanda(replayed) = send(&f, add(None, "c-k1")).await.unwrap() else {
            panic!("unexpected reply");
        };
        assert!(replayed.replayed);
        assert_eq!(replayed.comanda.id, id);

        let DeskReply::Comanda(more) = send(&f, add(Some(id.clone()), "c-k2")).await.unwrap()
        else {
            panic!("unexpected reply");
        };
        assert_eq!(more.comanda.items.len(), 1);
        assert_eq!(more.comanda.total, 2_000);

        send(
            &f,
            DeskAction::Comanda {
                comanda_id: Some(id.clone()),
                op: ComandaOp::Close,
                idempotency_key: None,
            },
        )
        .await
        .unwrap();
        let err = send(&f, add(Some(id), "c-k3")).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::ComandaNotOpen(_))
        ));
    }

    #[tokio::test]
    async fn test_driver_assignment_and_position() {
        let f = fixture();
        let order = admitted(send(&f, admit("k1", burgers(1))).await.unwrap()).order;
        send(
            &f,
            DeskAction::AssignDriver {
                order_id: order.id.clone(),
                driver_id: "d-1".into(),
                eta: None,
            },
        )
        .await
        .unwrap();

        let wrong_driver = send(
            &f,
            DeskAction::RecordPosition {
                order_id: order.id.clone(),
                driver_id: "d-2".into(),
                position: crate::model::GeoPoint::new(1.0, 1.0),
            },
        )
        .await;
        assert!(wrong_driver.is_err());

        let DeskReply::Order(updated) = send(
            &f,
            DeskAction::RecordPosition {
                order_id: order.id.clone(),
                driver_id: "d-1".into(),
                position: crate::model::GeoPoint::new(1.0, 1.0),
            },
        )
        .await
        .unwrap() else {
            panic!("unexpected reply");
        };
        let delivery = updated.delivery.unwrap();
        assert_eq!(delivery.driver_id, "d-1");
        assert!(delivery.last_known_position.is_some());
    }

    #[tokio::test]
    async fn test_expired_request_is_answered_with_timeout() {
        let f = fixture();
        let err = f
            .client
            .perform_action_within(admit("k1", burgers(1)), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::Timeout));
    }
}
