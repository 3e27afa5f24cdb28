//! Order status transitions.
//!
//! ```text
//!  new ──► accepted ──► preparing ──► ready ──► out_for_delivery ──► delivered
//!   │         │             │           │  └──────────────────────────► ▲ (pickup)
//!   │         │             │           │               │
//!   └─────────┴─────────────┴───────────┴───────────────┴──► cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal.

use crate::error::TransitionError;
use crate::model::{Initiator, Order, OrderStatus, OrderStatusChanged};
use chrono::{DateTime, Utc};

use OrderStatus::*;

/// Every legal `(from, to)` edge. Anything else is an [`TransitionError`].
pub const TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (New, Accepted),
    (Accepted, Preparing),
    (Preparing, Ready),
    (Ready, OutForDelivery),
    (OutForDelivery, Delivered),
    (Ready, Delivered),
    (New, Cancelled),
    (Accepted, Cancelled),
    (Preparing, Cancelled),
    (Ready, Cancelled),
    (OutForDelivery, Cancelled),
];

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    TRANSITIONS.contains(&(from, to))
}

/// Statuses reachable from `from` in one step.
pub fn next_statuses(from: OrderStatus) -> impl Iterator<Item = OrderStatus> {
    TRANSITIONS
        .iter()
        .filter(move |(f, _)| *f == from)
        .map(|(_, t)| *t)
}

/// Applies a transition without touching the input.
///
/// Returns the updated order together with the single event describing the change.
pub fn apply(
    order: &Order,
    to: OrderStatus,
    actor: &Initiator,
    now: DateTime<Utc>,
) -> Result<(Order, OrderStatusChanged), TransitionError> {
    let from = order.status;
    if !can_transition(from, to) {
        return Err(TransitionError { from, to });
    }

    let mut next = order.clone();
    next.status = to;
    next.status_changed_at = now;

    let event = OrderStatusChanged {
        order_id: order.id.clone(),
        previous_status: from,
        new_status: to,
        timestamp: now,
        changed_by: actor.clone(),
    };
    Ok((next, event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;

    fn order_in(status: OrderStatus) -> Order {
        let t = Utc::now();
        Order {
            id: "o-1".into(),
            code: "ABC234".into(),
            tenant_id: "t-1".into(),
            status,
            items: vec![LineItem {
                sku: "pizza".into(),
                quantity: 1,
                unit_price: 4_000,
            }],
            total: 4_000,
            customer_id: None,
            table_id: None,
            created_at: t,
            status_changed_at: t,
            delivery: None,
        }
    }

    #[test]
    fn test_happy_path_delivery() {
        let staff = Initiator::Staff("kitchen".into());
        let mut order = order_in(New);
        for to in [Accepted, Preparing, Ready, OutForDelivery, Delivered] {
            let (next, event) = apply(&order, to, &staff, Utc::now()).unwrap();
            assert_eq!(event.previous_status, order.status);
            assert_eq!(event.new_status, to);
            assert_eq!(event.order_id, "o-1");
            assert_eq!(next.status, to);
            order = next;
        }
    }

    #[test]
    fn test_pickup_skips_delivery() {
        let (next, _) = apply(&order_in(Ready), Delivered, &Initiator::System, Utc::now()).unwrap();
        assert_eq!(next.status, Delivered);
    }

    #[test]
    fn test_ready_back_to_new_is_rejected_and_order_unchanged() {
        let order = order_in(Ready);
        let before = order.clone();
        let err = apply(&order, New, &Initiator::System, Utc::now()).unwrap_err();
        assert_eq!(err, TransitionError { from: Ready, to: New });
        assert_eq!(order, before);
    }

    #[test]
    fn test_only_table_edges_succeed() {
        let now = Utc::now();
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let result = apply(&order_in(from), to, &Initiator::System, now);
                assert_eq!(
                    result.is_ok(),
                    TRANSITIONS.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [Delivered, Cancelled] {
            assert_eq!(next_statuses(terminal).count(), 0);
        }
        // Every non-terminal state can be cancelled.
        for from in OrderStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(can_transition(from, Cancelled), "{from} should cancel");
        }
    }
}
