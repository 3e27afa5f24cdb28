//! Domain data: orders, comandas, queued mutations, position samples and the events the hub
//! fans out. Everything here is plain data with serde derives; behavior lives in
//! [`state_machine`](crate::state_machine) and the actors.

pub mod comanda;
pub mod event;
pub mod mutation;
pub mod order;
pub mod position;

pub use comanda::*;
pub use event::*;
pub use mutation::*;
pub use order::*;
pub use position::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            id: "o-1".into(),
            code: "K7P2QX".into(),
            tenant_id: "t-1".into(),
            status: OrderStatus::New,
            items: vec![
                LineItem {
                    sku: "burger".into(),
                    quantity: 2,
                    unit_price: 1_250,
                },
                LineItem {
                    sku: "soda".into(),
                    quantity: 1,
                    unit_price: 500,
                },
            ],
            total: 3_000,
            customer_id: Some("c-9".into()),
            table_id: Some("12".into()),
            created_at: now,
            status_changed_at: now,
            delivery: None,
        }
    }

    #[test]
    fn test_items_total_checks_overflow() {
        assert_eq!(items_total(&order().items), Some(3_000));
        let huge = vec![LineItem {
            sku: "gold".into(),
            quantity: u32::MAX,
            unit_price: i64::MAX / 2,
        }];
        assert_eq!(items_total(&huge), None);
    }

    #[test]
    fn test_order_audience_covers_every_interested_key() {
        let mut o = order();
        o.delivery = Some(DeliveryInfo {
            driver_id: "d-3".into(),
            last_known_position: None,
            eta: None,
        });
        let keys = Audience::for_order(&o).keys();
        assert!(keys.contains(&SubscriberKey::tenant("t-1")));
        assert!(keys.contains(&SubscriberKey::table("t-1", "12")));
        assert!(keys.contains(&SubscriberKey::order("o-1")));
        assert!(keys.contains(&SubscriberKey::customer("c-9")));
        assert!(keys.contains(&SubscriberKey::driver("d-3")));
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
        assert_eq!(OrderStatus::OutForDelivery.to_string(), "out_for_delivery");
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
    }

    #[test]
    fn test_mutation_target_type_follows_operation() {
        let m = QueuedMutation::new(
            "L1",
            "t-1",
            Some(TargetRef::Local("L0".into())),
            Operation::RemoveComandaItem { sku: "A".into() },
        );
        assert_eq!(m.target_type, TargetType::Comanda);
        assert_eq!(m.attempt_count, 0);

        let json = serde_json::to_string(&m).unwrap();
        let back: QueuedMutation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
