//! Declarative side effects keyed by transition edge.
//!
//! The transition function stays pure. After a successful [`apply`](super::apply) the caller
//! looks up the effects for the edge it just took and hands them to a
//! [`SideEffects`](crate::collab::SideEffects) executor.

use crate::model::OrderStatus;
use serde::{Deserialize, Serialize};

/// Work that must happen outside the state machine when an edge is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    DecrementStock,
    RestoreStock,
    StopBillingAccrual,
}

/// Matches the `from` side of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromStatus {
    Any,
    Is(OrderStatus),
    OneOf(&'static [OrderStatus]),
}

impl FromStatus {
    fn matches(self, status: OrderStatus) -> bool {
        match self {
            FromStatus::Any => true,
            FromStatus::Is(s) => s == status,
            FromStatus::OneOf(set) => set.contains(&status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hook {
    pub from: FromStatus,
    pub to: OrderStatus,
    pub effect: SideEffect,
}

/// Stock was taken on `accepted`; these are the states where it is still held.
const STOCK_HELD: &[OrderStatus] = &[
    OrderStatus::Accepted,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
];

#[derive(Debug, Clone)]
pub struct TransitionHooks {
    hooks: Vec<Hook>,
}

impl Default for TransitionHooks {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransitionHooks {
    pub fn empty() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Stock moves with acceptance and cancellation; billing stops at the end of the line.
    pub fn standard() -> Self {
        Self::empty()
            .on(FromStatus::Any, OrderStatus::Accepted, SideEffect::DecrementStock)
            .on(
                FromStatus::OneOf(STOCK_HELD),
                OrderStatus::Cancelled,
                SideEffect::RestoreStock,
            )
            .on(
                FromStatus::Any,
                OrderStatus::Delivered,
                SideEffect::StopBillingAccrual,
            )
            .on(
                FromStatus::Any,
                OrderStatus::Cancelled,
                SideEffect::StopBillingAccrual,
            )
    }

    pub fn on(mut self, from: FromStatus, to: OrderStatus, effect: SideEffect) -> Self {
        self.hooks.push(Hook { from, to, effect });
        self
    }

    /// Effects for the edge `from -> to`, in registration order.
    pub fn effects_for(&self, from: OrderStatus, to: OrderStatus) -> Vec<SideEffect> {
        self.hooks
            .iter()
            .filter(|h| h.to == to && h.from.matches(from))
            .map(|h| h.effect)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_hooks() {
        let hooks = TransitionHooks::standard();
        assert_eq!(
            hooks.effects_for(OrderStatus::New, OrderStatus::Accepted),
            vec![SideEffect::DecrementStock]
        );
        assert_eq!(
            hooks.effects_for(OrderStatus::OutForDelivery, OrderStatus::Delivered),
            vec![SideEffect::StopBillingAccrual]
        );
        // Cancelling before acceptance has no stock to give back.
        assert_eq!(
            hooks.effects_for(OrderStatus::New, OrderStatus::Cancelled),
            vec![SideEffect::StopBillingAccrual]
        );
        assert_eq!(
            hooks.effects_for(OrderStatus::Preparing, OrderStatus::Cancelled),
            vec![SideEffect::RestoreStock, SideEffect::StopBillingAccrual]
        );
        assert!(hooks
            .effects_for(OrderStatus::Accepted, OrderStatus::Preparing)
            .is_empty());
    }

    #[test]
    fn test_custom_hook() {
        let hooks = TransitionHooks::empty().on(
            FromStatus::Is(OrderStatus::Ready),
            OrderStatus::OutForDelivery,
            SideEffect::StopBillingAccrual,
        );
        assert_eq!(
            hooks.effects_for(OrderStatus::Ready, OrderStatus::OutForDelivery),
            vec![SideEffect::StopBillingAccrual]
        );
        assert!(hooks
            .effects_for(OrderStatus::Ready, OrderStatus::Delivered)
            .is_empty());
    }
}
