//! # State Machines
//!
//! Pure transition logic for orders and comandas. Nothing in here performs I/O: functions take
//! the current record and return the next one (plus, for orders, the event describing the
//! change). The tenant desk is the only caller that persists the result.
//!
//! ## Side Effects
//!
//! Effects gated by a transition (stock, billing) are declared in [`TransitionHooks`] and
//! executed by the caller after a successful apply. A failing effect never rolls back the
//! transition.

pub mod comanda;
pub mod hooks;
pub mod order;

pub use hooks::{FromStatus, Hook, SideEffect, TransitionHooks};
pub use order::{apply, can_transition, next_statuses, TRANSITIONS};
