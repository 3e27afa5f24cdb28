//! # ActorEntity Trait
//!
//! The `ActorEntity` trait defines the contract for state that is owned by exactly one actor.
//! Where a database would put a row lock, we put a task: every request touching the entity
//! goes through the owning actor's mailbox and is handled one at a time.
//!
//! # Keyed Ownership
//! An entity is identified by its `Id` (a tenant, a driver, a device). The
//! [`ActorRegistry`](crate::ActorRegistry) spawns the owning actor the first time an id is
//! seen and builds the entity with [`ActorEntity::from_id`]. Two different ids never share an
//! actor, so they never wait on each other.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::on_start`] runs once before the first request is handled.
//! - [`ActorEntity::on_stop`] runs once after the mailbox closes.
//!
//! Both default to doing nothing.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// State owned by a single [`ResourceActor`](crate::ResourceActor).
///
/// # Async & Context
/// The trait is `#[async_trait]` so handlers can await collaborators (storage, catalogs, other
/// actors). The `Context` is injected into every hook at `run()` time; it must be `Clone`
/// because a registry hands one copy to every actor it spawns.
#[async_trait]
pub trait ActorEntity: Send + 'static {
    /// Key that selects the owning actor (e.g. a tenant id).
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// Requests the entity understands.
    type Action: Send + Debug + 'static;

    /// The result type returned by actions.
    type ActionResult: Send + Debug + 'static;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Clone + Send + Sync + 'static;

    /// The error type for this entity.
    ///
    /// The framework forwards it untouched inside
    /// [`FrameworkError::Entity`](crate::FrameworkError::Entity), so callers can still match
    /// on the concrete variants.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build the entity for a freshly spawned actor.
    fn from_id(id: Self::Id, ctx: &Self::Context) -> Self;

    /// Called once, before the first action.
    async fn on_start(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle one action. Actions are never interleaved.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;

    /// Called once after the mailbox closes.
    async fn on_stop(&mut self, _ctx: &Self::Context) {}
}
