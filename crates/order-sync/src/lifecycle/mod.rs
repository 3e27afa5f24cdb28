//! # System Lifecycle & Orchestration
//!
//! Individual actors are simple; wiring them together is where the complexity lives. This
//! module holds the conductor, [`SyncSystem`], and the tracing setup for the binary.
//!
//! ## Responsibilities
//!
//! 1. **Actor Creation** - Two registries: one [`TenantDesk`](crate::admission::TenantDesk) per
//!    tenant, one [`DriverTrack`](crate::tracking::DriverTrack) per driver, both spawned lazily
//! 2. **Dependency Injection** - Every desk receives the same store, catalog, effects, hooks
//!    and hub through its context
//! 3. **Cross-actor Flows** - Driver assignment (desk, then track reset), location reports
//!    (track, then hub, then desk) and offline replay
//! 4. **Graceful Shutdown** - Stop the liveness sweeper, then drain every registry
//!
//! ## Dependency Injection via Context
//!
//! Desks never hold clients to other desks, so the dependency graph is acyclic and shutdown
//! by channel closure is deterministic:
//!
//! ```rust,ignore
//! impl ActorEntity for TenantDesk {
//!     type Context = DeskContext; // store, catalog, effects, hub, hooks, settings
//! }
//!
//! impl ActorEntity for DriverTrack {
//!     type Context = GeoConfig;
//! }
//! ```
//!
//! ## Graceful Shutdown
//!
//! 1. **Drop all clients** - Registries own the only long-lived senders
//! 2. **Actors detect closure** - `receiver.recv()` returns `None` after the mailbox is empty
//! 3. **Actors clean up** - `on_stop` logs the final counters
//! 4. **Await completion** - [`SyncSystem::shutdown`] joins every actor task

pub mod sync_system;
pub mod tracing;

pub use self::sync_system::SyncSystem;
pub use self::tracing::setup_tracing;
