//! # Order Sync
//!
//! Real-time order synchronization for multi-tenant restaurants: order admission, the order
//! state machine, dine-in comandas, driver tracking, realtime fan-out and offline replay.
//!
//! ## Core Components
//!
//! - **[admission]**: [`TenantDesk`](admission::TenantDesk), the per-tenant single writer.
//!   Idempotent admission, unique short codes, transitions with side-effect hooks.
//! - **[state_machine]**: Pure transition rules for orders and comandas.
//! - **[tracking]**: [`DriverTrack`](tracking::DriverTrack), per-driver fix validation and
//!   display smoothing.
//! - **[hub]**: [`FanoutHub`](hub::FanoutHub), best-effort push to subscribed connections.
//! - **[queue]**: [`OfflineQueue`](queue::OfflineQueue), durable FIFO replay of offline writes.
//! - **[collab]**: Ports for persistence, catalog and side effects, with in-memory versions.
//! - **[lifecycle]**: [`SyncSystem`](lifecycle::SyncSystem), which wires it all together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use order_sync::collab::{LoggingEffects, MemoryCatalog, MemoryStore};
//! use order_sync::config::SyncConfig;
//! use order_sync::lifecycle::SyncSystem;
//! use order_sync::model::{ItemRequest, OrderPayload, SubscriberKey};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = MemoryCatalog::new().with_shared_sku("burger", 1_250);
//!     let system = SyncSystem::new(
//!         SyncConfig::default(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(catalog),
//!         Arc::new(LoggingEffects),
//!     );
//!
//!     let mut kitchen = system.subscribe(SubscriberKey::tenant("t-1"));
//!     let payload = OrderPayload::new(vec![ItemRequest::new("burger", 2)]);
//!     let admission = system.create_order("t-1", "req-1", payload).await?;
//!     println!("{} -> {:?}", admission.order.code, kitchen.recv().await.map(|e| e.kind()));
//!
//!     system.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing
//!
//! Unit tests live next to each module. `tests/integration_test.rs` drives the whole system
//! with in-memory collaborators. See [`actor_framework::mock`] for testing clients without
//! spawning actors.

pub mod admission;
pub mod clients;
pub mod collab;
pub mod config;
pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod model;
pub mod queue;
pub mod retry;
pub mod state_machine;
pub mod tracking;
