//! # Actor Framework
//!
//! This crate provides the foundational building blocks for keyed, single-writer actor systems
//! in Rust. Every piece of mutable state lives inside exactly one actor, addressed by a key
//! (a tenant, a driver, a device), and every change to it goes through that actor's mailbox.
//!
//! ## Why Keyed Actors?
//!
//! ### Actor Model
//!
//! - Isolated state (no shared memory, no locks)
//! - Message-passing concurrency
//! - Sequential processing within each actor eliminates race conditions
//!
//! ### Keyed Ownership
//!
//! - **Isolation**: Each key gets its own actor, so a slow or failing key never stalls another
//! - **Serialization**: Requests for the same key are handled one at a time, in arrival order,
//!   which turns "check then write" sequences into atomic steps
//! - **Laziness**: The [`ActorRegistry`] spawns an actor the first time its key is used
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model) - Foundational concurrency pattern by Carl Hewitt
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into three layers:
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - Your business logic and domain state
//! 2. **Runtime Layer** ([`ResourceActor`], [`ActorRegistry`]) - Message processing and concurrency
//! 3. **Interface Layer** ([`ResourceClient`], [`ActorClient`]) - Type-safe communication
//!
//! ## Core Abstractions
//!
//! ### [`ActorEntity`] - The Business Logic
//!
//! ```rust
//! use actor_framework::{ActorEntity, ActorRegistry};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct Tally { key: String, total: u64 }
//!
//! #[derive(Debug)]
//! enum TallyAction { Add(u64), Read }
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("tally overflow")]
//! struct Overflow;
//!
//! #[async_trait]
//! impl ActorEntity for Tally {
//!     type Id = String;
//!     type Action = TallyAction;
//!     type ActionResult = u64;
//!     type Context = ();
//!     type Error = Overflow;
//!
//!     fn from_id(key: String, _ctx: &()) -> Self {
//!         Self { key, total: 0 }
//!     }
//!
//!     async fn handle_action(&mut self, action: TallyAction, _ctx: &()) -> Result<u64, Overflow> {
//!         match action {
//!             TallyAction::Add(n) => {
//!                 self.total = self.total.checked_add(n).ok_or(Overflow)?;
//!                 Ok(self.total)
//!             }
//!             TallyAction::Read => Ok(self.total),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ActorRegistry::<Tally>::new((), 16);
//!
//!     let a = registry.client(&"a".to_string());
//!     let b = registry.client(&"b".to_string());
//!     a.perform_action(TallyAction::Add(2)).await.unwrap();
//!     b.perform_action(TallyAction::Add(40)).await.unwrap();
//!
//!     let total = a
//!         .perform_action_within(TallyAction::Read, Duration::from_secs(1))
//!         .await
//!         .unwrap();
//!     assert_eq!(total, 2);
//! }
//! ```
//!
//! ## Context Injection Pattern
//!
//! Dependencies (stores, catalogs, publishers, other actors' clients) are injected at
//! **runtime** through `run(context)`, not at construction time. A registry clones its context
//! into every actor it spawns, so the context is usually a struct of `Arc`s.
//!
//! ## Deadlines
//!
//! [`ResourceClient::perform_action_within`] bounds how long a request may wait, both for a
//! mailbox slot and for its turn in the actor. A request that is already being handled is never
//! abandoned, so a timeout always means "not applied".
//!
//! ## Concurrency Model
//!
//! - Each actor runs in its own Tokio task
//! - Messages are processed **sequentially** within an actor (no locks needed!)
//! - Multiple actors run in **parallel** (true concurrency)
//! - No shared mutable state (message passing only)
//!
//! ## Testing
//!
//! The [`mock`] module answers requests from a queue of expectations, which makes it easy to
//! test wrappers and orchestrators without spawning the real entity.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;
pub mod registry;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
pub use registry::ActorRegistry;
