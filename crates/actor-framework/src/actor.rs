//! # Generic Actor Server
//!
//! This module defines the `ResourceActor`, the task that owns one entity and handles its
//! requests strictly in arrival order. It is the "Server" side of the Actor Model.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The generic actor that owns a single entity.
///
/// # Architecture Note
/// This struct is the "Server" half of the actor. It owns the receiver end of the mailbox and,
/// once [`run`](ResourceActor::run) starts, the entity itself.
///
/// **Concurrency Model**:
/// Each actor handles one request at a time, so the entity needs no `Mutex` or `RwLock`.
/// Different actors (different ids) run in parallel on the Tokio scheduler and never wait on
/// each other.
///
/// # Usage Pattern
///
/// 1.  **Create**: `ResourceActor::new(id, buffer)` returns the actor and its client.
/// 2.  **Wire**: pass dependencies into `actor.run(context)`.
/// 3.  **Run**: spawn the run loop in a background task.
///
/// ```rust
/// use actor_framework::{ActorEntity, ResourceActor};
/// use async_trait::async_trait;
///
/// struct Counter { hits: u32 }
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("counter error")]
/// struct CounterError;
///
/// #[async_trait]
/// impl ActorEntity for Counter {
///     type Id = String;
///     type Action = u32;
///     type ActionResult = u32;
///     type Context = ();
///     type Error = CounterError;
///
///     fn from_id(_id: String, _ctx: &()) -> Self { Self { hits: 0 } }
///
///     async fn handle_action(&mut self, add: u32, _ctx: &()) -> Result<u32, CounterError> {
///         self.hits += add;
///         Ok(self.hits)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = ResourceActor::<Counter>::new("tenant-1".to_string(), 8);
///     tokio::spawn(actor.run(()));
///     assert_eq!(client.perform_action(2).await.unwrap(), 2);
///     assert_eq!(client.perform_action(3).await.unwrap(), 5);
/// }
/// ```
///
/// # Expired Requests
///
/// A request whose deadline passed while it waited in the mailbox is answered with
/// [`FrameworkError::Timeout`] and skipped. A request whose caller already went away is
/// skipped silently.
pub struct ResourceActor<T: ActorEntity> {
    id: T::Id,
    receiver: mpsc::Receiver<ResourceRequest<T>>,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// # Arguments
    ///
    /// * `id` - The key of the entity this actor will own.
    /// * `buffer_size` - The capacity of the mailbox. If it is full, callers wait for space
    ///   (bounded by their own deadline, if any).
    pub fn new(id: T::Id, buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let client = ResourceClient::new(id.clone(), sender);
        (Self { id, receiver }, client)
    }

    /// Runs the actor's event loop until every client has been dropped.
    ///
    /// # Context Injection
    /// The entity is built here, from the id and the injected `context`, and the same context
    /// is passed to every hook.
    pub async fn run(mut self, context: T::Context) {
        // Extract just the type name (e.g., "TenantDesk" instead of "order_sync::admission::TenantDesk")
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        let id = self.id.clone();

        let mut entity = T::from_id(id.clone(), &context);
        if let Err(e) = entity.on_start(&context).await {
            warn!(entity_type, %id, error = %e, "on_start failed, actor not started");
            return;
        }
        info!(entity_type, %id, "Actor started");

        let mut handled: u64 = 0;
        while let Some(request) = self.receiver.recv().await {
            if request.respond_to.is_closed() {
                debug!(entity_type, %id, "Caller went away, skipping request");
                continue;
            }
            if request.is_expired(Instant::now()) {
                warn!(entity_type, %id, action = ?request.action, "Request expired in mailbox");
                let _ = request.respond_to.send(Err(FrameworkError::Timeout));
                continue;
            }

            let ResourceRequest {
                action, respond_to, ..
            } = request;
            debug!(entity_type, %id, ?action, "Action");
            let result = entity
                .handle_action(action, &context)
                .await
                .map_err(FrameworkError::Entity);
            if let Err(e) = &result {
                debug!(entity_type, %id, error = %e, "Action rejected");
            }
            handled += 1;
            let _ = respond_to.send(result);
        }

        entity.on_stop(&context).await;
        info!(entity_type, %id, handled, "Shutdown");
    }
}
