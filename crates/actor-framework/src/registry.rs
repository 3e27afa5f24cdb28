//! # Actor Registry
//!
//! One actor per key, spawned lazily. The registry is the only shared structure between keys
//! and it is a sharded `DashMap`, so looking up tenant A never blocks behind tenant B's work:
//! once a caller holds a client, everything else happens on that actor's mailbox.

use crate::actor::ResourceActor;
use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct ActorSlot<T: ActorEntity> {
    client: ResourceClient<T>,
    handle: JoinHandle<()>,
}

/// Keyed collection of running actors sharing one context.
pub struct ActorRegistry<T: ActorEntity> {
    actors: DashMap<T::Id, ActorSlot<T>>,
    context: T::Context,
    buffer_size: usize,
}

impl<T: ActorEntity> ActorRegistry<T> {
    pub fn new(context: T::Context, buffer_size: usize) -> Self {
        Self {
            actors: DashMap::new(),
            context,
            buffer_size,
        }
    }

    /// Client for the actor owning `id`, spawning it on first use.
    ///
    /// A slot whose actor has stopped is replaced with a fresh one.
    pub fn client(&self, id: &T::Id) -> ResourceClient<T> {
        if let Some(slot) = self.actors.get(id) {
            if !slot.client.is_closed() {
                return slot.client.clone();
            }
        }

        let mut slot = self
            .actors
            .entry(id.clone())
            .or_insert_with(|| self.spawn(id.clone()));
        if slot.client.is_closed() {
            debug!(%id, "Respawning stopped actor");
            *slot = self.spawn(id.clone());
        }
        slot.client.clone()
    }

    fn spawn(&self, id: T::Id) -> ActorSlot<T> {
        let (actor, client) = ResourceActor::<T>::new(id, self.buffer_size);
        let handle = tokio::spawn(actor.run(self.context.clone()));
        ActorSlot { client, handle }
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.actors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Drops every registry-held client and waits for the actors to drain their mailboxes.
    ///
    /// Actors only stop once all clients are gone, so callers must drop any clones they
    /// still hold before awaiting this.
    pub async fn shutdown(self) {
        let count = self.actors.len();
        let handles: Vec<JoinHandle<()>> = self
            .actors
            .into_iter()
            .map(|(_, slot)| slot.handle)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!(count, "Registry shut down");
    }
}
