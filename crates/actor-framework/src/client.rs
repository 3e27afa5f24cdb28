//! # Generic Client
//!
//! This module defines the generic client for communicating with a keyed actor.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// ## ResourceClient
///
/// The `ResourceClient<T>` provides a type‑safe, async API for interacting with one
/// `ResourceActor<T>`. It forwards actions over a Tokio mpsc channel and returns results via
/// oneshot channels.
///
/// * **Cloneable** – holds only the id and a sender, so cloning is inexpensive.
/// * **Deadlines** – [`perform_action_within`](Self::perform_action_within) bounds how long a
///   caller waits for a slot in the mailbox and for its turn inside the actor.
pub struct ResourceClient<T: ActorEntity> {
    id: T::Id,
    sender: mpsc::Sender<ResourceRequest<T>>,
}

// `T` itself is rarely `Clone`, so the derive would add a bound we do not want.
impl<T: ActorEntity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<T: ActorEntity> ResourceClient<T> {
    pub fn new(id: T::Id, sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { id, sender }
    }

    /// Key of the actor this client talks to.
    pub fn id(&self) -> &T::Id {
        &self.id
    }

    /// True once the actor has stopped and its mailbox is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn perform_action(
        &self,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError<T::Error>> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ResourceRequest {
                action,
                deadline: None,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    /// Like [`perform_action`](Self::perform_action), but gives up with
    /// [`FrameworkError::Timeout`] if the request cannot be enqueued before `wait` elapses.
    ///
    /// The actor also drops the request with `Timeout` if it only reaches it after the
    /// deadline. Once the actor has started handling the action, the result is awaited in full
    /// so that a committed effect is never reported as a timeout.
    pub async fn perform_action_within(
        &self,
        action: T::Action,
        wait: Duration,
    ) -> Result<T::ActionResult, FrameworkError<T::Error>> {
        let deadline = Instant::now() + wait;
        let (respond_to, response) = oneshot::channel();
        let request = ResourceRequest {
            action,
            deadline: Some(deadline),
            respond_to,
        };
        match tokio::time::timeout_at(deadline, self.sender.send(request)).await {
            Err(_) => return Err(FrameworkError::Timeout),
            Ok(Err(_)) => return Err(FrameworkError::ActorClosed),
            Ok(Ok(())) => {}
        }
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}
