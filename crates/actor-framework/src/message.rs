//! # Generic Messages
//!
//! This module defines the request envelope passed from a `ResourceClient` to its
//! `ResourceActor`.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Type alias for the one-shot response channel used by actors.
pub type Response<R, E> = oneshot::Sender<Result<R, FrameworkError<E>>>;

/// A single action on its way to the owning actor.
///
/// `deadline` bounds how long the request may wait in the mailbox. The actor answers an expired
/// request with [`FrameworkError::Timeout`] instead of handling it, so a caller that gave up is
/// guaranteed its action was not applied.
#[derive(Debug)]
pub struct ResourceRequest<T: ActorEntity> {
    pub action: T::Action,
    pub deadline: Option<Instant>,
    pub respond_to: Response<T::ActionResult, T::Error>,
}

impl<T: ActorEntity> ResourceRequest<T> {
    /// True when the request sat in the mailbox past its deadline.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
