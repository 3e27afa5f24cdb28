//! # Framework Errors
//!
//! This module defines the error type returned by every [`ResourceClient`](crate::ResourceClient)
//! call. Runtime failures (closed mailbox, dropped responder, expired deadline) are framework
//! variants; everything the entity itself reports travels untouched in [`FrameworkError::Entity`].

/// Errors that can occur within the actor framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError<E> {
    /// The actor's mailbox is closed; the actor has stopped.
    #[error("Actor closed")]
    ActorClosed,
    /// The actor dropped the responder without answering (it panicked mid-request).
    #[error("Actor dropped response channel")]
    ActorDropped,
    /// The request could not reach the front of the mailbox before its deadline.
    #[error("Timed out waiting for actor")]
    Timeout,
    /// The entity handled the request and rejected it.
    #[error("Entity error: {0}")]
    Entity(#[source] E),
}

impl<E> FrameworkError<E> {
    /// True when the failure came from the runtime rather than the entity.
    pub fn is_runtime(&self) -> bool {
        !matches!(self, FrameworkError::Entity(_))
    }

    /// Returns the entity error, if that is what this is.
    pub fn into_entity(self) -> Option<E> {
        match self {
            FrameworkError::Entity(e) => Some(e),
            _ => None,
        }
    }
}
