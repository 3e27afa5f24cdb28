//! # ActorClient Trait
//!
//! Provides a common interface for domain-specific client wrappers, adding default `request`
//! and `request_within` methods built on top of a generic `ResourceClient`.
use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for domain-specific clients to inherit the standard request plumbing.
///
/// Implementors only say where the inner client lives and how framework errors map onto their
/// own error type; sending, awaiting and tracing come for free.
///
/// # Example
///
/// ```rust
/// use actor_framework::{ActorClient, ActorEntity, FrameworkError, ResourceClient};
/// use async_trait::async_trait;
///
/// struct Ledger { balance: i64 }
///
/// #[derive(Debug)]
/// enum LedgerAction { Deposit(i64) }
///
/// #[derive(Debug, thiserror::Error)]
/// enum LedgerError {
///     #[error("ledger unavailable: {0}")]
///     Unavailable(String),
/// }
///
/// #[async_trait]
/// impl ActorEntity for Ledger {
///     type Id = String;
///     type Action = LedgerAction;
///     type ActionResult = i64;
///     type Context = ();
///     type Error = LedgerError;
///
///     fn from_id(_: String, _: &()) -> Self { Self { balance: 0 } }
///
///     async fn handle_action(&mut self, action: LedgerAction, _: &()) -> Result<i64, LedgerError> {
///         let LedgerAction::Deposit(amount) = action;
///         self.balance += amount;
///         Ok(self.balance)
///     }
/// }
///
/// struct LedgerClient { inner: ResourceClient<Ledger> }
///
/// #[async_trait]
/// impl ActorClient<Ledger> for LedgerClient {
///     type Error = LedgerError;
///
///     fn inner(&self) -> &ResourceClient<Ledger> { &self.inner }
///
///     fn map_error(e: FrameworkError<LedgerError>) -> LedgerError {
///         match e {
///             FrameworkError::Entity(inner) => inner,
///             other => LedgerError::Unavailable(other.to_string()),
///         }
///     }
/// }
///
/// async fn usage(client: LedgerClient) {
///     // request() is provided automatically
///     let _ = client.request(LedgerAction::Deposit(10)).await;
/// }
/// ```
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The domain-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the domain error type.
    fn map_error(e: FrameworkError<T::Error>) -> Self::Error;

    /// Send an action and wait for its result.
    #[tracing::instrument(skip(self))]
    async fn request(&self, action: T::Action) -> Result<T::ActionResult, Self::Error> {
        tracing::debug!("Sending request");
        self.inner()
            .perform_action(action)
            .await
            .map_err(Self::map_error)
    }

    /// Send an action with a deadline on enqueueing and on dequeueing.
    #[tracing::instrument(skip(self))]
    async fn request_within(
        &self,
        action: T::Action,
        wait: Duration,
    ) -> Result<T::ActionResult, Self::Error> {
        tracing::debug!("Sending request");
        self.inner()
            .perform_action_within(action, wait)
            .await
            .map_err(Self::map_error)
    }
}
