//! # Mock Framework & Testing Guide
//!
//! The `MockClient<T>` type hands out a real `ResourceClient<T>` whose requests are answered
//! from a queue of expectations instead of by a running entity. It lets you test the logic
//! *around* a client (wrappers, orchestrators, appliers) without spawning actors.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **Determinism** | 100% Deterministic | Subject to scheduler |
//! | **State** | No real state (expectations) | Real state management |
//! | **Use Case** | Unit testing logic *around* the client | Testing the actor itself or full system |
//! | **Error Injection** | Easy (`return_err`) | Hard (requires specific state) |
//!
//! ## Testing Strategies
//!
//! <details>
//! <summary><b>Pattern 0: Client Logic Test (Pure Mock)</b></summary>
//!
//! ```rust
//! use actor_framework::mock::MockClient;
//! use actor_framework::{ActorEntity, FrameworkError};
//! use async_trait::async_trait;
//!
//! struct Stock;
//! #[derive(Debug)] enum StockAction { Reserve(u32) }
//! #[derive(Debug, thiserror::Error)] #[error("out of stock")] struct OutOfStock;
//!
//! #[async_trait]
//! impl ActorEntity for Stock {
//!     type Id = String; type Action = StockAction; type ActionResult = u32;
//!     type Context = (); type Error = OutOfStock;
//!     fn from_id(_: String, _: &()) -> Self { Stock }
//!     async fn handle_action(&mut self, _: StockAction, _: &()) -> Result<u32, OutOfStock> { Ok(0) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Stock>::new("sku-1".to_string());
//!     mock.expect_action().return_ok(7);
//!     mock.expect_action().return_err(FrameworkError::Entity(OutOfStock));
//!
//!     let client = mock.client();
//!     assert_eq!(client.perform_action(StockAction::Reserve(1)).await.unwrap(), 7);
//!     assert!(matches!(
//!         client.perform_action(StockAction::Reserve(1)).await,
//!         Err(FrameworkError::Entity(OutOfStock))
//!     ));
//!     mock.verify();
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 1: Single Actor Test (Fast, Isolated)</b></summary>
//!
//! Spawn one `ResourceActor` with an in-memory context and drive it through its client.
//! The `order-sync` crate tests its tenant desk this way.
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Full System Integration Test (Comprehensive)</b></summary>
//!
//! Start the whole system with in-memory collaborators and exercise end-to-end flows and
//! concurrency. See `crates/order-sync/tests/integration_test.rs`.
//! </details>
//!
//! ## Mocking Utilities
//!
//! Use [`create_mock_client`] to get a client and a receiver when a test needs to inspect the
//! request itself, or the fluent [`MockClient`] API when only the answers matter.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::{ResourceRequest, Response};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

type Expectations<T> = Arc<
    Mutex<
        VecDeque<
            Result<<T as ActorEntity>::ActionResult, FrameworkError<<T as ActorEntity>::Error>>,
        >,
    >,
>;

/// A mock client with expectation tracking for fluent testing.
///
/// Each request pops the oldest expectation. A request arriving with no expectation left
/// panics the background task, which the caller observes as `ActorDropped`.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Expectations<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new(id: T::Id) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let expectations_clone = expectations.clone();

        // Spawn background task to handle requests
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let next = expectations_clone.lock().unwrap().pop_front();
                match next {
                    Some(response) => {
                        let _ = request.respond_to.send(response);
                    }
                    None => panic!("Unexpected request: {:?}", request.action),
                }
            }
        });

        Self {
            client: ResourceClient::new(id, sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Expects one more action.
    pub fn expect_action(&mut self) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for `action` expectations.
pub struct ActionExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
}

impl<T: ActorEntity> ActionExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, result: T::ActionResult) {
        self.expectations.lock().unwrap().push_back(Ok(result));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError<T::Error>) {
        self.expectations.lock().unwrap().push_back(Err(error));
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// Creates a client and the receiver its requests land on.
///
/// # Testing Strategy
/// The test plays the actor: it pulls requests off `receiver`, asserts on them, and answers
/// (or deliberately does not answer) through the responder. Delays and failures become fully
/// deterministic.
pub fn create_mock_client<T: ActorEntity>(
    id: T::Id,
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(id, sender), receiver)
}

/// Helper to take the next request off a mock receiver.
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Action, Response<T::ActionResult, T::Error>)> {
    receiver
        .recv()
        .await
        .map(|request| (request.action, request.respond_to))
}
