//! # Offline Mutation Queue
//!
//! Devices keep writing while disconnected. Each write becomes a [`QueuedMutation`] appended
//! to a durable [`OfflineQueue`]; on reconnect the queue is replayed oldest-first through a
//! [`MutationApplier`].
//!
//! ## Ordering
//!
//! Replay is strictly FIFO. A retryable failure stops the pass with the failed entry still at
//! the head, so B never reaches the server before A. Permanent failures move the entry to the
//! rejected list for the user to review and the pass continues.
//!
//! ## Local Targets
//!
//! A mutation created offline may target an entity that itself was created offline. It names
//! the creating mutation's `local_id`; once that mutation is replayed the server id is stored
//! and the reference is rewritten on the fly.
//!
//! ## Idempotency
//!
//! The `local_id` doubles as the server idempotency key, so replaying an entry whose earlier
//! attempt actually reached the server returns the original result instead of a duplicate.
//!
//! [`QueuedMutation`]: crate::model::QueuedMutation

mod drain;
mod storage;

pub use drain::{DrainReport, MutationApplier};
pub use storage::OfflineQueue;
