//! # Error Taxonomy
//!
//! Every operation of the engine returns a typed error from this module. The taxonomy is small
//! on purpose because callers branch on it:
//!
//! | Error | Meaning | Retried automatically? |
//! |-------|---------|------------------------|
//! | [`SyncError::Validation`] | Bad input | Never |
//! | [`SyncError::InvalidTransition`] | Edge not in the adjacency table | Never |
//! | [`SyncError::NotFound`] | Unknown order / comanda | Never |
//! | [`SyncError::Transient`] | Persistence or network hiccup | Yes, with backoff |
//! | [`SyncError::Timeout`] | Tenant desk too busy | Yes, by the caller |
//!
//! A duplicate request is not an error: admission resolves it to the original order.

use crate::model::{ComandaStatus, OrderStatus};
use actor_framework::FrameworkError;
use thiserror::Error;

/// Why a payload was refused at the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("order has no items")]
    EmptyItems,

    #[error("quantity for {sku} must be positive, got {quantity}")]
    NonPositiveQuantity { sku: String, quantity: i64 },

    #[error("unknown sku: {0}")]
    UnknownSku(String),

    #[error("sku not available: {0}")]
    SkuUnavailable(String),

    #[error("order total overflows")]
    TotalOverflow,

    #[error("comanda is {0}, items can only change while open")]
    ComandaNotOpen(ComandaStatus),

    #[error("item {0} is not on the comanda")]
    ItemNotInComanda(String),

    #[error("order is already {0}")]
    OrderFinished(OrderStatus),

    #[error("malformed request: {0}")]
    Malformed(String),
}

/// A requested edge that the order state machine does not allow.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid transition {from} -> {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Failures reported by external collaborators (persistence, catalog, side effects).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Temporary; worth retrying.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with something unusable.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// The error every client-facing operation returns.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("transient infrastructure error: {0}")]
    Transient(String),

    #[error("timed out waiting for the tenant desk")]
    Timeout,
}

impl SyncError {
    /// The only retry classification in the engine: the offline queue and the orchestrator
    /// both ask this.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient(_) | SyncError::Timeout)
    }

    /// Response code for a failed operation.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Validation(_) => "validation-error",
            SyncError::InvalidTransition(_) => "invalid-transition",
            SyncError::NotFound { .. } => "not-found",
            SyncError::Transient(_) => "unavailable",
            SyncError::Timeout => "timeout",
        }
    }

    pub fn order_not_found(id: impl Into<String>) -> Self {
        SyncError::NotFound {
            kind: "order",
            id: id.into(),
        }
    }

    pub fn comanda_not_found(id: impl Into<String>) -> Self {
        SyncError::NotFound {
            kind: "comanda",
            id: id.into(),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => SyncError::Transient(msg),
            // A corrupt record will not heal on retry.
            StoreError::Corrupt(msg) => SyncError::Validation(ValidationError::Malformed(msg)),
        }
    }
}

impl From<FrameworkError<SyncError>> for SyncError {
    fn from(e: FrameworkError<SyncError>) -> Self {
        match e {
            FrameworkError::Entity(inner) => inner,
            FrameworkError::Timeout => SyncError::Timeout,
            other => SyncError::Transient(other.to_string()),
        }
    }
}

/// Errors from the durable offline queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("duplicate local id: {0}")]
    DuplicateLocalId(String),

    #[error("mutation {0} needs a target")]
    MissingTarget(String),

    #[error("mutation {local_id} targets unresolved local id {target}")]
    UnresolvedTarget { local_id: String, target: String },
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Errors while loading [`SyncConfig`](crate::config::SyncConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: cannot parse {value:?}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    #[error("{name} out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::Transient("db".into()).is_retryable());
        assert!(!SyncError::Validation(ValidationError::EmptyItems).is_retryable());
        assert!(!SyncError::order_not_found("o-1").is_retryable());
        assert!(!SyncError::InvalidTransition(TransitionError {
            from: OrderStatus::Ready,
            to: OrderStatus::New,
        })
        .is_retryable());
    }

    #[test]
    fn test_codes() {
        assert_eq!(SyncError::Timeout.code(), "timeout");
        assert_eq!(
            SyncError::Validation(ValidationError::EmptyItems).code(),
            "validation-error"
        );
        assert_eq!(
            SyncError::InvalidTransition(TransitionError {
                from: OrderStatus::Ready,
                to: OrderStatus::New,
            })
            .code(),
            "invalid-transition"
        );
    }

    #[test]
    fn test_framework_errors_map_onto_taxonomy() {
        let err: SyncError = FrameworkError::<SyncError>::Timeout.into();
        assert_eq!(err, SyncError::Timeout);

        let err: SyncError = FrameworkError::<SyncError>::ActorClosed.into();
        assert!(err.is_retryable());

        let err: SyncError =
            FrameworkError::Entity(SyncError::Validation(ValidationError::EmptyItems)).into();
        assert_eq!(err, SyncError::Validation(ValidationError::EmptyItems));
    }

    #[test]
    fn test_store_errors() {
        let err: SyncError = StoreError::Unavailable("down".into()).into();
        assert!(err.is_retryable());
        let err: SyncError = StoreError::Corrupt("bad json".into()).into();
        assert!(!err.is_retryable());
    }
}
