//! redb-backed storage for the offline mutation queue
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `mutations` | `seq` | `QueuedMutation` | Pending writes, in enqueue order |
//! | `local_ids` | `local_id` | `seq` | Duplicate detection for pending writes |
//! | `resolved` | `local_id` | `ResolvedTarget` | Server ids of entities created by replayed mutations |
//! | `rejected` | `local_id` | `RejectedMutation` | Permanently refused writes, until acknowledged |
//! | `meta` | `"next_seq"` | `u64` | Sequence counter |
//!
//! # Durability
//!
//! Each operation is one write transaction. redb commits are durable once `commit()`
//! returns, so a mutation acknowledged by [`OfflineQueue::enqueue`] survives a crash.
//!
//! # Growth
//!
//! Only creating mutations leave a `resolved` row, and [`OfflineQueue::prune_resolved`]
//! drops rows no pending mutation still needs.

use crate::error::{QueueError, QueueResult};
use crate::model::{QueuedMutation, RejectReason, RejectedMutation, TargetRef};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MUTATIONS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("mutations");

const LOCAL_IDS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("local_ids");

const RESOLVED_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("resolved");

const REJECTED_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("rejected");

const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_SEQ_KEY: &str = "next_seq";

#[derive(Debug, Serialize, Deserialize)]
struct ResolvedTarget {
    server_id: String,
    resolved_at: DateTime<Utc>,
}

/// Durable, strictly ordered queue of writes made while offline.
#[derive(Clone)]
pub struct OfflineQueue {
    db: Arc<Database>,
}

impl OfflineQueue {
    /// Open or create the queue file at `path`.
    pub fn open(path: impl AsRef<Path>) -> QueueResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// A queue that lives only as long as the process.
    pub fn open_in_memory() -> QueueResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> QueueResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MUTATIONS_TABLE)?;
            let _ = write_txn.open_table(LOCAL_IDS_TABLE)?;
            let _ = write_txn.open_table(RESOLVED_TABLE)?;
            let _ = write_txn.open_table(REJECTED_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;
            if meta.get(NEXT_SEQ_KEY)?.is_none() {
                meta.insert(NEXT_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Appends `mutation` and returns its sequence number.
    ///
    /// A mutation without a target must create one. A local target must name a creating
    /// mutation enqueued earlier (pending or already replayed).
    pub fn enqueue(&self, mutation: &QueuedMutation) -> QueueResult<u64> {
        let local_id = mutation.local_id.as_str();
        if mutation.target.is_none() && !mutation.operation.creates_target() {
            return Err(QueueError::MissingTarget(mutation.local_id.clone()));
        }

        let txn = self.db.begin_write()?;
        let seq = {
            let mut local_ids = txn.open_table(LOCAL_IDS_TABLE)?;
            let resolved = txn.open_table(RESOLVED_TABLE)?;
            let rejected = txn.open_table(REJECTED_TABLE)?;

            if local_ids.get(local_id)?.is_some()
                || resolved.get(local_id)?.is_some()
                || rejected.get(local_id)?.is_some()
            {
                return Err(QueueError::DuplicateLocalId(mutation.local_id.clone()));
            }
            if let Some(TargetRef::Local(target)) = &mutation.target {
                let pending_creator = match local_ids.get(target.as_str())? {
                    Some(seq) => {
                        let mutations = txn.open_table(MUTATIONS_TABLE)?;
                        let creator = mutations.get(seq.value())?;
                        match creator {
                            Some(value) => {
                                let creator: QueuedMutation =
                                    serde_json::from_slice(value.value())?;
                                creator.target.is_none()
                            }
                            None => false,
                        }
                    }
                    None => false,
                };
                let known = pending_creator || resolved.get(target.as_str())?.is_some();
                if !known {
                    return Err(QueueError::UnresolvedTarget {
                        local_id: mutation.local_id.clone(),
                        target: target.clone(),
                    });
                }
            }

            let mut meta = txn.open_table(META_TABLE)?;
            let seq = meta
                .get(NEXT_SEQ_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            meta.insert(NEXT_SEQ_KEY, seq + 1)?;

            let value = serde_json::to_vec(mutation)?;
            let mut mutations = txn.open_table(MUTATIONS_TABLE)?;
            mutations.insert(seq, value.as_slice())?;
            local_ids.insert(local_id, seq)?;
            seq
        };
        txn.commit()?;

        debug!(local_id, seq, op = ?mutation.operation, "Mutation queued");
        Ok(seq)
    }

    /// Oldest pending mutation.
    pub fn peek(&self) -> QueueResult<Option<(u64, QueuedMutation)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MUTATIONS_TABLE)?;
        let first = match table.first()? {
            Some((key, value)) => Some((key.value(), serde_json::from_slice(value.value())?)),
            None => None,
        };
        Ok(first)
    }

    /// Every pending mutation, oldest first.
    pub fn pending(&self) -> QueueResult<Vec<QueuedMutation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MUTATIONS_TABLE)?;

        let mut mutations = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            mutations.push(serde_json::from_slice(value.value())?);
        }
        Ok(mutations)
    }

    pub fn len(&self) -> QueueResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MUTATIONS_TABLE)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes an applied mutation. `server_id` is remembered when the mutation created its
    /// target, so later mutations naming its local id can be rewritten.
    pub fn complete(
        &self,
        seq: u64,
        mutation: &QueuedMutation,
        server_id: &str,
        at: DateTime<Utc>,
    ) -> QueueResult<()> {
        let local_id = mutation.local_id.as_str();
        let created = mutation.target.is_none();
        let row = ResolvedTarget {
            server_id: server_id.to_string(),
            resolved_at: at,
        };
        let value = serde_json::to_vec(&row)?;

        let txn = self.db.begin_write()?;
        {
            let mut mutations = txn.open_table(MUTATIONS_TABLE)?;
            let mut local_ids = txn.open_table(LOCAL_IDS_TABLE)?;
            mutations.remove(seq)?;
            local_ids.remove(local_id)?;
            if created {
                let mut resolved = txn.open_table(RESOLVED_TABLE)?;
                resolved.insert(local_id, value.as_slice())?;
            }
        }
        txn.commit()?;
        debug!(local_id, seq, server_id, "Mutation applied");
        Ok(())
    }

    /// Persists one more failed attempt for the mutation at `seq`.
    pub fn record_attempt(&self, seq: u64, mutation: &QueuedMutation) -> QueueResult<u32> {
        let mut updated = mutation.clone();
        updated.attempt_count = updated.attempt_count.saturating_add(1);
        let value = serde_json::to_vec(&updated)?;

        let txn = self.db.begin_write()?;
        {
            let mut mutations = txn.open_table(MUTATIONS_TABLE)?;
            mutations.insert(seq, value.as_slice())?;
        }
        txn.commit()?;
        Ok(updated.attempt_count)
    }

    /// Moves the mutation at `seq` out of the queue and into the rejected list.
    pub fn reject(
        &self,
        seq: u64,
        mutation: &QueuedMutation,
        reason: RejectReason,
        at: DateTime<Utc>,
    ) -> QueueResult<()> {
        let local_id = mutation.local_id.as_str();
        let entry = RejectedMutation {
            mutation: mutation.clone(),
            reason,
            rejected_at: at,
        };
        let value = serde_json::to_vec(&entry)?;

        let txn = self.db.begin_write()?;
        {
            let mut mutations = txn.open_table(MUTATIONS_TABLE)?;
            let mut local_ids = txn.open_table(LOCAL_IDS_TABLE)?;
            let mut rejected = txn.open_table(REJECTED_TABLE)?;
            mutations.remove(seq)?;
            local_ids.remove(local_id)?;
            rejected.insert(local_id, value.as_slice())?;
        }
        txn.commit()?;
        warn!(local_id, seq, reason = ?entry.reason, "Mutation rejected");
        Ok(())
    }

    /// Server id of the entity created by the mutation `local_id`, once replayed.
    pub fn resolved_target(&self, local_id: &str) -> QueueResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOLVED_TABLE)?;
        let Some(value) = table.get(local_id)? else {
            return Ok(None);
        };
        let row: ResolvedTarget = serde_json::from_slice(value.value())?;
        Ok(Some(row.server_id))
    }

    /// Forgets server ids resolved before `cutoff` that no pending mutation targets.
    /// Returns how many rows were dropped.
    pub fn prune_resolved(&self, cutoff: DateTime<Utc>) -> QueueResult<usize> {
        let txn = self.db.begin_write()?;
        let pruned = {
            let mutations = txn.open_table(MUTATIONS_TABLE)?;
            let mut still_needed = HashSet::new();
            for result in mutations.iter()? {
                let (_seq, value) = result?;
                let pending: QueuedMutation = serde_json::from_slice(value.value())?;
                if let Some(TargetRef::Local(target)) = pending.target {
                    still_needed.insert(target);
                }
            }

            let mut resolved = txn.open_table(RESOLVED_TABLE)?;
            let mut stale = Vec::new();
            for result in resolved.iter()? {
                let (key, value) = result?;
                let row: ResolvedTarget = serde_json::from_slice(value.value())?;
                let local_id = key.value();
                if row.resolved_at < cutoff && !still_needed.contains(local_id) {
                    stale.push(local_id.to_string());
                }
            }
            for local_id in &stale {
                resolved.remove(local_id.as_str())?;
            }
            stale.len()
        };
        txn.commit()?;
        if pruned > 0 {
            debug!(pruned, "Resolved targets pruned");
        }
        Ok(pruned)
    }

    /// Rejected mutations awaiting the user's acknowledgement.
    pub fn rejected(&self) -> QueueResult<Vec<RejectedMutation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REJECTED_TABLE)?;

        let mut entries: Vec<RejectedMutation> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        entries.sort_by_key(|e| e.rejected_at);
        Ok(entries)
    }

    /// Drops a rejected mutation once the user has seen it. `false` if it was not there.
    ///
    /// The local id becomes free again: nothing was created under it.
    pub fn acknowledge_rejected(&self, local_id: &str) -> QueueResult<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(REJECTED_TABLE)?;
            let removed = table.remove(local_id)?.is_some();
            removed
        };
        txn.commit()?;
        if removed {
            info!(local_id, "Rejected mutation acknowledged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemRequest, Operation, OrderPayload, OrderStatus};

    fn create(local_id: &str) -> QueuedMutation {
        QueuedMutation::new(
            local_id,
            "t-1",
            None,
            Operation::CreateOrder {
                payload: OrderPayload::new(vec![ItemRequest::new("burger", 1)]),
            },
        )
    }

    fn accept(local_id: &str, target: TargetRef) -> QueuedMutation {
        QueuedMutation::new(
            local_id,
            "t-1",
            Some(target),
            Operation::TransitionOrder {
                to: OrderStatus::Accepted,
            },
        )
    }

    #[test]
    fn test_fifo_order_and_completion() {
        let queue = OfflineQueue::open_in_memory().unwrap();
        let a = queue.enqueue(&create("A")).unwrap();
        let b = queue
            .enqueue(&accept("B", TargetRef::Local("A".into())))
            .unwrap();
        assert!(a < b);
        assert_eq!(queue.len().unwrap(), 2);

        let (seq, first) = queue.peek().unwrap().unwrap();
        assert_eq!((seq, first.local_id.as_str()), (a, "A"));
        queue.complete(seq, &first, "srv-1", Utc::now()).unwrap();

        assert_eq!(queue.resolved_target("A").unwrap().as_deref(), Some("srv-1"));
        let pending = queue.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_id, "B");
    }

    #[test]
    fn test_enqueue_checks() {
        let queue = OfflineQueue::open_in_memory().unwrap();
        queue.enqueue(&create("A")).unwrap();
        assert!(matches!(
            queue.enqueue(&create("A")),
            Err(QueueError::DuplicateLocalId(_))
        ));
        assert!(matches!(
            queue.enqueue(&accept("B", TargetRef::Local("nope".into()))),
            Err(QueueError::UnresolvedTarget { .. })
        ));
        let no_target = QueuedMutation::new("C", "t-1", None, Operation::CloseComanda);
        assert!(matches!(
            queue.enqueue(&no_target),
            Err(QueueError::MissingTarget(_))
        ));
        // Server targets need no local history.
        queue
            .enqueue(&accept("D", TargetRef::Server("srv-9".into())))
            .unwrap();
    }

    #[test]
    fn test_attempts_persist() {
        let queue = OfflineQueue::open_in_memory().unwrap();
        queue.enqueue(&create("A")).unwrap();
        let (seq, m) = queue.peek().unwrap().unwrap();
        assert_eq!(queue.record_attempt(seq, &m).unwrap(), 1);
        let (_, m) = queue.peek().unwrap().unwrap();
        assert_eq!(m.attempt_count, 1);
    }

    #[test]
    fn test_reject_and_acknowledge() {
        let queue = OfflineQueue::open_in_memory().unwrap();
        queue.enqueue(&create("A")).unwrap();
        let (seq, m) = queue.peek().unwrap().unwrap();
        queue
            .reject(seq, &m, RejectReason::Validation("empty".into()), Utc::now())
            .unwrap();

        assert!(queue.is_empty().unwrap());
        let rejected = queue.rejected().unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].mutation.local_id, "A");

        // A rejected local id stays taken until the user acknowledges it.
        assert!(queue.enqueue(&create("A")).is_err());

        assert!(queue.acknowledge_rejected("A").unwrap());
        assert!(!queue.acknowledge_rejected("A").unwrap());
        assert!(queue.rejected().unwrap().is_empty());
        queue.enqueue(&create("A")).unwrap();
    }

    #[test]
    fn test_only_creations_are_resolved() {
        let queue = OfflineQueue::open_in_memory().unwrap();
        queue.enqueue(&create("A")).unwrap();
        queue
            .enqueue(&accept("B", TargetRef::Local("A".into())))
            .unwrap();
        // B created nothing, so nothing may point at it.
        assert!(matches!(
            queue.enqueue(&accept("C", TargetRef::Local("B".into()))),
            Err(QueueError::UnresolvedTarget { .. })
        ));

        let now = Utc::now();
        for _ in 0..2 {
            let (seq, m) = queue.peek().unwrap().unwrap();
            queue.complete(seq, &m, "srv-A", now).unwrap();
        }
        assert_eq!(queue.resolved_target("A").unwrap().as_deref(), Some("srv-A"));
        assert!(queue.resolved_target("B").unwrap().is_none());
    }

    #[test]
    fn test_prune_keeps_targets_still_in_use() {
        let queue = OfflineQueue::open_in_memory().unwrap();
        let long_ago = Utc::now() - chrono::Duration::days(30);
        for id in ["A", "B"] {
            queue.enqueue(&create(id)).unwrap();
            let (seq, m) = queue.peek().unwrap().unwrap();
            queue.complete(seq, &m, &format!("srv-{id}"), long_ago).unwrap();
        }
        queue
            .enqueue(&accept("C", TargetRef::Local("B".into())))
            .unwrap();
        queue.enqueue(&create("D")).unwrap();
        let (seq, m) = queue.peek().unwrap().unwrap();
        queue.complete(seq, &m, "srv-C", Utc::now()).unwrap();
        let (seq, m) = queue.peek().unwrap().unwrap();
        queue.complete(seq, &m, "srv-D", Utc::now()).unwrap();

        queue
            .enqueue(&accept("E", TargetRef::Local("B".into())))
            .unwrap();
        let cutoff = Utc::now() - chrono::Duration::days(7);
        assert_eq!(queue.prune_resolved(cutoff).unwrap(), 1);

        assert!(queue.resolved_target("A").unwrap().is_none());
        assert_eq!(queue.resolved_target("B").unwrap().as_deref(), Some("srv-B"));
        assert_eq!(queue.resolved_target("D").unwrap().as_deref(), Some("srv-D"));
        // A pruned id may be used again.
        queue.enqueue(&create("A")).unwrap();
    }
}
