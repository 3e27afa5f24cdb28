//! Replays queued mutations against the server, oldest first.

use super::storage::OfflineQueue;
use crate::error::{QueueResult, SyncError};
use crate::model::{QueuedMutation, RejectReason, TargetRef};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// Applies one mutation on the server side.
#[async_trait]
pub trait MutationApplier: Send + Sync {
    /// `target` is the server id the mutation's target resolved to, if it has one.
    /// Returns the server id of the entity the mutation touched or created.
    async fn apply(
        &self,
        mutation: &QueuedMutation,
        target: Option<&str>,
    ) -> Result<String, SyncError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub applied: usize,
    pub rejected: usize,
    /// The retryable error that stopped the drain, if any.
    pub stalled: Option<SyncError>,
    pub remaining: u64,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.stalled.is_none() && self.remaining == 0
    }
}

fn reject_reason(e: &SyncError) -> RejectReason {
    match e {
        SyncError::InvalidTransition(_) => RejectReason::InvalidTransition(e.to_string()),
        SyncError::NotFound { .. } => RejectReason::NotFound(e.to_string()),
        _ => RejectReason::Validation(e.to_string()),
    }
}

impl OfflineQueue {
    /// One pass over the queue.
    ///
    /// Stops at the first retryable failure so nothing behind it overtakes it. Permanent
    /// failures and entries older than `retention` leave the queue as rejected and the pass
    /// continues. Resolved targets older than `retention` are pruned at the end.
    pub async fn drain(
        &self,
        applier: &dyn MutationApplier,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> QueueResult<DrainReport> {
        let mut report = DrainReport::default();

        while let Some((seq, mutation)) = self.peek()? {
            if now - mutation.enqueued_at > retention {
                self.reject(seq, &mutation, RejectReason::Expired, now)?;
                report.rejected += 1;
                continue;
            }

            let target = match &mutation.target {
                None => None,
                Some(TargetRef::Server(id)) => Some(id.clone()),
                Some(TargetRef::Local(local)) => match self.resolved_target(local)? {
                    Some(id) => Some(id),
                    None => {
                        // Everything enqueued before this entry is gone, so its creator was
                        // rejected.
                        let reason = RejectReason::NotFound(format!(
                            "target {local} was never created on the server"
                        ));
                        self.reject(seq, &mutation, reason, now)?;
                        report.rejected += 1;
                        continue;
                    }
                },
            };

            match applier.apply(&mutation, target.as_deref()).await {
                Ok(server_id) => {
                    self.complete(seq, &mutation, &server_id, now)?;
                    report.applied += 1;
                }
                Err(e) if e.is_retryable() => {
                    let attempts = self.record_attempt(seq, &mutation)?;
                    warn!(
                        local_id = %mutation.local_id,
                        attempts,
                        error = %e,
                        "Replay stalled"
                    );
                    report.stalled = Some(e);
                    break;
                }
                Err(e) => {
                    self.reject(seq, &mutation, reject_reason(&e), now)?;
                    report.rejected += 1;
                }
            }
        }

        self.prune_resolved(now - retention)?;
        report.remaining = self.len()?;
        info!(
            applied = report.applied,
            rejected = report.rejected,
            remaining = report.remaining,
            stalled = report.stalled.is_some(),
            "Drain pass finished"
        );
        Ok(report)
    }

    /// Repeats [`drain`](Self::drain) with exponential backoff until the queue is empty, a
    /// pass ends without a retryable failure, or `policy` runs out of attempts.
    pub async fn drain_until_settled(
        &self,
        applier: &dyn MutationApplier,
        retention: Duration,
        policy: &RetryPolicy,
    ) -> QueueResult<DrainReport> {
        let mut attempt = 1;
        loop {
            let report = self.drain(applier, retention, Utc::now()).await?;
            if report.stalled.is_none() || attempt >= policy.max_attempts {
                return Ok(report);
            }
            tokio::time::sleep(policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}
