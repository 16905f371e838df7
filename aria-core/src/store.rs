// Durable job store contract.
//
// The store is the only shared mutable resource in the engine; every piece
// of coordination between the scheduler and the manual trigger path is
// expressed as a conditional update through this trait.

use crate::errors::StoreError;
use crate::models::{Job, JobStatusSummary};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Repository abstraction over the durable `generation_jobs` rows.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a single job by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Job>, StoreError>;

    /// Select the oldest row eligible for automatic pickup: status pending,
    /// attempts below `max_attempts`, model on the allow-list.
    async fn next_eligible(
        &self,
        max_attempts: i32,
        models: &[String],
    ) -> Result<Option<Job>, StoreError>;

    /// Conditionally claim a job: transition to processing, increment
    /// attempts, and stamp `started_at`, but only if the row is currently
    /// pending. Returns the claimed row, or `None` when the condition did
    /// not hold and another caller won the claim.
    ///
    /// This must be a single atomic conditional update; it is the
    /// load-bearing concurrency contract of the whole engine.
    async fn claim(&self, id: i64) -> Result<Option<Job>, StoreError>;

    /// Terminal success write: status completed, response set, error
    /// cleared, `completed_at` stamped.
    async fn mark_completed(&self, id: i64, response: &str) -> Result<(), StoreError>;

    /// Terminal failure write: status failed, error set, response cleared,
    /// `completed_at` stamped.
    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), StoreError>;

    /// Conditionally reset a failed job to pending for a manual retry,
    /// clearing `error` and `completed_at`. Returns `false` when the row
    /// was not in failed status.
    async fn reset_for_retry(&self, id: i64) -> Result<bool, StoreError>;

    /// Bulk recovery sweep: reset every processing row to pending, touching
    /// no other column. Returns the number of rows reset.
    async fn reset_orphaned(&self) -> Result<u64, StoreError>;

    /// Read-only status projection for UI polling.
    async fn statuses(&self, ids: &[i64]) -> Result<Vec<JobStatusSummary>, StoreError>;
}
