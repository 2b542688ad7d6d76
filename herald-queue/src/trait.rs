use async_trait::async_trait;

use crate::{Job, JobId, JobInput};

/// Storage for one batch of delivery jobs
///
/// The store is the single source of truth for which jobs remain to be
/// attempted. It is shared by every worker of a dispatch run, so each
/// implementation serialises its own writes: an update to one job is never
/// lost or applied twice.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Append every input as a `Pending` job.
    ///
    /// Enqueueing is best-effort: when some inputs are rejected the others
    /// stay queued and the error reports how many made it in.
    ///
    /// # Errors
    /// Returns [`crate::QueueError::PartialEnqueue`] when any input was rejected
    async fn enqueue(&self, jobs: Vec<JobInput>) -> crate::Result<Vec<JobId>>;

    /// All `Pending` jobs, in insertion order
    ///
    /// # Errors
    /// If the store cannot be read
    async fn fetch_pending(&self) -> crate::Result<Vec<Job>>;

    /// Record that a job was delivered. Marking a sent job again is a no-op.
    ///
    /// # Errors
    /// If no job has this id, or the change cannot be persisted
    async fn mark_sent(&self, id: JobId) -> crate::Result<()>;

    /// Remove every job regardless of status
    ///
    /// # Errors
    /// If the change cannot be persisted
    async fn purge(&self) -> crate::Result<()>;

    /// Number of `Pending` jobs
    ///
    /// # Errors
    /// If the store cannot be read
    async fn count_pending(&self) -> crate::Result<usize>;
}
