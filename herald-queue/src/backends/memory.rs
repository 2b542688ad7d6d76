use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::{Job, JobId, JobInput, r#trait::JobStore, table::JobTable};

/// In-memory job store
///
/// Jobs live in a table behind an `RwLock`, so nothing survives a restart.
/// Suitable for tests and for runs where the batch can simply be resubmitted.
///
/// # Capacity Management
/// An optional capacity bounds the number of rows held. Inputs beyond it are
/// rejected by `enqueue`, which still keeps the ones that fit.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    pub(crate) table: Arc<RwLock<JobTable>>,
    /// Maximum number of jobs to hold (None = unlimited)
    capacity: Option<usize>,
}

impl MemoryJobStore {
    /// Create an empty store with unlimited capacity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store holding at most `capacity` jobs
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Number of jobs held, whatever their status
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, jobs: Vec<JobInput>) -> crate::Result<Vec<JobId>> {
        self.table.write()?.enqueue(jobs, self.capacity)
    }

    async fn fetch_pending(&self) -> crate::Result<Vec<Job>> {
        Ok(self.table.read()?.pending())
    }

    async fn mark_sent(&self, id: JobId) -> crate::Result<()> {
        self.table.write()?.mark_sent(id)?;
        Ok(())
    }

    async fn purge(&self) -> crate::Result<()> {
        self.table.write()?.purge();
        Ok(())
    }

    async fn count_pending(&self) -> crate::Result<usize> {
        Ok(self.table.read()?.count_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JobStatus, QueueError};

    fn input(name: &str) -> JobInput {
        JobInput {
            sender_name: "Alice".to_string(),
            recipient_name: name.to_string(),
            recipient_email: format!("{}@example.com", name.to_lowercase()),
            subject: "Hello {name}".to_string(),
            body: "Regards, {sender}".to_string(),
        }
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Calls an unsupported method")]
    async fn test_memory_store_basic_operations() {
        let store = MemoryJobStore::new();

        let ids = store
            .enqueue(vec![input("Bob"), input("Carol")])
            .await
            .expect("Failed to enqueue");
        assert_eq!(ids.len(), 2);
        assert_eq!(store.count_pending().await.expect("Failed to count"), 2);

        let pending = store.fetch_pending().await.expect("Failed to fetch");
        assert_eq!(pending[0].recipient_name, "Bob");
        assert_eq!(pending[1].recipient_name, "Carol");
        assert!(pending.iter().all(|job| job.status == JobStatus::Pending));

        store.mark_sent(ids[0]).await.expect("Failed to mark sent");
        let pending = store.fetch_pending().await.expect("Failed to fetch");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ids[1]);

        store.purge().await.expect("Failed to purge");
        assert!(store.is_empty());
        assert_eq!(store.count_pending().await.expect("Failed to count"), 0);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Calls an unsupported method")]
    async fn test_memory_store_mark_sent_twice() {
        let store = MemoryJobStore::new();
        let ids = store.enqueue(vec![input("Bob")]).await.expect("Failed to enqueue");

        store.mark_sent(ids[0]).await.expect("First mark failed");
        store.mark_sent(ids[0]).await.expect("Second mark failed");

        assert_eq!(store.count_pending().await.expect("Failed to count"), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Calls an unsupported method")]
    async fn test_memory_store_unknown_id() {
        let store = MemoryJobStore::new();
        let result = store.mark_sent(JobId::new(9)).await;
        assert!(matches!(result, Err(QueueError::NotFound(_))));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Calls an unsupported method")]
    async fn test_memory_store_capacity_limit() {
        let store = MemoryJobStore::with_capacity(2);
        assert_eq!(store.capacity(), Some(2));

        let result = store
            .enqueue(vec![input("Bob"), input("Carol"), input("Dave")])
            .await;
        assert!(matches!(
            result,
            Err(QueueError::PartialEnqueue {
                inserted: 2,
                rejected: 1,
                ..
            })
        ));

        // Accepted jobs remain queued
        assert_eq!(store.count_pending().await.expect("Failed to count"), 2);

        // Purging frees the capacity again
        store.purge().await.expect("Failed to purge");
        let ids = store.enqueue(vec![input("Erin")]).await.expect("Failed to enqueue");
        assert_eq!(ids, vec![JobId::new(1)]);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Calls an unsupported method")]
    async fn test_memory_store_concurrent_marks() {
        let store = MemoryJobStore::new();
        let inputs = (0..50).map(|i| input(&format!("User{i}"))).collect();
        let ids = store.enqueue(inputs).await.expect("Failed to enqueue");

        let mut tasks = tokio::task::JoinSet::new();
        for id in ids {
            let store = store.clone();
            tasks.spawn(async move { store.mark_sent(id).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.expect("Task panicked").expect("Failed to mark sent");
        }

        assert_eq!(store.count_pending().await.expect("Failed to count"), 0);
        assert_eq!(store.len(), 50);
    }
}
