use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Job, JobId, JobInput, JobStatus, QueueError};

/// The job rows of a single batch, keyed by id
///
/// Shared by every backend. Ids are allocated from a counter that restarts
/// when the table is purged, since the store only ever holds one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JobTable {
    last_id: u64,
    jobs: BTreeMap<JobId, Job>,
}

impl JobTable {
    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn insert(&mut self, input: JobInput) -> JobId {
        self.last_id += 1;
        let id = JobId::new(self.last_id);
        self.jobs.insert(id, Job::from_input(id, input));
        id
    }

    pub(crate) fn pending(&self) -> Vec<Job> {
        self.jobs
            .values()
            .filter(|job| job.status.is_pending())
            .cloned()
            .collect()
    }

    pub(crate) fn count_pending(&self) -> usize {
        self.jobs
            .values()
            .filter(|job| job.status.is_pending())
            .count()
    }

    /// Returns `true` if the job changed status
    pub(crate) fn mark_sent(&mut self, id: JobId) -> crate::Result<bool> {
        let job = self.jobs.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        if job.status == JobStatus::Sent {
            return Ok(false);
        }

        job.status = JobStatus::Sent;
        Ok(true)
    }

    pub(crate) fn purge(&mut self) {
        self.jobs.clear();
        self.last_id = 0;
    }

    /// Insert inputs one at a time, stopping at `capacity`
    ///
    /// Accepted inputs stay in the table even when later ones are rejected.
    pub(crate) fn enqueue(
        &mut self,
        inputs: Vec<JobInput>,
        capacity: Option<usize>,
    ) -> crate::Result<Vec<JobId>> {
        let mut ids = Vec::with_capacity(inputs.len());
        let mut rejected = 0;
        let mut first_error = None;

        for input in inputs {
            match capacity {
                Some(capacity) if self.len() >= capacity => {
                    rejected += 1;
                    first_error.get_or_insert(QueueError::CapacityExceeded {
                        len: self.len(),
                        capacity,
                    });
                }
                _ => ids.push(self.insert(input)),
            }
        }

        match first_error {
            None => Ok(ids),
            Some(first_error) => Err(QueueError::PartialEnqueue {
                inserted: ids.len(),
                rejected,
                first_error: Box::new(first_error),
            }),
        }
    }
}
