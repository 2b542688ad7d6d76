use std::{
    ffi::OsString,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Job, JobId, JobInput, QueueError, r#trait::JobStore, table::JobTable};

/// Job store persisted to a single snapshot file
///
/// The whole table is encoded with bincode and rewritten after every
/// mutation: the new snapshot goes to a sibling `.tmp` file which is then
/// renamed over the old one, so a crash leaves either the previous or the
/// next state on disk, never a torn one. The in-memory copy is only replaced
/// once the snapshot has been written.
///
/// Writers are serialised by a mutex, so concurrent `mark_sent` calls from
/// the dispatch workers never lose an update.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    path: PathBuf,
    table: Arc<Mutex<JobTable>>,
}

impl FileJobStore {
    /// Open the store at `path`, loading any snapshot left by a previous run
    ///
    /// A missing file is an empty store. A stale temporary file from an
    /// interrupted write is removed.
    ///
    /// # Errors
    /// - If the path is rejected by validation
    /// - If an existing snapshot cannot be read or decoded
    pub async fn open(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let path = path.into();
        Self::validate_path(&path)?;

        let temp = temp_path(&path);
        match tokio::fs::remove_file(&temp).await {
            Ok(()) => {
                tracing::warn!(path = %temp.display(), "Removed stale job store snapshot");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let (table, _): (JobTable, usize) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                tracing::debug!(
                    path = %path.display(),
                    jobs = table.len(),
                    "Loaded job store snapshot"
                );
                table
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => JobTable::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            table: Arc::new(Mutex::new(table)),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn validate_path(path: &Path) -> crate::Result<()> {
        if path.as_os_str().is_empty() {
            return Err(QueueError::Validation(
                "Job store path cannot be empty".to_string(),
            ));
        }

        if path.components().any(|c| c == Component::ParentDir) {
            return Err(QueueError::Validation(format!(
                "Job store path cannot contain '..' components: {}",
                path.display()
            )));
        }

        let sensitive_prefixes = [
            "/etc",
            "/bin",
            "/sbin",
            "/usr/bin",
            "/usr/sbin",
            "/boot",
            "/sys",
            "/proc",
            "/dev",
        ];

        for prefix in &sensitive_prefixes {
            if path.starts_with(prefix) {
                return Err(QueueError::Validation(format!(
                    "Job store path cannot be in system directory {prefix}: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    async fn persist(&self, table: &JobTable) -> crate::Result<()> {
        let bytes = bincode::serde::encode_to_vec(table, bincode::config::standard())?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = temp_path(&self.path);
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        Ok(())
    }

    /// Apply `change` to a copy of the table, persist it if anything changed,
    /// then make it current
    ///
    /// The change's own error is returned after persisting, so rows accepted
    /// by a partially failed enqueue are still written.
    async fn update<T: Send>(
        &self,
        change: impl FnOnce(&mut JobTable) -> crate::Result<T> + Send,
    ) -> crate::Result<T> {
        let mut current = self.table.lock().await;
        let mut next = current.clone();
        let result = change(&mut next);

        if next != *current {
            self.persist(&next).await?;
            *current = next;
        }

        result
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn enqueue(&self, jobs: Vec<JobInput>) -> crate::Result<Vec<JobId>> {
        self.update(|table| table.enqueue(jobs, None)).await
    }

    async fn fetch_pending(&self) -> crate::Result<Vec<Job>> {
        Ok(self.table.lock().await.pending())
    }

    async fn mark_sent(&self, id: JobId) -> crate::Result<()> {
        self.update(|table| table.mark_sent(id).map(|_| ())).await
    }

    async fn purge(&self) -> crate::Result<()> {
        self.update(|table| {
            table.purge();
            Ok(())
        })
        .await
    }

    async fn count_pending(&self) -> crate::Result<usize> {
        Ok(self.table.lock().await.count_pending())
    }
}
