use std::{path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    backends::{FileJobStore, MemoryJobStore},
    r#trait::JobStore,
};

/// Configuration for the job store
///
/// # Examples
///
/// File-backed queue in RON config:
/// ```ron
/// Herald (
///     queue: (
///         type: "File",
///         path: "/var/lib/herald/queue.bin",
///     ),
/// )
/// ```
///
/// Memory-backed queue with capacity limit:
/// ```ron
/// Herald (
///     queue: (
///         type: "Memory",
///         capacity: 1000,
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueConfig {
    /// Durable snapshot on disk
    File(FileConfig),
    /// Lost on exit; the batch must be resubmitted
    Memory(MemoryConfig),
}

/// Configuration for the file-backed store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::default_path")]
    pub path: PathBuf,
}

impl FileConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("herald.queue")
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// Configuration for the memory-backed store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of jobs to hold (omit for unlimited)
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::File(FileConfig::default())
    }
}

impl QueueConfig {
    /// Get the filesystem path for file-backed stores, if applicable
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File(config) => Some(&config.path),
            Self::Memory(_) => None,
        }
    }

    /// Open the configured store
    ///
    /// # Errors
    /// If the file store path is invalid or its snapshot cannot be loaded
    pub async fn open(&self) -> crate::Result<Arc<dyn JobStore>> {
        Ok(match self {
            Self::File(config) => Arc::new(FileJobStore::open(&config.path).await?),
            Self::Memory(config) => config.capacity.map_or_else(
                || Arc::new(MemoryJobStore::new()) as Arc<dyn JobStore>,
                |capacity| Arc::new(MemoryJobStore::with_capacity(capacity)),
            ),
        })
    }
}
