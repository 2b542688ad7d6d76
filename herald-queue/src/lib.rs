pub mod backends;
pub mod config;
pub mod error;
pub mod r#trait;
pub mod types;

mod table;

pub use backends::{FileJobStore, MemoryJobStore, TestJobStore};
pub use config::{FileConfig, MemoryConfig, QueueConfig};
pub use error::{QueueError, Result, SerializationError};
pub use r#trait::JobStore;
pub use types::{Job, JobId, JobInput, JobStatus};
