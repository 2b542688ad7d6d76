//! Error types for the herald-queue crate.
//!
//! Every job store operation returns [`QueueError`], which separates I/O and
//! snapshot encoding failures from logical ones such as an unknown id.

use std::io;

use thiserror::Error;

use crate::JobId;

/// Top-level job store error type.
#[derive(Debug, Error)]
pub enum QueueError {
    /// I/O operation failed (snapshot read/write/rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// No job with this id is held by the store.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The store refused another job.
    #[error("Job store capacity exceeded: {len}/{capacity} jobs")]
    CapacityExceeded { len: usize, capacity: usize },

    /// Some jobs of a batch were rejected. The accepted ones stay queued.
    #[error("Enqueued {inserted} jobs, rejected {rejected}: {first_error}")]
    PartialEnqueue {
        inserted: usize,
        rejected: usize,
        first_error: Box<QueueError>,
    },

    /// Store location validation failed.
    #[error("Job store validation error: {0}")]
    Validation(String),

    /// Internal error (lock poisoning, injected faults, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Snapshot encoding errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Specialized `Result` type for job store operations.
pub type Result<T> = std::result::Result<T, QueueError>;

impl<T> From<std::sync::PoisonError<T>> for QueueError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

impl From<bincode::error::EncodeError> for QueueError {
    fn from(e: bincode::error::EncodeError) -> Self {
        Self::Serialization(e.into())
    }
}

impl From<bincode::error::DecodeError> for QueueError {
    fn from(e: bincode::error::DecodeError) -> Self {
        Self::Serialization(e.into())
    }
}
