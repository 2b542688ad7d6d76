//! Configuration errors.
//!
//! These are the only failures that stop a dispatch run before it starts;
//! everything that goes wrong once jobs are draining is contained per job.

use thiserror::Error;

/// Errors raised while validating caller-supplied configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required configuration field is missing or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A configuration value is present but unusable.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// The worker count and pause combine to exceed the hourly ceiling.
    #[error(
        "{concurrency} workers would send up to {effective_per_hour} messages per hour, above the ceiling of {ceiling}"
    )]
    RateCeilingExceeded {
        concurrency: usize,
        effective_per_hour: u64,
        ceiling: u64,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
