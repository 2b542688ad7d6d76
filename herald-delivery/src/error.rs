//! Typed error handling for dispatch runs.
//!
//! A [`DeliveryError`] describes why one job could not be delivered and never
//! escapes the pool: it is logged and counted as a failure. Only a
//! [`DispatchError`] prevents a run from starting.

use herald_common::ConfigError;
use thiserror::Error;

/// Failure of a delivery attempt, or of a job once its attempts are used up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Connecting, reading the greeting, EHLO or STARTTLS failed.
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The server refused the sender, the recipient or the message.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Every attempt for this address failed.
    #[error("Failed to deliver to {0} after all attempts")]
    Exhausted(String),

    /// The run was cancelled before the next attempt for this address.
    #[error("Delivery to {0} cancelled")]
    Cancelled(String),
}

impl DeliveryError {
    /// Returns `true` if this error ends the job.
    ///
    /// Per-attempt errors are retried inside the delivery client; only the
    /// outcome of the whole retry loop is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted(_) | Self::Cancelled(_))
    }
}

/// Errors that stop a run before any job is attempted.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A run is already counting or draining on this pool.
    #[error("A dispatch run is already in progress")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(DeliveryError::Exhausted("bob@example.com".into()).is_terminal());
        assert!(DeliveryError::Cancelled("bob@example.com".into()).is_terminal());
        assert!(!DeliveryError::ConnectFailed("refused".into()).is_terminal());
        assert!(!DeliveryError::AuthFailed("535".into()).is_terminal());
        assert!(!DeliveryError::TransferFailed("550".into()).is_terminal());
    }

    #[test]
    fn test_exhausted_names_address() {
        assert_eq!(
            DeliveryError::Exhausted("bob@example.com".into()).to_string(),
            "Failed to deliver to bob@example.com after all attempts"
        );
    }
}
