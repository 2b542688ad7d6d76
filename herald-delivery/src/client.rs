use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use herald_common::{ConfigError, TransportConfig};
use herald_queue::Job;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{ComposedMessage, DeliveryError, Transport};

/// How often, and how far apart, a job's delivery is attempted
///
/// The backoff is flat: every retry waits the same time.
///
/// # Example
///
/// ```ron
/// retry: (
///     max_attempts: 3,
///     backoff_secs: 2,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts per job, including the first
    ///
    /// Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between a failed attempt and the next one
    ///
    /// Default: 2 seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_secs() -> u64 {
    2
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    /// # Errors
    ///
    /// Returns an error if no attempt would ever be made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidField {
                field: "max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Delivers one job, retrying internally, and reports the final outcome
///
/// This is the seam between the dispatch pool and delivery: the pool only
/// ever sees a job's terminal result.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// # Errors
    ///
    /// Returns a terminal [`DeliveryError`] once the job cannot be delivered.
    async fn attempt_delivery(
        &self,
        config: &TransportConfig,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<(), DeliveryError>;
}

/// Composes a job's message and drives a [`Transport`] through the retry policy
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl DeliveryClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[async_trait]
impl Delivery for DeliveryClient {
    async fn attempt_delivery(
        &self,
        config: &TransportConfig,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<(), DeliveryError> {
        let message = ComposedMessage::new(config, job);
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.transport.send(config, &message).await {
                Ok(()) => {
                    tracing::debug!(
                        job_id = %job.id,
                        recipient = %message.to,
                        attempt,
                        "Delivered"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        recipient = %message.to,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Delivery attempt failed"
                    );
                }
            }

            if attempt == max_attempts {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(DeliveryError::Cancelled(message.to));
                }
                () = tokio::time::sleep(self.retry.backoff()) => {}
            }
        }

        Err(DeliveryError::Exhausted(message.to))
    }
}
