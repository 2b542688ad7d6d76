//! Fixed-delay pacing of delivery workers
//!
//! Every worker pauses for a fixed time after each job it resolves, whether
//! the job was sent or not. This is not a token bucket: with `N` workers the
//! sustained throughput is `N` jobs per pause, so the pause and the pool's
//! concurrency have to be chosen together to stay under an hourly ceiling.
//!
//! # Example
//!
//! ```text
//! concurrency: 10, pause: 2s
//! - each worker resolves at most one job every 2s
//! - the pool resolves at most 10 jobs every 2s, 18000 per hour
//! - a 180/hour ceiling needs concurrency 1 with a 20s pause
//! ```

use std::time::Duration;

use herald_common::ConfigError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Configuration for pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePolicy {
    /// Pause each worker takes after every attempt
    ///
    /// Default: 2 seconds
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,

    /// Intended maximum deliveries per hour
    ///
    /// Default: 180
    #[serde(default = "default_hourly_ceiling")]
    pub hourly_ceiling: u64,

    /// Refuse to start a run whose pacing could exceed the ceiling,
    /// rather than warning about it
    ///
    /// Default: false
    #[serde(default)]
    pub enforce_ceiling: bool,
}

const fn default_pause_secs() -> u64 {
    2
}

const fn default_hourly_ceiling() -> u64 {
    180
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            pause_secs: default_pause_secs(),
            hourly_ceiling: default_hourly_ceiling(),
            enforce_ceiling: false,
        }
    }
}

/// Applies the post-attempt pause for every worker of a pool
#[derive(Debug, Clone, Default)]
pub struct RateGovernor {
    policy: RatePolicy,
}

impl RateGovernor {
    #[must_use]
    pub const fn new(policy: RatePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    #[must_use]
    pub const fn pause(&self) -> Duration {
        Duration::from_secs(self.policy.pause_secs)
    }

    /// Upper bound on deliveries per hour with `concurrency` workers
    ///
    /// Unbounded (`u64::MAX`) when there is no pause at all.
    #[must_use]
    pub const fn effective_hourly_rate(&self, concurrency: usize) -> u64 {
        if self.policy.pause_secs == 0 {
            return u64::MAX;
        }
        (concurrency as u64).saturating_mul(3600) / self.policy.pause_secs
    }

    /// Compare the effective rate for `concurrency` workers against the ceiling.
    ///
    /// Exceeding it is only logged unless the policy enforces the ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RateCeilingExceeded`] when the ceiling is
    /// enforced and would be exceeded.
    pub fn check_ceiling(&self, concurrency: usize) -> Result<(), ConfigError> {
        let effective_per_hour = self.effective_hourly_rate(concurrency);
        if effective_per_hour <= self.policy.hourly_ceiling {
            return Ok(());
        }

        if self.policy.enforce_ceiling {
            return Err(ConfigError::RateCeilingExceeded {
                concurrency,
                effective_per_hour,
                ceiling: self.policy.hourly_ceiling,
            });
        }

        tracing::warn!(
            concurrency,
            pause_secs = self.policy.pause_secs,
            effective_per_hour,
            ceiling = self.policy.hourly_ceiling,
            "Pacing allows more deliveries per hour than the configured ceiling"
        );
        Ok(())
    }

    /// Hold the calling worker for the post-attempt pause.
    ///
    /// Returns early once `cancel` fires, so a cancelled run is not held up
    /// by workers that have nothing left to do.
    pub async fn pace(&self, cancel: &CancellationToken) {
        let pause = self.pause();
        if pause.is_zero() {
            return;
        }

        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(pause) => {}
        }
    }
}
