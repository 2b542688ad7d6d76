//! Bounded-concurrency draining of the job store
//!
//! A run moves through `Idle → Counting → Draining → Settling → Completed`. While
//! draining, the dispatch loop takes one of `concurrency` slots per job
//! (waiting when all are busy) and launches a worker that delivers the job,
//! marks it sent, reports its outcome and then paces itself. When every
//! launched worker has finished the store is purged and the summary returned.
//!
//! Cancellation stops the loop from launching further jobs. Workers already
//! running finish their current attempt, make no further ones, and still
//! report, so a cancelled run ends with a partial summary.

use std::sync::Arc;

use herald_common::{ConfigError, TransportConfig, internal};
use herald_queue::{Job, JobStore};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{
    Delivery, DispatchError, ProgressAggregator, ProgressEvent, ProgressSink, ProgressSnapshot,
    RateGovernor, Totals,
};

/// Pool settings
///
/// ```ron
/// dispatch: (
///     concurrency: 10,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Maximum deliveries in flight at once
    ///
    /// Default: 10
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

const fn default_concurrency() -> usize {
    10
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl DispatchSettings {
    /// # Errors
    ///
    /// Returns an error if no worker could ever run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidField {
                field: "concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where a pool is in its current run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPhase {
    /// No run has started
    #[default]
    Idle,
    /// Counting the pending jobs
    Counting,
    /// Launching workers, one per job
    Draining,
    /// Launching has stopped; waiting for the workers still in flight
    Settling,
    /// Every launched worker finished and the store was purged
    Completed,
}

impl RunPhase {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Counting | Self::Draining | Self::Settling)
    }
}

/// The result of one run
///
/// `sent + failed + skipped == total`; `skipped` is only non-zero for a
/// cancelled run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// Jobs never launched because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
}

/// Everything a worker needs, cloned once per job
#[derive(Clone)]
struct Worker {
    store: Arc<dyn JobStore>,
    delivery: Arc<dyn Delivery>,
    governor: RateGovernor,
    config: Arc<TransportConfig>,
    events: mpsc::UnboundedSender<ProgressEvent>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, job: Job, _slot: OwnedSemaphorePermit) {
        let event = match self
            .delivery
            .attempt_delivery(&self.config, &job, &self.cancel)
            .await
        {
            Ok(()) => match self.store.mark_sent(job.id).await {
                Ok(()) => {
                    tracing::info!(
                        job_id = %job.id,
                        recipient = %job.recipient_email,
                        "Email sent"
                    );
                    ProgressEvent::sent(job.id)
                }
                Err(e) => {
                    tracing::error!(
                        job_id = %job.id,
                        recipient = %job.recipient_email,
                        error = %e,
                        "Delivered but could not mark job as sent"
                    );
                    ProgressEvent::failed(job.id)
                }
            },
            Err(e) => {
                tracing::warn!(
                    job_id = %job.id,
                    recipient = %job.recipient_email,
                    error = %e,
                    "Failed to send email"
                );
                ProgressEvent::failed(job.id)
            }
        };

        if self.events.send(event).is_err() {
            tracing::error!(job_id = %job.id, "Progress aggregator stopped before the run ended");
        }

        self.governor.pace(&self.cancel).await;
    }
}

/// Drains a job store through a bounded set of concurrent workers
pub struct DispatchPool {
    store: Arc<dyn JobStore>,
    delivery: Arc<dyn Delivery>,
    governor: RateGovernor,
    settings: DispatchSettings,
    phase: watch::Sender<RunPhase>,
}

impl DispatchPool {
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, or if the pacing would
    /// exceed an enforced hourly ceiling.
    pub fn new(
        store: Arc<dyn JobStore>,
        delivery: Arc<dyn Delivery>,
        governor: RateGovernor,
        settings: DispatchSettings,
    ) -> Result<Self, DispatchError> {
        settings.validate()?;
        governor.check_ceiling(settings.concurrency)?;

        let (phase, _) = watch::channel(RunPhase::Idle);
        Ok(Self {
            store,
            delivery,
            governor,
            settings,
            phase,
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Observe phase transitions
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Drain every pending job, purge the store, and summarise the run.
    ///
    /// Per-job failures and store errors are logged and counted, never
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error, before touching the store, if the transport
    /// configuration is invalid or a run is already in progress.
    pub async fn run(
        &self,
        config: &TransportConfig,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, DispatchError> {
        config.validate()?;

        let started = self.phase.send_if_modified(|phase| {
            if phase.is_active() {
                false
            } else {
                *phase = RunPhase::Counting;
                true
            }
        });
        if !started {
            return Err(DispatchError::AlreadyRunning);
        }

        let summary = self.drain(config, sink, &cancel).await;

        if let Err(e) = self.store.purge().await {
            tracing::error!(error = %e, "Failed to clear the job store");
        }
        self.phase.send_replace(RunPhase::Completed);

        internal!(
            level = INFO,
            "Dispatch finished: {} sent, {} failed, {} skipped of {}",
            summary.sent,
            summary.failed,
            summary.skipped,
            summary.total
        );

        Ok(summary)
    }

    async fn drain(
        &self,
        config: &TransportConfig,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let counted = match self.store.count_pending().await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count pending jobs");
                None
            }
        };

        if counted == Some(0) {
            internal!(level = INFO, "No pending jobs");
            sink.publish(&ProgressSnapshot::terminal(0, Totals::default()));
            return RunSummary {
                cancelled: cancel.is_cancelled(),
                ..RunSummary::default()
            };
        }

        self.phase.send_replace(RunPhase::Draining);

        let jobs = match self.store.fetch_pending().await {
            Ok(jobs) => jobs,
            Err(e) => {
                let total = counted.unwrap_or_default();
                tracing::error!(error = %e, total, "Failed to fetch pending jobs");

                let (events, aggregator) = ProgressAggregator::spawn(total, sink);
                if total > 0 {
                    let _ = events.send(ProgressEvent::Abandoned { count: total });
                }
                drop(events);

                let totals = collect(aggregator).await;
                return RunSummary {
                    total,
                    sent: totals.sent,
                    failed: totals.failed,
                    skipped: 0,
                    cancelled: cancel.is_cancelled(),
                };
            }
        };

        let total = jobs.len();
        internal!(
            level = INFO,
            "Dispatching {total} jobs with {} workers",
            self.settings.concurrency
        );

        let (events, aggregator) = ProgressAggregator::spawn(total, sink);
        let worker = Worker {
            store: Arc::clone(&self.store),
            delivery: Arc::clone(&self.delivery),
            governor: self.governor.clone(),
            config: Arc::new(config.clone()),
            events: events.clone(),
            cancel: cancel.clone(),
        };

        let slots = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut workers = JoinSet::new();
        let mut skipped = 0;

        for (index, job) in jobs.into_iter().enumerate() {
            let slot = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                slot = Arc::clone(&slots).acquire_owned() => slot.ok(),
            };

            let Some(slot) = slot else {
                skipped = total - index;
                tracing::warn!(skipped, "Dispatch cancelled, remaining jobs not started");
                break;
            };

            workers.spawn(worker.clone().run(job, slot));
        }
        drop(worker);
        self.phase.send_replace(RunPhase::Settling);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Dispatch worker did not finish");
                let _ = events.send(ProgressEvent::Abandoned { count: 1 });
            }
        }
        drop(events);

        let totals = collect(aggregator).await;
        RunSummary {
            total,
            sent: totals.sent,
            failed: totals.failed,
            skipped,
            cancelled: cancel.is_cancelled(),
        }
    }
}

async fn collect(aggregator: tokio::task::JoinHandle<Totals>) -> Totals {
    aggregator.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Progress aggregator failed");
        Totals::default()
    })
}
