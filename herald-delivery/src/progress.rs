//! Run progress: events from workers, counters owned by one aggregator task
//!
//! Workers never touch the counters. Each resolved job becomes one
//! [`ProgressEvent`] on a channel, and the [`ProgressAggregator`] task that
//! drains it is the only writer of the run's totals. After every event it
//! publishes a [`ProgressSnapshot`] to a [`ProgressSink`], and once the
//! channel closes it publishes one final, terminal snapshot.

use std::sync::Arc;

use herald_queue::JobId;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

/// How a job resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A launched job finished
    Resolved { job_id: JobId, outcome: Outcome },
    /// Jobs that failed without being attempted, e.g. because the store
    /// could not be read or a worker died
    Abandoned { count: usize },
}

impl ProgressEvent {
    #[must_use]
    pub const fn sent(job_id: JobId) -> Self {
        Self::Resolved {
            job_id,
            outcome: Outcome::Sent,
        }
    }

    #[must_use]
    pub const fn failed(job_id: JobId) -> Self {
        Self::Resolved {
            job_id,
            outcome: Outcome::Failed,
        }
    }
}

/// Final counters of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub sent: usize,
    pub failed: usize,
}

impl Totals {
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.sent + self.failed
    }
}

/// A consistent view of a run's progress
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// `processed / total`, forced to 1.0 on the terminal snapshot
    pub fraction: f64,
    /// The run is over and no further snapshot follows
    pub terminal: bool,
}

impl ProgressSnapshot {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(total: usize, totals: Totals) -> Self {
        let processed = totals.processed();
        let fraction = if total == 0 {
            1.0
        } else {
            (processed as f64 / total as f64).min(1.0)
        };

        Self {
            processed,
            total,
            sent: totals.sent,
            failed: totals.failed,
            fraction,
            terminal: false,
        }
    }

    #[must_use]
    pub fn terminal(total: usize, totals: Totals) -> Self {
        Self {
            fraction: 1.0,
            terminal: true,
            ..Self::new(total, totals)
        }
    }
}

/// Receives progress snapshots for display
pub trait ProgressSink: Send + Sync {
    fn publish(&self, snapshot: &ProgressSnapshot);
}

/// Publishes snapshots on a `watch` channel, for UIs and tests
#[derive(Debug)]
pub struct WatchSink {
    sender: watch::Sender<ProgressSnapshot>,
}

impl WatchSink {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ProgressSnapshot::default());
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.sender.subscribe()
    }

    /// The most recently published snapshot
    #[must_use]
    pub fn latest(&self) -> ProgressSnapshot {
        *self.sender.borrow()
    }
}

impl Default for WatchSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for WatchSink {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        self.sender.send_replace(*snapshot);
    }
}

/// Logs each snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        if snapshot.terminal {
            tracing::info!(
                sent = snapshot.sent,
                failed = snapshot.failed,
                total = snapshot.total,
                "Job completed! Emails sent: {}, Failed: {}",
                snapshot.sent,
                snapshot.failed
            );
        } else {
            tracing::info!(
                processed = snapshot.processed,
                total = snapshot.total,
                sent = snapshot.sent,
                failed = snapshot.failed,
                "Progress {:.0}%",
                snapshot.fraction * 100.0
            );
        }
    }
}

/// Single consumer of a run's progress events
pub struct ProgressAggregator {
    total: usize,
    totals: Totals,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(total: usize, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            total,
            totals: Totals::default(),
            sink,
        }
    }

    /// Start aggregating on its own task
    ///
    /// The task ends, publishing the terminal snapshot, once every sender
    /// has been dropped.
    #[must_use]
    pub fn spawn(
        total: usize,
        sink: Arc<dyn ProgressSink>,
    ) -> (mpsc::UnboundedSender<ProgressEvent>, JoinHandle<Totals>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::new(total, sink).run(receiver));
        (sender, handle)
    }

    /// Apply one event and publish the resulting snapshot
    pub fn record(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Resolved {
                outcome: Outcome::Sent,
                ..
            } => self.totals.sent += 1,
            ProgressEvent::Resolved {
                outcome: Outcome::Failed,
                ..
            } => self.totals.failed += 1,
            ProgressEvent::Abandoned { count } => self.totals.failed += count,
        }

        self.sink
            .publish(&ProgressSnapshot::new(self.total, self.totals));
    }

    /// Publish the terminal snapshot and hand back the counters
    pub fn finish(self) -> Totals {
        self.sink
            .publish(&ProgressSnapshot::terminal(self.total, self.totals));
        self.totals
    }

    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ProgressEvent>) -> Totals {
        while let Some(event) = events.recv().await {
            self.record(event);
        }
        self.finish()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<ProgressSnapshot>>);

    impl ProgressSink for RecordingSink {
        fn publish(&self, snapshot: &ProgressSnapshot) {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(*snapshot);
        }
    }

    impl RecordingSink {
        fn snapshots(&self) -> Vec<ProgressSnapshot> {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[test]
    fn test_snapshot_fraction() {
        let snapshot = ProgressSnapshot::new(4, Totals { sent: 1, failed: 1 });
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.fraction, 0.5);
        assert!(!snapshot.terminal);

        assert_eq!(ProgressSnapshot::new(0, Totals::default()).fraction, 1.0);
    }

    #[test]
    fn test_terminal_snapshot_is_complete() {
        // A cancelled run still ends at 100%
        let snapshot = ProgressSnapshot::terminal(10, Totals { sent: 3, failed: 1 });
        assert_eq!(snapshot.fraction, 1.0);
        assert!(snapshot.terminal);
        assert_eq!(snapshot.processed, 4);
    }

    #[test]
    fn test_record_publishes_every_event() {
        let sink = Arc::new(RecordingSink::default());
        let mut aggregator = ProgressAggregator::new(3, sink.clone());

        aggregator.record(ProgressEvent::sent(JobId::new(2)));
        aggregator.record(ProgressEvent::failed(JobId::new(1)));
        aggregator.record(ProgressEvent::sent(JobId::new(3)));
        let totals = aggregator.finish();

        assert_eq!(totals, Totals { sent: 2, failed: 1 });

        let snapshots = sink.snapshots();
        assert_eq!(snapshots.len(), 4);
        assert_eq!(
            snapshots.iter().map(|s| s.processed).collect::<Vec<_>>(),
            vec![1, 2, 3, 3]
        );
        assert!(snapshots[3].terminal);
        assert!(snapshots[..3].iter().all(|s| !s.terminal));
    }

    #[test]
    fn test_abandoned_jobs_count_as_failed() {
        let sink = Arc::new(RecordingSink::default());
        let mut aggregator = ProgressAggregator::new(5, sink);

        aggregator.record(ProgressEvent::Abandoned { count: 5 });
        assert_eq!(aggregator.finish(), Totals { sent: 0, failed: 5 });
    }

    #[tokio::test]
    async fn test_spawned_aggregator_counts_concurrent_events() {
        let sink = Arc::new(WatchSink::new());
        let (events, handle) = ProgressAggregator::spawn(100, sink.clone());

        let mut producers = tokio::task::JoinSet::new();
        for id in 1..=100u64 {
            let events = events.clone();
            producers.spawn(async move {
                let event = if id % 3 == 0 {
                    ProgressEvent::failed(JobId::new(id))
                } else {
                    ProgressEvent::sent(JobId::new(id))
                };
                events.send(event).is_ok()
            });
        }
        drop(events);
        while let Some(sent) = producers.join_next().await {
            assert!(matches!(sent, Ok(true)));
        }

        let totals = handle.await.unwrap_or_default();
        assert_eq!(totals, Totals { sent: 67, failed: 33 });

        let latest = sink.latest();
        assert!(latest.terminal);
        assert_eq!(latest.processed, 100);
        assert_eq!(latest.fraction, 1.0);
    }
}
