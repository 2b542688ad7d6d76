//! Dispatch engine for bulk delivery
//!
//! This crate drains a [`herald_queue::JobStore`] through a bounded pool of
//! concurrent workers:
//! - [`DeliveryClient`] composes a job's message and attempts delivery with a
//!   flat retry policy
//! - [`RateGovernor`] paces each worker after every attempt
//! - [`DispatchPool`] owns the run state machine, slots and cancellation
//! - [`ProgressAggregator`] is the single owner of the run counters

mod client;
mod compose;
mod error;
mod governor;
mod pool;
mod progress;
mod transport;
mod types;

pub use client::{Delivery, DeliveryClient, RetryPolicy};
pub use compose::{ComposedMessage, substitute};
pub use error::{DeliveryError, DispatchError};
pub use governor::{RateGovernor, RatePolicy};
pub use pool::{DispatchPool, DispatchSettings, RunPhase, RunSummary};
pub use progress::{
    LogSink, Outcome, ProgressAggregator, ProgressEvent, ProgressSink, ProgressSnapshot, Totals,
    WatchSink,
};
pub use transport::{SmtpTransport, Transport};
pub use types::SmtpTimeouts;
