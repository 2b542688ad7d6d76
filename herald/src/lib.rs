//! Bulk message dispatcher: queue a batch of personalised messages and drain
//! it through a paced, bounded pool of SMTP deliveries.

pub mod controller;

pub use controller::Herald;
