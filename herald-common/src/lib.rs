//! Shared building blocks for the herald dispatcher: logging setup, the
//! configuration types handed to the dispatch engine, and configuration errors.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Recipient, Template, TlsPolicy, TransportConfig};
pub use error::ConfigError;
pub use tracing;
