//! Configuration types supplied by the caller before a dispatch run.
//!
//! ## Modules
//!
//! - [`transport`]: where and how to connect to the mail-transfer endpoint
//! - [`tls`]: when the connection is upgraded via STARTTLS
//! - [`message`]: recipients and the subject/body template

pub mod message;
pub mod tls;
pub mod transport;

pub use message::{NAME_PLACEHOLDER, Recipient, SENDER_PLACEHOLDER, Template};
pub use tls::TlsPolicy;
pub use transport::TransportConfig;
