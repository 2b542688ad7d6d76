//! Async SMTP submission client used by the herald delivery workers.
//!
//! The client speaks just enough of RFC 5321 to submit a message to a relay:
//! greeting, EHLO, optional STARTTLS (RFC 3207), optional AUTH PLAIN
//! (RFC 4616), MAIL, RCPT, DATA and QUIT.

pub mod client;

pub use client::{ClientError, Response, ResponseLine, SmtpClient};
