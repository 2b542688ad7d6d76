//! Failures of a submission session.

use std::io;

use thiserror::Error;

/// Why a command of the session could not be completed
#[derive(Error, Debug)]
pub enum ClientError {
    /// Reading from or writing to the socket failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The server sent something that is not an SMTP reply.
    #[error("Failed to parse SMTP response: {0}")]
    ParseError(String),

    /// The server returned an error status code (4xx or 5xx), or a success
    /// code other than the one the command calls for.
    #[error("SMTP error: {code} - {message}")]
    SmtpError { code: u16, message: String },

    /// Setting up or running the STARTTLS upgrade failed.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// The server hung up mid-session.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// A reply was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

impl ClientError {
    /// The SMTP reply code, when the server rejected a command
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::SmtpError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
