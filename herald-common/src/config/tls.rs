//! TLS policy for the submission connection.

use serde::{Deserialize, Serialize};

/// Port on which submission servers expect a STARTTLS upgrade.
pub const SUBMISSION_PORT: u16 = 587;

/// Defines when the connection is upgraded via STARTTLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Upgrade when connecting to the submission port (587), plaintext otherwise.
    #[default]
    PortBased,

    /// Always upgrade, fail the attempt if the server refuses.
    Required,

    /// Never upgrade.
    ///
    /// **WARNING**: credentials travel in the clear. Only use for testing.
    Disabled,
}

impl TlsPolicy {
    /// Returns `true` if a connection to `port` must be upgraded before
    /// authenticating.
    #[must_use]
    pub const fn requires_starttls(self, port: u16) -> bool {
        match self {
            Self::PortBased => port == SUBMISSION_PORT,
            Self::Required => true,
            Self::Disabled => false,
        }
    }
}
