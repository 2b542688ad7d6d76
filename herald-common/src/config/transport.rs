//! Transport configuration: the remote endpoint and its credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, config::TlsPolicy};

/// Immutable snapshot of endpoint host, port, credentials and sender address.
///
/// Shared read-only across every worker of a run. The legacy field names
/// (`smtp_host`, `smtp_port`, `smtp_user`, `smtp_pass`) are accepted as aliases.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Hostname of the mail-transfer endpoint
    #[serde(alias = "smtp_host")]
    pub host: String,

    /// TCP port of the endpoint
    #[serde(alias = "smtp_port")]
    pub port: u16,

    /// User name for AUTH PLAIN; authentication is skipped when empty
    #[serde(alias = "smtp_user", default)]
    pub user: String,

    /// Password for AUTH PLAIN
    #[serde(alias = "smtp_pass", default)]
    pub password: String,

    /// Envelope sender address, also used in the `From` header
    pub from: String,

    /// When to upgrade the connection via STARTTLS
    #[serde(default)]
    pub tls: TlsPolicy,

    /// Accept invalid TLS certificates (for testing only)
    ///
    /// **SECURITY WARNING**: disables certificate validation.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("tls", &self.tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl TransportConfig {
    /// Create a configuration with the default TLS policy
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            from: from.into(),
            tls: TlsPolicy::default(),
            accept_invalid_certs: false,
        }
    }

    /// The `host:port` pair to connect to
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the connection must be upgraded before authenticating
    #[must_use]
    pub const fn requires_starttls(&self) -> bool {
        self.tls.requires_starttls(self.port)
    }

    /// Whether credentials were supplied
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty()
    }

    /// The domain part of the sender address, used to identify ourselves in EHLO
    #[must_use]
    pub fn sender_domain(&self) -> &str {
        self.from
            .rsplit_once('@')
            .map_or(self.host.as_str(), |(_, domain)| domain)
    }

    /// Check that the configuration can be used to start a run
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty, the port is zero, or the
    /// sender address is not an address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("host"));
        }

        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be between 1-65535"));
        }

        if self.from.trim().is_empty() {
            return Err(ConfigError::MissingField("from"));
        }

        match self.from.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(ConfigError::invalid(
                    "from",
                    format!("'{}' is not an email address", self.from),
                ));
            }
        }

        if self.user.is_empty() != self.password.is_empty() {
            return Err(ConfigError::invalid(
                "password",
                "user and password must be supplied together",
            ));
        }

        Ok(())
    }
}
