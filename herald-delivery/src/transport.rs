//! Single delivery attempts against the mail-transfer endpoint
//!
//! A [`Transport`] performs exactly one attempt and reports which stage failed;
//! retrying is the delivery client's concern.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use herald_common::{TransportConfig, internal};
use herald_smtp::{ClientError, SmtpClient};

use crate::{ComposedMessage, DeliveryError, SmtpTimeouts};

/// One end-to-end delivery attempt of a composed message
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// # Errors
    ///
    /// Returns the stage that failed: [`DeliveryError::ConnectFailed`],
    /// [`DeliveryError::AuthFailed`] or [`DeliveryError::TransferFailed`].
    async fn send(
        &self,
        config: &TransportConfig,
        message: &ComposedMessage,
    ) -> Result<(), DeliveryError>;
}

/// Submits messages over SMTP, one connection per attempt
///
/// The session runs connect, greeting, EHLO, STARTTLS (when the TLS policy
/// calls for it) followed by a second EHLO, AUTH PLAIN (when credentials are
/// configured), MAIL FROM, RCPT TO, DATA and QUIT. Every step is bounded by
/// its own timeout.
#[derive(Debug, Clone, Default)]
pub struct SmtpTransport {
    timeouts: SmtpTimeouts,
}

impl SmtpTransport {
    #[must_use]
    pub const fn new(timeouts: SmtpTimeouts) -> Self {
        Self { timeouts }
    }

    #[must_use]
    pub const fn timeouts(&self) -> &SmtpTimeouts {
        &self.timeouts
    }
}

/// Run one protocol step under `limit`, mapping its failure to `stage`
async fn step<T>(
    limit: Duration,
    name: &str,
    stage: fn(String) -> DeliveryError,
    future: impl Future<Output = Result<T, ClientError>> + Send,
) -> Result<T, DeliveryError> {
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(stage(format!("{name}: {e}"))),
        Err(_) => Err(stage(format!("{name} timed out after {limit:?}"))),
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(
        &self,
        config: &TransportConfig,
        message: &ComposedMessage,
    ) -> Result<(), DeliveryError> {
        let timeouts = &self.timeouts;
        let address = config.address();
        let helo_domain = config.sender_domain();

        let mut client = step(
            timeouts.connect(),
            "connect",
            DeliveryError::ConnectFailed,
            async {
                let mut client = SmtpClient::connect(&address, config.host.clone())
                    .await?
                    .accept_invalid_certs(config.accept_invalid_certs);
                client.read_greeting().await?;
                Ok(client)
            },
        )
        .await?;

        step(
            timeouts.ehlo(),
            "EHLO",
            DeliveryError::ConnectFailed,
            client.ehlo(helo_domain),
        )
        .await?;

        if config.requires_starttls() {
            step(
                timeouts.starttls(),
                "STARTTLS",
                DeliveryError::ConnectFailed,
                client.starttls(),
            )
            .await?;
            internal!("Upgraded connection to {address} via STARTTLS");

            step(
                timeouts.ehlo(),
                "EHLO",
                DeliveryError::ConnectFailed,
                client.ehlo(helo_domain),
            )
            .await?;
        }

        if config.has_credentials() {
            step(
                timeouts.auth(),
                "AUTH",
                DeliveryError::AuthFailed,
                client.auth_plain(&config.user, &config.password),
            )
            .await?;
        }

        step(
            timeouts.mail_from(),
            "MAIL FROM",
            DeliveryError::TransferFailed,
            client.mail_from(&message.from),
        )
        .await?;

        step(
            timeouts.rcpt_to(),
            "RCPT TO",
            DeliveryError::TransferFailed,
            client.rcpt_to(&message.to),
        )
        .await?;

        let content = message.render();
        step(
            timeouts.data(),
            "DATA",
            DeliveryError::TransferFailed,
            async {
                client.data().await?;
                client.send_data(&content).await
            },
        )
        .await?;

        // The message has been accepted; a failed QUIT does not undo that
        if let Err(e) = step(
            timeouts.quit(),
            "QUIT",
            DeliveryError::TransferFailed,
            client.quit(),
        )
        .await
        {
            tracing::warn!(server = %address, error = %e, "QUIT failed after successful delivery");
        }

        Ok(())
    }
}
