use std::sync::Arc;

use herald_common::{ConfigError, Recipient, Template, TransportConfig, internal, logging};
use herald_delivery::{
    DeliveryClient, DispatchPool, DispatchSettings, LogSink, RateGovernor, RatePolicy,
    RetryPolicy, RunSummary, SmtpTimeouts, SmtpTransport,
};
use herald_queue::{JobInput, JobStore, QueueConfig, QueueError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Everything one dispatch run needs, as read from `herald.config.ron`
///
/// ```ron
/// Herald (
///     transport: (
///         host: "smtp.example.com",
///         port: 587,
///         user: "newsletter",
///         password: "secret",
///         from: "news@example.com",
///     ),
///     template: (
///         subject: "Hello {name}",
///         body: "Dear {name},\n\nRegards,\n{sender}",
///     ),
///     recipients: [
///         (sender_name: "Alice", recipient_name: "Bob", recipient_email: "bob@example.org"),
///     ],
///     queue: (type: "File", path: "herald.queue"),
/// )
/// ```
#[derive(Debug, Deserialize)]
pub struct Herald {
    #[serde(alias = "smtp")]
    transport: TransportConfig,
    template: Template,
    #[serde(default)]
    recipients: Vec<Recipient>,
    #[serde(default)]
    queue: QueueConfig,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default)]
    rate: RatePolicy,
    #[serde(default)]
    dispatch: DispatchSettings,
    #[serde(default)]
    timeouts: SmtpTimeouts,
}

/// Resolves once SIGINT or SIGTERM is received
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            internal!(level = WARN, "CTRL+C entered, finishing in-flight deliveries");
        }
        _ = terminate.recv() => {
            internal!(level = WARN, "Terminate Signal received, finishing in-flight deliveries");
        }
    };

    Ok(())
}

impl Herald {
    #[must_use]
    pub const fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    #[must_use]
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    #[must_use]
    pub const fn queue(&self) -> &QueueConfig {
        &self.queue
    }

    /// Check the whole configuration before anything is queued
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transport.validate()?;
        self.template.validate()?;
        for recipient in &self.recipients {
            recipient.validate()?;
        }
        self.retry.validate()?;
        self.dispatch.validate()?;
        RateGovernor::new(self.rate).check_ceiling(self.dispatch.concurrency)?;

        Ok(())
    }

    /// Clear whatever a previous run left behind, then queue this batch
    async fn prepare(&self) -> anyhow::Result<Arc<dyn JobStore>> {
        let store = self.queue.open().await?;

        let stale = store.count_pending().await?;
        if stale > 0 {
            internal!(level = WARN, "Discarding {stale} jobs left over from a previous run");
        }
        store.purge().await?;

        match store
            .enqueue(JobInput::batch(&self.recipients, &self.template))
            .await
        {
            Ok(ids) => internal!(level = INFO, "Queued {} jobs", ids.len()),
            Err(QueueError::PartialEnqueue {
                inserted,
                rejected,
                first_error,
            }) => {
                tracing::warn!(
                    inserted,
                    rejected,
                    error = %first_error,
                    "Some recipients could not be queued"
                );
            }
            Err(e) => return Err(e.into()),
        }

        Ok(store)
    }

    fn pool(&self, store: Arc<dyn JobStore>) -> anyhow::Result<DispatchPool> {
        let transport = Arc::new(SmtpTransport::new(self.timeouts.clone()));
        let delivery = Arc::new(DeliveryClient::new(transport, self.retry));

        Ok(DispatchPool::new(
            store,
            delivery,
            RateGovernor::new(self.rate),
            self.dispatch,
        )?)
    }

    /// Queue the configured batch and drain it, stopping early once `cancel`
    /// fires
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the store cannot
    /// be opened or filled. Failed deliveries are only counted.
    pub async fn dispatch(&self, cancel: CancellationToken) -> anyhow::Result<RunSummary> {
        self.validate()?;

        let store = self.prepare().await?;
        let pool = self.pool(store)?;

        Ok(pool
            .run(&self.transport, Arc::new(LogSink), cancel)
            .await?)
    }

    /// Run one dispatch with logging and signal handling installed
    ///
    /// # Errors
    ///
    /// See [`Herald::dispatch`].
    pub async fn run(self) -> anyhow::Result<RunSummary> {
        logging::init();

        internal!(
            level = INFO,
            "Dispatching {} messages through {}",
            self.recipients.len(),
            self.transport.address()
        );

        let cancel = CancellationToken::new();
        let signals = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match shutdown().await {
                    Ok(()) => cancel.cancel(),
                    Err(e) => tracing::error!(error = %e, "Unable to listen for shutdown signals"),
                }
            }
        });

        let summary = self.dispatch(cancel).await;
        signals.abort();

        let summary = summary?;
        if summary.cancelled {
            internal!(
                level = WARN,
                "Run cancelled: {} jobs were never attempted",
                summary.skipped
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CONFIG: &str = r#"
        Herald (
            transport: (
                smtp_host: "smtp.example.com",
                smtp_port: 587,
                smtp_user: "newsletter",
                smtp_pass: "secret",
                from: "news@example.com",
            ),
            template: (
                subject: "Hello {name}",
                body: "Regards, {sender}",
            ),
            recipients: [
                (SenderName: "Alice", RecipientName: "Bob", RecipientEmail: "bob@example.org"),
                (sender_name: "Alice", recipient_name: "Carol", recipient_email: "carol@example.org"),
            ],
            queue: (type: "Memory"),
            dispatch: (concurrency: 4),
        )
    "#;

    #[test]
    fn test_parse_config() {
        let herald: Herald = ron::from_str(CONFIG).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(herald.transport.host, "smtp.example.com");
        assert!(herald.transport.requires_starttls());
        assert_eq!(herald.recipients.len(), 2);
        assert_eq!(herald.recipients[0].recipient_name, "Bob");
        assert_eq!(herald.dispatch.concurrency, 4);
        assert_eq!(herald.retry, RetryPolicy::default());
        assert_eq!(herald.rate, RatePolicy::default());
        assert!(matches!(herald.queue, QueueConfig::Memory(_)));
        assert!(herald.validate().is_ok());
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let mut herald: Herald = ron::from_str(CONFIG).unwrap_or_else(|e| panic!("{e}"));
        herald.recipients[1].recipient_email = "carol".to_string();

        assert!(matches!(
            herald.validate(),
            Err(ConfigError::InvalidField { field, .. }) if field == "recipient_email"
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_queues_nothing() {
        let mut herald: Herald = ron::from_str(CONFIG).unwrap_or_else(|e| panic!("{e}"));
        herald.transport.port = 0;

        assert!(herald.dispatch(CancellationToken::new()).await.is_err());
    }

    #[test]
    fn test_enforced_ceiling_fails_validation() {
        let mut herald: Herald = ron::from_str(CONFIG).unwrap_or_else(|e| panic!("{e}"));
        herald.rate.enforce_ceiling = true;

        assert_eq!(
            herald.validate(),
            Err(ConfigError::RateCeilingExceeded {
                concurrency: 4,
                effective_per_hour: 7200,
                ceiling: 180,
            })
        );

        herald.dispatch.concurrency = 1;
        herald.rate.pause_secs = 20;
        assert!(herald.validate().is_ok());
    }

    #[tokio::test]
    async fn test_prepare_replaces_previous_batch() {
        let herald: Herald = ron::from_str(CONFIG).unwrap_or_else(|e| panic!("{e}"));
        let store = herald.prepare().await.unwrap_or_else(|e| panic!("{e}"));

        let jobs = store.fetch_pending().await.unwrap_or_default();
        assert_eq!(
            jobs.iter()
                .map(|job| job.recipient_email.as_str())
                .collect::<Vec<_>>(),
            vec!["bob@example.org", "carol@example.org"]
        );
        assert!(jobs.iter().all(|job| job.subject == "Hello {name}"));
    }
}
