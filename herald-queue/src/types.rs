use std::fmt;

use herald_common::{Recipient, Template};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a queued job
///
/// Identifiers are handed out in increasing order, so sorting by id yields
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl JobId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Delivery state of a job. Only ever moves from `Pending` to `Sent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Sent,
}

impl JobStatus {
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Sent => f.write_str("sent"),
        }
    }
}

/// A job as submitted by the caller, before the store assigns it an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub sender_name: String,
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
}

impl JobInput {
    /// Pair one recipient with the batch template
    #[must_use]
    pub fn new(recipient: &Recipient, template: &Template) -> Self {
        Self {
            sender_name: recipient.sender_name.clone(),
            recipient_name: recipient.recipient_name.clone(),
            recipient_email: recipient.recipient_email.clone(),
            subject: template.subject.clone(),
            body: template.body.clone(),
        }
    }

    /// Build the inputs for a whole batch, preserving recipient order
    #[must_use]
    pub fn batch(recipients: &[Recipient], template: &Template) -> Vec<Self> {
        recipients
            .iter()
            .map(|recipient| Self::new(recipient, template))
            .collect()
    }
}

/// One message to deliver, as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub sender_name: String,
    pub recipient_name: String,
    pub recipient_email: String,
    /// Subject template, placeholders not yet substituted
    pub subject: String,
    /// Body template, placeholders not yet substituted
    pub body: String,
    pub status: JobStatus,
}

impl Job {
    pub(crate) fn from_input(id: JobId, input: JobInput) -> Self {
        Self {
            id,
            sender_name: input.sender_name,
            recipient_name: input.recipient_name,
            recipient_email: input.recipient_email,
            subject: input.subject,
            body: input.body,
            status: JobStatus::Pending,
        }
    }
}
