//! Recipients and message templates.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Placeholder replaced with the recipient's display name
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Placeholder replaced with the sender's display name
pub const SENDER_PLACEHOLDER: &str = "{sender}";

/// One addressed entry of a recipient batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(alias = "SenderName")]
    pub sender_name: String,
    #[serde(alias = "RecipientName")]
    pub recipient_name: String,
    #[serde(alias = "RecipientEmail")]
    pub recipient_email: String,
}

impl Recipient {
    #[must_use]
    pub fn new(
        sender_name: impl Into<String>,
        recipient_name: impl Into<String>,
        recipient_email: impl Into<String>,
    ) -> Self {
        Self {
            sender_name: sender_name.into(),
            recipient_name: recipient_name.into(),
            recipient_email: recipient_email.into(),
        }
    }

    /// All three fields are required.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first empty field, or if the address has
    /// no `@`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sender_name.trim().is_empty() {
            return Err(ConfigError::MissingField("sender_name"));
        }
        if self.recipient_name.trim().is_empty() {
            return Err(ConfigError::MissingField("recipient_name"));
        }
        if self.recipient_email.trim().is_empty() {
            return Err(ConfigError::MissingField("recipient_email"));
        }
        if !self.recipient_email.contains('@') {
            return Err(ConfigError::invalid(
                "recipient_email",
                format!("'{}' is not an email address", self.recipient_email),
            ));
        }

        Ok(())
    }
}

/// Subject and body with `{name}` and `{sender}` placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub subject: String,
    pub body: String,
}

impl Template {
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// A template without a subject cannot be sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject is empty or spans several lines.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subject.trim().is_empty() {
            return Err(ConfigError::MissingField("subject"));
        }
        if self.subject.contains(['\r', '\n']) {
            return Err(ConfigError::invalid(
                "subject",
                "must fit on a single header line",
            ));
        }

        Ok(())
    }
}
