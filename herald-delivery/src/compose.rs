//! Message composition: placeholder substitution and the rendered text a
//! transport sends

use herald_common::{
    TransportConfig,
    config::{NAME_PLACEHOLDER, SENDER_PLACEHOLDER},
};
use herald_queue::Job;

/// Replace `{name}` with `recipient_name` and `{sender}` with `sender_name`.
///
/// The template is scanned once, so placeholder text that appears inside a
/// substituted name is left alone. Matching is case-sensitive and nothing is
/// escaped.
#[must_use]
pub fn substitute(template: &str, recipient_name: &str, sender_name: &str) -> String {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        resolved.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix(NAME_PLACEHOLDER) {
            resolved.push_str(recipient_name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(SENDER_PLACEHOLDER) {
            resolved.push_str(sender_name);
            rest = after;
        } else {
            resolved.push('{');
            rest = &tail[1..];
        }
    }

    resolved.push_str(rest);
    resolved
}

/// Header values must stay on one line
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// A job's message with placeholders resolved, ready for one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Envelope sender
    pub from: String,
    /// Envelope recipient
    pub to: String,
    pub sender_name: String,
    pub subject: String,
    pub body: String,
}

impl ComposedMessage {
    #[must_use]
    pub fn new(config: &TransportConfig, job: &Job) -> Self {
        Self {
            from: config.from.clone(),
            to: job.recipient_email.clone(),
            sender_name: job.sender_name.clone(),
            subject: substitute(&job.subject, &job.recipient_name, &job.sender_name),
            body: substitute(&job.body, &job.recipient_name, &job.sender_name),
        }
    }

    /// The message content: `From` and `Subject` headers, a blank line, the body
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "From: {} <{}>\r\nSubject: {}\r\n\r\n{}",
            header_value(&self.sender_name),
            self.from,
            header_value(&self.subject),
            self.body
        )
    }
}
