pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::models::SubmissionRecord;

pub use smtp::SmtpNotifier;

const UNKNOWN_SUBMITTER: &str = "Unknown";

/// A plain-text message for the administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Summary of a final submission.
    pub fn for_submission(record: &SubmissionRecord) -> Self {
        let payload = &record.payload;
        let name = payload.get("name").filter(|v| crate::submission::validate::is_truthy(v));

        let subject = format!(
            "New test submission from {}",
            name.map(display).unwrap_or_else(|| UNKNOWN_SUBMITTER.to_string())
        );

        let body = format!(
            "Submission at {}\nName: {}\nTimeLeft: {}\nAnswers: {}\nClient: {}",
            record.received_at_iso(),
            payload.get("name").map(display).unwrap_or_else(|| "n/a".into()),
            payload.get("timeLeft").map(display).unwrap_or_else(|| "n/a".into()),
            payload.get("answers").unwrap_or(&Value::Null),
            payload.get("client").cloned().unwrap_or_else(|| Value::Object(Default::default())),
        );

        Self { subject, body }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug)]
pub struct NotifyError {
    pub message: String,
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NotifyError {}

impl From<String> for NotifyError {
    fn from(s: String) -> Self {
        NotifyError { message: s }
    }
}

impl From<&str> for NotifyError {
    fn from(s: &str) -> Self {
        NotifyError {
            message: s.to_string(),
        }
    }
}

/// Delivery channel for administrator notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Send `notification` on a detached task.
///
/// The caller is never affected by the outcome; failures are only logged.
/// Returns `None` when no notifier is configured.
pub fn dispatch(
    notifier: Option<Arc<dyn Notifier>>,
    notification: Notification,
) -> Option<JoinHandle<()>> {
    let notifier = notifier?;

    Some(tokio::spawn(async move {
        match notifier.send(&notification).await {
            Ok(()) => tracing::debug!("Notification sent: {}", notification.subject),
            Err(e) => tracing::error!("Notification failed ({}): {e}", notification.subject),
        }
    }))
}
