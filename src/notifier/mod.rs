//! Outbound notifications to the person who requested a scan.

mod log_notifier;
mod mail_relay;

pub use log_notifier::LogNotifier;
pub use mail_relay::MailRelayNotifier;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Mail relay rejected the message with status {0}")]
    Rejected(u16),

    #[error("Mail relay unreachable: {0}")]
    Transport(String),
}

/// Best-effort message delivery. Callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// A rendered message, ready for [`Notifier::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn vulnerabilities_detected(count: u64) -> Self {
        Self {
            subject: "Vulnerabilities Detected in Your Dependencies".to_string(),
            body: format!(
                "A total of {} vulnerabilities were detected in your dependencies.",
                count
            ),
        }
    }

    pub fn file_rejected(file_name: &str) -> Self {
        Self {
            subject: "Failed to upload file".to_string(),
            body: file_name.to_string(),
        }
    }

    pub fn upload_failed(reason: &str) -> Self {
        Self {
            subject: "File upload failed".to_string(),
            body: reason.to_string(),
        }
    }
}
