use async_trait::async_trait;
use tracing::info;

use super::{Notifier, NotifyError};

/// Writes notifications to the log. Used when no mail relay is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!("Notification to {}: [{}] {}", to, subject, body);
        Ok(())
    }
}
