//! Delivers notifications through an HTTP mail relay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{Notifier, NotifyError};

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct MailRelayNotifier {
    client: reqwest::Client,
    relay_url: String,
}

impl MailRelayNotifier {
    pub fn new(relay_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create mail relay HTTP client")?;
        Ok(Self { client, relay_url })
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.relay_url)
            .json(&RelayMessage { to, subject, body })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        debug!("Mail relay accepted message to {}", to);
        Ok(())
    }
}
