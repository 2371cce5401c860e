//! Client side of the external dependency-scanning provider.

mod client;
mod models;

pub use client::DebrickedClient;
pub use models::{AuthToken, ScanProgress, UploadFile};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Provider rejected the request with status {status}")]
    Rejected { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to start scan: {0}")]
    Finalize(String),

    #[error("Failed to fetch scan status: {0}")]
    Status(String),
}

/// The four operations the lifecycle needs from a scanning provider.
#[async_trait]
pub trait ScanProvider: Send + Sync {
    async fn authenticate(&self) -> Result<AuthToken, ProviderError>;

    /// Submit one file. Passing `existing_upload_id` appends the file to an
    /// already registered batch. Returns the batch id the provider reports.
    async fn submit_file(
        &self,
        token: &AuthToken,
        file: &UploadFile,
        existing_upload_id: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Close the batch and start scanning it.
    async fn finalize_submission(
        &self,
        token: &AuthToken,
        upload_id: &str,
    ) -> Result<(), ProviderError>;

    async fn fetch_status(
        &self,
        token: &AuthToken,
        upload_id: &str,
    ) -> Result<ScanProgress, ProviderError>;
}
