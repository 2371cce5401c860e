//! Turns a batch of uploaded files into one tracked scan job.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notifier::{Message, Notifier};
use crate::provider::{ProviderError, ScanProvider, UploadFile};
use crate::scan_store::{ScanJob, ScanStore};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to authenticate with the scanning provider: {0}")]
    Auth(#[source] ProviderError),

    #[error("Failed to start scan for upload {upload_id}: {source}")]
    Finalize {
        upload_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to record scan job: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// A file the provider did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// At least one file was accepted and a pending job now tracks the batch.
    Tracked {
        job: ScanJob,
        failures: Vec<FileFailure>,
    },
    /// No file was accepted; nothing is tracked.
    NothingAccepted { failures: Vec<FileFailure> },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Tracked { .. })
    }

    pub fn failures(&self) -> &[FileFailure] {
        match self {
            UploadOutcome::Tracked { failures, .. } => failures,
            UploadOutcome::NothingAccepted { failures } => failures,
        }
    }
}

pub struct UploadManager {
    provider: Arc<dyn ScanProvider>,
    store: Arc<dyn ScanStore>,
    notifier: Arc<dyn Notifier>,
}

impl UploadManager {
    pub fn new(
        provider: Arc<dyn ScanProvider>,
        store: Arc<dyn ScanStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            store,
            notifier,
        }
    }

    /// Submit every file under a single provider batch, start the scan and
    /// record a pending job for it.
    ///
    /// Files the provider refuses are reported in the outcome and their
    /// rejection is sent to `notify_target`; they do not abort the batch.
    pub async fn upload_dependencies(
        &self,
        files: &[UploadFile],
        notify_target: &str,
    ) -> Result<UploadOutcome, UploadError> {
        if files.is_empty() {
            return Ok(UploadOutcome::NothingAccepted {
                failures: Vec::new(),
            });
        }

        let token = self
            .provider
            .authenticate()
            .await
            .map_err(UploadError::Auth)?;

        let mut upload_id: Option<String> = None;
        let mut accepted = 0u32;
        let mut failures = Vec::new();

        for file in files {
            match self
                .provider
                .submit_file(&token, file, upload_id.as_deref())
                .await
            {
                Ok(returned_id) => {
                    accepted += 1;
                    match &upload_id {
                        None => {
                            debug!("Provider opened batch {} with {}", returned_id, file.file_name);
                            upload_id = Some(returned_id);
                        }
                        Some(established) if *established != returned_id => {
                            warn!(
                                "Provider returned upload id {} for {} while appending to {}; keeping {}",
                                returned_id, file.file_name, established, established
                            );
                        }
                        Some(_) => debug!("Appended {} to batch", file.file_name),
                    }
                }
                Err(err) => {
                    warn!("Provider did not accept {}: {}", file.file_name, err);
                    let message = Message::file_rejected(&file.file_name);
                    if let Err(notify_err) = self
                        .notifier
                        .send(notify_target, &message.subject, &message.body)
                        .await
                    {
                        warn!(
                            "Failed to notify {} about rejected file {}: {}",
                            notify_target, file.file_name, notify_err
                        );
                    }
                    failures.push(FileFailure {
                        file_name: file.file_name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let Some(upload_id) = upload_id else {
            info!(
                "None of the {} submitted files were accepted for {}",
                files.len(),
                notify_target
            );
            return Ok(UploadOutcome::NothingAccepted { failures });
        };

        self.provider
            .finalize_submission(&token, &upload_id)
            .await
            .map_err(|source| UploadError::Finalize {
                upload_id: upload_id.clone(),
                source,
            })?;

        let job = ScanJob::new_pending(upload_id, notify_target.to_string(), accepted);
        self.store.insert(&job).map_err(UploadError::Persistence)?;

        info!(
            "Tracking scan job {} (upload {}, {} of {} files accepted)",
            job.id,
            job.ci_upload_id,
            accepted,
            files.len()
        );
        Ok(UploadOutcome::Tracked { job, failures })
    }
}
