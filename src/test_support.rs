//! In-memory fakes for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::notifier::{Notifier, NotifyError};
use crate::provider::{AuthToken, ProviderError, ScanProgress, ScanProvider, UploadFile};

#[derive(Debug, Clone)]
pub enum SubmitBehavior {
    Accept(String),
    Reject(u16),
    Transport,
}

#[derive(Default)]
pub struct FakeProvider {
    pub fail_auth: bool,
    pub fail_finalize: bool,
    /// Per file name. Files not listed are accepted under `default_upload_id`.
    pub submit_behavior: HashMap<String, SubmitBehavior>,
    pub default_upload_id: String,
    /// Per upload id. Missing ids produce a status error.
    pub statuses: Mutex<HashMap<String, ScanProgress>>,
    pub auth_calls: AtomicUsize,
    pub submissions: Mutex<Vec<(String, Option<String>)>>,
    pub finalized: Mutex<Vec<String>>,
    pub status_checks: Mutex<Vec<String>>,
    /// When set, every status check waits for a permit after being recorded.
    pub status_gate: Option<Arc<Notify>>,
}

impl FakeProvider {
    pub fn accepting(upload_id: &str) -> Self {
        Self {
            default_upload_id: upload_id.to_string(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file_name: &str, behavior: SubmitBehavior) -> Self {
        self.submit_behavior.insert(file_name.to_string(), behavior);
        self
    }

    pub fn set_status(&self, upload_id: &str, progress: u8, vulnerabilities_found: u64) {
        self.statuses.lock().unwrap().insert(
            upload_id.to_string(),
            ScanProgress {
                progress,
                vulnerabilities_found,
            },
        );
    }

    pub fn auth_count(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanProvider for FakeProvider {
    async fn authenticate(&self) -> Result<AuthToken, ProviderError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            return Err(ProviderError::Auth("bad credentials".to_string()));
        }
        Ok(AuthToken::new("test-token"))
    }

    async fn submit_file(
        &self,
        _token: &AuthToken,
        file: &UploadFile,
        existing_upload_id: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.submissions.lock().unwrap().push((
            file.file_name.clone(),
            existing_upload_id.map(str::to_string),
        ));
        match self.submit_behavior.get(&file.file_name) {
            Some(SubmitBehavior::Accept(id)) => Ok(id.clone()),
            Some(SubmitBehavior::Reject(status)) => {
                Err(ProviderError::Rejected { status: *status })
            }
            Some(SubmitBehavior::Transport) => {
                Err(ProviderError::Transport("connection reset".to_string()))
            }
            None => Ok(existing_upload_id
                .map(str::to_string)
                .unwrap_or_else(|| self.default_upload_id.clone())),
        }
    }

    async fn finalize_submission(
        &self,
        _token: &AuthToken,
        upload_id: &str,
    ) -> Result<(), ProviderError> {
        self.finalized.lock().unwrap().push(upload_id.to_string());
        if self.fail_finalize {
            return Err(ProviderError::Finalize("status 500".to_string()));
        }
        Ok(())
    }

    async fn fetch_status(
        &self,
        _token: &AuthToken,
        upload_id: &str,
    ) -> Result<ScanProgress, ProviderError> {
        self.status_checks.lock().unwrap().push(upload_id.to_string());
        if let Some(gate) = &self.status_gate {
            gate.notified().await;
        }
        self.statuses
            .lock()
            .unwrap()
            .get(upload_id)
            .copied()
            .ok_or_else(|| ProviderError::Status(format!("unknown upload {}", upload_id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.fail {
            return Err(NotifyError::Transport("relay down".to_string()));
        }
        Ok(())
    }
}
