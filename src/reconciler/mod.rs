//! Advances pending scan jobs by polling the provider.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::notifier::{Message, Notifier};
use crate::provider::{ProviderError, ScanProvider};
use crate::scan_store::{ScanJobStatus, ScanStore};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Failed to authenticate with the scanning provider: {0}")]
    Auth(#[source] ProviderError),

    #[error("Failed to load pending scan jobs: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub completed: usize,
    pub notified: usize,
    pub still_pending: usize,
    /// Jobs left pending because their status check or update failed.
    pub deferred: usize,
}

pub struct ScanReconciler {
    provider: Arc<dyn ScanProvider>,
    store: Arc<dyn ScanStore>,
    notifier: Arc<dyn Notifier>,
    vulnerability_threshold: u64,
    /// Held for the duration of a run.
    run_lock: Mutex<()>,
}

impl ScanReconciler {
    pub fn new(
        provider: Arc<dyn ScanProvider>,
        store: Arc<dyn ScanStore>,
        notifier: Arc<dyn Notifier>,
        vulnerability_threshold: u64,
    ) -> Self {
        Self {
            provider,
            store,
            notifier,
            vulnerability_threshold,
            run_lock: Mutex::new(()),
        }
    }

    /// Check every pending job once.
    ///
    /// A job reaching 100% is marked completed and, if its vulnerability count
    /// is above the threshold, its owner is notified once. Jobs whose check
    /// fails stay pending for the next run. A call made while another run is
    /// in progress returns an empty report without touching any job.
    pub async fn run_once(&self) -> Result<ReconcileReport, ReconcileError> {
        let Ok(_running) = self.run_lock.try_lock() else {
            warn!("Reconciliation already in progress, skipping this run");
            return Ok(ReconcileReport::default());
        };

        let pending = self
            .store
            .find_all_by_status(ScanJobStatus::Pending)
            .map_err(ReconcileError::Persistence)?;

        let mut report = ReconcileReport::default();
        if pending.is_empty() {
            debug!("No pending scan jobs");
            return Ok(report);
        }

        let token = self
            .provider
            .authenticate()
            .await
            .map_err(ReconcileError::Auth)?;

        for mut job in pending {
            report.checked += 1;

            let progress = match self.provider.fetch_status(&token, &job.ci_upload_id).await {
                Ok(progress) => progress,
                Err(err) => {
                    warn!(
                        "Status check for job {} (upload {}) failed: {}",
                        job.id, job.ci_upload_id, err
                    );
                    report.deferred += 1;
                    continue;
                }
            };

            if !progress.is_complete() {
                debug!(
                    "Job {} (upload {}) at {}%",
                    job.id, job.ci_upload_id, progress.progress
                );
                report.still_pending += 1;
                continue;
            }

            job.mark_completed(progress.vulnerabilities_found);
            match self.store.update(&job) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Job {} was already completed, not notifying again", job.id);
                    continue;
                }
                Err(err) => {
                    warn!("Failed to mark job {} completed: {:#}", job.id, err);
                    report.deferred += 1;
                    continue;
                }
            }
            report.completed += 1;
            info!(
                "Scan job {} (upload {}) completed with {} vulnerabilities",
                job.id, job.ci_upload_id, progress.vulnerabilities_found
            );

            if progress.vulnerabilities_found > self.vulnerability_threshold {
                let message = Message::vulnerabilities_detected(progress.vulnerabilities_found);
                match self
                    .notifier
                    .send(&job.notify_target, &message.subject, &message.body)
                    .await
                {
                    Ok(()) => report.notified += 1,
                    Err(err) => warn!(
                        "Failed to notify {} about job {}: {}",
                        job.notify_target, job.id, err
                    ),
                }
            }
        }

        Ok(report)
    }
}
