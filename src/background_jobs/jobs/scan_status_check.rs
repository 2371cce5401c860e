//! Periodic reconciliation of pending scan jobs.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule, ShutdownBehavior};
use crate::reconciler::ScanReconciler;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Polls the provider for every pending scan job and applies the
/// completion and notification rules.
pub struct ScanStatusCheckJob {
    reconciler: Arc<ScanReconciler>,
    interval: Duration,
}

impl ScanStatusCheckJob {
    pub fn new(reconciler: Arc<ScanReconciler>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }
}

#[async_trait]
impl BackgroundJob for ScanStatusCheckJob {
    fn id(&self) -> &'static str {
        "scan_status_check"
    }

    fn name(&self) -> &'static str {
        "Scan Status Check"
    }

    fn description(&self) -> &'static str {
        "Poll the scanning provider for pending jobs and notify when results exceed the threshold"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.interval)
    }

    // A run interrupted between the job update and the notification would
    // lose the notification.
    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::WaitForCompletion
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let report = self
            .reconciler
            .run_once()
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        if report.checked > 0 {
            info!(
                "Checked {} pending scans: {} completed, {} notified, {} still pending, {} deferred",
                report.checked,
                report.completed,
                report.notified,
                report.still_pending,
                report.deferred
            );
        }
        Ok(())
    }
}
