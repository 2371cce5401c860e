use super::context::JobContext;
use super::handle::{
    JobRunInfo, JobRunStatus, SchedulerCommand, SchedulerHandle, SharedJobState,
};
use super::job::{BackgroundJob, JobError, JobSchedule, ShutdownBehavior};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest the loop sleeps when nothing is scheduled.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How long shutdown waits for each running job.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Manages background job scheduling and execution.
pub struct JobScheduler {
    /// Shared state accessible by SchedulerHandle
    shared_state: Arc<RwLock<SharedJobState>>,

    /// Task handles of running jobs (owned by the scheduler loop)
    running_handles: HashMap<String, JoinHandle<()>>,

    job_cancel_tokens: HashMap<String, CancellationToken>,

    command_receiver: mpsc::Receiver<SchedulerCommand>,

    /// Running jobs report their id here when they finish.
    finished_tx: mpsc::UnboundedSender<String>,
    finished_rx: mpsc::UnboundedReceiver<String>,

    shutdown_token: CancellationToken,
}

impl JobScheduler {
    fn new(
        command_receiver: mpsc::Receiver<SchedulerCommand>,
        shutdown_token: CancellationToken,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            shared_state,
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            command_receiver,
            finished_tx,
            finished_rx,
            shutdown_token,
        }
    }

    /// Register a job with the scheduler.
    pub async fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id().to_string();
        info!("Registering job: {} - {}", job_id, job.description());
        let mut state = self.shared_state.write().await;
        state.jobs.insert(job_id, job);
    }

    pub async fn job_count(&self) -> usize {
        self.shared_state.read().await.jobs.len()
    }

    /// Main scheduler loop. Returns after the shutdown token is cancelled and
    /// running jobs have been drained.
    pub async fn run(&mut self) {
        let job_count = self.job_count().await;
        info!("Starting job scheduler with {} registered jobs", job_count);

        loop {
            let sleep_duration = self.time_until_next_scheduled_job().await;
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                Some(job_id) = self.finished_rx.recv() => {
                    self.reap_job(&job_id).await;
                }
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::TriggerJob { job_id, response } => {
                let result = self.trigger_job(&job_id).await;
                let _ = response.send(result);
            }
        }
    }

    /// Manually trigger a job by ID.
    async fn trigger_job(&mut self, job_id: &str) -> Result<(), JobError> {
        let state = self.shared_state.read().await;
        if !state.jobs.contains_key(job_id) {
            return Err(JobError::NotFound);
        }

        if state.running_jobs.contains(job_id) {
            return Err(JobError::AlreadyRunning);
        }
        drop(state);

        self.spawn_job(job_id, "manual").await;
        Ok(())
    }

    /// Time until the earliest idle interval job is due.
    async fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = IDLE_CHECK_INTERVAL;
        let now = Utc::now();

        let state = self.shared_state.read().await;
        for (job_id, job) in &state.jobs {
            if state.running_jobs.contains(job_id) {
                continue;
            }
            if let JobSchedule::Interval(_) = job.schedule() {
                let Some(next_run) = state.next_runs.get(job_id) else {
                    return Duration::ZERO;
                };
                if *next_run <= now {
                    return Duration::ZERO;
                }
                let duration = (*next_run - now).to_std().unwrap_or(Duration::ZERO);
                min_duration = min_duration.min(duration);
            }
        }

        min_duration
    }

    /// Start every idle interval job whose next run time has passed.
    async fn run_due_jobs(&mut self) {
        let now = Utc::now();
        let jobs_to_run: Vec<String> = {
            let state = self.shared_state.read().await;
            state
                .jobs
                .iter()
                .filter(|(job_id, job)| {
                    !state.running_jobs.contains(*job_id)
                        && matches!(job.schedule(), JobSchedule::Interval(_))
                        && state
                            .next_runs
                            .get(*job_id)
                            .map(|next| *next <= now)
                            .unwrap_or(true)
                })
                .map(|(job_id, _)| job_id.clone())
                .collect()
        };

        for job_id in jobs_to_run {
            self.spawn_job(&job_id, "schedule").await;
        }
    }

    async fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let job = {
            let mut state = self.shared_state.write().await;
            let Some(job) = state.jobs.get(job_id).cloned() else {
                error!("Attempted to spawn unknown job: {}", job_id);
                return;
            };
            state.running_jobs.insert(job_id.to_string());

            // Next run counts from this start, so a slow run never queues extra runs.
            if let JobSchedule::Interval(interval) = job.schedule() {
                let next_run = Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
                state.next_runs.insert(job_id.to_string(), next_run);
            }
            job
        };

        info!("Starting job: {} (triggered_by: {})", job_id, triggered_by);

        // Not a child of the shutdown token: only cancellable jobs get cancelled.
        let cancel_token = CancellationToken::new();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());
        let ctx = JobContext::new(cancel_token);

        let shared_state = Arc::clone(&self.shared_state);
        let finished_tx = self.finished_tx.clone();
        let job_id_owned = job_id.to_string();
        let triggered_by = triggered_by.to_string();

        let handle = tokio::spawn(async move {
            let started_at = Utc::now();
            let start_time = Instant::now();
            let result = tokio::spawn(async move { job.execute(&ctx).await }).await;
            let elapsed = start_time.elapsed();

            let (status, error_msg) = match result {
                Ok(Ok(())) => {
                    info!(
                        "Job {} completed successfully in {:?}",
                        job_id_owned, elapsed
                    );
                    (JobRunStatus::Completed, None)
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                    (JobRunStatus::Cancelled, Some("Cancelled".to_string()))
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                    (JobRunStatus::Failed, Some(e.to_string()))
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id_owned, elapsed, e);
                    (JobRunStatus::Failed, Some(format!("Task panic: {}", e)))
                }
            };

            {
                let mut state = shared_state.write().await;
                state.running_jobs.remove(&job_id_owned);
                state.last_runs.insert(
                    job_id_owned.clone(),
                    JobRunInfo::new(started_at, Utc::now(), status, error_msg, &triggered_by),
                );
            }
            let _ = finished_tx.send(job_id_owned);
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    async fn reap_job(&mut self, job_id: &str) {
        if let Some(handle) = self.running_handles.remove(job_id) {
            let _ = handle.await;
        }
        self.job_cancel_tokens.remove(job_id);
    }

    /// Cancel cancellable jobs and wait for the rest, bounded per job.
    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        let behaviors: HashMap<String, ShutdownBehavior> = {
            let state = self.shared_state.read().await;
            self.running_handles
                .keys()
                .map(|job_id| {
                    let behavior = state
                        .jobs
                        .get(job_id)
                        .map(|j| j.shutdown_behavior())
                        .unwrap_or_default();
                    (job_id.clone(), behavior)
                })
                .collect()
        };

        for (job_id, behavior) in &behaviors {
            if *behavior == ShutdownBehavior::Cancellable {
                if let Some(token) = self.job_cancel_tokens.get(job_id) {
                    debug!("Cancelling job: {}", job_id);
                    token.cancel();
                }
            }
        }

        for (job_id, handle) in self.running_handles.drain() {
            if behaviors.get(&job_id) == Some(&ShutdownBehavior::WaitForCompletion) {
                info!("Waiting for job {} to complete...", job_id);
            }
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("Job {} did not finish within {:?}", job_id, SHUTDOWN_GRACE);
            }
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}

/// Create a scheduler and its handle.
pub fn create_scheduler(shutdown_token: CancellationToken) -> (JobScheduler, SchedulerHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);
    let shared_state = Arc::new(RwLock::new(SharedJobState::default()));

    let scheduler = JobScheduler::new(command_rx, shutdown_token, Arc::clone(&shared_state));
    let handle = SchedulerHandle::new(command_tx, shared_state);

    (scheduler, handle)
}
