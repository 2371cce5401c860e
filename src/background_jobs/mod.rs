//! Background job scheduling and execution.
//!
//! Jobs run on a fixed interval or on demand through the admin API. A job is
//! never started while a previous run of it is still in progress.

mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use handle::{JobInfo, JobRunInfo, JobRunStatus, JobScheduleInfo, SchedulerHandle};
pub use job::{BackgroundJob, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::{create_scheduler, JobScheduler};
