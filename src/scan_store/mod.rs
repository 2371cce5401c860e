mod models;
mod schema;
mod sqlite_scan_store;

pub use models::{ScanJob, ScanJobStatus};
pub use schema::SCAN_VERSIONED_SCHEMAS;
pub use sqlite_scan_store::SqliteScanStore;

use anyhow::Result;

/// Durable storage for scan jobs.
pub trait ScanStore: Send + Sync {
    /// Persist a new job. Fails if the id already exists.
    fn insert(&self, job: &ScanJob) -> Result<()>;

    /// Write back the mutable fields of an existing job (status, vulnerability
    /// count, completion time). The provider upload id and the notification
    /// target are never rewritten.
    ///
    /// Only a job still pending in storage is written. Returns `false` when the
    /// stored job was already completed, so concurrent writers can tell which
    /// one performed the transition.
    fn update(&self, job: &ScanJob) -> Result<bool>;

    fn find_all_by_status(&self, status: ScanJobStatus) -> Result<Vec<ScanJob>>;

    fn get(&self, id: &str) -> Result<Option<ScanJob>>;

    /// All jobs, newest first.
    fn list_all(&self) -> Result<Vec<ScanJob>>;
}
