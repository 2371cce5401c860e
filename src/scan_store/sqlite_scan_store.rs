use super::models::{ScanJob, ScanJobStatus};
use super::schema::SCAN_VERSIONED_SCHEMAS;
use super::ScanStore;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const JOB_COLUMNS: &str = "id, ci_upload_id, notify_target, status, files_submitted, \
     vulnerabilities_found, created_at, completed_at";

pub struct SqliteScanStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteScanStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), SCAN_VERSIONED_SCHEMAS, "scan")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<ScanJob> {
        let status_str: String = row.get("status")?;
        let status = ScanJobStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown scan job status '{}'", status_str).into(),
            )
        })?;
        let vulnerabilities: Option<i64> = row.get("vulnerabilities_found")?;

        Ok(ScanJob {
            id: row.get("id")?,
            ci_upload_id: row.get("ci_upload_id")?,
            notify_target: row.get("notify_target")?,
            status,
            files_submitted: row.get("files_submitted")?,
            vulnerabilities_found: vulnerabilities.map(|v| v as u64),
            created_at: row.get("created_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

impl ScanStore for SqliteScanStore {
    fn insert(&self, job: &ScanJob) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO scan_jobs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                JOB_COLUMNS
            ),
            params![
                job.id,
                job.ci_upload_id,
                job.notify_target,
                job.status.as_str(),
                job.files_submitted,
                job.vulnerabilities_found.map(|v| v as i64),
                job.created_at,
                job.completed_at,
            ],
        )
        .with_context(|| format!("Failed to insert scan job {}", job.id))?;
        Ok(())
    }

    fn update(&self, job: &ScanJob) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM scan_jobs WHERE id = ?1",
                params![job.id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            bail!("Scan job {} not found", job.id);
        };
        let current = ScanJobStatus::parse(&current)
            .with_context(|| format!("Scan job {} has unknown status '{}'", job.id, current))?;
        if current == ScanJobStatus::Completed && job.status == ScanJobStatus::Completed {
            return Ok(false);
        }
        if !current.can_transition_to(job.status) {
            bail!(
                "Scan job {} cannot move from {} to {}",
                job.id,
                current,
                job.status
            );
        }

        let changed = conn
            .execute(
                "UPDATE scan_jobs SET status = ?1, vulnerabilities_found = ?2, completed_at = ?3 \
                 WHERE id = ?4 AND status = ?5",
                params![
                    job.status.as_str(),
                    job.vulnerabilities_found.map(|v| v as i64),
                    job.completed_at,
                    job.id,
                    ScanJobStatus::Pending.as_str(),
                ],
            )
            .with_context(|| format!("Failed to update scan job {}", job.id))?;
        Ok(changed == 1)
    }

    fn find_all_by_status(&self, status: ScanJobStatus) -> Result<Vec<ScanJob>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scan_jobs WHERE status = ?1 ORDER BY created_at ASC, id ASC",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map(params![status.as_str()], Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn get(&self, id: &str) -> Result<Option<ScanJob>> {
        let conn = self.conn.lock().unwrap();
        let job = conn
            .query_row(
                &format!("SELECT {} FROM scan_jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn list_all(&self) -> Result<Vec<ScanJob>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scan_jobs ORDER BY created_at DESC, id ASC",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map([], Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }
}
