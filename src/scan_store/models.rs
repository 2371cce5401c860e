use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked scan.
///
/// The only legal transition is `Pending -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanJobStatus {
    /// Files are accepted and the provider is still scanning.
    Pending,
    /// The provider reported 100% progress.
    Completed,
}

impl ScanJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanJobStatus::Pending => "PENDING",
            ScanJobStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ScanJobStatus::Pending),
            "COMPLETED" => Some(ScanJobStatus::Completed),
            _ => None,
        }
    }

    /// Parse the lowercase form used in query strings.
    pub fn from_query(s: &str) -> Option<Self> {
        Self::parse(&s.to_ascii_uppercase())
    }

    pub fn can_transition_to(&self, next: ScanJobStatus) -> bool {
        matches!((self, next), (ScanJobStatus::Pending, _))
    }
}

impl std::fmt::Display for ScanJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch of dependency files submitted to the scanning provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: String,
    /// Identifier the provider assigned to the batch (`ciUploadId`).
    pub ci_upload_id: String,
    /// Where the result notification goes.
    pub notify_target: String,
    pub status: ScanJobStatus,
    pub files_submitted: u32,
    /// Known once the scan completes.
    pub vulnerabilities_found: Option<u64>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl ScanJob {
    /// Create a pending job with a fresh local id.
    pub fn new_pending(ci_upload_id: String, notify_target: String, files_submitted: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ci_upload_id,
            notify_target,
            status: ScanJobStatus::Pending,
            files_submitted,
            vulnerabilities_found: None,
            created_at: chrono::Utc::now().timestamp(),
            completed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ScanJobStatus::Pending
    }

    /// Move the job to `Completed`, recording the final vulnerability count.
    pub fn mark_completed(&mut self, vulnerabilities_found: u64) {
        self.status = ScanJobStatus::Completed;
        self.vulnerabilities_found = Some(vulnerabilities_found);
        self.completed_at = Some(chrono::Utc::now().timestamp());
    }
}
