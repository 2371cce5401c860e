//! Types exchanged with the scanning provider.

use serde::Deserialize;

/// One dependency manifest or lock file to submit for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Short-lived bearer credential. Acquired per batch or reconciliation run,
/// never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Provider view of a batch scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    /// Percentage, 100 means complete.
    pub progress: u8,
    pub vulnerabilities_found: u64,
}

impl ScanProgress {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadResponse {
    #[serde(rename = "ciUploadId")]
    pub ci_upload_id: serde_json::Value,
}

impl UploadResponse {
    /// The provider sends the id as a number; accept strings too.
    pub fn upload_id(&self) -> Option<String> {
        match &self.ci_upload_id {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusResponse {
    #[serde(default)]
    pub progress: i64,
    #[serde(rename = "vulnerabilitiesFound", default)]
    pub vulnerabilities_found: u64,
}

impl From<StatusResponse> for ScanProgress {
    fn from(value: StatusResponse) -> Self {
        Self {
            progress: value.progress.clamp(0, 100) as u8,
            vulnerabilities_found: value.vulnerabilities_found,
        }
    }
}
