//! Dependency upload HTTP routes.
//!
//! Provides endpoints for:
//! - Uploading dependency manifests for scanning
//! - Listing tracked scan jobs
//! - Looking up a single scan job

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::notifier::Message;
use crate::provider::UploadFile;
use crate::scan_store::{ScanJob, ScanJobStatus};
use crate::server::state::{GuardedNotifier, GuardedScanStore, GuardedUploadManager, ServerState};
use crate::uploads::{FileFailure, UploadOutcome};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub job_id: String,
    pub ci_upload_id: String,
    pub rejected_files: Vec<FileFailure>,
}

#[derive(Debug, Serialize)]
pub struct UploadFailedResponse {
    pub error: String,
    pub rejected_files: Vec<FileFailure>,
}

#[derive(Debug, Serialize)]
pub struct ScanJobsResponse {
    pub jobs: Vec<ScanJob>,
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(error: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Malformed or oversized multipart bodies abort the whole upload.
fn invalid_multipart(err: MultipartError) -> axum::response::Response {
    warn!("Rejecting upload with unreadable multipart body: {}", err);
    (
        err.status(),
        Json(ErrorResponse {
            error: format!("Invalid upload body: {}", err.body_text()),
        }),
    )
        .into_response()
}

// =============================================================================
// Routes
// =============================================================================

/// POST /upload - Submit dependency files (multipart/form-data)
async fn upload_dependencies(
    State(upload_manager): State<GuardedUploadManager>,
    State(notifier): State<GuardedNotifier>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut files: Vec<UploadFile> = Vec::new();
    let mut email: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return invalid_multipart(e),
        };
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                match field.bytes().await {
                    Ok(bytes) => files.push(UploadFile::new(file_name, bytes.to_vec())),
                    Err(e) => return invalid_multipart(e),
                }
            }
            "email" => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(e) => return invalid_multipart(e),
                };
                let value = text.trim().to_string();
                if !value.is_empty() {
                    email = Some(value);
                }
            }
            _ => {}
        }
    }

    let email = match email {
        Some(e) => e,
        None => return bad_request("No email provided"),
    };
    if files.is_empty() {
        return bad_request("No files provided");
    }

    debug!("Received {} file(s) for {}", files.len(), email);

    match upload_manager.upload_dependencies(&files, &email).await {
        Ok(UploadOutcome::Tracked { job, failures }) => {
            debug!("Upload for {} tracked as job {}", email, job.id);
            Json(UploadResponse {
                message: "Files uploaded successfully".to_string(),
                job_id: job.id,
                ci_upload_id: job.ci_upload_id,
                rejected_files: failures,
            })
            .into_response()
        }
        Ok(UploadOutcome::NothingAccepted { failures }) => {
            warn!("No file accepted for {}", email);
            (
                StatusCode::BAD_REQUEST,
                Json(UploadFailedResponse {
                    error: "File Upload Failed".to_string(),
                    rejected_files: failures,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Upload for {} failed: {}", email, e);
            let reason = e.to_string();
            let message = Message::upload_failed(&reason);
            if let Err(notify_err) = notifier.send(&email, &message.subject, &message.body).await {
                warn!("Could not notify {} about failed upload: {}", email, notify_err);
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("File upload failed: {}", reason),
                }),
            )
                .into_response()
        }
    }
}

/// GET /jobs - List tracked scan jobs, optionally filtered by status
async fn list_scan_jobs(
    State(store): State<GuardedScanStore>,
    Query(query): Query<JobsQuery>,
) -> impl IntoResponse {
    let result = match query.status.as_deref() {
        None => store.list_all(),
        Some(raw) => match ScanJobStatus::from_query(raw) {
            Some(status) => store.find_all_by_status(status),
            None => return bad_request(&format!("Invalid status: {}", raw)),
        },
    };

    match result {
        Ok(jobs) => Json(ScanJobsResponse { jobs }).into_response(),
        Err(e) => {
            error!("Failed to list scan jobs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /jobs/{id} - Get one scan job
async fn get_scan_job(
    State(store): State<GuardedScanStore>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match store.get(&job_id) {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to load scan job {}: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn dependency_routes(max_upload_size_mb: usize) -> Router<ServerState> {
    Router::new()
        .route(
            "/upload",
            post(upload_dependencies).layer(DefaultBodyLimit::max(max_upload_size_mb * 1024 * 1024)),
        )
        .route("/jobs", get(list_scan_jobs))
        .route("/jobs/{id}", get(get_scan_job))
}
