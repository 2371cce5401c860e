//! In-process stand-in for the Debricked open API.
//!
//! Serves login, file upload, batch finalization and status polling on a
//! random local port and records every request it sees.

use super::constants::*;
use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One `uploads/dependencies/files` request as received.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub file_name: String,
    pub repository_name: String,
    pub commit_name: String,
    pub ci_upload_id: Option<String>,
}

/// One `finishes/dependencies/files/uploads` request as received.
#[derive(Debug, Clone)]
pub struct RecordedFinalize {
    pub ci_upload_id: String,
    pub return_commit_data: String,
}

#[derive(Default)]
struct ProviderState {
    logins: usize,
    next_upload_id: u64,
    uploads: Vec<RecordedUpload>,
    finalized: Vec<RecordedFinalize>,
    rejected_files: HashSet<String>,
    fail_login: bool,
    fail_finalize: bool,
    /// ciUploadId -> (progress, vulnerabilitiesFound)
    statuses: HashMap<String, (u8, u64)>,
}

type SharedProviderState = Arc<Mutex<ProviderState>>;

pub struct FakeProvider {
    pub base_url: String,
    state: SharedProviderState,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(rename = "_username")]
    username: String,
    #[serde(rename = "_password")]
    password: String,
}

#[derive(Deserialize)]
struct StatusQuery {
    #[serde(rename = "ciUploadId")]
    ci_upload_id: String,
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", PROVIDER_TOKEN))
        .unwrap_or(false)
}

async fn multipart_fields(mut multipart: Multipart) -> HashMap<String, (Option<String>, String)> {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let value = field.text().await.unwrap_or_default();
        fields.insert(name, (file_name, value));
    }
    fields
}

async fn login(
    State(state): State<SharedProviderState>,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    state.logins += 1;
    if state.fail_login || form.username != PROVIDER_USER || form.password != PROVIDER_PASS {
        return (StatusCode::UNAUTHORIZED, Json(json!({"code": 401}))).into_response();
    }
    Json(json!({ "token": PROVIDER_TOKEN })).into_response()
}

async fn upload_file(
    State(state): State<SharedProviderState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let fields = multipart_fields(multipart).await;
    let text = |name: &str| fields.get(name).map(|(_, v)| v.clone());

    let upload = RecordedUpload {
        file_name: fields
            .get("fileData")
            .and_then(|(file_name, _)| file_name.clone())
            .unwrap_or_default(),
        repository_name: text("repositoryName").unwrap_or_default(),
        commit_name: text("commitName").unwrap_or_default(),
        ci_upload_id: text("ciUploadId"),
    };

    let mut state = state.lock().unwrap();
    let rejected = state.rejected_files.contains(&upload.file_name);
    let existing = upload.ci_upload_id.clone();
    state.uploads.push(upload);
    if rejected {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Unsupported file format"})),
        )
            .into_response();
    }

    let upload_id: u64 = match existing.and_then(|id| id.parse().ok()) {
        Some(id) => id,
        None => {
            let id = FIRST_UPLOAD_ID + state.next_upload_id;
            state.next_upload_id += 1;
            id
        }
    };
    Json(json!({ "ciUploadId": upload_id, "uploadProgramsFileId": 1 })).into_response()
}

async fn finalize(
    State(state): State<SharedProviderState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let fields = multipart_fields(multipart).await;
    let mut state = state.lock().unwrap();
    state.finalized.push(RecordedFinalize {
        ci_upload_id: fields
            .get("ciUploadId")
            .map(|(_, v)| v.clone())
            .unwrap_or_default(),
        return_commit_data: fields
            .get("returnCommitData")
            .map(|(_, v)| v.clone())
            .unwrap_or_default(),
    });
    if state.fail_finalize {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    StatusCode::OK.into_response()
}

async fn upload_status(
    State(state): State<SharedProviderState>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let state = state.lock().unwrap();
    match state.statuses.get(&query.ci_upload_id) {
        Some((progress, found)) if *progress >= 100 => {
            Json(json!({ "progress": progress, "vulnerabilitiesFound": found })).into_response()
        }
        Some((progress, found)) => (
            StatusCode::ACCEPTED,
            Json(json!({ "progress": progress, "vulnerabilitiesFound": found })),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl FakeProvider {
    pub async fn spawn() -> Self {
        let state: SharedProviderState = Arc::new(Mutex::new(ProviderState::default()));

        let app = Router::new()
            .route("/api/login_check", post(login))
            .route("/api/1.0/open/uploads/dependencies/files", post(upload_file))
            .route(
                "/api/1.0/open/finishes/dependencies/files/uploads",
                post(finalize),
            )
            .route("/api/1.0/open/ci/upload/status", get(upload_status))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake provider");
        let port = listener.local_addr().expect("No local address").port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake provider failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/login_check", self.base_url)
    }

    pub fn api_url(&self) -> String {
        format!("{}/api/1.0/open/", self.base_url)
    }

    pub fn reject_file(&self, file_name: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_files
            .insert(file_name.to_string());
    }

    pub fn fail_login(&self) {
        self.state.lock().unwrap().fail_login = true;
    }

    pub fn fail_finalize(&self) {
        self.state.lock().unwrap().fail_finalize = true;
    }

    pub fn set_status(&self, ci_upload_id: &str, progress: u8, vulnerabilities_found: u64) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(ci_upload_id.to_string(), (progress, vulnerabilities_found));
    }

    pub fn login_count(&self) -> usize {
        self.state.lock().unwrap().logins
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn finalized(&self) -> Vec<RecordedFinalize> {
        self.state.lock().unwrap().finalized.clone()
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
