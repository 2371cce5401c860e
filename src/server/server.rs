use anyhow::{Context, Result};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::upload_routes::{dependency_routes, ErrorResponse};
use super::{log_requests, state::*};
use crate::background_jobs::{JobError, JobInfo};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

#[derive(Serialize)]
struct JobsListResponse {
    jobs: Vec<JobInfo>,
}

#[derive(Serialize)]
struct TriggerResponse {
    job_id: String,
    message: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

fn scheduler_unavailable() -> axum::response::Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Scheduler not available".to_string(),
        }),
    )
        .into_response()
}

async fn admin_list_jobs(State(scheduler): State<OptionalSchedulerHandle>) -> impl IntoResponse {
    match scheduler {
        Some(handle) => Json(JobsListResponse {
            jobs: handle.list_jobs().await,
        })
        .into_response(),
        None => scheduler_unavailable(),
    }
}

async fn admin_trigger_job(
    State(scheduler): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = scheduler else {
        return scheduler_unavailable();
    };

    match handle.trigger_job(&job_id).await {
        Ok(()) => {
            info!("Job {} triggered via admin API", job_id);
            (
                StatusCode::ACCEPTED,
                Json(TriggerResponse {
                    message: format!("Job '{}' triggered", job_id),
                    job_id,
                }),
            )
                .into_response()
        }
        Err(e) => {
            let status = match e {
                JobError::NotFound => StatusCode::NOT_FOUND,
                JobError::AlreadyRunning => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!("Could not trigger job {}: {}", job_id, e);
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    let api_routes: Router = Router::new()
        .nest(
            "/dependencies",
            dependency_routes(state.config.max_upload_size_mb),
        )
        .with_state(state.clone());

    let admin_routes: Router = Router::new()
        .route("/jobs", get(admin_list_jobs))
        .route("/jobs/{id}/trigger", post(admin_trigger_job))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/api", api_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Serves until `shutdown` is cancelled, then drains in-flight requests.
pub async fn run_server(state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
