//! Axum route handlers for the learning-job API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{generate_job_id, is_valid_job_id, JobSnapshot};
use crate::artifacts::{ArtifactError, REPORT_ARTIFACT};
use crate::errors::AppError;
use crate::models::job::{Job, JobStatus, LearningLevel};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartLearningRequest {
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub learning_level: LearningLevel,
    /// Optional caller-chosen id; generated when absent.
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartLearningResponse {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/start-learning
///
/// Records the job and returns immediately; the pipeline runs in the background.
pub async fn handle_start_learning(
    State(state): State<AppState>,
    payload: Result<Json<StartLearningRequest>, JsonRejection>,
) -> Result<Json<StartLearningResponse>, AppError> {
    let Json(request) = payload?;
    let topic = request.topic_name.trim();
    if topic.is_empty() {
        return Err(AppError::Validation("Topic name is required".to_string()));
    }

    let job_id = match request.job_id {
        Some(id) if !is_valid_job_id(&id) => {
            return Err(AppError::Validation(
                "job_id must be 1-64 characters of letters, digits, '-' or '_'".to_string(),
            ));
        }
        Some(id) => id,
        None => generate_job_id(),
    };

    let job = state
        .runner
        .submit(job_id, topic.to_string(), request.learning_level)
        .await?;

    Ok(Json(StartLearningResponse {
        job_id: job.job_id,
        status: "started".to_string(),
    }))
}

/// GET /api/job-status/:job_id
///
/// Completed jobs carry the report (`summary`) and the query list (`queries`).
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, AppError> {
    let job = state.registry.get(&job_id).await?;
    Ok(Json(JobSnapshot::load(job, &state.store).await))
}

/// GET /api/download-report/:job_id
pub async fn handle_download_report(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = state
        .registry
        .get(&job_id)
        .await
        .ok()
        .filter(|job| job.status == JobStatus::Completed)
        .ok_or_else(|| AppError::NotFound("Job not found or not completed".to_string()))?;

    let report = match state.store.read_text(&job.job_id, REPORT_ARTIFACT).await {
        Ok(report) => report,
        Err(ArtifactError::Missing(_)) => {
            return Err(AppError::NotFound("Report file not found".to_string()));
        }
        Err(e) => return Err(AppError::Internal(e.into())),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"learning_report_{}.md\"", job.job_id),
            ),
        ],
        report,
    ))
}

/// GET /api/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.registry.list().await,
    })
}
