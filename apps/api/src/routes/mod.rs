pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/start-learning", post(handlers::handle_start_learning))
        .route("/api/job-status/:job_id", get(handlers::handle_job_status))
        .route(
            "/api/download-report/:job_id",
            get(handlers::handle_download_report),
        )
        .route("/api/jobs", get(handlers::handle_list_jobs))
        .with_state(state)
}
