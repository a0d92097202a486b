use serde::Serialize;
use tracing::warn;

use crate::artifacts::{ArtifactStore, QUERIES_ARTIFACT, REPORT_ARTIFACT};
use crate::models::job::{Job, JobStatus};
use crate::models::resources::QuerySet;

/// What a poller sees: the job record plus, once completed, the report and queries.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    #[serde(flatten)]
    pub job: Job,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
}

impl JobSnapshot {
    /// Reads artifacts back for completed jobs. A missing or unreadable artifact
    /// is logged and left out; it never fails the read.
    pub async fn load(job: Job, store: &ArtifactStore) -> Self {
        if job.status != JobStatus::Completed {
            return Self {
                job,
                summary: None,
                queries: None,
            };
        }

        let summary = match store.read_text(&job.job_id, REPORT_ARTIFACT).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Job {}: could not load report: {e}", job.job_id);
                None
            }
        };

        let queries = match store.read_json::<QuerySet>(&job.job_id, QUERIES_ARTIFACT).await {
            Ok(set) => Some(set.queries),
            Err(e) => {
                warn!("Job {}: could not load queries: {e}", job.job_id);
                None
            }
        };

        Self {
            job,
            summary,
            queries,
        }
    }
}
