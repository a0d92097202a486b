use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::job::{Job, JobStatus, LearningLevel};

#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {0} is already active")]
    Conflict(String),

    #[error("Job {job_id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

/// A state change requested by the task that owns the job.
#[derive(Debug, Clone)]
pub enum JobUpdate {
    /// Enter or stay in `running` with new progress text.
    Running {
        message: String,
        percent: Option<u8>,
    },
    Completed {
        result_path: PathBuf,
    },
    Failed {
        error: String,
    },
}

impl JobUpdate {
    pub fn target(&self) -> JobStatus {
        match self {
            JobUpdate::Running { .. } => JobStatus::Running,
            JobUpdate::Completed { .. } => JobStatus::Completed,
            JobUpdate::Failed { .. } => JobStatus::Failed,
        }
    }

    fn apply(self, job: &mut Job) {
        match self {
            JobUpdate::Running { message, percent } => {
                job.status = JobStatus::Running;
                job.progress = message;
                job.progress_percent = percent;
            }
            JobUpdate::Completed { result_path } => {
                job.status = JobStatus::Completed;
                job.progress = "Complete!".to_string();
                job.progress_percent = Some(100);
                job.completed_at = Some(Utc::now());
                job.result_path = Some(result_path);
                job.error = None;
            }
            JobUpdate::Failed { error } => {
                job.status = JobStatus::Failed;
                job.completed_at = Some(Utc::now());
                job.result_path = None;
                job.error = Some(error);
            }
        }
    }
}

/// Process-wide job table shared by the runner and the HTTP layer.
///
/// Only the task running a job calls `transition` for that job id.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Records a new `starting` job. An active job with the same id is a conflict;
    /// a finished one is replaced.
    async fn create(&self, job_id: &str, topic: &str, level: LearningLevel) -> Result<Job, JobError>;

    async fn transition(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError>;

    async fn get(&self, job_id: &str) -> Result<Job, JobError>;

    /// All jobs, most recently started first.
    async fn list(&self) -> Vec<Job>;
}

/// Jobs live until process exit; nothing is evicted.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, job_id: &str, topic: &str, level: LearningLevel) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(job_id) {
            if !existing.status.is_terminal() {
                return Err(JobError::Conflict(job_id.to_string()));
            }
            info!("Replacing finished job {job_id} ({})", existing.status);
        }

        let job = Job::new(job_id, topic, level);
        jobs.insert(job_id.to_string(), job.clone());
        info!("Job {job_id} created for '{topic}' ({level})");
        Ok(job)
    }

    async fn transition(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        let to = update.target();
        if !job.status.can_transition_to(to) {
            return Err(JobError::IllegalTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to,
            });
        }

        let from = job.status;
        update.apply(job);
        if from != to {
            info!("Job {job_id}: {from} -> {to}");
        }
        Ok(job.clone())
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }
}
