use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a job: `starting → running → {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Legal edges of the job state machine. `Running → Running` is a progress update.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Starting, JobStatus::Running)
                | (JobStatus::Starting, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-assessed skill level of the learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl LearningLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LearningLevel::Beginner => "beginner",
            LearningLevel::Intermediate => "intermediate",
            LearningLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for LearningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end pipeline execution for a topic/level request.
///
/// Once terminal, exactly one of `result_path` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    pub topic: String,
    pub level: LearningLevel,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_id: impl Into<String>, topic: impl Into<String>, level: LearningLevel) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Starting,
            progress: "Preparing...".to_string(),
            progress_percent: Some(0),
            topic: topic.into(),
            level,
            started_at: Utc::now(),
            completed_at: None,
            result_path: None,
            error: None,
        }
    }
}
