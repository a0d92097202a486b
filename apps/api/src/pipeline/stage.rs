use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::artifacts::{ArtifactError, ArtifactKey};
use crate::llm_client::LlmError;
use crate::models::job::LearningLevel;
use crate::models::resources::{QuerySet, ResultSet};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Missing upstream output '{dependency}'")]
    MissingContext { dependency: &'static str },
}

/// Typed output of one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Queries(QuerySet),
    Results(ResultSet),
    Report(String),
}

impl StageOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            StageOutput::Queries(_) => "query set",
            StageOutput::Results(_) => "result set",
            StageOutput::Report(_) => "report",
        }
    }
}

/// Static description of a stage. Fixed at process start.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    /// Names of earlier stages whose outputs this stage reads.
    pub depends_on: &'static [&'static str],
    /// Name of the bound tool, if any.
    pub tool: Option<&'static str>,
    pub artifact: ArtifactKey,
    /// Shown to pollers while the stage runs.
    pub progress_message: &'static str,
}

/// Read-only input handed to a stage producer.
pub struct StageContext<'a> {
    pub job_id: &'a str,
    pub topic: &'a str,
    pub level: LearningLevel,
    upstream: HashMap<&'static str, &'a StageOutput>,
}

impl<'a> StageContext<'a> {
    pub fn new(
        job_id: &'a str,
        topic: &'a str,
        level: LearningLevel,
        upstream: HashMap<&'static str, &'a StageOutput>,
    ) -> Self {
        Self {
            job_id,
            topic,
            level,
            upstream,
        }
    }

    pub fn upstream(&self, dependency: &'static str) -> Result<&'a StageOutput, StageError> {
        self.upstream
            .get(dependency)
            .copied()
            .ok_or(StageError::MissingContext { dependency })
    }

    pub fn queries(&self, dependency: &'static str) -> Result<&'a QuerySet, StageError> {
        match self.upstream(dependency)? {
            StageOutput::Queries(set) => Ok(set),
            other => Err(StageError::MalformedOutput(format!(
                "'{dependency}' produced a {} where a query set was expected",
                other.kind()
            ))),
        }
    }

    pub fn results(&self, dependency: &'static str) -> Result<&'a ResultSet, StageError> {
        match self.upstream(dependency)? {
            StageOutput::Results(set) => Ok(set),
            other => Err(StageError::MalformedOutput(format!(
                "'{dependency}' produced a {} where a result set was expected",
                other.kind()
            ))),
        }
    }
}

/// A named unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    fn descriptor(&self) -> &StageDescriptor;

    async fn produce(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError>;
}
