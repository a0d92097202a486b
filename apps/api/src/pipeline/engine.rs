use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::stage::{Stage, StageContext, StageDescriptor, StageError, StageOutput};
use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::models::job::LearningLevel;

/// Share of the progress bar reserved for setup before the first stage.
const SETUP_PERCENT: usize = 15;
/// Share spread across the stages themselves.
const STAGES_PERCENT: usize = 80;

/// Pipeline definition errors, caught when the pipeline is built.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Pipeline has no stages")]
    Empty,

    #[error("Stage '{0}' is defined more than once")]
    DuplicateStage(&'static str),

    #[error("Stage '{stage}' depends on '{dependency}', which does not run before it")]
    UnknownDependency {
        stage: &'static str,
        dependency: &'static str,
    },
}

/// Why a pipeline run stopped early.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Could not prepare job directory: {0}")]
    Prepare(#[from] ArtifactError),

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error("job cancelled")]
    Cancelled,
}

/// Receives coarse progress milestones between stages.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage's producer is invoked. `percent` is monotonic across the run.
    async fn stage_started(&self, index: usize, total: usize, percent: u8, stage: &StageDescriptor);
}

/// Percent shown while stage `index` (0-based) of `total` runs.
pub fn stage_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return SETUP_PERCENT as u8;
    }
    (SETUP_PERCENT + STAGES_PERCENT * index / total) as u8
}

/// An immutable, validated, ordered list of stages.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Validates that names are unique and every dependency runs earlier.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut seen: HashSet<&'static str> = HashSet::new();
        for stage in &stages {
            let descriptor = stage.descriptor();
            for dependency in descriptor.depends_on {
                if !seen.contains(dependency) {
                    return Err(PipelineError::UnknownDependency {
                        stage: descriptor.name,
                        dependency,
                    });
                }
            }
            if !seen.insert(descriptor.name) {
                return Err(PipelineError::DuplicateStage(descriptor.name));
            }
        }

        Ok(Self { stages })
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.stages.iter().map(|s| s.descriptor())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Runs every stage in order and returns the job directory.
    ///
    /// Artifacts written by stages that finished before a failure stay on disk.
    #[instrument(skip_all, fields(job_id = %job_id, level = %level))]
    pub async fn run(
        &self,
        job_id: &str,
        topic: &str,
        level: LearningLevel,
        store: &ArtifactStore,
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RunError> {
        let job_dir = store.prepare(job_id).await?;
        let total = self.stages.len();
        let mut outputs: HashMap<&'static str, StageOutput> = HashMap::with_capacity(total);

        for (index, stage) in self.stages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            let descriptor = stage.descriptor();
            reporter
                .stage_started(index, total, stage_percent(index, total), descriptor)
                .await;

            let started = Instant::now();
            let output = {
                let upstream = descriptor
                    .depends_on
                    .iter()
                    .filter_map(|dep| outputs.get(dep).map(|out| (*dep, out)))
                    .collect();
                let ctx = StageContext::new(job_id, topic, level, upstream);
                stage.produce(&ctx).await
            }
            .map_err(|source| RunError::Stage {
                stage: descriptor.name,
                source,
            })?;

            store
                .write(job_id, descriptor.artifact, &output)
                .await
                .map_err(|e| RunError::Stage {
                    stage: descriptor.name,
                    source: StageError::Artifact(e),
                })?;

            info!(
                "Stage {}/{} '{}' produced a {} in {}ms",
                index + 1,
                total,
                descriptor.name,
                output.kind(),
                started.elapsed().as_millis()
            );
            outputs.insert(descriptor.name, output);
        }

        Ok(job_dir)
    }
}
