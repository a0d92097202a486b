//! Background execution: one tokio task per job.
//!
//! The submitting request returns as soon as the job is recorded as `starting`.
//! The job's task is the only writer of that job's record and job directory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{JobError, JobRegistry, JobUpdate};
use crate::artifacts::ArtifactStore;
use crate::models::job::{Job, LearningLevel};
use crate::pipeline::{Pipeline, ProgressReporter, StageDescriptor};

const INITIALIZING_PERCENT: u8 = 5;

struct JobHandle {
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

/// Launches pipeline runs and keeps a join/cancel handle per job id.
#[derive(Clone)]
pub struct JobRunner {
    registry: Arc<dyn JobRegistry>,
    pipeline: Arc<Pipeline>,
    store: ArtifactStore,
    handles: Arc<Mutex<HashMap<String, JobHandle>>>,
}

impl JobRunner {
    pub fn new(registry: Arc<dyn JobRegistry>, pipeline: Arc<Pipeline>, store: ArtifactStore) -> Self {
        Self {
            registry,
            pipeline,
            store,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records the job as `starting` and spawns its run. Does not wait for any stage.
    pub async fn submit(
        &self,
        job_id: String,
        topic: String,
        level: LearningLevel,
    ) -> Result<Job, JobError> {
        let job = self.registry.create(&job_id, &topic, level).await?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_job(
            self.registry.clone(),
            self.pipeline.clone(),
            self.store.clone(),
            job_id.clone(),
            topic,
            level,
            cancel.clone(),
        ));

        self.handles.lock().await.insert(
            job_id,
            JobHandle {
                task: Some(task),
                cancel,
            },
        );
        Ok(job)
    }

    /// Waits for the job's task to finish. Returns immediately if it was already joined.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn join(&self, job_id: &str) -> Result<(), JobError> {
        let task = {
            let mut handles = self.handles.lock().await;
            let handle = handles
                .get_mut(job_id)
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
            handle.task.take()
        };

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Job {job_id}: task ended abnormally: {e}");
            }
        }
        Ok(())
    }

    /// Asks the job to stop before its next stage. The stage in flight is not interrupted.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn cancel(&self, job_id: &str) -> Result<(), JobError> {
        let handles = self.handles.lock().await;
        let handle = handles
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        handle.cancel.cancel();
        info!("Job {job_id}: cancellation requested");
        Ok(())
    }
}

/// Mirrors stage milestones into the registry.
struct RegistryProgress {
    registry: Arc<dyn JobRegistry>,
    job_id: String,
}

#[async_trait]
impl ProgressReporter for RegistryProgress {
    async fn stage_started(&self, index: usize, total: usize, percent: u8, stage: &StageDescriptor) {
        info!(
            "Job {}: stage {}/{} '{}'",
            self.job_id,
            index + 1,
            total,
            stage.name
        );
        let update = JobUpdate::Running {
            message: stage.progress_message.to_string(),
            percent: Some(percent),
        };
        if let Err(e) = self.registry.transition(&self.job_id, update).await {
            warn!("Job {}: progress update rejected: {e}", self.job_id);
        }
    }
}

async fn run_job(
    registry: Arc<dyn JobRegistry>,
    pipeline: Arc<Pipeline>,
    store: ArtifactStore,
    job_id: String,
    topic: String,
    level: LearningLevel,
    cancel: CancellationToken,
) {
    let started = JobUpdate::Running {
        message: "Initializing agents...".to_string(),
        percent: Some(INITIALIZING_PERCENT),
    };
    if let Err(e) = registry.transition(&job_id, started).await {
        error!("Job {job_id}: could not start: {e}");
        return;
    }

    let reporter = RegistryProgress {
        registry: registry.clone(),
        job_id: job_id.clone(),
    };

    // Run the pipeline on its own task so a panicking stage still ends the job.
    let run = {
        let job_id = job_id.clone();
        tokio::spawn(async move {
            pipeline
                .run(&job_id, &topic, level, &store, &reporter, &cancel)
                .await
        })
    };

    let update = match run.await {
        Ok(Ok(result_path)) => {
            info!("Job {job_id} completed: {}", result_path.display());
            JobUpdate::Completed { result_path }
        }
        Ok(Err(e)) => {
            error!("Job {job_id} failed: {e}");
            JobUpdate::Failed {
                error: e.to_string(),
            }
        }
        Err(e) => {
            error!("Job {job_id} aborted: {e}");
            JobUpdate::Failed {
                error: format!("job aborted: {e}"),
            }
        }
    };

    if let Err(e) = registry.transition(&job_id, update).await {
        error!("Job {job_id}: could not record outcome: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::agents::prompts::{QUERY_ROLE, REPORT_ROLE};
    use crate::agents::report_synthesis::{TEXTUAL_HEADING, VISUAL_HEADING};
    use crate::agents::{build_learning_pipeline, DiscoveryOptions};
    use crate::artifacts::{
        QUERIES_ARTIFACT, REPORT_ARTIFACT, TEXTUAL_RESULTS_ARTIFACT, VISUAL_RESULTS_ARTIFACT,
    };
    use crate::jobs::registry::InMemoryJobRegistry;
    use crate::jobs::JobSnapshot;
    use crate::models::job::JobStatus;
    use crate::models::resources::ResultSet;
    use crate::test_support::{StubGenerator, StubTransport};

    const GRAPH_QUERIES: &str = r#"{"queries": ["what is a graph", "graph theory basics"]}"#;

    fn runner(
        generator: StubGenerator,
        transport: StubTransport,
        root: &Path,
    ) -> (JobRunner, Arc<InMemoryJobRegistry>, ArtifactStore) {
        let pipeline = build_learning_pipeline(
            Arc::new(generator),
            Arc::new(transport),
            DiscoveryOptions::default(),
        )
        .unwrap();
        let registry = Arc::new(InMemoryJobRegistry::new());
        let store = ArtifactStore::new(root);
        let runner = JobRunner::new(registry.clone(), Arc::new(pipeline), store.clone());
        (runner, registry, store)
    }

    fn populated_transport() -> StubTransport {
        StubTransport::new()
            .with_hits("youtube.com", &[("Graphs in 10 minutes", "https://youtube.com/g")])
            .with_hits("coursera.org", &[("Discrete math", "https://coursera.org/d")])
            .with_hits("arxiv.org", &[("A survey of graphs", "https://arxiv.org/abs/1")])
            .with_hits("github.com", &[("awesome-graphs", "https://github.com/awesome/graphs")])
    }

    fn link_count(report: &str, heading: &str) -> usize {
        report
            .split(heading)
            .nth(1)
            .map(|rest| rest.split("\n## ").next().unwrap_or(""))
            .map(|s| s.lines().filter(|l| l.starts_with("- [")).count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_completed_job_persists_queries_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .respond("Start with the videos.");
        let (runner, registry, store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("a".to_string(), "graph theory".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        runner.join("a").await.unwrap();

        let job = registry.get("a").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_path, Some(tmp.path().join("job_a")));
        assert!(job.error.is_none());

        let raw = std::fs::read_to_string(
            tmp.path().join("job_a").join("step_1_suggested_search_queries.json"),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["queries"], serde_json::json!(["what is a graph", "graph theory basics"]));

        for key in [QUERIES_ARTIFACT, VISUAL_RESULTS_ARTIFACT, TEXTUAL_RESULTS_ARTIFACT, REPORT_ARTIFACT] {
            assert!(store.exists("a", key).await, "missing {}", key.file_name());
        }
    }

    #[tokio::test]
    async fn test_report_keeps_every_discovered_resource() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .respond("Overview.");
        let (runner, _registry, store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("r".to_string(), "graph theory".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        runner.join("r").await.unwrap();

        let visual: ResultSet = store.read_json("r", VISUAL_RESULTS_ARTIFACT).await.unwrap();
        let textual: ResultSet = store.read_json("r", TEXTUAL_RESULTS_ARTIFACT).await.unwrap();
        let report = store.read_text("r", REPORT_ARTIFACT).await.unwrap();

        // 2 queries x 2 populated filters each
        assert_eq!(visual.len(), 4);
        assert_eq!(textual.len(), 4);
        assert_eq!(link_count(&report, VISUAL_HEADING), visual.len());
        assert_eq!(link_count(&report, TEXTUAL_HEADING), textual.len());
    }

    #[tokio::test]
    async fn test_empty_search_completes_with_empty_result_sets() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, r#"{"queries": ["recursion"]}"#)
            .respond("Nothing found yet.");
        let (runner, registry, store) = runner(generator, StubTransport::new(), tmp.path());

        runner
            .submit("b".to_string(), "recursion".to_string(), LearningLevel::Intermediate)
            .await
            .unwrap();
        runner.join("b").await.unwrap();

        assert_eq!(registry.get("b").await.unwrap().status, JobStatus::Completed);
        let raw = std::fs::read_to_string(tmp.path().join("job_b/step_2_visual_results.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_status_before_terminal_has_no_outcome() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .respond("Overview.")
            .gated(gate.clone());
        let (runner, registry, store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("c".to_string(), "graphs".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();

        let snapshot = JobSnapshot::load(registry.get("c").await.unwrap(), &store).await;
        assert!(matches!(
            snapshot.job.status,
            JobStatus::Starting | JobStatus::Running
        ));
        assert!(snapshot.job.result_path.is_none());
        assert!(snapshot.job.error.is_none());
        assert!(snapshot.summary.is_none());

        gate.notify_one();
        runner.join("c").await.unwrap();
        assert_eq!(registry.get("c").await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_model_failure_fails_job_with_message() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new().fail("model unavailable");
        let (runner, registry, store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("f".to_string(), "graphs".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        runner.join("f").await.unwrap();

        let job = registry.get("f").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_path.is_none());
        let error = job.error.unwrap();
        assert!(error.contains("search_queries_recommendation"), "{error}");
        assert!(error.contains("model unavailable"), "{error}");
        assert!(!store.exists("f", QUERIES_ARTIFACT).await);
    }

    #[tokio::test]
    async fn test_late_failure_leaves_earlier_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .fail_for(REPORT_ROLE, "context window exceeded");
        let (runner, registry, store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("p".to_string(), "graphs".to_string(), LearningLevel::Advanced)
            .await
            .unwrap();
        runner.join("p").await.unwrap();

        let job = registry.get("p").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_path.is_none());
        assert!(store.exists("p", QUERIES_ARTIFACT).await);
        assert!(store.exists("p", VISUAL_RESULTS_ARTIFACT).await);
        assert!(store.exists("p", TEXTUAL_RESULTS_ARTIFACT).await);
        assert!(!store.exists("p", REPORT_ARTIFACT).await);
    }

    #[tokio::test]
    async fn test_reused_id_does_not_keep_previous_report() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .respond("Overview.");
        let (first, _registry, store) = runner(generator, populated_transport(), tmp.path());
        first
            .submit("s".to_string(), "graphs".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        first.join("s").await.unwrap();
        assert!(store.exists("s", REPORT_ARTIFACT).await);

        // Same output root, report stage now fails.
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, r#"{"queries": ["knife skills"]}"#)
            .fail_for(REPORT_ROLE, "context window exceeded");
        let (second, registry, store) = runner(generator, StubTransport::new(), tmp.path());
        second
            .submit("s".to_string(), "cooking".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        second.join("s").await.unwrap();

        let job = registry.get("s").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.topic, "cooking");
        let visual: ResultSet = store.read_json("s", VISUAL_RESULTS_ARTIFACT).await.unwrap();
        assert!(visual.is_empty());
        assert!(store.read_text("s", REPORT_ARTIFACT).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_rejected_while_active() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .respond("Overview.")
            .gated(gate.clone());
        let (runner, _registry, _store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("d".to_string(), "graphs".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        let second = runner
            .submit("d".to_string(), "trees".to_string(), LearningLevel::Beginner)
            .await;
        assert_eq!(second.unwrap_err(), JobError::Conflict("d".to_string()));

        gate.notify_one();
        runner.join("d").await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let generator = StubGenerator::new()
            .respond_to(QUERY_ROLE, GRAPH_QUERIES)
            .respond("Overview.")
            .gated(gate.clone());
        let (runner, registry, store) = runner(generator, populated_transport(), tmp.path());

        runner
            .submit("x".to_string(), "graphs".to_string(), LearningLevel::Beginner)
            .await
            .unwrap();
        runner.cancel("x").await.unwrap();
        gate.notify_one();
        runner.join("x").await.unwrap();

        let job = registry.get("x").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("job cancelled"));
        assert!(!store.exists("x", REPORT_ARTIFACT).await);
    }

    #[tokio::test]
    async fn test_join_and_cancel_unknown_job() {
        let tmp = tempfile::tempdir().unwrap();
        let (runner, _registry, _store) =
            runner(StubGenerator::new(), StubTransport::new(), tmp.path());
        assert!(matches!(runner.join("nope").await, Err(JobError::NotFound(_))));
        assert!(matches!(runner.cancel("nope").await, Err(JobError::NotFound(_))));
    }
}
