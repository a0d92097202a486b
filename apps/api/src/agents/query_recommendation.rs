use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::prompts::{
    fill, QUERY_BACKSTORY, QUERY_EXPECTED_OUTPUT, QUERY_GOAL, QUERY_ROLE, QUERY_TASK,
};
use super::QUERY_STAGE;
use crate::artifacts::QUERIES_ARTIFACT;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{parse_json, AgentPrompt, TextGenerator};
use crate::models::resources::{QuerySet, MAX_QUERIES};
use crate::pipeline::{Stage, StageContext, StageDescriptor, StageError, StageOutput};

pub const DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: QUERY_STAGE,
    role: QUERY_ROLE,
    goal: QUERY_GOAL,
    backstory: QUERY_BACKSTORY,
    depends_on: &[],
    tool: None,
    artifact: QUERIES_ARTIFACT,
    progress_message: "Generating search queries...",
};

#[derive(Debug, Deserialize)]
struct RawQueries {
    queries: Vec<String>,
}

/// Stage 1: asks the model for platform-agnostic search queries.
pub struct QueryRecommendationStage {
    generator: Arc<dyn TextGenerator>,
}

impl QueryRecommendationStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Stage for QueryRecommendationStage {
    fn descriptor(&self) -> &StageDescriptor {
        &DESCRIPTOR
    }

    async fn produce(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let prompt = AgentPrompt {
            role: DESCRIPTOR.role.to_string(),
            goal: DESCRIPTOR.goal.to_string(),
            backstory: DESCRIPTOR.backstory.to_string(),
            task: fill(QUERY_TASK, ctx.topic, ctx.level.as_str()),
            expected_output: format!("{QUERY_EXPECTED_OUTPUT}\n{JSON_ONLY_INSTRUCTION}"),
            context: String::new(),
        };

        let text = self.generator.generate(&prompt).await?;
        let raw: RawQueries = parse_json(&text)
            .map_err(|e| StageError::MalformedOutput(format!("query set is not valid JSON: {e}")))?;

        let set = parse_query_set(raw.queries)?;
        info!(
            "Job {}: recommended {} queries for '{}'",
            ctx.job_id,
            set.len(),
            ctx.topic
        );
        Ok(StageOutput::Queries(set))
    }
}

/// Drops site-restricted queries (the fan-out tool adds its own) and enforces the 1..=10 bound.
fn parse_query_set(raw: Vec<String>) -> Result<QuerySet, StageError> {
    let received = raw.len();
    let queries: Vec<String> = raw
        .into_iter()
        .filter(|q| {
            let keep = !q.contains("site:");
            if !keep {
                warn!("Discarding site-restricted query '{q}'");
            }
            keep
        })
        .collect();

    QuerySet::from_raw(queries).ok_or_else(|| {
        StageError::MalformedOutput(format!(
            "expected between 1 and {MAX_QUERIES} usable queries, model returned {received}"
        ))
    })
}
