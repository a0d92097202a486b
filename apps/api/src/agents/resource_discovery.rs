use async_trait::async_trait;
use tracing::info;

use super::prompts::{
    TEXTUAL_BACKSTORY, TEXTUAL_GOAL, TEXTUAL_ROLE, VISUAL_BACKSTORY, VISUAL_GOAL, VISUAL_ROLE,
};
use super::{QUERY_STAGE, TEXTUAL_STAGE, VISUAL_STAGE};
use crate::artifacts::{TEXTUAL_RESULTS_ARTIFACT, VISUAL_RESULTS_ARTIFACT};
use crate::models::resources::ResultSet;
use crate::pipeline::{Stage, StageContext, StageDescriptor, StageError, StageOutput};
use crate::search::SearchFanOut;

const VISUAL_DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: VISUAL_STAGE,
    role: VISUAL_ROLE,
    goal: VISUAL_GOAL,
    backstory: VISUAL_BACKSTORY,
    depends_on: &[QUERY_STAGE],
    tool: None,
    artifact: VISUAL_RESULTS_ARTIFACT,
    progress_message: "Finding visual resources...",
};

const TEXTUAL_DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: TEXTUAL_STAGE,
    role: TEXTUAL_ROLE,
    goal: TEXTUAL_GOAL,
    backstory: TEXTUAL_BACKSTORY,
    depends_on: &[QUERY_STAGE],
    tool: None,
    artifact: TEXTUAL_RESULTS_ARTIFACT,
    progress_message: "Finding textual resources...",
};

/// Stages 2 and 3: runs the bound fan-out tool once per recommended query.
///
/// Pure aggregation, no model call. The tool never fails, so neither does the
/// search part of this stage; an empty result set is a valid output.
pub struct ResourceDiscoveryStage {
    descriptor: StageDescriptor,
    tool: SearchFanOut,
}

impl ResourceDiscoveryStage {
    fn bound(mut descriptor: StageDescriptor, tool: SearchFanOut) -> Self {
        descriptor.tool = Some(tool.name());
        Self { descriptor, tool }
    }

    pub fn visual(tool: SearchFanOut) -> Self {
        Self::bound(VISUAL_DESCRIPTOR, tool)
    }

    pub fn textual(tool: SearchFanOut) -> Self {
        Self::bound(TEXTUAL_DESCRIPTOR, tool)
    }
}

#[async_trait]
impl Stage for ResourceDiscoveryStage {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    async fn produce(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let queries = ctx.queries(QUERY_STAGE)?;
        let mut results = ResultSet::default();

        for query in &queries.queries {
            results.extend(self.tool.search(query).await);
        }

        info!(
            "{} found {} resources across {} queries",
            self.descriptor.name,
            results.len(),
            queries.len()
        );
        Ok(StageOutput::Results(results))
    }
}
