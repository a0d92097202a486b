use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::prompts::{
    fill, REPORT_BACKSTORY, REPORT_EXPECTED_OUTPUT, REPORT_GOAL, REPORT_ROLE, REPORT_TASK,
};
use super::{REPORT_STAGE, TEXTUAL_STAGE, VISUAL_STAGE};
use crate::artifacts::REPORT_ARTIFACT;
use crate::llm_client::{AgentPrompt, TextGenerator};
use crate::models::job::LearningLevel;
use crate::models::resources::{ResultSet, SearchResult};
use crate::pipeline::{Stage, StageContext, StageDescriptor, StageError, StageOutput};

pub const VISUAL_HEADING: &str = "## Visual Resources";
pub const TEXTUAL_HEADING: &str = "## Textual Resources";

pub const DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: REPORT_STAGE,
    role: REPORT_ROLE,
    goal: REPORT_GOAL,
    backstory: REPORT_BACKSTORY,
    depends_on: &[VISUAL_STAGE, TEXTUAL_STAGE],
    tool: None,
    artifact: REPORT_ARTIFACT,
    progress_message: "Creating summary...",
};

/// Stage 4: Markdown report with every upstream result as a link.
///
/// The model only writes the overview; link lists are rendered here so no
/// entry can be dropped or truncated.
pub struct ReportSynthesisStage {
    generator: Arc<dyn TextGenerator>,
}

impl ReportSynthesisStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Stage for ReportSynthesisStage {
    fn descriptor(&self) -> &StageDescriptor {
        &DESCRIPTOR
    }

    async fn produce(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let visual = ctx.results(VISUAL_STAGE)?;
        let textual = ctx.results(TEXTUAL_STAGE)?;

        let prompt = AgentPrompt {
            role: DESCRIPTOR.role.to_string(),
            goal: DESCRIPTOR.goal.to_string(),
            backstory: DESCRIPTOR.backstory.to_string(),
            task: fill(REPORT_TASK, ctx.topic, ctx.level.as_str()),
            expected_output: REPORT_EXPECTED_OUTPUT.to_string(),
            context: overview_context(visual, textual),
        };
        let overview = self.generator.generate(&prompt).await?;

        let report = render_report(ctx.topic, ctx.level, overview.trim(), visual, textual);
        info!(
            "Report rendered with {} visual and {} textual resources",
            visual.len(),
            textual.len()
        );
        Ok(StageOutput::Report(report))
    }
}

fn overview_context(visual: &ResultSet, textual: &ResultSet) -> String {
    let titles = |set: &ResultSet| {
        set.results
            .iter()
            .map(|r| format!("- {}", r.title))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Visual resources ({}):\n{}\n\nTextual resources ({}):\n{}",
        visual.len(),
        titles(visual),
        textual.len(),
        titles(textual)
    )
}

pub fn render_report(
    topic: &str,
    level: LearningLevel,
    overview: &str,
    visual: &ResultSet,
    textual: &ResultSet,
) -> String {
    let mut out = format!("# Learning Resources: {topic}\n\n_Level: {level}_\n\n");
    if !overview.is_empty() {
        out.push_str(overview);
        out.push_str("\n\n");
    }
    render_section(&mut out, VISUAL_HEADING, visual, "_No visual resources found._");
    out.push('\n');
    render_section(&mut out, TEXTUAL_HEADING, textual, "_No textual resources found._");
    out
}

fn render_section(out: &mut String, heading: &str, set: &ResultSet, empty: &str) {
    out.push_str(heading);
    out.push_str("\n\n");
    if set.is_empty() {
        out.push_str(empty);
        out.push('\n');
        return;
    }
    for result in &set.results {
        out.push_str(&markdown_link(result));
        out.push('\n');
    }
}

fn markdown_link(result: &SearchResult) -> String {
    let title = result.title.trim();
    let text = if title.is_empty() { result.url.as_str() } else { title };
    let text = text
        .replace('\n', " ")
        .replace('[', "\\[")
        .replace(']', "\\]");
    let url = result
        .url
        .trim()
        .replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29");
    format!("- [{text}]({url})")
}
