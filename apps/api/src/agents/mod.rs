//! The four fixed stages of the learning-resource pipeline.
//!
//! Flow: query recommendation → visual discovery → textual discovery → report synthesis.
//! Discovery stages read the query set; the report reads both result sets.

use std::sync::Arc;

use crate::llm_client::TextGenerator;
use crate::pipeline::{Pipeline, PipelineError, Stage};
use crate::search::{SearchFanOut, SearchTransport};

pub mod prompts;
pub mod query_recommendation;
pub mod report_synthesis;
pub mod resource_discovery;

pub use query_recommendation::QueryRecommendationStage;
pub use report_synthesis::ReportSynthesisStage;
pub use resource_discovery::ResourceDiscoveryStage;

pub const QUERY_STAGE: &str = "search_queries_recommendation";
pub const VISUAL_STAGE: &str = "visual_search";
pub const TEXTUAL_STAGE: &str = "textual_search";
pub const REPORT_STAGE: &str = "summary_report";

/// Options that shape the search-backed stages.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    pub max_results: u32,
    pub dedupe_urls: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            dedupe_urls: false,
        }
    }
}

/// Builds the fixed four-stage pipeline.
pub fn build_learning_pipeline(
    generator: Arc<dyn TextGenerator>,
    transport: Arc<dyn SearchTransport>,
    options: DiscoveryOptions,
) -> Result<Pipeline, PipelineError> {
    let visual = SearchFanOut::visual(transport.clone(), options.max_results)
        .with_url_dedup(options.dedupe_urls);
    let textual = SearchFanOut::textual(transport, options.max_results)
        .with_url_dedup(options.dedupe_urls);

    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(QueryRecommendationStage::new(generator.clone())),
        Arc::new(ResourceDiscoveryStage::visual(visual)),
        Arc::new(ResourceDiscoveryStage::textual(textual)),
        Arc::new(ReportSynthesisStage::new(generator)),
    ];
    Pipeline::new(stages)
}
