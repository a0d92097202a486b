mod agents;
mod artifacts;
mod config;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod search;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::agents::{build_learning_pipeline, DiscoveryOptions};
use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::jobs::{InMemoryJobRegistry, JobRegistry, JobRunner};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::search::TavilyClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting learning resources API v{}", env!("CARGO_PKG_VERSION"));

    // Artifact root
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("Could not create output dir {}", config.output_dir.display()))?;
    let store = ArtifactStore::new(&config.output_dir);
    info!("Writing job artifacts under {}", config.output_dir.display());

    // External collaborators
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let search = TavilyClient::new(config.tavily_api_key.clone())?;
    info!("Search client initialized ({} results per filter)", config.results_num);

    // Pipeline definition is fixed for the life of the process
    let pipeline = build_learning_pipeline(
        Arc::new(llm),
        Arc::new(search),
        DiscoveryOptions {
            max_results: config.results_num,
            dedupe_urls: config.dedupe_urls,
        },
    )?;
    info!("Pipeline ready with {} stages", pipeline.len());
    for (i, stage) in pipeline.descriptors().enumerate() {
        info!(
            "Stage {}: {} (after: {:?}, tool: {:?})",
            i + 1,
            stage.name,
            stage.depends_on,
            stage.tool
        );
    }

    let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
    let runner = JobRunner::new(registry.clone(), Arc::new(pipeline), store.clone());

    let state = AppState {
        registry,
        runner,
        store,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
