//! Search provider boundary and the fan-out tool built on top of it.
//!
//! Stages never call the provider directly; they hold a `SearchFanOut`
//! bound to a fixed list of site filters.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod fan_out;
pub mod tavily;

pub use fan_out::SearchFanOut;
pub use tavily::TavilyClient;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One raw hit as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// One request per `(query, site filter)` pair, bounded by `max_results`.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, SearchError>;
}
