use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchError, SearchHit, SearchTransport};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Thin client for the Tavily search API. No retries: a failed call is
/// absorbed by the fan-out tool.
#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self, SearchError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            api_key,
        })
    }
}

#[async_trait]
impl SearchTransport for TavilyClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(TAVILY_API_URL)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query,
                max_results,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: TavilyResponse = response.json().await?;
        debug!("Search '{}' returned {} hits", query, body.results.len());
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parses_hits_and_ignores_extra_fields() {
        let body = r#"{
            "query": "recursion site:medium.com",
            "response_time": 1.2,
            "results": [
                {"title": "Recursion explained", "url": "https://medium.com/a", "content": "...", "score": 0.9},
                {"title": "Untitled", "url": "https://medium.com/b"}
            ]
        }"#;
        let parsed: TavilyResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].url, "https://medium.com/b");
        assert_eq!(parsed.results[0].title, "Recursion explained");
    }

    #[test]
    fn test_response_without_results_is_empty() {
        let parsed: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
