//! Stub collaborators for unit and end-to-end tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::llm_client::{AgentPrompt, LlmError, TextGenerator};
use crate::search::{SearchError, SearchHit, SearchTransport};

type Reply = Result<String, String>;

/// Answers by agent role, falling back to a default reply.
#[derive(Default)]
pub struct StubGenerator {
    by_role: HashMap<String, Reply>,
    default: Option<Reply>,
    gate: Option<Arc<Notify>>,
    opened: AtomicBool,
    prompts: Mutex<Vec<AgentPrompt>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, text: &str) -> Self {
        self.default = Some(Ok(text.to_string()));
        self
    }

    pub fn respond_to(mut self, role: &str, text: &str) -> Self {
        self.by_role.insert(role.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.default = Some(Err(message.to_string()));
        self
    }

    pub fn fail_for(mut self, role: &str, message: &str) -> Self {
        self.by_role.insert(role.to_string(), Err(message.to_string()));
        self
    }

    /// The first call waits until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn prompts(&self) -> Vec<AgentPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &AgentPrompt) -> Result<String, LlmError> {
        if let Some(gate) = &self.gate {
            if !self.opened.swap(true, Ordering::SeqCst) {
                gate.notified().await;
            }
        }
        self.prompts.lock().unwrap().push(prompt.clone());

        match self.by_role.get(&prompt.role).or(self.default.as_ref()) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(LlmError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

/// Returns canned hits per `site:` domain; unknown domains return nothing.
#[derive(Default)]
pub struct StubTransport {
    hits: HashMap<&'static str, Vec<SearchHit>>,
    failing: Vec<&'static str>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, domain: &'static str, hits: &[(&str, &str)]) -> Self {
        self.hits.insert(
            domain,
            hits.iter()
                .map(|(title, url)| SearchHit {
                    title: title.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn failing(mut self, domain: &'static str) -> Self {
        self.failing.push(domain);
        self
    }

    /// Every query received, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn max_results_seen(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }
}

#[async_trait]
impl SearchTransport for StubTransport {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));

        let domain = query
            .rsplit_once("site:")
            .map(|(_, d)| d.trim())
            .unwrap_or_default();

        if self.failing.iter().any(|d| *d == domain) {
            return Err(SearchError::Api {
                status: 503,
                message: format!("stub failure for {domain}"),
            });
        }
        Ok(self.hits.get(domain).cloned().unwrap_or_default())
    }
}
