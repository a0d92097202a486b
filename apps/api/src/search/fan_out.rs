use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::SearchTransport;
use crate::models::resources::SearchResult;

/// A fixed target-domain restriction applied to one search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteFilter {
    pub domain: &'static str,
    /// Prefix the query with "free" (course marketplaces).
    pub free_qualifier: bool,
}

impl SiteFilter {
    pub const fn new(domain: &'static str) -> Self {
        Self {
            domain,
            free_qualifier: false,
        }
    }

    pub const fn free(domain: &'static str) -> Self {
        Self {
            domain,
            free_qualifier: true,
        }
    }

    pub fn apply(&self, query: &str) -> String {
        if self.free_qualifier {
            format!("free {} site:{}", query, self.domain)
        } else {
            format!("{} site:{}", query, self.domain)
        }
    }
}

/// Video and course hosting.
pub const VISUAL_FILTERS: &[SiteFilter] = &[
    SiteFilter::new("youtube.com"),
    SiteFilter::free("udemy.com"),
    SiteFilter::free("coursera.org"),
];

/// Articles, papers and code hosting.
pub const TEXTUAL_FILTERS: &[SiteFilter] = &[
    SiteFilter::new("medium.com"),
    SiteFilter::new("arxiv.org"),
    SiteFilter::new("github.com"),
    SiteFilter::new("paperswithcode.com"),
];

/// Issues one search per site filter and concatenates the hits.
///
/// Failures never escape: a failing filter is logged and contributes nothing,
/// the remaining filters still run.
#[derive(Clone)]
pub struct SearchFanOut {
    name: &'static str,
    filters: &'static [SiteFilter],
    transport: Arc<dyn SearchTransport>,
    max_results: u32,
    dedupe_urls: bool,
}

impl SearchFanOut {
    pub fn new(
        name: &'static str,
        filters: &'static [SiteFilter],
        transport: Arc<dyn SearchTransport>,
        max_results: u32,
    ) -> Self {
        Self {
            name,
            filters,
            transport,
            max_results,
            dedupe_urls: false,
        }
    }

    pub fn visual(transport: Arc<dyn SearchTransport>, max_results: u32) -> Self {
        Self::new("visual_search_tool", VISUAL_FILTERS, transport, max_results)
    }

    pub fn textual(transport: Arc<dyn SearchTransport>, max_results: u32) -> Self {
        Self::new("text_search_tool", TEXTUAL_FILTERS, transport, max_results)
    }

    /// Keep only the first occurrence of each URL across filters.
    pub fn with_url_dedup(mut self, enabled: bool) -> Self {
        self.dedupe_urls = enabled;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Results preserve filter iteration order, then per-filter order.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let mut results = Vec::new();

        for filter in self.filters {
            let rewritten = filter.apply(query);
            match self.transport.search(&rewritten, self.max_results).await {
                Ok(hits) => {
                    debug!(
                        "{}: {} hits for '{}'",
                        self.name,
                        hits.len(),
                        rewritten
                    );
                    results.extend(
                        hits.into_iter()
                            .filter(|hit| !hit.url.trim().is_empty())
                            .map(|hit| SearchResult {
                                title: hit.title,
                                url: hit.url,
                            }),
                    );
                }
                Err(e) => {
                    warn!(
                        "{}: search failed for filter site:{} ({e}); skipping",
                        self.name, filter.domain
                    );
                }
            }
        }

        if self.dedupe_urls {
            let mut seen = HashSet::new();
            results.retain(|r| seen.insert(r.url.clone()));
        }

        results
    }
}
