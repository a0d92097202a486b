use serde::{Deserialize, Serialize};

/// Upper bound on the number of queries a Query Set may carry.
pub const MAX_QUERIES: usize = 10;

/// Ordered set of general-purpose search queries produced by the first stage.
/// Serialized as `{"queries": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySet {
    pub queries: Vec<String>,
}

impl QuerySet {
    /// Builds a query set from raw model output, discarding blank entries.
    /// Returns `None` unless between 1 and `MAX_QUERIES` queries remain.
    pub fn from_raw(raw: Vec<String>) -> Option<Self> {
        let queries: Vec<String> = raw
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if queries.is_empty() || queries.len() > MAX_QUERIES {
            return None;
        }
        Some(Self { queries })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// A single learning resource found by a search filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
}

/// Flat, ordered list of search results. Duplicates are kept.
/// Serialized as `{"results": [{"title", "url"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub results: Vec<SearchResult>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = SearchResult>) {
        self.results.extend(results);
    }
}
