//! Search result types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BlockReason;
use crate::SearchError;

/// Kind of search page to query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Web,
    News,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Web => "web",
            SearchType::News => "news",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(SearchType::Web),
            "news" => Ok(SearchType::News),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown search type '{}'",
                other
            ))),
        }
    }
}

/// A single scraped search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
    /// Publisher or site name, when the engine shows one.
    #[serde(default)]
    pub source: String,
    /// Publication time exactly as rendered by the engine.
    #[serde(default)]
    pub time: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }
}

/// How a single candidate engine attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Returned at least one result.
    Ok,
    /// Classified as an anti-bot block; the engine was banned.
    Blocked,
    /// Parsed fine but produced nothing.
    Empty,
    /// Navigation exceeded its timeout.
    Timeout,
    /// The page answered with an HTTP error status.
    HttpError,
    /// Any other browser or parse failure.
    Failed,
}

/// Record of one engine tried during a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineAttempt {
    pub engine: String,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<BlockReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EngineAttempt {
    pub fn new(engine: impl Into<String>, outcome: AttemptOutcome) -> Self {
        Self {
            engine: engine.into(),
            outcome,
            block_reason: None,
            detail: None,
        }
    }

    pub fn blocked(engine: impl Into<String>, reason: BlockReason) -> Self {
        Self {
            block_reason: Some(reason),
            ..Self::new(engine, AttemptOutcome::Blocked)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of one logical search request.
///
/// Exhaustion is a normal value: `engine` is `None`, `total` is zero and
/// `error` explains why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub search_type: SearchType,
    pub engine: Option<String>,
    pub engine_name: Option<String>,
    pub total: usize,
    pub results: Vec<SearchResult>,
    pub available_engines: usize,
    pub banned_engines: usize,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<BlockReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<EngineAttempt>,
}

impl SearchResponse {
    /// Successful response from `engine`.
    pub fn success(
        query: impl Into<String>,
        search_type: SearchType,
        engine: impl Into<String>,
        engine_name: impl Into<String>,
        results: Vec<SearchResult>,
    ) -> Self {
        Self {
            query: query.into(),
            search_type,
            engine: Some(engine.into()),
            engine_name: Some(engine_name.into()),
            total: results.len(),
            results,
            available_engines: 0,
            banned_engines: 0,
            blocked: false,
            block_reason: None,
            error: None,
            attempts: Vec::new(),
        }
    }

    /// Failure payload with no results.
    pub fn failure(query: impl Into<String>, search_type: SearchType, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            search_type,
            engine: None,
            engine_name: None,
            total: 0,
            results: Vec::new(),
            available_engines: 0,
            banned_engines: 0,
            blocked: false,
            block_reason: None,
            error: Some(error.into()),
            attempts: Vec::new(),
        }
    }

    pub fn with_engine_counts(mut self, available: usize, banned: usize) -> Self {
        self.available_engines = available;
        self.banned_engines = banned;
        self
    }

    /// Attaches attempts and derives `blocked` / `block_reason` from the last block seen.
    pub fn with_attempts(mut self, attempts: Vec<EngineAttempt>) -> Self {
        if self.engine.is_none() {
            if let Some(reason) = attempts.iter().rev().find_map(|a| a.block_reason) {
                self.blocked = true;
                self.block_reason = Some(reason);
            }
        }
        self.attempts = attempts;
        self
    }

    pub fn is_success(&self) -> bool {
        self.engine.is_some() && self.total > 0
    }
}
