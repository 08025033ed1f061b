//! Search request representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, SearchError, SearchType};

/// Which engine the caller prefers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineSelector {
    /// Start from a random eligible engine.
    #[default]
    Auto,
    /// Start from the engine with this id.
    Named(String),
}

impl FromStr for EngineSelector {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SearchError::InvalidQuery("engine id cannot be empty".into()));
        }
        if s.eq_ignore_ascii_case("auto") {
            Ok(EngineSelector::Auto)
        } else {
            Ok(EngineSelector::Named(s.to_ascii_lowercase()))
        }
    }
}

impl fmt::Display for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineSelector::Auto => f.write_str("auto"),
            EngineSelector::Named(id) => f.write_str(id),
        }
    }
}

/// A search request with all parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search terms.
    pub query: String,
    /// Preferred engine.
    #[serde(default)]
    pub engine: EngineSelector,
    /// Maximum results to return. `None` uses the configured default.
    #[serde(default)]
    pub num_results: Option<usize>,
    #[serde(default)]
    pub search_type: SearchType,
}

impl SearchQuery {
    /// Creates a web query with automatic engine selection.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            engine: EngineSelector::Auto,
            num_results: None,
            search_type: SearchType::Web,
        }
    }

    /// Prefers the engine with the given id.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = EngineSelector::Named(engine.into().to_ascii_lowercase());
        self
    }

    pub fn with_selector(mut self, selector: EngineSelector) -> Self {
        self.engine = selector;
        self
    }

    pub fn with_num_results(mut self, num_results: usize) -> Self {
        self.num_results = Some(num_results);
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Shorthand for `with_search_type(SearchType::News)`.
    pub fn news(self) -> Self {
        self.with_search_type(SearchType::News)
    }

    /// Rejects blank queries and a zero result count.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Query cannot be empty".into()));
        }
        if self.num_results == Some(0) {
            return Err(SearchError::InvalidQuery(
                "num_results must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
