//! Search engine trait and configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::fetcher::{default_block_list, BrowserPage, ResourceKind, WaitStrategy};
use crate::{Result, SearchResult, SearchType};

/// Configuration for a search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Display name of the engine.
    pub name: String,
    /// Stable identifier used for selection, bans and rate limits.
    pub id: String,
    /// Web search URL template with `{query}` and optional `{num}` placeholders.
    pub search_url: String,
    /// News search URL template with a `{query}` placeholder.
    pub news_url: String,
    /// Resource kinds to block in this engine's contexts. `None` uses the default list.
    #[serde(default)]
    pub block_resources: Option<Vec<ResourceKind>>,
    /// Whether the engine is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: String::new(),
            search_url: String::new(),
            news_url: String::new(),
            block_resources: None,
            enabled: true,
        }
    }
}

/// Fills a URL template with an encoded query and result count.
pub fn fill_template(template: &str, query: &str, num_results: usize) -> String {
    template
        .replace("{query}", &urlencoding::encode(query))
        .replace("{num}", &num_results.to_string())
}

/// Host part of `url`, or `"unknown"` when it has none.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Resolves a possibly relative link against the page it was found on.
pub fn normalize_url(href: &str, base: Option<&str>) -> String {
    if href.is_empty() || !href.starts_with('/') || href.starts_with("//") {
        if let Some(rest) = href.strip_prefix("//") {
            return format!("https://{}", rest);
        }
        return href.to_string();
    }
    base.and_then(|b| url::Url::parse(b).ok())
        .and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Trait for implementing search engines.
///
/// The orchestrator navigates the page to [`Engine::search_url`] and screens
/// it for anti-bot blocks before calling [`Engine::search`], which only has to
/// read the loaded page and parse it.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the engine configuration.
    fn config(&self) -> &EngineConfig;

    /// Extracts up to `num_results` results from a page already showing the
    /// search results for `query`.
    async fn search(
        &self,
        page: &dyn BrowserPage,
        query: &str,
        num_results: usize,
        search_type: SearchType,
    ) -> Result<Vec<SearchResult>>;

    /// Returns the engine name.
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Returns the engine id.
    fn id(&self) -> &str {
        &self.config().id
    }

    /// Returns whether the engine is enabled.
    fn is_enabled(&self) -> bool {
        self.config().enabled
    }

    /// Builds the results URL for a query.
    fn search_url(&self, query: &str, num_results: usize, search_type: SearchType) -> String {
        let config = self.config();
        match search_type {
            SearchType::Web => fill_template(&config.search_url, query, num_results),
            SearchType::News => fill_template(&config.news_url, query, num_results),
        }
    }

    /// Resource kinds to block while this engine's pages load.
    fn resource_block_list(&self) -> Vec<ResourceKind> {
        self.config()
            .block_resources
            .clone()
            .unwrap_or_else(default_block_list)
    }

    /// How long navigation should wait before the page is parsed.
    fn wait_strategy(&self, _search_type: SearchType) -> WaitStrategy {
        WaitStrategy::Load
    }
}
