//! Sogou search engine implementation.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;

use super::{element_text, first_text, selector};
use crate::engine::normalize_url;
use crate::fetcher::BrowserPage;
use crate::{Engine, EngineConfig, Result, SearchResult, SearchType};

static ABSOLUTE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2}|\d{4}年\d{1,2}月\d{1,2}日)$")
        .expect("ABSOLUTE_DATE: hardcoded regex is valid")
});

/// Sogou search engine (搜狗).
pub struct Sogou {
    config: EngineConfig,
}

impl Sogou {
    /// Creates a new Sogou engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "搜狗".to_string(),
                id: "sogou".to_string(),
                search_url: "https://www.sogou.com/web?query={query}&page=1&ie=utf8".to_string(),
                news_url: "https://www.sogou.com/sogou?ie=utf8&interation=1728053249&query={query}"
                    .to_string(),
                block_resources: None,
                enabled: true,
            },
        }
    }

    /// Creates with custom configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses result blocks; relative links are resolved against `base_url`.
    fn parse_results(&self, html: &str, base_url: Option<&str>) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let result_selector = selector("#main div[class*='vrwrap'], #main div.rb")?;
        let title_selector = selector("h3 a")?;
        let news_from_selector = selector("p[class*='news-from'] span")?;
        let div_selector = selector("div")?;
        let p_selector = selector("p")?;
        let fallback_summary_selector = selector("p[class*='star-wiki'], .str_info, .str-text")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let link = match element.select(&title_selector).next() {
                Some(el) => el,
                None => continue,
            };

            let title = element_text(link);
            let href = link.value().attr("href").unwrap_or_default();
            if title.is_empty() || href.is_empty() {
                continue;
            }
            let url = normalize_url(href, base_url);

            let from: Vec<String> = element.select(&news_from_selector).map(element_text).collect();
            let source = from.first().cloned().unwrap_or_default();
            let mut time = from.get(1).cloned().unwrap_or_default();

            if time.is_empty() {
                time = element
                    .select(&div_selector)
                    .map(element_text)
                    .find(|t| ABSOLUTE_DATE.is_match(t))
                    .unwrap_or_default();
            }

            let mut summary = element
                .select(&p_selector)
                .filter(|p| {
                    let classes: Vec<&str> = p.value().classes().collect();
                    !classes
                        .iter()
                        .any(|c| c.contains("news-from") || *c == "text-lightgray")
                })
                .map(element_text)
                .find(|t| t.chars().count() > 20 && *t != title)
                .unwrap_or_default();

            if summary.is_empty() {
                summary = first_text(element, &fallback_summary_selector);
            }

            results.push(
                SearchResult::new(title, url)
                    .with_summary(summary)
                    .with_source(source)
                    .with_time(time),
            );
        }

        Ok(results)
    }
}

impl Default for Sogou {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for Sogou {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(
        &self,
        page: &dyn BrowserPage,
        _query: &str,
        num_results: usize,
        _search_type: SearchType,
    ) -> Result<Vec<SearchResult>> {
        let html = page.content().await?;
        let current_url = page.url().await.ok();
        let mut results = self.parse_results(&html, current_url.as_deref())?;
        results.truncate(num_results);
        Ok(results)
    }
}
