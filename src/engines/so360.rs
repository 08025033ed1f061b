//! 360 Search engine implementation.

use async_trait::async_trait;
use scraper::Html;

use super::{element_text, first_text, selector};
use crate::fetcher::BrowserPage;
use crate::{Engine, EngineConfig, Result, SearchResult, SearchType};

/// 360 Search engine (360搜索).
pub struct So360 {
    config: EngineConfig,
}

impl So360 {
    /// Creates a new 360 Search engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "360搜索".to_string(),
                id: "360".to_string(),
                search_url: "https://www.so.com/s?q={query}".to_string(),
                news_url: "https://news.so.com/ns?q={query}".to_string(),
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

    fn parse_news_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let item_selector = selector("li[data-from='news']")?;
        let title_selector = selector("h3 .g-txt-inner")?;
        let summary_selector = selector(".summary")?;
        let source_selector = selector(".sitename")?;
        let time_selector = selector(".time")?;

        let mut results = Vec::new();

        for item in document.select(&item_selector) {
            let url = item.value().attr("data-url").unwrap_or_default().to_string();
            if url.is_empty() {
                continue;
            }
            let title = first_text(item, &title_selector);
            if title.is_empty() {
                continue;
            }

            results.push(
                SearchResult::new(title, url)
                    .with_summary(first_text(item, &summary_selector))
                    .with_source(first_text(item, &source_selector))
                    .with_time(first_text(item, &time_selector)),
            );
        }

        Ok(results)
    }

    fn parse_web_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let result_selector = selector("li.res-list")?;
        let title_selector = selector("h3 a")?;
        let snippet_selector = selector(".res-desc, .res-rich")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let title_elem = match element.select(&title_selector).next() {
                Some(el) => el,
                None => continue,
            };

            let title = element_text(title_elem);

            // 360 Search stores the real URL in data-mdurl, falling back to href
            let url = title_elem
                .value()
                .attr("data-mdurl")
                .or_else(|| title_elem.value().attr("href"))
                .unwrap_or_default()
                .to_string();

            if !url.is_empty() && !title.is_empty() {
                results.push(
                    SearchResult::new(title, url)
                        .with_summary(first_text(element, &snippet_selector)),
                );
            }
        }

        Ok(results)
    }
}

impl Default for So360 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for So360 {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(
        &self,
        page: &dyn BrowserPage,
        _query: &str,
        num_results: usize,
        search_type: SearchType,
    ) -> Result<Vec<SearchResult>> {
        let html = page.content().await?;
        let mut results = match search_type {
            SearchType::News => self.parse_news_results(&html)?,
            SearchType::Web => self.parse_web_results(&html)?,
        };
        results.truncate(num_results);
        Ok(results)
    }
}
