//! Bing search engine implementation.

use async_trait::async_trait;
use scraper::Html;

use super::{element_text, first_text, selector};
use crate::fetcher::{BrowserPage, WaitStrategy};
use crate::{Engine, EngineConfig, Result, SearchResult, SearchType};

/// Bing search engine (必应).
///
/// Web search goes through cn.bing.com; news search through bing.com/news,
/// whose result cards carry their metadata as data attributes.
pub struct Bing {
    config: EngineConfig,
}

impl Bing {
    /// Creates a new Bing engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "必应".to_string(),
                id: "bing".to_string(),
                search_url: "https://cn.bing.com/search?q={query}&count={num}".to_string(),
                news_url: "https://www.bing.com/news/search?q={query}".to_string(),
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

    fn parse_news_cards(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let card_selector = selector("div[class*='news-card']")?;
        let h2_selector = selector("h2")?;
        let time_selector = selector("span[tabindex='0']")?;
        let snippet_selector = selector(".snippet")?;

        let mut results = Vec::new();

        for card in document.select(&card_selector) {
            let url = card.value().attr("data-url").unwrap_or_default().to_string();
            if url.is_empty() {
                continue;
            }

            let title = match card.value().attr("data-title").filter(|t| !t.trim().is_empty()) {
                Some(t) => t.trim().to_string(),
                None => first_text(card, &h2_selector),
            };
            if title.is_empty() {
                continue;
            }

            let source = card.value().attr("data-author").unwrap_or_default().to_string();
            let time = card
                .select(&time_selector)
                .next()
                .map(|span| {
                    span.value()
                        .attr("aria-label")
                        .map(|s| s.trim().to_string())
                        .unwrap_or_else(|| element_text(span))
                })
                .unwrap_or_default();

            results.push(
                SearchResult::new(title, url)
                    .with_summary(first_text(card, &snippet_selector))
                    .with_source(source)
                    .with_time(time),
            );
        }

        Ok(results)
    }

    fn parse_web_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let result_selector = selector("li.b_algo")?;
        let title_selector = selector("h2 a")?;
        let snippet_selector = selector(".b_caption p, .b_algoSlug")?;
        let source_selector = selector(".tptt")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let title_elem = match element.select(&title_selector).next() {
                Some(el) => el,
                None => continue,
            };

            let title = element_text(title_elem);
            let url = title_elem.value().attr("href").unwrap_or_default().to_string();

            if !url.is_empty() && !title.is_empty() {
                results.push(
                    SearchResult::new(title, url)
                        .with_summary(first_text(element, &snippet_selector))
                        .with_source(first_text(element, &source_selector)),
                );
            }
        }

        Ok(results)
    }

    /// Cards first; classic organic results when the page has none.
    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let cards = self.parse_news_cards(html)?;
        if !cards.is_empty() {
            return Ok(cards);
        }
        self.parse_web_results(html)
    }
}

impl Default for Bing {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for Bing {
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
        let mut results = self.parse_results(&html)?;
        results.truncate(num_results);
        Ok(results)
    }

    fn wait_strategy(&self, search_type: SearchType) -> WaitStrategy {
        match search_type {
            SearchType::News => WaitStrategy::Selector {
                css: "div[class*='news-card']".to_string(),
                timeout_ms: 5000,
            },
            SearchType::Web => WaitStrategy::Load,
        }
    }
}
