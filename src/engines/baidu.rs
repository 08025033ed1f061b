//! Baidu search engine implementation.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{element_text, first_text, selector};
use crate::fetcher::BrowserPage;
use crate::hot::HotItem;
use crate::{Engine, EngineConfig, Result, SearchResult, SearchType};

/// Baidu's realtime trending board (百度热搜).
pub const HOT_BOARD_URL: &str = "https://top.baidu.com/board?tab=realtime";

static RELATIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"昨天|前天|\d+小时前|\d+月\d+日|\d+天前|\d+分钟前")
        .expect("RELATIVE_TIME: hardcoded regex is valid")
});

/// Baidu search engine (百度).
pub struct Baidu {
    config: EngineConfig,
}

impl Baidu {
    /// Creates a new Baidu engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "百度".to_string(),
                id: "baidu".to_string(),
                search_url: "https://www.baidu.com/s?wd={query}&rn={num}".to_string(),
                news_url: "https://www.baidu.com/s?tn=news&rtt=1&bsst=1&cl=2&wd={query}"
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

    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let item_selector = selector(
            "#content_left > div[srcid], #content_left > div.result-op, \
             #content_left > div.result, #content_left > div.c-container",
        )?;
        let title_selector = selector("h3 a")?;
        let abstract_selector = selector(".c-abstract, .c-span-last, span[class*='content-right']")?;
        let span_selector = selector("span")?;
        let div_selector = selector("div")?;

        let mut results = Vec::new();

        for item in document.select(&item_selector) {
            let link = match item.select(&title_selector).next() {
                Some(el) => el,
                None => continue,
            };

            let title = element_text(link);
            let url = link.value().attr("href").unwrap_or_default().to_string();
            if title.is_empty() || url.is_empty() {
                continue;
            }

            let spans: Vec<String> = item.select(&span_selector).map(element_text).collect();
            let time = spans
                .iter()
                .find(|t| RELATIVE_TIME.is_match(t))
                .cloned()
                .unwrap_or_default();

            let mut summary = first_text(item, &abstract_selector);
            if summary.is_empty() {
                summary = first_long_text(item, &div_selector, &title, &time);
            }

            let source = spans
                .iter()
                .find(|t| {
                    let len = t.chars().count();
                    (2..=10).contains(&len) && !RELATIVE_TIME.is_match(t) && **t != title
                })
                .cloned()
                .unwrap_or_default();

            results.push(
                SearchResult::new(title, url)
                    .with_summary(summary)
                    .with_source(source)
                    .with_time(time),
            );
        }

        Ok(results)
    }

    fn parse_news_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let item_selector = selector("div[tpl='news-normal']")?;
        let title_selector = selector("h3")?;
        let time_selector = selector("span.c-color-gray2")?;
        let summary_selector = selector("div.c-span-last > span.c-font-normal.c-color-text")?;
        let source_selector = selector("div[class*='news-source'] > a")?;

        let mut results = Vec::new();

        for item in document.select(&item_selector) {
            let url = item.value().attr("mu").unwrap_or_default().to_string();
            if url.is_empty() {
                continue;
            }
            let title = first_text(item, &title_selector);
            if title.is_empty() {
                continue;
            }

            let time = first_text(item, &time_selector)
                .replace("发布于：", "")
                .trim()
                .to_string();

            results.push(
                SearchResult::new(title, url)
                    .with_summary(first_text(item, &summary_selector))
                    .with_source(first_text(item, &source_selector))
                    .with_time(time),
            );
        }

        Ok(results)
    }
}

/// Parses the trending board. Rows without a title are skipped; ranks follow
/// page order and count skipped rows.
///
/// Class names on the board carry build hashes (`category-wrap_iQLoo`), so
/// only their stable prefixes are matched.
pub fn parse_hot_board(html: &str) -> Result<Vec<HotItem>> {
    let document = Html::parse_document(html);

    let row_selector = selector("div[class*='category-wrap_']")?;
    let title_selector = selector(".c-single-text-ellipsis")?;
    let score_selector = selector("div[class*='hot-index_']")?;
    let link_selector = selector("a[href]")?;

    let mut items = Vec::new();
    for (idx, row) in document.select(&row_selector).enumerate() {
        let title = first_text(row, &title_selector);
        if title.is_empty() {
            continue;
        }
        let url = row
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();
        items.push(HotItem {
            rank: idx + 1,
            title,
            hot_score: first_text(row, &score_selector),
            url,
        });
    }
    Ok(items)
}

/// First nested block whose text looks like a snippet rather than a label.
fn first_long_text(item: ElementRef<'_>, div: &scraper::Selector, title: &str, time: &str) -> String {
    item.select(div)
        .map(element_text)
        .find(|text| {
            text.chars().count() > 30
                && text != title
                && (time.is_empty() || !text.contains(time))
        })
        .unwrap_or_default()
}

impl Default for Baidu {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for Baidu {
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
            SearchType::Web => self.parse_results(&html)?,
            SearchType::News => self.parse_news_results(&html)?,
        };
        results.truncate(num_results);
        Ok(results)
    }
}
