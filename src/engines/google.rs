//! Google search engine implementation.

use async_trait::async_trait;
use scraper::Html;

use super::{element_text, first_text, selector};
use crate::fetcher::BrowserPage;
use crate::{Engine, EngineConfig, Result, SearchResult, SearchType};

/// Google search engine (谷歌).
pub struct Google {
    config: EngineConfig,
}

impl Google {
    /// Creates a new Google engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "谷歌".to_string(),
                id: "google".to_string(),
                search_url: "https://www.google.com/search?q={query}".to_string(),
                news_url: "https://www.google.com/search?q={query}&tbm=nws".to_string(),
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

        let container_selector = selector("div[data-news-doc-id], div[data-news-cluster-id]")?;
        let link_selector = selector("a[href]")?;
        let heading_selector = selector("div[role='heading']")?;
        let time_selector = selector("span[data-ts]")?;
        let div_selector = selector("div")?;
        let span_selector = selector("span")?;

        let mut results = Vec::new();

        for container in document.select(&container_selector) {
            let link = match container.select(&link_selector).next() {
                Some(el) => el,
                None => continue,
            };
            let url = link.value().attr("href").unwrap_or_default().to_string();
            if url.is_empty() || url.starts_with('#') {
                continue;
            }

            let title = first_text(link, &heading_selector);
            if title.is_empty() {
                continue;
            }
            let time = first_text(link, &time_selector);

            let divs: Vec<_> = link.select(&div_selector).collect();

            let source = divs
                .iter()
                .filter(|div| div.select(&heading_selector).next().is_none())
                .filter(|div| {
                    let text = element_text(**div);
                    !text.is_empty()
                        && text.chars().count() < 20
                        && text != title
                        && !text.contains('前')
                })
                .find_map(|div| {
                    div.select(&span_selector)
                        .next()
                        .filter(|span| span.value().attr("data-ts").is_none())
                        .map(element_text)
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or_default();

            let summary = divs
                .iter()
                .filter(|div| div.select(&heading_selector).next().is_none())
                .filter(|div| div.select(&time_selector).next().is_none())
                .map(|div| element_text(*div))
                .find(|text| {
                    text.chars().count() > 30
                        && *text != title
                        && (time.is_empty() || !text.contains(&time))
                })
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

    fn parse_web_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let container_selector = selector("div.g")?;
        let title_selector = selector("h3")?;
        let link_selector = selector("a[href]")?;
        let snippet_selector = selector("div[data-sncf], div.VwiC3b")?;

        let mut results = Vec::new();

        for element in document.select(&container_selector) {
            let title = first_text(element, &title_selector);
            if title.is_empty() {
                continue;
            }

            let url = match element.select(&link_selector).next() {
                Some(el) => {
                    let href = el.value().attr("href").unwrap_or_default();
                    // Skip Google's internal links
                    if href.starts_with('/') && !href.starts_with("/url?") {
                        continue;
                    }
                    // Extract actual URL from /url?q= redirects
                    match href.strip_prefix("/url?q=") {
                        Some(q) => {
                            let raw = q.split('&').next().unwrap_or(q);
                            urlencoding::decode(raw)
                                .map(|s| s.into_owned())
                                .unwrap_or_else(|_| raw.to_string())
                        }
                        None => href.to_string(),
                    }
                }
                None => continue,
            };

            if !url.is_empty() {
                results.push(
                    SearchResult::new(title, url)
                        .with_summary(first_text(element, &snippet_selector)),
                );
            }
        }

        Ok(results)
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let news = self.parse_news_results(html)?;
        if !news.is_empty() {
            return Ok(news);
        }
        self.parse_web_results(html)
    }
}

impl Default for Google {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for Google {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEWS_HTML: &str = r##"
        <html><body>
            <div data-news-doc-id="1">
                <a href="https://news.example.com/story">
                    <div><span>路透社</span></div>
                    <div role="heading">全球市场今日大幅上涨</div>
                    <div>分析人士认为主要原因是通胀数据好于预期并且就业市场依然强劲有力，投资者信心恢复。</div>
                    <div><span data-ts="1700000000">3 小时前</span></div>
                </a>
            </div>
            <div data-news-cluster-id="2">
                <a href="#">anchor only</a>
            </div>
        </body></html>
    "##;

    const WEB_HTML: &str = r#"
        <html><body>
            <div class="g">
                <a href="/url?q=https%3A%2F%2Fwww.rust-lang.org%2F&sa=U"><h3>Rust</h3></a>
                <div class="VwiC3b">A language empowering everyone.</div>
            </div>
            <div class="g">
                <a href="/search?q=related"><h3>Related</h3></a>
            </div>
            <div class="g">
                <a href="https://doc.rust-lang.org/book/"><h3>The Book</h3></a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_google_new() {
        let engine = Google::new();
        assert_eq!(engine.name(), "谷歌");
        assert_eq!(engine.id(), "google");
        assert_eq!(
            engine.search_url("rust", 30, SearchType::News),
            "https://www.google.com/search?q=rust&tbm=nws"
        );
    }

    #[test]
    fn test_parse_news_results() {
        let results = Google::new().parse_results(NEWS_HTML).unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.title, "全球市场今日大幅上涨");
        assert_eq!(r.url, "https://news.example.com/story");
        assert_eq!(r.source, "路透社");
        assert_eq!(r.time, "3 小时前");
        assert!(r.summary.starts_with("分析人士"));
    }

    #[test]
    fn test_parse_web_results() {
        let results = Google::new().parse_results(WEB_HTML).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(results[0].summary, "A language empowering everyone.");
        assert_eq!(results[1].title, "The Book");
    }

    #[test]
    fn test_parse_results_empty_html() {
        assert!(Google::new().parse_results("<html></html>").unwrap().is_empty());
    }
}
