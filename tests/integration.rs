//! Integration tests through the public API.
//!
//! Tests marked `#[ignore]` drive a real Chrome against live search engines;
//! they need a browser, network access, and may be slow or flaky.
//!
//! Run with: `cargo test -p a3s-scout --test integration -- --ignored`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use a3s_scout::{
    extract_domain, AntiBotDetector, BlockReason, BrowserBackend, BrowserContext, BrowserPage,
    ContentExtractor, ContextOptions, Cookie, Engine, EngineConfig, EngineRegistry,
    ExtractionMethod, PageSnapshot, RateLimiter, Result, Scout, SearchQuery, SearchResult,
    SearchType, Settings, StatusLevel, WaitStrategy,
};
use async_trait::async_trait;

/// Serves fixed `(title, html)` pairs by host.
#[derive(Clone, Default)]
struct CannedBackend {
    pages: Arc<HashMap<String, (String, String)>>,
}

impl CannedBackend {
    fn new(pages: &[(&str, &str, &str)]) -> Self {
        let pages = pages
            .iter()
            .map(|(host, title, html)| (host.to_string(), (title.to_string(), html.to_string())))
            .collect();
        Self {
            pages: Arc::new(pages),
        }
    }
}

#[async_trait]
impl BrowserBackend for CannedBackend {
    async fn new_context(&self, _options: &ContextOptions) -> Result<Arc<dyn BrowserContext>> {
        Ok(Arc::new(self.clone()))
    }

    fn is_running(&self) -> bool {
        true
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl BrowserContext for CannedBackend {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        Ok(Box::new(CannedPage {
            pages: Arc::clone(&self.pages),
            current: Mutex::new(None),
        }))
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(Vec::new())
    }

    async fn add_cookies(&self, _cookies: Vec<Cookie>) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct CannedPage {
    pages: Arc<HashMap<String, (String, String)>>,
    current: Mutex<Option<(String, String, String)>>,
}

impl CannedPage {
    fn current(&self) -> (String, String, String) {
        self.current.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl BrowserPage for CannedPage {
    async fn goto(&self, url: &str, _wait: &WaitStrategy) -> Result<Option<u16>> {
        let (title, html) = self
            .pages
            .get(&extract_domain(url))
            .cloned()
            .unwrap_or_default();
        *self.current.lock().unwrap() = Some((url.to_string(), title, html));
        Ok(Some(200))
    }

    async fn title(&self) -> Result<String> {
        Ok(self.current().1)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current().2)
    }

    async fn url(&self) -> Result<String> {
        Ok(self.current().0)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Engine whose results are every `<li>` link on `<id>.example`.
struct ListEngine {
    config: EngineConfig,
}

impl ListEngine {
    fn new(id: &str) -> Self {
        Self {
            config: EngineConfig {
                name: id.to_uppercase(),
                id: id.to_string(),
                search_url: format!("https://{}.example/s?q={{query}}", id),
                news_url: format!("https://{}.example/news?q={{query}}", id),
                block_resources: None,
                enabled: true,
            },
        }
    }
}

#[async_trait]
impl Engine for ListEngine {
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
        let document = scraper::Html::parse_document(&html);
        let link = a3s_scout::engines::selector("li a")?;
        Ok(document
            .select(&link)
            .take(num_results)
            .map(|a| {
                SearchResult::new(
                    a3s_scout::engines::element_text(a),
                    a.value().attr("href").unwrap_or_default(),
                )
            })
            .collect())
    }
}

fn scout(backend: CannedBackend) -> Scout {
    let mut settings = Settings::default();
    settings.browser.cookie_file = None;
    let mut registry = EngineRegistry::empty(&settings.engines);
    registry.register("first", || Arc::new(ListEngine::new("first")) as Arc<dyn Engine>);
    registry.register("second", || Arc::new(ListEngine::new("second")) as Arc<dyn Engine>);
    let registry = registry.with_priority(["first", "second"]);
    Scout::with_parts(settings, Arc::new(backend), registry).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_third_call_waits_one_window() {
    let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1), 2, 2));
    let start = tokio::time::Instant::now();

    let first = limiter.acquire(Some("a.com"), Some("x")).await;
    let second = limiter.acquire(Some("a.com"), Some("x")).await;
    assert!(first.is_zero());
    assert!(second.is_zero());

    limiter.acquire(Some("a.com"), Some("x")).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(2100));
}

#[test]
fn test_extractor_selects_article_over_boilerplate() {
    let paragraphs = [
        "Paragraph one describes the opening of the new river bridge.",
        "Paragraph two quotes the mayor on the long construction effort.",
        "Paragraph three covers the expected changes to commuter traffic.",
        "Paragraph four lists the businesses that expect new customers.",
        "Paragraph five explains when the second phase will begin.",
    ];
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    let links: String = (0..15)
        .map(|i| format!("<a href=\"/c/{i}\">Category link number {i}</a>"))
        .collect();
    let html = format!(
        "<html><head><title>Bridge opens</title></head><body>\
         <nav>{links}</nav><article>{body}</article>\
         <footer><p>Footer text that is long enough to be a paragraph.</p>{links}</footer>\
         </body></html>"
    );

    let article = ContentExtractor::new().extract(&html, "https://city.example/news/1");
    let extracted: Vec<&str> = article.paragraphs().collect();
    assert_eq!(extracted, paragraphs);
    assert_eq!(article.method, ExtractionMethod::Paragraphs);
    assert!(!article.content.contains("Category link"));
    assert!(!article.content.contains("Footer text"));
}

#[test]
fn test_detector_classifies_verification_page() {
    let detector = AntiBotDetector::default();
    let blocked = detector.detect(&PageSnapshot::new(
        Some(200),
        "百度安全验证",
        "<html><body>请完成下方验证</body></html>",
    ));
    assert_eq!(blocked.block_reason(), Some(BlockReason::TitleKeyword));

    let normal = detector.detect(&PageSnapshot::new(
        Some(200),
        "rust_百度搜索",
        "<html><body><div id='content_left'>results</div></body></html>",
    ));
    assert!(normal.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_scout_falls_back_and_bans() {
    let backend = CannedBackend::new(&[
        ("first.example", "请输入验证码", "<html><body>captcha</body></html>"),
        (
            "second.example",
            "results",
            "<html><body><ul><li><a href='https://r.example/1'>One</a></li>\
             <li><a href='https://r.example/2'>Two</a></li></ul></body></html>",
        ),
    ]);
    let scout = scout(backend);

    let response = scout
        .search(&SearchQuery::new("rust").with_engine("first"))
        .await
        .unwrap();
    assert_eq!(response.engine.as_deref(), Some("second"));
    assert_eq!(response.engine_name.as_deref(), Some("SECOND"));
    assert_eq!(response.total, 2);
    assert_eq!(response.banned_engines, 1);
    assert!(scout.registry().is_banned("first"));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["engine"], "second");
    assert_eq!(json["attempts"][0]["outcome"], "blocked");

    let stats = scout.shutdown().await;
    assert_eq!(stats.total_requests, 2);
}

#[tokio::test]
async fn test_scout_fetch_article_record() {
    let backend = CannedBackend::new(&[(
        "blog.example",
        "Post",
        "<html><body><main><h1>Notes on async Rust</h1>\
         <p>Async functions return futures that do nothing until polled.</p>\
         <p>An executor such as Tokio drives those futures to completion.</p>\
         <img src='/fig/1.png' alt='diagram'></main></body></html>",
    )]);
    let scout = scout(backend);

    let article = scout
        .fetch_article("https://blog.example/posts/async", true)
        .await
        .unwrap();
    assert_ne!(article.status.status, StatusLevel::Error);
    let record = article.to_record();
    assert_eq!(record.title, "Notes on async Rust");
    assert_eq!(record.images, vec!["https://blog.example/fig/1.png".to_string()]);
}

#[cfg(feature = "headless")]
mod live {
    use super::*;

    fn live_scout() -> Scout {
        let mut settings = Settings::load(None).expect("settings");
        settings.browser.cookie_file = None;
        Scout::new(settings).expect("scout")
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_auto_search() {
        let scout = live_scout();
        let response = scout.search(&SearchQuery::new("rust programming")).await.unwrap();
        println!(
            "engine={:?} total={} attempts={:?}",
            response.engine, response.total, response.attempts
        );
        for (i, result) in response.results.iter().take(3).enumerate() {
            println!("  {}. {} - {}", i + 1, result.title, result.url);
        }
        scout.shutdown().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_baidu_news() {
        let scout = live_scout();
        let query = SearchQuery::new("人工智能").news();
        let response = scout.search_engine("baidu", &query).await.unwrap();
        println!("baidu news: {} results, error={:?}", response.total, response.error);
        scout.shutdown().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_fetch_article() {
        let scout = live_scout();
        let article = scout
            .fetch_article("https://www.rust-lang.org/", true)
            .await
            .unwrap();
        println!(
            "{} | {:?} | {} chars",
            article.title, article.status.status, article.content_length
        );
        assert!(!article.title.is_empty());
        scout.shutdown().await;
    }
}
