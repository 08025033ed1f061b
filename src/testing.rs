//! In-memory browser and engine doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tokio::time::Instant;

use crate::cookies::Cookie;
use crate::engine::extract_domain;
use crate::engines::{element_text, selector};
use crate::fetcher::{BrowserBackend, BrowserContext, BrowserPage, ContextOptions, WaitStrategy};
use crate::{Engine, EngineConfig, Result, SearchError, SearchResult, SearchType};

/// A page with fixed content that never navigates.
pub struct StaticPage {
    url: String,
    title: String,
    html: String,
}

impl StaticPage {
    pub fn new(url: &str, title: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            html: html.to_string(),
        }
    }
}

#[async_trait]
impl BrowserPage for StaticPage {
    async fn goto(&self, _url: &str, _wait: &WaitStrategy) -> Result<Option<u16>> {
        Ok(Some(200))
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// What the fake browser serves for a host.
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    pub status: Option<u16>,
    pub title: String,
    pub html: String,
    pub delay: Option<Duration>,
    pub fail: bool,
    /// Title shown once this long has passed since navigation.
    pub later_title: Option<(Duration, String)>,
}

impl FakeResponse {
    pub fn ok(title: &str, html: &str) -> Self {
        Self {
            status: Some(200),
            title: title.to_string(),
            html: html.to_string(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_title_after(mut self, after: Duration, title: &str) -> Self {
        self.later_title = Some((after, title.to_string()));
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

/// Observable state shared by the fake backend and everything it creates.
#[derive(Default)]
pub struct FakeState {
    pub responses: Mutex<HashMap<String, FakeResponse>>,
    pub contexts_created: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub open_pages: AtomicUsize,
    pub peak_pages: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub context_options: Mutex<Vec<ContextOptions>>,
    pub fail_launch: AtomicBool,
    pub running: AtomicBool,
    pub shutdowns: AtomicUsize,
    pub cookie_store: Mutex<Vec<Cookie>>,
    /// Every `add_cookies` batch, in call order.
    pub cookie_loads: Mutex<Vec<Vec<Cookie>>>,
}

impl FakeState {
    fn response_for(&self, url: &str) -> FakeResponse {
        let host = extract_domain(url);
        self.responses
            .lock()
            .unwrap()
            .get(&host)
            .cloned()
            .unwrap_or_else(|| FakeResponse::ok("", "<html><body></body></html>"))
    }
}

/// Browser backend that serves canned responses keyed by host.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<FakeState> {
        Arc::clone(&self.state)
    }

    pub fn serve(&self, host: &str, response: FakeResponse) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(host.to_string(), response);
    }

    pub fn fail_launch(&self) {
        self.state.fail_launch.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserBackend for FakeBackend {
    async fn new_context(&self, options: &ContextOptions) -> Result<Arc<dyn BrowserContext>> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(SearchError::BrowserLaunch("chrome not found".to_string()));
        }
        self.state.running.store(true, Ordering::SeqCst);
        self.state.contexts_created.fetch_add(1, Ordering::SeqCst);
        self.state
            .context_options
            .lock()
            .unwrap()
            .push(options.clone());
        Ok(Arc::new(FakeContext {
            state: Arc::clone(&self.state),
        }))
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.running.store(false, Ordering::SeqCst);
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeContext {
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let open = self.state.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_pages.fetch_max(open, Ordering::SeqCst);
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
            current: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.state.cookie_store.lock().unwrap().clone())
    }

    async fn add_cookies(&self, cookies: Vec<Cookie>) -> Result<()> {
        self.state.cookie_loads.lock().unwrap().push(cookies.clone());
        self.state.cookie_store.lock().unwrap().extend(cookies);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
    current: Mutex<Option<(String, FakeResponse, Instant)>>,
    closed: AtomicBool,
}

impl FakePage {
    fn current(&self) -> Option<(String, FakeResponse)> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .map(|(url, mut response, loaded)| {
                if let Some((after, title)) = response.later_title.take() {
                    if loaded.elapsed() >= after {
                        response.title = title;
                    }
                }
                (url, response)
            })
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str, _wait: &WaitStrategy) -> Result<Option<u16>> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        let response = self.state.response_for(url);
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        if response.fail {
            return Err(SearchError::Browser("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        let status = response.status;
        *self.current.lock().unwrap() = Some((url.to_string(), response, Instant::now()));
        Ok(status)
    }

    async fn title(&self) -> Result<String> {
        Ok(self.current().map(|(_, r)| r.title).unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current().map(|(_, r)| r.html).unwrap_or_default())
    }

    async fn url(&self) -> Result<String> {
        Ok(self
            .current()
            .map(|(u, _)| u)
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.open_pages.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Engine whose results are `<a class="hit">` links on its host `<id>.test`.
pub struct ScriptedEngine {
    config: EngineConfig,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(id: &str) -> Self {
        Self {
            config: EngineConfig {
                name: format!("Engine {}", id),
                id: id.to_string(),
                search_url: format!("https://{}.test/search?q={{query}}&n={{num}}", id),
                news_url: format!("https://{}.test/news?q={{query}}", id),
                block_resources: None,
                enabled: true,
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.config.enabled = false;
        self
    }

    pub fn host(id: &str) -> String {
        format!("{}.test", id)
    }

    /// HTML listing `n` results.
    pub fn results_html(n: usize) -> String {
        let items: String = (0..n)
            .map(|i| format!(r#"<a class="hit" href="https://r.test/{i}">Result {i}</a>"#))
            .collect();
        format!("<html><body>{}</body></html>", items)
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        let html = page.content().await?;
        let document = Html::parse_document(&html);
        let hit = selector("a.hit")?;
        Ok(document
            .select(&hit)
            .take(num_results)
            .map(|a| {
                SearchResult::new(
                    element_text(a),
                    a.value().attr("href").unwrap_or_default(),
                )
            })
            .collect())
    }
}
