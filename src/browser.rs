//! Chrome DevTools Protocol implementation of the browser traits.
//!
//! This module is only available when the `headless` Cargo feature is enabled.
//! One Chrome process is launched lazily and shared; every `ChromeContext` is a
//! CDP browser context (separate cookies and storage), and every page applies
//! the context's fingerprint overrides and resource blocking before use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, ErrorReason, Headers, ResourceType, SetExtraHttpHeadersParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::storage::{GetCookiesParams, SetCookiesParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::cookies::Cookie;
use crate::fetcher::{
    should_block, BrowserBackend, BrowserContext, BrowserPage, ContextOptions, ResourceKind,
    WaitStrategy,
};
use crate::{Result, SearchError};

/// Reads the main document's HTTP status from the Navigation Timing entry.
const STATUS_SCRIPT: &str =
    "performance.getEntriesByType('navigation')[0]?.responseStatus ?? null";

fn browser_err(what: &str, e: impl std::fmt::Display) -> SearchError {
    SearchError::Browser(format!("{}: {}", what, e))
}

/// A lazily launched, shared Chrome process.
pub struct ChromeBackend {
    settings: BrowserSettings,
    browser: Mutex<Option<Arc<Browser>>>,
    running: Arc<AtomicBool>,
}

impl ChromeBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn launch_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();

        if self.settings.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let chrome_path = crate::browser_setup::resolve_chrome(self.settings.chrome_path.as_deref())?;
        debug!("Using Chrome at: {}", chrome_path.display());
        builder = builder.chrome_executable(chrome_path);

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .arg("--no-first-run")
            .arg(format!(
                "--window-size={},{}",
                self.settings.viewport.width, self.settings.viewport.height
            ));

        if let Some(ref proxy) = self.settings.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        for arg in &self.settings.launch_args {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| SearchError::BrowserLaunch(format!("invalid browser config: {}", e)))
    }

    /// Returns the running browser, launching it on first use.
    async fn browser(&self) -> Result<Arc<Browser>> {
        let mut guard = self.browser.lock().await;

        if let Some(ref browser) = *guard {
            return Ok(Arc::clone(browser));
        }

        info!("Launching browser (headless: {})", self.settings.headless);
        let config = self.launch_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SearchError::BrowserLaunch(e.to_string()))?;

        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            running.store(false, Ordering::SeqCst);
            debug!("Browser CDP handler exited");
        });

        self.running.store(true, Ordering::SeqCst);
        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }
}

#[async_trait]
impl BrowserBackend for ChromeBackend {
    async fn new_context(&self, options: &ContextOptions) -> Result<Arc<dyn BrowserContext>> {
        let browser = self.browser().await?;
        let created = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| browser_err("Failed to create browser context", e))?;
        let id = created.result.browser_context_id.clone();
        debug!("Created browser context {:?}", id);
        Ok(Arc::new(ChromeContext {
            browser,
            id,
            options: options.clone(),
        }))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::SeqCst);

        match Arc::try_unwrap(browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!("Failed to close browser: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    warn!("Failed to reap browser process: {}", e);
                }
            }
            Err(shared) => {
                if let Err(e) = shared.execute(CloseParams::default()).await {
                    warn!("Failed to close shared browser: {}", e);
                }
            }
        }
        info!("Browser shut down");
        Ok(())
    }
}

/// One CDP browser context with its fingerprint settings.
pub struct ChromeContext {
    browser: Arc<Browser>,
    id: BrowserContextId,
    options: ContextOptions,
}

impl ChromeContext {
    async fn prepare(&self, page: &Page) -> Result<()> {
        let opts = &self.options;

        let mut ua = SetUserAgentOverrideParams::new(opts.user_agent.clone());
        ua.accept_language = Some(opts.accept_language.clone());
        page.set_user_agent(ua)
            .await
            .map_err(|e| browser_err("Failed to set user agent", e))?;

        let headers: serde_json::Map<String, serde_json::Value> = opts
            .extra_headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::Value::Object(headers),
        )))
        .await
        .map_err(|e| browser_err("Failed to set extra headers", e))?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(opts.viewport.width),
            i64::from(opts.viewport.height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| browser_err("Failed to set viewport", e))?;

        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(opts.timezone.clone()))
            .await
        {
            warn!("Failed to set timezone {}: {}", opts.timezone, e);
        }
        let locale = SetLocaleOverrideParams {
            locale: Some(opts.locale.clone()),
        };
        if let Err(e) = page.execute(locale).await {
            warn!("Failed to set locale {}: {}", opts.locale, e);
        }

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            opts.init_script.clone(),
        ))
        .await
        .map_err(|e| browser_err("Failed to install init script", e))?;

        Ok(())
    }

    /// Pauses every request and fails the ones the block list rejects.
    async fn intercept(&self, page: &Page) -> Result<JoinHandle<()>> {
        let mut events = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| browser_err("Failed to listen for requests", e))?;
        page.execute(FetchEnableParams::default())
            .await
            .map_err(|e| browser_err("Failed to enable request interception", e))?;

        let page = page.clone();
        let block_list = self.options.block_list.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let kind = resource_kind(&event.resource_type);
                let outcome = if should_block(kind, &event.request.url, &block_list) {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    debug!("Request {} not resumed: {}", event.request.url, e);
                }
            }
        }))
    }
}

#[async_trait]
impl BrowserContext for ChromeContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(self.id.clone());
        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| browser_err("Failed to open tab", e))?;

        let interceptor = match self.prepare(&page).await {
            Ok(()) => self.intercept(&page).await,
            Err(e) => Err(e),
        };
        match interceptor {
            Ok(interceptor) => Ok(Box::new(ChromePage { page, interceptor })),
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    debug!("Failed to close half-prepared tab: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let response = self
            .browser
            .execute(GetCookiesParams {
                browser_context_id: Some(self.id.clone()),
            })
            .await
            .map_err(|e| browser_err("Failed to read cookies", e))?;
        Ok(response
            .result
            .cookies
            .iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .filter_map(cookie_from_cdp)
            .collect())
    }

    async fn add_cookies(&self, cookies: Vec<Cookie>) -> Result<()> {
        let params: Vec<CookieParam> = cookies.iter().filter_map(cookie_param).collect();
        if params.is_empty() {
            return Ok(());
        }
        let count = params.len();
        self.browser
            .execute(SetCookiesParams {
                cookies: params,
                browser_context_id: Some(self.id.clone()),
            })
            .await
            .map_err(|e| browser_err("Failed to set cookies", e))?;
        debug!("Injected {} cookies into context {:?}", count, self.id);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await
            .map_err(|e| browser_err("Failed to dispose browser context", e))?;
        debug!("Disposed browser context {:?}", self.id);
        Ok(())
    }
}

/// A tab plus the task resolving its paused requests.
pub struct ChromePage {
    page: Page,
    interceptor: JoinHandle<()>,
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&self, url: &str, wait: &WaitStrategy) -> Result<Option<u16>> {
        let page = &self.page;

        match wait {
            WaitStrategy::Selector { css, timeout_ms } => {
                page.goto(url)
                    .await
                    .map_err(|e| browser_err("Navigation failed", e))?;
                let found = tokio::time::timeout(Duration::from_millis(*timeout_ms), async {
                    page.find_element(css.as_str()).await
                })
                .await;
                if let Err(_) | Ok(Err(_)) = found {
                    debug!(
                        "Selector '{}' not found within {}ms, proceeding with current page content",
                        css, timeout_ms
                    );
                }
            }
            WaitStrategy::Load => {
                page.goto(url)
                    .await
                    .map_err(|e| browser_err("Navigation failed", e))?;
            }
            WaitStrategy::NetworkIdle { idle_ms: ms } | WaitStrategy::Delay { ms } => {
                page.goto(url)
                    .await
                    .map_err(|e| browser_err("Navigation failed", e))?;
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }

        let status = match page.evaluate(STATUS_SCRIPT).await {
            Ok(result) => result.into_value::<Option<u16>>().ok().flatten(),
            Err(e) => {
                debug!("Could not read navigation status for {}: {}", url, e);
                None
            }
        };
        Ok(status.filter(|s| *s != 0))
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| browser_err("Failed to read title", e))?
            .unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| browser_err("Failed to get page content", e))
    }

    async fn url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(|e| browser_err("Failed to read page url", e))?
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.interceptor.abort();
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| browser_err("Failed to close tab", e))
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        self.interceptor.abort();
    }
}

/// Maps a CDP resource type onto the block-list categories.
///
/// Documents map to `None` so a navigation is never refused by kind.
fn resource_kind(resource_type: &ResourceType) -> Option<ResourceKind> {
    match resource_type {
        ResourceType::Document => None,
        ResourceType::Image => Some(ResourceKind::Image),
        ResourceType::Font => Some(ResourceKind::Font),
        ResourceType::Media => Some(ResourceKind::Media),
        ResourceType::Stylesheet => Some(ResourceKind::Stylesheet),
        ResourceType::Script => Some(ResourceKind::Script),
        ResourceType::Xhr => Some(ResourceKind::Xhr),
        ResourceType::Fetch => Some(ResourceKind::Fetch),
        _ => Some(ResourceKind::Other),
    }
}

/// Converts a CDP `Network.Cookie` (as JSON) into a jar cookie.
///
/// Session cookies report `expires: -1`, stored as `None`.
fn cookie_from_cdp(value: serde_json::Value) -> Option<Cookie> {
    let mut cookie: Cookie = serde_json::from_value(value).ok()?;
    if cookie.expires.is_some_and(|e| e < 0.0) {
        cookie.expires = None;
    }
    Some(cookie)
}

/// Converts a jar cookie into a CDP `CookieParam`.
///
/// Cookies without a domain cannot be scoped and are skipped.
fn cookie_param(cookie: &Cookie) -> Option<CookieParam> {
    if cookie.domain.is_empty() {
        return None;
    }
    let mut value = serde_json::json!({
        "name": cookie.name,
        "value": cookie.value,
        "domain": cookie.domain,
        "path": cookie.path,
        "secure": cookie.secure,
        "httpOnly": cookie.http_only,
    });
    if let Some(expires) = cookie.expires.filter(|e| *e >= 0.0) {
        value["expires"] = serde_json::json!(expires);
    }
    if let Some(ref same_site) = cookie.same_site {
        value["sameSite"] = serde_json::json!(same_site);
    }
    match serde_json::from_value(value) {
        Ok(param) => Some(param),
        Err(e) => {
            debug!("Skipping cookie {} for {}: {}", cookie.name, cookie.domain, e);
            None
        }
    }
}
