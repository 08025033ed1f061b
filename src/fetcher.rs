//! Browser abstraction used by the session pool.
//!
//! The pool, the orchestrator and the article fetcher only talk to these
//! traits. `browser::ChromeBackend` implements them over the Chrome DevTools
//! Protocol; tests use an in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cookies::Cookie;
use crate::Result;

/// Strategy for waiting until a page is considered fully loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WaitStrategy {
    /// Wait for the page load event only.
    #[default]
    Load,
    /// Wait until network activity settles for the given duration.
    NetworkIdle {
        /// Milliseconds of network inactivity to wait for.
        idle_ms: u64,
    },
    /// Wait until a CSS selector matches an element on the page.
    /// Missing selectors do not fail navigation.
    Selector {
        /// CSS selector to wait for.
        css: String,
        /// Maximum time to wait in milliseconds.
        timeout_ms: u64,
    },
    /// Wait a fixed delay after the page load event.
    Delay {
        /// Milliseconds to wait after page load.
        ms: u64,
    },
}

/// Browser window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Network resource categories that a context can refuse to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Font,
    Media,
    Stylesheet,
    Script,
    Xhr,
    Fetch,
    Other,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Font => "font",
            ResourceKind::Media => "media",
            ResourceKind::Stylesheet => "stylesheet",
            ResourceKind::Script => "script",
            ResourceKind::Xhr => "xhr",
            ResourceKind::Fetch => "fetch",
            ResourceKind::Other => "other",
        }
    }
}

/// Heavy resources blocked when an engine does not supply its own list.
pub fn default_block_list() -> Vec<ResourceKind> {
    vec![ResourceKind::Image, ResourceKind::Font, ResourceKind::Media]
}

/// Returns true when a request should be aborted under `block_list`.
///
/// Icons are always dropped regardless of their resource type.
pub fn should_block(kind: Option<ResourceKind>, url: &str, block_list: &[ResourceKind]) -> bool {
    if kind.is_some_and(|k| block_list.contains(&k)) {
        return true;
    }
    let url = url.to_lowercase();
    url.contains("icon") || url.contains("favicon")
}

/// Script installed in every new document to mask automation fingerprints.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', {get: () => undefined});
Object.defineProperty(navigator, 'plugins', {get: () => [1, 2, 3, 4, 5]});
Object.defineProperty(navigator, 'languages', {get: () => ['zh-CN', 'zh', 'en']});
Object.defineProperty(navigator, 'platform', {get: () => 'Win32'});
Object.defineProperty(navigator, 'deviceMemory', {get: () => 8});
Object.defineProperty(navigator, 'hardwareConcurrency', {get: () => 8});
Object.defineProperty(navigator, 'connection', {
    get: () => ({effectiveType: '4g', rtt: 50, downlink: 10})
});
window.chrome = {runtime: {}, loadTimes: function() {}, csi: function() {}, app: {}};
delete navigator.__proto__.webdriver;
window.outerWidth = window.screen.width;
window.outerHeight = window.screen.height;
"#;

/// Everything needed to create an isolated browsing context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextOptions {
    pub user_agent: String,
    pub viewport: Viewport,
    pub locale: String,
    pub timezone: String,
    pub accept_language: String,
    pub block_list: Vec<ResourceKind>,
    pub extra_headers: Vec<(String, String)>,
    pub init_script: String,
}

impl ContextOptions {
    /// Creates options with the stock headers and stealth script.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            viewport: Viewport::default(),
            locale: "zh-CN".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            block_list: default_block_list(),
            extra_headers: default_extra_headers(),
            init_script: STEALTH_SCRIPT.to_string(),
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>, timezone: impl Into<String>) -> Self {
        self.locale = locale.into();
        self.timezone = timezone.into();
        self
    }

    pub fn with_accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = accept_language.into();
        self
    }

    pub fn with_block_list(mut self, block_list: Vec<ResourceKind>) -> Self {
        self.block_list = block_list;
        self
    }

    /// Order-independent key of the block list, used to match reusable contexts.
    pub fn block_fingerprint(&self) -> String {
        block_fingerprint(&self.block_list)
    }
}

/// Order-independent key for a resource block list.
pub fn block_fingerprint(block_list: &[ResourceKind]) -> String {
    let mut kinds: Vec<&str> = block_list.iter().map(|k| k.as_str()).collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds.join(",")
}

fn default_extra_headers() -> Vec<(String, String)> {
    [
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("Cache-Control", "max-age=0"),
        ("Connection", "keep-alive"),
        ("DNT", "1"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// A browser process able to create isolated contexts.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Creates a new context, launching the browser first if needed.
    ///
    /// A launch failure is reported as `SearchError::BrowserLaunch`.
    async fn new_context(&self, options: &ContextOptions) -> Result<Arc<dyn BrowserContext>>;

    /// Returns true while the browser process is running.
    fn is_running(&self) -> bool;

    /// Terminates the browser process. Safe to call repeatedly.
    async fn shutdown(&self) -> Result<()>;
}

/// An isolated browsing profile (cookies, storage).
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;

    async fn cookies(&self) -> Result<Vec<Cookie>>;

    async fn add_cookies(&self, cookies: Vec<Cookie>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// A single tab inside a context.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigates and waits per `wait`. Returns the main document's HTTP
    /// status when the browser exposes it.
    async fn goto(&self, url: &str, wait: &WaitStrategy) -> Result<Option<u16>>;

    async fn title(&self) -> Result<String>;

    /// Rendered HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// URL of the current document after redirects.
    async fn url(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_strategy_default() {
        let strategy = WaitStrategy::default();
        assert!(matches!(strategy, WaitStrategy::Load));
    }

    #[test]
    fn test_wait_strategy_selector() {
        let strategy = WaitStrategy::Selector {
            css: "div.news-card".to_string(),
            timeout_ms: 5000,
        };
        match strategy {
            WaitStrategy::Selector { css, timeout_ms } => {
                assert_eq!(css, "div.news-card");
                assert_eq!(timeout_ms, 5000);
            }
            _ => panic!("Expected Selector"),
        }
    }

    #[test]
    fn test_viewport_default() {
        let v = Viewport::default();
        assert_eq!((v.width, v.height), (1920, 1080));
    }

    #[test]
    fn test_should_block_by_kind() {
        let list = default_block_list();
        assert!(should_block(Some(ResourceKind::Image), "https://a.com/x.png", &list));
        assert!(should_block(Some(ResourceKind::Font), "https://a.com/f.woff", &list));
        assert!(!should_block(Some(ResourceKind::Script), "https://a.com/app.js", &list));
        assert!(!should_block(None, "https://a.com/page", &list));
    }

    #[test]
    fn test_should_block_icons_always() {
        assert!(should_block(Some(ResourceKind::Other), "https://a.com/FAVICON.ico", &[]));
        assert!(should_block(None, "https://a.com/static/icon-32.png", &[]));
    }

    #[test]
    fn test_block_fingerprint_is_order_independent() {
        let a = block_fingerprint(&[ResourceKind::Media, ResourceKind::Image]);
        let b = block_fingerprint(&[ResourceKind::Image, ResourceKind::Media, ResourceKind::Image]);
        assert_eq!(a, b);
        assert_eq!(a, "image,media");
        assert_ne!(a, block_fingerprint(&default_block_list()));
    }

    #[test]
    fn test_context_options_defaults() {
        let opts = ContextOptions::new("UA/1.0");
        assert_eq!(opts.user_agent, "UA/1.0");
        assert_eq!(opts.locale, "zh-CN");
        assert_eq!(opts.timezone, "Asia/Shanghai");
        assert_eq!(opts.block_fingerprint(), "font,image,media");
        assert!(opts.init_script.contains("webdriver"));
        assert!(opts.extra_headers.iter().any(|(k, v)| k == "DNT" && v == "1"));
    }

    #[test]
    fn test_context_options_builder_chain() {
        let opts = ContextOptions::new("UA")
            .with_viewport(Viewport { width: 800, height: 600 })
            .with_locale("en-US", "UTC")
            .with_accept_language("en-US")
            .with_block_list(vec![]);
        assert_eq!(opts.viewport.width, 800);
        assert_eq!(opts.locale, "en-US");
        assert_eq!(opts.timezone, "UTC");
        assert_eq!(opts.accept_language, "en-US");
        assert_eq!(opts.block_fingerprint(), "");
    }

    #[test]
    fn test_resource_kind_serialization() {
        let json = serde_json::to_string(&ResourceKind::Stylesheet).unwrap();
        assert_eq!(json, "\"stylesheet\"");
    }
}
