//! Runtime settings.
//!
//! Every tunable has a default. Settings can be loaded from a JSON file and
//! then overridden by `SCOUT_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::antibot::DetectorConfig;
use crate::fetcher::Viewport;
use crate::{Result, SearchError};

/// Default desktop user agents rotated per page acquisition.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
];

/// Browser process and context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run Chrome without a window.
    pub headless: bool,
    /// Explicit Chrome/Chromium executable. Auto-detected when `None`.
    pub chrome_path: Option<String>,
    /// Proxy server passed to Chrome (`--proxy-server`).
    pub proxy: Option<String>,
    /// Extra Chrome launch arguments.
    pub launch_args: Vec<String>,
    /// Maximum pages open at once across the whole pool.
    pub max_concurrent_pages: usize,
    /// Contexts idle longer than this with no open pages are evicted.
    pub context_idle_timeout_secs: u64,
    /// Soft cap on pooled contexts; exceeding it only logs a warning.
    pub max_context_pool_size: usize,
    pub viewport: Viewport,
    pub locale: String,
    pub timezone: String,
    pub accept_language: String,
    /// Cookie jar location. `None` disables cookie persistence.
    pub cookie_file: Option<PathBuf>,
    pub user_agents: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            proxy: None,
            launch_args: Vec::new(),
            max_concurrent_pages: 2,
            context_idle_timeout_secs: 300,
            max_context_pool_size: 4,
            viewport: Viewport::default(),
            locale: "zh-CN".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            cookie_file: Some(PathBuf::from(".scout_cookies.json")),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BrowserSettings {
    pub fn context_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.context_idle_timeout_secs)
    }
}

/// Sliding-window rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Window length in seconds.
    pub window_secs: f64,
    pub max_per_domain: usize,
    pub max_per_engine: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: 1.0,
            max_per_domain: 2,
            max_per_engine: 2,
        }
    }
}

/// Longest accepted rate-limit window, in seconds.
pub const MAX_WINDOW_SECS: f64 = 3600.0;

impl RateLimitSettings {
    /// Window as a `Duration`, clamped to `(0, MAX_WINDOW_SECS]`. Values that
    /// `validate` rejects map to the default one second.
    pub fn window(&self) -> Duration {
        if self.window_secs.is_finite() && self.window_secs > 0.0 {
            Duration::from_secs_f64(self.window_secs.min(MAX_WINDOW_SECS))
        } else {
            Duration::from_secs(1)
        }
    }
}

/// Engine enablement, ordering and ban policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engine ids that may be selected.
    pub enabled: Vec<String>,
    /// Fallback order, fastest first.
    pub priority: Vec<String>,
    /// First ban duration in seconds; doubles on each repeat.
    pub ban_base_secs: u64,
    /// Upper bound on a single ban, in seconds.
    pub ban_max_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: ["baidu", "bing", "sogou", "google", "360"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            priority: ["baidu", "sogou", "google", "360", "bing"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ban_base_secs: 300,
            ban_max_secs: 1800,
        }
    }
}

/// Per-request search behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_num_results: usize,
    pub navigation_timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_num_results: 30,
            navigation_timeout_secs: 30,
        }
    }
}

impl SearchSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub browser: BrowserSettings,
    pub rate_limit: RateLimitSettings,
    pub engines: EngineSettings,
    pub search: SearchSettings,
    pub detector: DetectorConfig,
}

impl Settings {
    /// Loads settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    /// Loads from `path` when given, applies environment overrides, and validates.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let settings = settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `SCOUT_*` overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies `SCOUT_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SCOUT_HEADLESS") {
            self.browser.headless = !matches!(v.trim(), "0" | "false" | "no");
        }
        if let Some(v) = get("SCOUT_CHROME_PATH") {
            self.browser.chrome_path = Some(v);
        }
        if let Some(v) = get("SCOUT_PROXY") {
            self.browser.proxy = Some(v);
        }
        if let Some(n) = get("SCOUT_MAX_PAGES").and_then(|v| v.trim().parse().ok()) {
            self.browser.max_concurrent_pages = n;
        }
        if let Some(v) = get("SCOUT_COOKIE_FILE") {
            self.browser.cookie_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SCOUT_ENGINES") {
            self.engines.enabled = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(n) = get("SCOUT_NAV_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            self.search.navigation_timeout_secs = n;
        }
        self
    }

    /// Rejects settings that would deadlock or never make progress.
    pub fn validate(&self) -> Result<()> {
        if self.browser.max_concurrent_pages == 0 {
            return Err(SearchError::Config(
                "browser.max_concurrent_pages must be at least 1".into(),
            ));
        }
        let window = self.rate_limit.window_secs;
        if !window.is_finite() || window <= 0.0 || window > MAX_WINDOW_SECS {
            return Err(SearchError::Config(format!(
                "rate_limit.window_secs must be in (0, {}]",
                MAX_WINDOW_SECS
            )));
        }
        if self.rate_limit.max_per_domain == 0 || self.rate_limit.max_per_engine == 0 {
            return Err(SearchError::Config(
                "rate limits must allow at least one request per window".into(),
            ));
        }
        if self.engines.ban_base_secs == 0 || self.engines.ban_max_secs < self.engines.ban_base_secs {
            return Err(SearchError::Config(
                "engines.ban_max_secs must be >= ban_base_secs > 0".into(),
            ));
        }
        if self.search.navigation_timeout_secs == 0 {
            return Err(SearchError::Config(
                "search.navigation_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
