//! The per-process service object.
//!
//! `Scout` owns the browser pool, rate limiter, engine registry and detector.
//! Create one per process, share it by reference, and call
//! [`Scout::shutdown`] before exit.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::antibot::AntiBotDetector;
use crate::article::{ArticleFetcher, ArticleResponse};
use crate::config::Settings;
use crate::fetcher::BrowserBackend;
use crate::hot::{HotBoard, HotBoardFetcher};
use crate::pool::{BrowserSessionPool, PoolStats};
use crate::rate_limiter::RateLimiter;
use crate::registry::{EngineRegistry, EngineStatus};
use crate::search::SearchOrchestrator;
use crate::verify::{ManualVerifier, Verification};
use crate::{Result, SearchQuery, SearchResponse};

/// Search and article fetching over one shared browser.
pub struct Scout {
    settings: Settings,
    pool: Arc<BrowserSessionPool>,
    registry: Arc<EngineRegistry>,
    orchestrator: SearchOrchestrator,
    articles: ArticleFetcher,
    hot: HotBoardFetcher,
    verifier: ManualVerifier,
}

impl Scout {
    /// Creates a service backed by a local Chrome, launched on first use.
    #[cfg(feature = "headless")]
    pub fn new(settings: Settings) -> Result<Self> {
        let backend = Arc::new(crate::browser::ChromeBackend::new(settings.browser.clone()));
        let registry = EngineRegistry::new(&settings.engines);
        Self::with_parts(settings, backend, registry)
    }

    /// Creates a service over any browser backend with the built-in engines.
    pub fn with_backend(settings: Settings, backend: Arc<dyn BrowserBackend>) -> Result<Self> {
        let registry = EngineRegistry::new(&settings.engines);
        Self::with_parts(settings, backend, registry)
    }

    /// Creates a service with a caller-assembled engine registry.
    ///
    /// Fails with `SearchError::Config` when the settings do not validate.
    pub fn with_parts(
        settings: Settings,
        backend: Arc<dyn BrowserBackend>,
        registry: EngineRegistry,
    ) -> Result<Self> {
        settings.validate()?;
        let pool = Arc::new(BrowserSessionPool::new(backend, &settings.browser));
        let limiter = Arc::new(RateLimiter::from_settings(&settings.rate_limit));
        let detector = Arc::new(AntiBotDetector::new(settings.detector.clone()));
        let registry = Arc::new(registry);

        let orchestrator = SearchOrchestrator::new(
            Arc::clone(&pool),
            Arc::clone(&limiter),
            Arc::clone(&registry),
            Arc::clone(&detector),
            settings.search.clone(),
        );
        let articles = ArticleFetcher::new(
            Arc::clone(&pool),
            Arc::clone(&limiter),
            Arc::clone(&detector),
            settings.search.navigation_timeout(),
        );
        let hot = HotBoardFetcher::new(
            Arc::clone(&pool),
            limiter,
            Arc::clone(&detector),
            settings.search.navigation_timeout(),
        );
        let verifier = ManualVerifier::new(
            Arc::clone(&pool),
            detector,
            settings.search.navigation_timeout(),
        );

        Ok(Self {
            settings,
            pool,
            registry,
            orchestrator,
            articles,
            hot,
            verifier,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Searches with engine fallback. See [`SearchOrchestrator::search`].
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.orchestrator.search(query).await
    }

    /// Searches a single engine without fallback.
    pub async fn search_engine(&self, engine: &str, query: &SearchQuery) -> Result<SearchResponse> {
        self.orchestrator.search_engine(engine, query).await
    }

    /// Fetches and extracts one article page.
    pub async fn fetch_article(&self, url: &str, include_images: bool) -> Result<ArticleResponse> {
        self.articles.fetch(url, include_images).await
    }

    /// Baidu's realtime trending topics.
    pub async fn baidu_hot(&self) -> Result<HotBoard> {
        self.hot.fetch().await
    }

    /// Waits for a human to clear the verification wall at `url`, then saves
    /// the session cookies. Use with `browser.headless = false`.
    pub async fn verify(&self, url: &str, max_wait: Duration) -> Result<Verification> {
        self.verifier.verify(url, max_wait).await
    }

    /// Status of every registered engine.
    pub fn engines(&self) -> Vec<EngineStatus> {
        self.registry.snapshot()
    }

    pub async fn pool_stats(&self) -> PoolStats {
        self.pool.stats().await
    }

    /// Closes all contexts and the browser. Later calls fail or return
    /// failure payloads.
    pub async fn shutdown(&self) -> PoolStats {
        let stats = self.pool.close().await;
        info!("Scout shut down");
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{FakeBackend, FakeResponse, ScriptedEngine};
    use crate::Engine;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.browser.cookie_file = None;
        settings
    }

    fn scout(backend: &FakeBackend) -> Scout {
        let mut registry = EngineRegistry::empty(&settings().engines);
        registry.register("alpha", || Arc::new(ScriptedEngine::new("alpha")) as Arc<dyn Engine>);
        registry.register("beta", || Arc::new(ScriptedEngine::new("beta")) as Arc<dyn Engine>);
        let registry = registry.with_priority(["alpha", "beta"]);
        Scout::with_parts(settings(), Arc::new(backend.clone()), registry).unwrap()
    }

    #[test]
    fn test_builtin_engines_listed() {
        let scout = Scout::with_backend(settings(), Arc::new(FakeBackend::new())).unwrap();
        let ids: Vec<String> = scout.engines().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["baidu", "sogou", "google", "360", "bing"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_and_ban_visible_in_engines() {
        let backend = FakeBackend::new();
        backend.serve(
            &ScriptedEngine::host("alpha"),
            FakeResponse::ok("安全验证", "<html><body></body></html>"),
        );
        backend.serve(
            &ScriptedEngine::host("beta"),
            FakeResponse::ok("ok", &ScriptedEngine::results_html(2)),
        );
        let scout = scout(&backend);

        let response = scout
            .search(&SearchQuery::new("rust").with_engine("alpha"))
            .await
            .unwrap();
        assert_eq!(response.engine.as_deref(), Some("beta"));

        let alpha = scout
            .engines()
            .into_iter()
            .find(|e| e.id == "alpha")
            .unwrap();
        assert!(alpha.banned);
        assert_eq!(alpha.ban_count, 1);
        assert!(alpha.remaining_secs > 0 && alpha.remaining_secs <= 300);
    }

    #[tokio::test]
    async fn test_fetch_article_through_service() {
        let backend = FakeBackend::new();
        backend.serve(
            "blog.example.com",
            FakeResponse::ok(
                "A post",
                "<html><body><article><h1>A long enough post title</h1>\
                 <p>The first paragraph of the post has plenty of words in it.</p>\
                 <p>The second paragraph continues the story with more detail.</p>\
                 </article></body></html>",
            ),
        );
        let scout = scout(&backend);
        let article = scout
            .fetch_article("https://blog.example.com/post", true)
            .await
            .unwrap();
        assert_eq!(article.title, "A long enough post title");
        assert!(article.content.contains("second paragraph"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut bad = settings();
        bad.rate_limit.window_secs = f64::INFINITY;
        let result = Scout::with_backend(bad, Arc::new(FakeBackend::new()));
        assert!(matches!(result, Err(crate::SearchError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_then_searches_carry_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new();
        backend.serve(
            "www.baidu.com",
            FakeResponse::ok("百度安全验证", "<html></html>")
                .with_title_after(Duration::from_secs(3), "百度一下"),
        );
        backend.serve(
            &ScriptedEngine::host("alpha"),
            FakeResponse::ok("ok", &ScriptedEngine::results_html(1)),
        );
        backend
            .state()
            .cookie_store
            .lock()
            .unwrap()
            .push(crate::Cookie::new("BAIDUID", "v", ".baidu.com"));

        let mut settings = settings();
        settings.browser.cookie_file = Some(dir.path().join("jar.json"));
        settings.browser.context_idle_timeout_secs = 1;
        let mut registry = EngineRegistry::empty(&settings.engines);
        registry.register("alpha", || Arc::new(ScriptedEngine::new("alpha")) as Arc<dyn Engine>);
        let scout = Scout::with_parts(settings, Arc::new(backend.clone()), registry).unwrap();

        let outcome = scout
            .verify("https://www.baidu.com", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(outcome.cleared);
        assert_eq!(outcome.cookies_saved, 1);

        // The verified context goes idle and is evicted; its replacement
        // starts from the saved jar.
        tokio::time::advance(Duration::from_secs(2)).await;
        scout
            .search(&SearchQuery::new("rust").with_engine("alpha"))
            .await
            .unwrap();
        let loads = backend.state().cookie_loads.lock().unwrap().clone();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0][0].name, "BAIDUID");
        assert_eq!(backend.state().contexts_created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_baidu_hot_through_service() {
        let backend = FakeBackend::new();
        backend.serve(
            "top.baidu.com",
            FakeResponse::ok(
                "百度热搜",
                "<html><body><div class='category-wrap_x'>\
                 <div class='c-single-text-ellipsis'>热点</div></div></body></html>",
            ),
        );
        let board = scout(&backend).baidu_hot().await.unwrap();
        assert_eq!(board.total, 1);
        assert_eq!(board.items[0].title, "热点");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_pool() {
        let backend = FakeBackend::new();
        backend.serve(
            &ScriptedEngine::host("alpha"),
            FakeResponse::ok("ok", &ScriptedEngine::results_html(1)),
        );
        let scout = scout(&backend);
        scout
            .search(&SearchQuery::new("rust").with_engine("alpha"))
            .await
            .unwrap();
        assert_eq!(scout.pool_stats().await.total_requests, 1);

        let stats = scout.shutdown().await;
        assert_eq!(stats.context_create_count, 1);
        assert!(!stats.browser_alive);
        assert_eq!(backend.state().shutdowns.load(Ordering::SeqCst), 1);
    }
}
