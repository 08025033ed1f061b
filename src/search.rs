//! Search orchestration with multi-engine fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::antibot::{AntiBotDetector, PageSnapshot};
use crate::config::SearchSettings;
use crate::engine::extract_domain;
use crate::fetcher::BrowserPage;
use crate::pool::{BrowserSessionPool, PageRequest};
use crate::rate_limiter::RateLimiter;
use crate::registry::EngineRegistry;
use crate::result::{AttemptOutcome, EngineAttempt};
use crate::{
    Engine, EngineSelector, Result, SearchError, SearchQuery, SearchResponse, SearchResult,
    SearchType,
};

/// How one candidate engine fared.
enum Outcome {
    Found(Vec<SearchResult>),
    Miss(EngineAttempt),
}

/// Runs a search against the best available engine, falling back through
/// the rest in priority order.
///
/// Per-engine failures never escape: blocked engines are banned and skipped,
/// empty or failed attempts are skipped, and exhaustion is reported as a
/// failure payload. Only a browser that cannot start is returned as `Err`.
pub struct SearchOrchestrator {
    pool: Arc<BrowserSessionPool>,
    limiter: Arc<RateLimiter>,
    registry: Arc<EngineRegistry>,
    detector: Arc<AntiBotDetector>,
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(
        pool: Arc<BrowserSessionPool>,
        limiter: Arc<RateLimiter>,
        registry: Arc<EngineRegistry>,
        detector: Arc<AntiBotDetector>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            pool,
            limiter,
            registry,
            detector,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    fn navigation_timeout(&self) -> Duration {
        self.settings.navigation_timeout()
    }

    fn num_results(&self, query: &SearchQuery) -> usize {
        query.num_results.unwrap_or(self.settings.default_num_results)
    }

    /// Preferred (or random) engine first, then the priority order, deduplicated.
    fn candidates(&self, selector: &EngineSelector) -> Vec<Arc<dyn Engine>> {
        let first = match selector {
            EngineSelector::Auto => self.registry.random_engine(),
            EngineSelector::Named(id) => {
                let engine = self.registry.get_engine(id);
                if engine.is_none() {
                    debug!("Preferred engine '{}' unavailable, using priority order", id);
                }
                engine
            }
        };

        let mut candidates: Vec<Arc<dyn Engine>> = first.into_iter().collect();
        for engine in self.registry.engines_by_priority() {
            if !candidates.iter().any(|c| c.id() == engine.id()) {
                candidates.push(engine);
            }
        }
        candidates
    }

    fn respond(&self, response: SearchResponse) -> SearchResponse {
        response.with_engine_counts(self.registry.available_count(), self.registry.banned_count())
    }

    /// Searches with fallback across all eligible engines.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        if let Err(e) = query.validate() {
            return Ok(self.respond(SearchResponse::failure(
                &query.query,
                query.search_type,
                e.to_string(),
            )));
        }

        let num_results = self.num_results(query);
        let candidates = self.candidates(&query.engine);
        debug!(
            "Searching '{}' ({}) across {} candidate engines",
            query.query,
            query.search_type,
            candidates.len()
        );

        let mut attempts = Vec::with_capacity(candidates.len());
        for engine in candidates {
            match self
                .attempt(engine.as_ref(), &query.query, num_results, query.search_type)
                .await?
            {
                Outcome::Found(results) => {
                    attempts.push(EngineAttempt::new(engine.id(), AttemptOutcome::Ok));
                    info!(
                        "Engine '{}' returned {} results for '{}'",
                        engine.id(),
                        results.len(),
                        query.query
                    );
                    let response = SearchResponse::success(
                        &query.query,
                        query.search_type,
                        engine.id(),
                        engine.name(),
                        results,
                    )
                    .with_attempts(attempts);
                    return Ok(self.respond(response));
                }
                Outcome::Miss(attempt) => attempts.push(attempt),
            }
        }

        warn!(
            "All engines exhausted for '{}' after {} attempts",
            query.query,
            attempts.len()
        );
        let response = SearchResponse::failure(
            &query.query,
            query.search_type,
            SearchError::AllEnginesExhausted.to_string(),
        )
        .with_attempts(attempts);
        Ok(self.respond(response))
    }

    /// Searches one engine only, without fallback.
    ///
    /// The query's engine selector is ignored in favour of `id`.
    pub async fn search_engine(&self, id: &str, query: &SearchQuery) -> Result<SearchResponse> {
        let failure = |error: String| SearchResponse::failure(&query.query, query.search_type, error);

        if let Err(e) = query.validate() {
            return Ok(self.respond(failure(e.to_string())));
        }
        let engine = match self.registry.try_engine(id) {
            Ok(engine) => engine,
            Err(e) => return Ok(self.respond(failure(e.to_string()))),
        };

        let num_results = self.num_results(query);
        let response = match self
            .attempt(engine.as_ref(), &query.query, num_results, query.search_type)
            .await?
        {
            Outcome::Found(results) => SearchResponse::success(
                &query.query,
                query.search_type,
                engine.id(),
                engine.name(),
                results,
            )
            .with_attempts(vec![EngineAttempt::new(engine.id(), AttemptOutcome::Ok)]),
            Outcome::Miss(attempt) => {
                let error = attempt
                    .detail
                    .clone()
                    .unwrap_or_else(|| SearchError::ParseEmpty(engine.id().to_string()).to_string());
                failure(error).with_attempts(vec![attempt])
            }
        };
        Ok(self.respond(response))
    }

    /// One rate-limit charge, at most one page, one verdict.
    async fn attempt(
        &self,
        engine: &dyn Engine,
        query: &str,
        num_results: usize,
        search_type: SearchType,
    ) -> Result<Outcome> {
        let id = engine.id();
        let url = engine.search_url(query, num_results, search_type);

        let waited = self
            .limiter
            .acquire(Some(&extract_domain(&url)), Some(id))
            .await;
        if !waited.is_zero() {
            debug!("Rate limited '{}' for {}ms", id, waited.as_millis());
        }

        let lease = match self.pool.acquire_page(PageRequest::for_engine(engine)).await {
            Ok(lease) => lease,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Engine '{}' could not get a page: {}", id, e);
                return Ok(Outcome::Miss(
                    EngineAttempt::new(id, AttemptOutcome::Failed).with_detail(e.to_string()),
                ));
            }
        };

        let outcome = self
            .run(engine, lease.page(), &url, query, num_results, search_type)
            .await;
        lease.release().await;
        Ok(outcome)
    }

    async fn run(
        &self,
        engine: &dyn Engine,
        page: &dyn BrowserPage,
        url: &str,
        query: &str,
        num_results: usize,
        search_type: SearchType,
    ) -> Outcome {
        let id = engine.id();
        let miss = |outcome, detail: String| {
            Outcome::Miss(EngineAttempt::new(id, outcome).with_detail(detail))
        };

        let wait = engine.wait_strategy(search_type);
        let nav_timeout = self.navigation_timeout();
        let status = match timeout(nav_timeout, page.goto(url, &wait)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!("Engine '{}' navigation failed: {}", id, e);
                return miss(AttemptOutcome::Failed, e.to_string());
            }
            Err(_) => {
                let e = SearchError::NavigationTimeout(nav_timeout.as_secs());
                warn!("Engine '{}' {}", id, e);
                return miss(AttemptOutcome::Timeout, e.to_string());
            }
        };

        let title = page.title().await.unwrap_or_else(|e| {
            debug!("Engine '{}' title unavailable: {}", id, e);
            String::new()
        });
        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => return miss(AttemptOutcome::Failed, e.to_string()),
        };

        let verdict = self.detector.detect(&PageSnapshot::new(status, title, html));
        if let Some(reason) = verdict.block_reason() {
            self.registry.ban_engine(id, reason);
            return Outcome::Miss(EngineAttempt::blocked(id, reason).with_detail(verdict.reason));
        }
        if !verdict.is_ok() {
            warn!("Engine '{}' page rejected: {}", id, verdict.reason);
            return miss(AttemptOutcome::HttpError, verdict.reason);
        }

        match engine.search(page, query, num_results, search_type).await {
            Ok(results) if results.is_empty() => {
                debug!("Engine '{}' returned no results", id);
                miss(
                    AttemptOutcome::Empty,
                    SearchError::ParseEmpty(id.to_string()).to_string(),
                )
            }
            Ok(mut results) => {
                results.truncate(num_results);
                Outcome::Found(results)
            }
            Err(e) => {
                warn!("Engine '{}' failed to parse results: {}", id, e);
                miss(AttemptOutcome::Failed, e.to_string())
            }
        }
    }
}
