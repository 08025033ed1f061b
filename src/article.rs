//! Single-article fetch: load, screen, extract, score.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::antibot::{AntiBotDetector, Check, PageSnapshot, PageStatus, StatusLevel};
use crate::engine::extract_domain;
use crate::extractor::{clean_content, ArticleImage, ContentExtractor, ExtractionMethod};
use crate::fetcher::{BrowserPage, WaitStrategy};
use crate::pool::{BrowserSessionPool, PageRequest};
use crate::quality::{QualityReport, QualityScorer};
use crate::rate_limiter::RateLimiter;
use crate::{Result, SearchError};

/// Best-effort article with a diagnosis of the page it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub url: String,
    pub title: String,
    pub content: String,
    pub content_length: usize,
    pub images: Vec<ArticleImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    pub status: PageStatus,
}

impl ArticleResponse {
    fn empty(url: &str, status: PageStatus) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            content: String::new(),
            content_length: 0,
            images: Vec::new(),
            method: None,
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.status != StatusLevel::Error
    }

    /// The `{title, url, content, images}` shape stored by article archives.
    pub fn to_record(&self) -> ArticleRecord {
        ArticleRecord {
            title: self.title.clone(),
            url: self.url.clone(),
            content: self.content.clone(),
            images: self.images.iter().map(|i| i.url.clone()).collect(),
        }
    }
}

/// Article as persisted, keyed by `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    pub content: String,
    pub images: Vec<String>,
}

/// Fetches arbitrary article pages through the shared session pool.
///
/// Never fails for page-level problems; those are reported in
/// [`ArticleResponse::status`]. Only a browser that cannot start is an `Err`.
pub struct ArticleFetcher {
    pool: Arc<BrowserSessionPool>,
    limiter: Arc<RateLimiter>,
    detector: Arc<AntiBotDetector>,
    scorer: QualityScorer,
    navigation_timeout: Duration,
    wait: WaitStrategy,
}

impl ArticleFetcher {
    pub fn new(
        pool: Arc<BrowserSessionPool>,
        limiter: Arc<RateLimiter>,
        detector: Arc<AntiBotDetector>,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            limiter,
            detector,
            scorer: QualityScorer::new(),
            navigation_timeout,
            wait: WaitStrategy::Load,
        }
    }

    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    pub async fn fetch(&self, url: &str, include_images: bool) -> Result<ArticleResponse> {
        if let Err(e) = Url::parse(url) {
            return Ok(ArticleResponse::empty(
                url,
                PageStatus::error(
                    format!("invalid url: {}", e),
                    vec![Check::fail("url", e.to_string())],
                ),
            ));
        }

        self.limiter.acquire(Some(&extract_domain(url)), None).await;

        let lease = match self.pool.acquire_page(PageRequest::new()).await {
            Ok(lease) => lease,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("No page for {}: {}", url, e);
                return Ok(ArticleResponse::empty(
                    url,
                    PageStatus::error(e.to_string(), vec![Check::fail("page", e.to_string())]),
                ));
            }
        };

        let response = self.load(lease.page(), url, include_images).await;
        lease.release().await;
        info!(
            "Fetched {} ({} chars, status {:?})",
            url, response.content_length, response.status.status
        );
        Ok(response)
    }

    async fn load(&self, page: &dyn BrowserPage, url: &str, include_images: bool) -> ArticleResponse {
        let status = match timeout(self.navigation_timeout, page.goto(url, &self.wait)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return navigation_failed(url, e),
            Err(_) => {
                return navigation_failed(
                    url,
                    SearchError::NavigationTimeout(self.navigation_timeout.as_secs()),
                )
            }
        };

        let page_title = page.title().await.unwrap_or_else(|e| {
            debug!("Title unavailable for {}: {}", url, e);
            String::new()
        });
        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => return navigation_failed(url, e),
        };
        let final_url = page
            .url()
            .await
            .ok()
            .filter(|u| Url::parse(u).is_ok())
            .unwrap_or_else(|| url.to_string());

        let verdict = self
            .detector
            .detect(&PageSnapshot::new(status, page_title.clone(), html.as_str()));
        if !verdict.is_ok() {
            warn!("Article page {} rejected: {}", url, verdict.reason);
            return ArticleResponse::empty(url, verdict);
        }

        let extracted = ContentExtractor::new()
            .with_images(include_images)
            .extract(&html, &final_url);
        let content = clean_content(&extracted.content);
        let title = if extracted.title.is_empty() {
            page_title
        } else {
            extracted.title
        };

        let mut response = ArticleResponse {
            url: url.to_string(),
            content_length: content.chars().count(),
            title,
            content,
            images: extracted.images,
            method: Some(extracted.method),
            status: verdict,
        };

        let quality = self.scorer.score(&response.title, &response.content);
        compose_status(&mut response.status, response.content_length, quality);
        response
    }
}

fn navigation_failed(url: &str, e: SearchError) -> ArticleResponse {
    warn!("Navigation to {} failed: {}", url, e);
    let mut status = PageStatus::error(
        format!("navigation failed: {}", e),
        vec![Check::fail("navigation", e.to_string())],
    );
    status.suggestions = vec![
        "Check that the URL is reachable from this network".to_string(),
        "Retry later or raise the navigation timeout".to_string(),
    ];
    ArticleResponse::empty(url, status)
}

/// Folds the quality verdict into the detector's status.
///
/// No content is an error; a warning or poor score downgrades to warning.
fn compose_status(status: &mut PageStatus, content_length: usize, quality: QualityReport) {
    status.checks.extend(quality.checks.iter().cloned());

    if content_length == 0 {
        status.status = StatusLevel::Error;
        status.reason = "no content extracted".to_string();
        status
            .suggestions
            .push("The page may render its content with JavaScript; try a longer wait".to_string());
    } else if quality.level.is_degraded() {
        status.status = StatusLevel::Warning;
        status.reason = format!("low content quality ({})", quality.level.as_str());
        status.suggestions.extend(quality_suggestions(&quality));
    }
    status.quality = Some(quality);
}

fn quality_suggestions(quality: &QualityReport) -> Vec<String> {
    quality
        .checks
        .iter()
        .filter(|c| !c.passed)
        .filter_map(|c| match c.name.as_str() {
            "content_length" => Some("Content is short; the page may be a summary or paywalled"),
            "error_page" => Some("The page looks like an error page; verify the URL"),
            "ad_density" => Some("Content is dominated by advertising"),
            "title" => Some("No usable title was found"),
            _ => None,
        })
        .map(str::to_string)
        .collect()
}
