//! Baidu trending board (百度热搜).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::antibot::{AntiBotDetector, PageSnapshot};
use crate::engine::extract_domain;
use crate::engines::{parse_hot_board, HOT_BOARD_URL};
use crate::fetcher::{BrowserPage, WaitStrategy};
use crate::pool::{BrowserSessionPool, PageRequest};
use crate::rate_limiter::RateLimiter;
use crate::{BlockReason, Result, SearchError};

/// One trending topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotItem {
    /// 1-based position on the board.
    pub rank: usize,
    pub title: String,
    /// Heat index as displayed, e.g. `"4950123"`.
    pub hot_score: String,
    pub url: String,
}

/// The board, or the reason it could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotBoard {
    pub total: usize,
    pub items: Vec<HotItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<BlockReason>,
}

impl HotBoard {
    fn found(items: Vec<HotItem>) -> Self {
        Self {
            total: items.len(),
            items,
            error: None,
            block_reason: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            total: 0,
            items: Vec::new(),
            error: Some(error.into()),
            block_reason: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Loads the trending board through the shared pool.
///
/// Charged to the `baidu` engine key in the rate limiter. A blocked board is
/// reported but does not ban the search engine, which lives on another host.
pub struct HotBoardFetcher {
    pool: Arc<BrowserSessionPool>,
    limiter: Arc<RateLimiter>,
    detector: Arc<AntiBotDetector>,
    navigation_timeout: Duration,
}

impl HotBoardFetcher {
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
            navigation_timeout,
        }
    }

    pub async fn fetch(&self) -> Result<HotBoard> {
        self.limiter
            .acquire(Some(&extract_domain(HOT_BOARD_URL)), Some("baidu"))
            .await;

        let lease = match self.pool.acquire_page(PageRequest::new()).await {
            Ok(lease) => lease,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(HotBoard::failed(e.to_string())),
        };
        let board = self.load(lease.page()).await;
        lease.release().await;

        match &board.error {
            None => info!("Hot board: {} items", board.total),
            Some(e) => warn!("Hot board unavailable: {}", e),
        }
        Ok(board)
    }

    async fn load(&self, page: &dyn BrowserPage) -> HotBoard {
        let goto = page.goto(HOT_BOARD_URL, &WaitStrategy::Load);
        let status = match timeout(self.navigation_timeout, goto).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return HotBoard::failed(e.to_string()),
            Err(_) => {
                return HotBoard::failed(
                    SearchError::NavigationTimeout(self.navigation_timeout.as_secs()).to_string(),
                )
            }
        };
        let title = page.title().await.unwrap_or_default();
        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => return HotBoard::failed(e.to_string()),
        };

        let verdict = self.detector.detect(&PageSnapshot::new(status, title, html.as_str()));
        if !verdict.is_ok() {
            let mut board = HotBoard::failed(verdict.reason.clone());
            board.block_reason = verdict.block_reason();
            return board;
        }

        match parse_hot_board(&html) {
            Ok(items) if items.is_empty() => {
                HotBoard::failed(SearchError::ParseEmpty("baidu hot board".to_string()).to_string())
            }
            Ok(items) => HotBoard::found(items),
            Err(e) => HotBoard::failed(e.to_string()),
        }
    }
}
