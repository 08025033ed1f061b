//! Manual verification: open a page in the shared browser, wait for a human
//! to clear the anti-bot check, then persist the cookies that prove it.
//!
//! Meant for a headed browser. Saved cookies are loaded into every context
//! the pool creates afterwards.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::antibot::{AntiBotDetector, PageSnapshot};
use crate::fetcher::{BrowserPage, WaitStrategy};
use crate::pool::{BrowserSessionPool, PageLease, PageRequest};
use crate::{Result, SearchError};

/// Page opened when no URL is given.
pub const DEFAULT_VERIFY_URL: &str = "https://www.baidu.com";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What a verification session ended with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub url: String,
    /// The page stopped looking like a verification wall.
    pub cleared: bool,
    /// Last title seen.
    pub title: String,
    pub waited_secs: u64,
    /// Cookies written to the jar; zero when not cleared or no jar is set.
    pub cookies_saved: usize,
}

/// Polls a page until the detector stops flagging it, then saves cookies.
pub struct ManualVerifier {
    pool: Arc<BrowserSessionPool>,
    detector: Arc<AntiBotDetector>,
    navigation_timeout: Duration,
    poll_interval: Duration,
}

impl ManualVerifier {
    pub fn new(
        pool: Arc<BrowserSessionPool>,
        detector: Arc<AntiBotDetector>,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            detector,
            navigation_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(100));
        self
    }

    /// Opens `url` and waits up to `max_wait` for the check to clear.
    ///
    /// Cookies are saved only when it clears. Navigation failures and
    /// browser errors are returned as `Err`.
    pub async fn verify(&self, url: &str, max_wait: Duration) -> Result<Verification> {
        let lease = self.pool.acquire_page(PageRequest::new()).await?;
        let outcome = self.run(&lease, url, max_wait).await;
        lease.release().await;
        outcome
    }

    async fn run(&self, lease: &PageLease, url: &str, max_wait: Duration) -> Result<Verification> {
        let page = lease.page();
        match timeout(self.navigation_timeout, page.goto(url, &WaitStrategy::Load)).await {
            Ok(result) => result?,
            Err(_) => return Err(SearchError::NavigationTimeout(self.navigation_timeout.as_secs())),
        };
        info!("Waiting up to {:?} for verification on {}", max_wait, url);

        let start = Instant::now();
        loop {
            let title = page.title().await.unwrap_or_default();
            let waited = start.elapsed();

            if self.cleared(page, &title).await {
                info!("Verification cleared after {:?}: '{}'", waited, title);
                let cookies_saved = self.pool.save_cookies(lease).await?;
                return Ok(Verification {
                    url: url.to_string(),
                    cleared: true,
                    title,
                    waited_secs: waited.as_secs(),
                    cookies_saved,
                });
            }

            if waited >= max_wait {
                warn!("Verification not cleared within {:?}, last title '{}'", max_wait, title);
                return Ok(Verification {
                    url: url.to_string(),
                    cleared: false,
                    title,
                    waited_secs: waited.as_secs(),
                    cookies_saved: 0,
                });
            }

            debug!("Still on verification page after {:?}: '{}'", waited, title);
            tokio::time::sleep(self.poll_interval.min(max_wait - waited)).await;
        }
    }

    async fn cleared(&self, page: &dyn BrowserPage, title: &str) -> bool {
        let html = page.content().await.unwrap_or_default();
        let verdict = self.detector.detect(&PageSnapshot::new(None, title, html));
        !verdict.anti_bot_detected
    }
}
