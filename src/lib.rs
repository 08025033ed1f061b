//! # a3s-scout
//!
//! A resilient multi-engine search orchestrator over one shared headless
//! browser.
//!
//! A single Chrome process is shared by every caller. Pages are handed out
//! from a bounded pool of reusable browser contexts, every request is rate
//! limited per domain and per engine, and each loaded page is screened for
//! anti-bot blocks before it is parsed. Engines caught by anti-bot defenses
//! are banned with exponential back-off while the search falls back to the
//! next engine in priority order.
//!
//! - Multi-engine search with adaptive bans (Baidu, Bing, Sogou, Google, 360)
//! - Readability-style article extraction with quality scoring
//! - Baidu trending board
//! - Cookie persistence across browser contexts, seeded by a manual
//!   verification pass in a headed browser
//!
//! ## Example
//!
//! ```rust,no_run
//! use a3s_scout::{Scout, SearchQuery, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scout = Scout::new(Settings::load(None)?)?;
//!
//!     let response = scout.search(&SearchQuery::new("rust programming")).await?;
//!     for result in &response.results {
//!         println!("{}: {}", result.title, result.url);
//!     }
//!
//!     scout.shutdown().await;
//!     Ok(())
//! }
//! ```

mod antibot;
mod article;
mod config;
mod cookies;
mod engine;
mod error;
mod extractor;
mod fetcher;
mod hot;
mod pool;
mod quality;
mod query;
mod rate_limiter;
mod registry;
mod result;
mod search;
mod service;
mod verify;

#[cfg(feature = "headless")]
mod browser;
#[cfg(feature = "headless")]
pub mod browser_setup;

#[cfg(test)]
mod testing;

pub mod engines;

pub use antibot::{AntiBotDetector, Check, DetectorConfig, PageSnapshot, PageStatus, StatusLevel};
pub use article::{ArticleFetcher, ArticleRecord, ArticleResponse};
pub use config::{
    BrowserSettings, EngineSettings, RateLimitSettings, SearchSettings, Settings,
    DEFAULT_USER_AGENTS,
};
pub use cookies::{Cookie, CookieJar};
pub use engine::{extract_domain, fill_template, normalize_url, Engine, EngineConfig};
pub use error::{BlockReason, Result, SearchError, Unavailable};
pub use extractor::{
    clean_content, ArticleImage, ContentExtractor, ExtractedArticle, ExtractionMethod,
};
pub use fetcher::{
    default_block_list, should_block, BrowserBackend, BrowserContext, BrowserPage,
    ContextOptions, ResourceKind, Viewport, WaitStrategy,
};
pub use pool::{BrowserSessionPool, PageLease, PageRequest, PoolStats};
pub use hot::{HotBoard, HotBoardFetcher, HotItem};
pub use quality::{QualityLevel, QualityReport, QualityScorer};
pub use query::{EngineSelector, SearchQuery};
pub use rate_limiter::RateLimiter;
pub use registry::{BanRecord, EngineConstructor, EngineRegistry, EngineStatus};
pub use result::{AttemptOutcome, EngineAttempt, SearchResponse, SearchResult, SearchType};
pub use search::SearchOrchestrator;
pub use service::Scout;
pub use verify::{ManualVerifier, Verification, DEFAULT_VERIFY_URL};

#[cfg(feature = "headless")]
pub use browser::ChromeBackend;
