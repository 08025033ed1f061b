//! Error types for the scout library.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for scout operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Which anti-bot signal classified a page as blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Page title matched a verification keyword.
    TitleKeyword,
    /// DOM contained a CAPTCHA or verification widget.
    CaptchaElement,
    /// Body text contained a rate-limit or robot-suspicion phrase.
    ContentText,
    /// Body text contained an IP-ban phrase.
    IpBlocked,
}

impl BlockReason {
    /// Stable wire name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::TitleKeyword => "title_keyword",
            BlockReason::CaptchaElement => "captcha_element",
            BlockReason::ContentText => "content_text",
            BlockReason::IpBlocked => "ip_blocked",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an engine cannot be handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// Engine is switched off in configuration.
    Disabled,
    /// Engine is serving a ban.
    Banned,
    /// No engine is registered under the id.
    Unknown,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unavailable::Disabled => "disabled",
            Unavailable::Banned => "banned",
            Unavailable::Unknown => "unknown",
        })
    }
}

/// Errors that can occur while searching or fetching.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The shared browser process could not be started.
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    /// A browser operation (context, page, CDP command) failed.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation did not finish within the configured timeout.
    #[error("Navigation timed out after {0}s")]
    NavigationTimeout(u64),

    /// The loaded page was classified as an anti-bot block.
    #[error("Blocked by anti-bot defenses ({0})")]
    AntiBotBlocked(BlockReason),

    /// The requested engine cannot be used right now.
    #[error("Engine '{engine}' is unavailable ({reason})")]
    EngineUnavailable { engine: String, reason: Unavailable },

    /// Every candidate engine was tried without results.
    #[error("All engines exhausted without results")]
    AllEnginesExhausted,

    /// The engine parsed the page but found no results.
    #[error("Engine '{0}' returned no results")]
    ParseEmpty(String),

    /// Failed to parse a page or selector.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Reading or writing persisted state failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Returns true for process-level failures that must reach the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::BrowserLaunch(_))
    }
}
