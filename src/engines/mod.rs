//! Built-in search engine implementations.
//!
//! Each engine parses the rendered results page with `scraper`. Navigation and
//! anti-bot screening happen in the orchestrator before `search` is called.
//! [`selector`] and [`element_text`] are public for engines registered from
//! outside the crate.

mod baidu;
mod bing;
mod google;
mod so360;
mod sogou;

pub use baidu::{parse_hot_board, Baidu, HOT_BOARD_URL};
pub use bing::Bing;
pub use google::Google;
pub use so360::So360;
pub use sogou::Sogou;

use scraper::{ElementRef, Selector};

use crate::{Result, SearchError};

/// Compiles a CSS selector, mapping failures to `SearchError::Parse`.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

/// Visible text of an element with whitespace runs collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `sel`, or an empty string.
pub(crate) fn first_text(element: ElementRef<'_>, sel: &Selector) -> String {
    element
        .select(sel)
        .next()
        .map(element_text)
        .unwrap_or_default()
}
