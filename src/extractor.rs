//! Readability-style article extraction.
//!
//! Finds the node most likely to hold the article body without any
//! site-specific rules:
//!
//! 1. Mark boilerplate (scripts, navigation, headers, footers, ad-like and
//!    social blocks) as excluded. The parsed document is never mutated; every
//!    text measurement skips excluded nodes.
//! 2. Collect candidates from a ranked list of container selectors, falling
//!    back to top-level body children with enough text.
//! 3. Score each candidate by text length, paragraph, heading, image and list
//!    counts, class/id keywords and link density.
//! 4. Pull paragraphs out of the winner, falling back to a text-node walk and
//!    then to a body-wide paragraph scan.

use std::collections::HashSet;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Shortest text counted as a paragraph.
const MIN_TEXT_LENGTH: usize = 20;
/// Paragraphs at or above this length are skipped.
const MAX_BLOCK_LENGTH: usize = 500;
/// Fewer blocks than this triggers the next fallback tier.
const MIN_PARAGRAPHS: usize = 2;
const MAX_BLOCKS: usize = 30;
const MAX_LINK_DENSITY: f64 = 0.3;
const MIN_CANDIDATE_TEXT: usize = 100;
const MIN_FALLBACK_CHILD_TEXT: usize = 200;
const KEYWORD_WEIGHT: f64 = 25.0;

const REMOVE_SELECTORS: &str =
    "script, style, nav, header, footer, aside, iframe, noscript, meta, link, \
     .related, .recommend, .menu, .breadcrumb";

/// Class/id fragments that mark a block as chrome rather than content.
const REMOVE_CLASS_FRAGMENTS: &[&str] = &["advert", "sidebar", "comment", "share", "social"];

const CANDIDATE_SELECTORS: &[&str] = &[
    "article",
    "[role='article']",
    ".article-content",
    ".article-body",
    ".news-content",
    ".post-content",
    ".entry-content",
    ".content",
    "[class*='content']",
    "#content",
    "main",
    "[role='main']",
    ".main",
    ".post-body",
    ".detail-content",
    ".text-content",
];

const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".article-title",
    ".news-title",
    ".post-title",
    ".entry-title",
    "[class*='title']",
    "#title",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "article", "content", "post", "text", "body", "main", "story", "entry", "blog", "news",
    "detail", "excerpt",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "comment", "footer", "header", "nav", "sidebar", "ad", "advertisement", "related",
    "recommend", "share", "social", "menu", "breadcrumb", "pagination", "tag", "category",
];

const BOILERPLATE: &[&str] = &["点击查看", "关注我们", "扫码", "转载请注明"];
const FALLBACK_BOILERPLATE: &[&str] = &["点击", "关注", "免责声明"];

static DIGITS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s]+$").expect("DIGITS_ONLY: hardcoded regex is valid"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("BLANK_LINES: hardcoded regex is valid"));

static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("SPACE_RUNS: hardcoded regex is valid"));

static LEADING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n +").expect("LEADING_SPACE: hardcoded regex is valid"));

static TRAILING_BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(点击查看.*详情|更多内容请.*|责任编辑.*|版权声明.*|本文来源.*|转载请注明.*|免责声明.*|广告.*)")
        .expect("TRAILING_BOILERPLATE: hardcoded regex is valid")
});

fn sel(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Which tier produced the article text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Paragraphs and headings of the best candidate.
    Paragraphs,
    /// Raw text nodes of the best candidate.
    TextNodes,
    /// Paragraphs anywhere in the body.
    BodyFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Paragraphs => "paragraphs",
            ExtractionMethod::TextNodes => "text_nodes",
            ExtractionMethod::BodyFallback => "body_fallback",
        }
    }
}

/// An image referenced by the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleImage {
    pub index: usize,
    pub url: String,
    pub alt: String,
    pub title: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Extraction output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    /// Blocks joined by blank lines.
    pub content: String,
    pub images: Vec<ArticleImage>,
    pub method: ExtractionMethod,
    /// Score of the winning candidate; zero for the body fallback.
    pub score: f64,
}

impl ExtractedArticle {
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content.split("\n\n").filter(|p| !p.is_empty())
    }
}

struct Candidate<'a> {
    element: ElementRef<'a>,
    score: f64,
}

/// Stateless readability scorer.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    include_images: bool,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            include_images: true,
        }
    }

    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    /// Extracts title, body text and images from `html` served at `page_url`.
    pub fn extract(&self, html: &str, page_url: &str) -> ExtractedArticle {
        let document = Html::parse_document(html);
        let title = extract_title(&document);
        let excluded = excluded_nodes(&document);

        let body = sel("body").and_then(|s| document.select(&s).next());
        let candidates = body
            .map(|b| collect_candidates(b, &excluded))
            .unwrap_or_default();

        let best = candidates
            .iter()
            .fold(None::<&Candidate>, |best, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            });

        let (content, method, score, container) = match best {
            Some(best) => {
                debug!(
                    "Best candidate <{}> scored {:.1} of {} candidates",
                    best.element.value().name(),
                    best.score,
                    candidates.len()
                );
                let blocks = paragraph_blocks(best.element, &excluded);
                if blocks.len() >= MIN_PARAGRAPHS {
                    (blocks, ExtractionMethod::Paragraphs, best.score, Some(best.element))
                } else {
                    let texts = text_node_blocks(best.element, &excluded);
                    if texts.len() >= MIN_PARAGRAPHS {
                        (texts, ExtractionMethod::TextNodes, best.score, Some(best.element))
                    } else {
                        (body_fallback(&document), ExtractionMethod::BodyFallback, 0.0, None)
                    }
                }
            }
            None => (body_fallback(&document), ExtractionMethod::BodyFallback, 0.0, None),
        };

        let images = if self.include_images {
            let root = container
                .or_else(|| first_content_container(&document))
                .or(body);
            root.map(|r| collect_images(r, &excluded, page_url))
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        ExtractedArticle {
            title,
            content: content.join("\n\n"),
            images,
            method,
            score,
        }
    }
}

/// Title from the ranked selector list, else the document `<title>`.
pub fn extract_title(document: &Html) -> String {
    for css in TITLE_SELECTORS {
        let Some(selector) = sel(css) else { continue };
        if let Some(el) = document.select(&selector).next() {
            let text = collapse(&el.text().collect::<String>());
            let len = text.chars().count();
            if len > 5 && len < 200 {
                return text;
            }
        }
    }
    sel("title")
        .and_then(|s| document.select(&s).next())
        .map(|t| collapse(&t.text().collect::<String>()))
        .unwrap_or_default()
}

/// Collapses blank-line runs and spaces, then strips trailing boilerplate
/// such as editor credits and copyright notices.
pub fn clean_content(content: &str) -> String {
    let text = BLANK_LINES.replace_all(content, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = LEADING_SPACE.replace_all(&text, "\n");
    let text = TRAILING_BOILERPLATE.replace_all(text.trim(), "");
    text.trim().to_string()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn class_and_id(el: ElementRef<'_>) -> String {
    let value = el.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    )
    .to_lowercase()
}

fn tokens(class_and_id: &str) -> impl Iterator<Item = &str> {
    class_and_id
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Short keywords must match a whole token so that `ad` does not hit `header`.
fn keyword_match(class_and_id: &str, keyword: &str) -> bool {
    if keyword.len() <= 3 {
        tokens(class_and_id).any(|t| t == keyword || t == format!("{}s", keyword))
    } else {
        class_and_id.contains(keyword)
    }
}

fn is_ad_like(el: ElementRef<'_>) -> bool {
    let key = class_and_id(el);
    if key.trim().is_empty() {
        return false;
    }
    keyword_match(&key, "ad") || REMOVE_CLASS_FRAGMENTS.iter().any(|f| key.contains(f))
}

/// Every node inside a boilerplate element, the element included.
fn excluded_nodes(document: &Html) -> HashSet<NodeId> {
    let mut roots: Vec<ElementRef> = Vec::new();
    if let Some(selector) = sel(REMOVE_SELECTORS) {
        roots.extend(document.select(&selector));
    }
    if let Some(all) = sel("body *") {
        roots.extend(document.select(&all).filter(|el| is_ad_like(*el)));
    }
    roots
        .into_iter()
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect()
}

fn visible_text(el: ElementRef<'_>, excluded: &HashSet<NodeId>) -> String {
    el.descendants()
        .filter(|n| !excluded.contains(&n.id()))
        .filter_map(|n| n.value().as_text().map(|t| t.to_string()))
        .collect()
}

fn text_len(el: ElementRef<'_>, excluded: &HashSet<NodeId>) -> usize {
    visible_text(el, excluded).trim().chars().count()
}

fn visible<'a>(el: ElementRef<'a>, css: &str, excluded: &HashSet<NodeId>) -> Vec<ElementRef<'a>> {
    match sel(css) {
        Some(selector) => el
            .select(&selector)
            .filter(|e| !excluded.contains(&e.id()))
            .collect(),
        None => Vec::new(),
    }
}

fn collect_candidates<'a>(body: ElementRef<'a>, excluded: &HashSet<NodeId>) -> Vec<Candidate<'a>> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for css in CANDIDATE_SELECTORS {
        for el in visible(body, css, excluded) {
            if seen.contains(&el.id()) {
                continue;
            }
            let len = text_len(el, excluded);
            if len >= MIN_CANDIDATE_TEXT {
                seen.insert(el.id());
                candidates.push(Candidate {
                    element: el,
                    score: score_element(el, excluded),
                });
            }
        }
    }

    if candidates.is_empty() {
        for child in body.children().filter_map(ElementRef::wrap) {
            if excluded.contains(&child.id()) {
                continue;
            }
            if text_len(child, excluded) >= MIN_FALLBACK_CHILD_TEXT {
                candidates.push(Candidate {
                    element: child,
                    score: score_element(child, excluded),
                });
            }
        }
    }

    candidates
}

/// Readability score of one candidate container.
fn score_element(el: ElementRef<'_>, excluded: &HashSet<NodeId>) -> f64 {
    let text = visible_text(el, excluded);
    let len = text.trim().chars().count();
    let mut score = 0.0;

    if len > 0 {
        score += ((len + 1) as f64).ln();
    }

    let paragraphs = visible(el, "p", excluded)
        .into_iter()
        .filter(|p| text_len(*p, excluded) >= MIN_TEXT_LENGTH)
        .count();
    score += 5.0 * paragraphs as f64;

    score += 3.0 * visible(el, "h1, h2, h3, h4, h5, h6", excluded).len() as f64;

    let images = visible(el, "img", excluded).len();
    if len as f64 / (images + 1) as f64 > 50.0 {
        score += 2.0 * images as f64;
    }

    score += 2.0 * visible(el, "ul, ol", excluded).len() as f64;

    let key = class_and_id(el);
    if POSITIVE_KEYWORDS.iter().any(|k| keyword_match(&key, k)) {
        score += KEYWORD_WEIGHT;
    }
    if NEGATIVE_KEYWORDS.iter().any(|k| keyword_match(&key, k)) {
        score -= KEYWORD_WEIGHT;
    }

    let density = link_density(el, len, excluded);
    if density > MAX_LINK_DENSITY {
        score *= 1.0 - density;
    }

    score
}

fn link_density(el: ElementRef<'_>, total: usize, excluded: &HashSet<NodeId>) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let linked: usize = visible(el, "a", excluded)
        .into_iter()
        .map(|a| text_len(a, excluded))
        .sum();
    linked as f64 / total as f64
}

fn is_block_text(text: &str, boilerplate: &[&str]) -> bool {
    let len = text.chars().count();
    (MIN_TEXT_LENGTH..MAX_BLOCK_LENGTH).contains(&len)
        && !boilerplate.iter().any(|b| text.contains(b))
        && !DIGITS_ONLY.is_match(text)
}

fn paragraph_blocks(el: ElementRef<'_>, excluded: &HashSet<NodeId>) -> Vec<String> {
    visible(el, "p, h1, h2, h3, h4, h5, h6", excluded)
        .into_iter()
        .map(|p| collapse(&visible_text(p, excluded)))
        .filter(|t| is_block_text(t, BOILERPLATE))
        .take(MAX_BLOCKS)
        .collect()
}

fn text_node_blocks(el: ElementRef<'_>, excluded: &HashSet<NodeId>) -> Vec<String> {
    el.descendants()
        .filter(|n| !excluded.contains(&n.id()))
        .filter_map(|n| n.value().as_text().map(|t| collapse(t)))
        .filter(|t| t.chars().count() >= MIN_TEXT_LENGTH)
        .take(MAX_BLOCKS)
        .collect()
}

fn body_fallback(document: &Html) -> Vec<String> {
    let Some(selector) = sel("body p, body h1, body h2, body h3, body h4, body h5, body h6") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|p| collapse(&p.text().collect::<String>()))
        .filter(|t| is_block_text(t, FALLBACK_BOILERPLATE))
        .take(MAX_BLOCKS)
        .collect()
}

fn first_content_container(document: &Html) -> Option<ElementRef<'_>> {
    CANDIDATE_SELECTORS
        .iter()
        .filter_map(|css| sel(css))
        .find_map(|s| document.select(&s).next())
}

fn collect_images(
    root: ElementRef<'_>,
    excluded: &HashSet<NodeId>,
    page_url: &str,
) -> Vec<ArticleImage> {
    let base = Url::parse(page_url).ok();
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for img in visible(root, "img", excluded) {
        let value = img.value();
        let src = ["src", "data-src", "data-original"]
            .iter()
            .filter_map(|attr| value.attr(attr))
            .map(str::trim)
            .find(|s| !s.is_empty() && !s.starts_with("data:"));
        let Some(src) = src else { continue };

        let url = match &base {
            Some(base) => match base.join(src) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            None => src.to_string(),
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let dim = |attr: &str| {
            value
                .attr(attr)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
        };
        images.push(ArticleImage {
            index: images.len(),
            url,
            alt: value.attr("alt").unwrap_or_default().trim().to_string(),
            title: value.attr("title").unwrap_or_default().trim().to_string(),
            width: dim("width"),
            height: dim("height"),
        });
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPHS: [&str; 5] = [
        "The first paragraph explains what happened in the city today.",
        "A second paragraph adds quotes from officials at the scene.",
        "The third paragraph provides background on the long dispute.",
        "Fourth, analysts weigh in on what the decision could mean.",
        "Finally the fifth paragraph notes what happens next week.",
    ];

    fn article_page() -> String {
        let body: String = PARAGRAPHS.iter().map(|p| format!("<p>{}</p>", p)).collect();
        let links: String = (0..12)
            .map(|i| format!("<a href=\"/section/{i}\">Navigation section link {i}</a> "))
            .collect();
        format!(
            r#"<html><head><title>City news - Example Daily</title></head><body>
                <nav class="site-nav">{links}</nav>
                <article class="story">
                    <img src="/img/lead.jpg" alt="Lead photo" width="640" height="360">
                    {body}
                </article>
                <footer><p>Copyright Example Daily, all rights reserved worldwide.</p>{links}</footer>
            </body></html>"#
        )
    }

    #[test]
    fn test_article_selected_with_exact_paragraphs() {
        let article = ContentExtractor::new().extract(&article_page(), "https://news.example.com/a/1");
        assert_eq!(article.method, ExtractionMethod::Paragraphs);
        let got: Vec<&str> = article.paragraphs().collect();
        assert_eq!(got, PARAGRAPHS.to_vec());
        assert!(!article.content.contains("Navigation"));
        assert!(!article.content.contains("Copyright"));
        assert!(article.score > 0.0);
    }

    #[test]
    fn test_images_absolutized() {
        let article = ContentExtractor::new().extract(&article_page(), "https://news.example.com/a/1");
        assert_eq!(article.images.len(), 1);
        let img = &article.images[0];
        assert_eq!(img.url, "https://news.example.com/img/lead.jpg");
        assert_eq!(img.alt, "Lead photo");
        assert_eq!((img.width, img.height), (Some(640), Some(360)));
        assert_eq!(img.index, 0);
    }

    #[test]
    fn test_form_wrapped_page_keeps_article() {
        let body: String = PARAGRAPHS.iter().map(|p| format!("<p>{}</p>", p)).collect();
        let html = format!(
            r#"<html><body><form id="form1" action="/page.aspx" method="post">
                <nav><a href="/">Home</a> <a href="/news">News</a></nav>
                <div class="article-content"><img src="/pic.jpg" alt="photo">{body}</div>
            </form></body></html>"#
        );
        let article = ContentExtractor::new().extract(&html, "https://gov.example.cn/a/1");
        assert_eq!(article.method, ExtractionMethod::Paragraphs);
        assert_eq!(article.paragraphs().count(), PARAGRAPHS.len());
        assert_eq!(article.images.len(), 1);
        assert_eq!(article.images[0].url, "https://gov.example.cn/pic.jpg");
    }

    #[test]
    fn test_images_disabled() {
        let article = ContentExtractor::new()
            .with_images(false)
            .extract(&article_page(), "https://news.example.com/a/1");
        assert!(article.images.is_empty());
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let article = ContentExtractor::new().extract(&article_page(), "https://x.test/");
        assert_eq!(article.title, "City news - Example Daily");
    }

    #[test]
    fn test_title_prefers_h1() {
        let html = "<html><head><title>Site</title></head><body><h1>An actual headline</h1></body></html>";
        assert_eq!(extract_title(&Html::parse_document(html)), "An actual headline");
    }

    #[test]
    fn test_short_h1_is_skipped() {
        let html = r#"<html><head><title>Doc title</title></head><body><h1>Hi</h1><div class="news-title">A longer news headline</div></body></html>"#;
        assert_eq!(extract_title(&Html::parse_document(html)), "A longer news headline");
    }

    #[test]
    fn test_body_children_fallback() {
        let text = "Plain body text without any semantic container at all here. ".repeat(5);
        let html = format!(
            "<html><body><div><p>{t}</p><p>{t}</p></div></body></html>",
            t = &text[..120]
        );
        let article = ContentExtractor::new().extract(&html, "https://x.test/");
        assert_eq!(article.method, ExtractionMethod::Paragraphs);
        assert_eq!(article.paragraphs().count(), 2);
    }

    #[test]
    fn test_text_node_tier() {
        let line = "A line of raw text sitting directly inside the container";
        let html = format!(
            "<html><body><div class='content'>{l} one<br>{l} two<br>{l} three</div></body></html>",
            l = line
        );
        let article = ContentExtractor::new().extract(&html, "https://x.test/");
        assert_eq!(article.method, ExtractionMethod::TextNodes);
        assert_eq!(article.paragraphs().count(), 3);
    }

    #[test]
    fn test_body_fallback_tier() {
        let html = "<html><body><p>Only one paragraph of sufficient length here.</p><p>tiny</p></body></html>";
        let article = ContentExtractor::new().extract(html, "https://x.test/");
        assert_eq!(article.method, ExtractionMethod::BodyFallback);
        assert_eq!(article.score, 0.0);
        assert_eq!(article.paragraphs().count(), 1);
    }

    #[test]
    fn test_boilerplate_paragraphs_filtered() {
        let html = r#"<html><body><article>
            <p>这是一段正常的新闻正文内容，描述了事件发生的经过和细节。</p>
            <p>这是第二段正常的新闻正文内容，补充了更多的背景信息。</p>
            <p>扫码关注我们的公众号获取更多精彩内容和最新的资讯推送</p>
            <p>12345 67890 12345 67890 12345</p>
            <p>第三段正文同样包含足够的文字长度，可以被算作有效段落。第三段正文同样包含足够的文字长度，可以被算作有效段落。第三段正文同样包含足够的文字长度。</p>
        </article></body></html>"#;
        let article = ContentExtractor::new().extract(html, "https://x.test/");
        assert_eq!(article.paragraphs().count(), 3);
        assert!(!article.content.contains("扫码"));
    }

    #[test]
    fn test_ad_blocks_excluded_but_header_class_kept() {
        let html = r#"<html><body><article class="article-header-wrap">
            <div class="ad-banner"><p>Buy now, limited offer, click this sponsored banner</p></div>
            <p>The real story paragraph number one with plenty of words.</p>
            <p>The real story paragraph number two with plenty of words.</p>
        </article></body></html>"#;
        let article = ContentExtractor::new().extract(html, "https://x.test/");
        assert_eq!(article.paragraphs().count(), 2);
        assert!(!article.content.contains("Buy now"));
    }

    #[test]
    fn test_link_density_penalizes_link_farms() {
        let document = Html::parse_document(
            r#"<html><body>
            <div id="links"><a href="/1">aaaaaaaaaaaaaaaaaaaaaaaaa</a><a href="/2">bbbbbbbbbbbbbbbbbbbbbbbbbb</a> x</div>
            <div id="plain">aaaaaaaaaaaaaaaaaaaaaaaaa bbbbbbbbbbbbbbbbbbbbbbbbbb x</div>
            </body></html>"#,
        );
        let excluded = HashSet::new();
        let pick = |id: &str| {
            let s = Selector::parse(&format!("#{id}")).unwrap();
            document.select(&s).next().unwrap()
        };
        assert!(score_element(pick("links"), &excluded) < score_element(pick("plain"), &excluded));
    }

    #[test]
    fn test_keyword_match_tokens() {
        assert!(keyword_match("ad-slot", "ad"));
        assert!(keyword_match("top ads", "ad"));
        assert!(!keyword_match("header", "ad"));
        assert!(keyword_match("main-nav", "nav"));
        assert!(!keyword_match("canvas", "nav"));
        assert!(keyword_match("post-comments", "comment"));
    }

    #[test]
    fn test_clean_content() {
        let raw = "第一段   内容\n\n\n\n  第二段内容\n责任编辑：张三";
        assert_eq!(clean_content(raw), "第一段 内容\n\n第二段内容");
    }
}
