//! Anti-bot page classification.
//!
//! A freshly loaded page is screened before its content is trusted. Checks run
//! in a fixed order and stop at the first hit:
//!
//! 1. HTTP status >= 400 (an error, not attributed to anti-bot)
//! 2. title keyword
//! 3. CAPTCHA / verification element
//! 4. rate-limit or robot-suspicion phrase in the body text
//! 5. IP-ban phrase in the body text
//!
//! All keyword, selector and phrase sets are configuration.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BlockReason;
use crate::quality::QualityReport;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Keyword, selector and phrase sets used by the detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Case-insensitive substrings of the page title.
    pub title_keywords: Vec<String>,
    /// CSS selectors of CAPTCHA or verification widgets.
    pub captcha_selectors: Vec<String>,
    /// Case-insensitive body phrases indicating throttling or robot suspicion.
    pub content_phrases: Vec<String>,
    /// Case-insensitive body phrases indicating an IP-level ban.
    pub ip_phrases: Vec<String>,
    /// Only this many leading characters of body text are scanned.
    pub body_scan_chars: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            title_keywords: strings(&[
                "验证",
                "安全验证",
                "人机验证",
                "访问异常",
                "请输入验证码",
                "captcha",
                "verify you are human",
                "are you a robot",
                "access denied",
                "attention required",
                "just a moment",
            ]),
            captcha_selectors: strings(&[
                "iframe[src*='recaptcha']",
                "div.g-recaptcha",
                "iframe[src*='hcaptcha']",
                "div.h-captcha",
                "#captcha",
                "#captcha-form",
                "form[action*='/sorry/']",
                "#challenge-form",
                "#cf-challenge-running",
                ".vcode-body",
                ".verify-wrap",
                "#seccaptcha",
            ]),
            content_phrases: strings(&[
                "unusual traffic",
                "/sorry/index",
                "too many requests",
                "not a robot",
                "are you a robot",
                "automated queries",
                "异常流量",
                "请求过于频繁",
                "访问过于频繁",
                "网络环境存在异常",
                "请完成安全验证",
            ]),
            ip_phrases: strings(&[
                "your ip address has been blocked",
                "your ip has been banned",
                "ip address is blocked",
                "ip已被封",
                "ip地址已被封",
                "ip被限制",
                "ip访问受限",
            ]),
            body_scan_chars: 5000,
        }
    }
}

/// Overall health of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Ok,
    Warning,
    Error,
}

/// One named check and whether the page passed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Check {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: None,
        }
    }

    pub fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// Classification of a loaded page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStatus {
    pub status: StatusLevel,
    pub reason: String,
    pub anti_bot_detected: bool,
    pub anti_bot_type: Option<BlockReason>,
    pub checks: Vec<Check>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
    pub suggestions: Vec<String>,
}

impl PageStatus {
    pub fn ok(checks: Vec<Check>) -> Self {
        Self {
            status: StatusLevel::Ok,
            reason: "ok".to_string(),
            anti_bot_detected: false,
            anti_bot_type: None,
            checks,
            quality: None,
            suggestions: Vec::new(),
        }
    }

    pub fn error(reason: impl Into<String>, checks: Vec<Check>) -> Self {
        Self {
            status: StatusLevel::Error,
            reason: reason.into(),
            anti_bot_detected: false,
            anti_bot_type: None,
            checks,
            quality: None,
            suggestions: Vec::new(),
        }
    }

    fn blocked(kind: BlockReason, detail: String, checks: Vec<Check>) -> Self {
        Self {
            status: StatusLevel::Error,
            reason: format!("{}: {}", kind, detail),
            anti_bot_detected: true,
            anti_bot_type: Some(kind),
            checks,
            quality: None,
            suggestions: block_suggestions(kind),
        }
    }

    /// The anti-bot reason, when the page was classified as blocked.
    pub fn block_reason(&self) -> Option<BlockReason> {
        if self.anti_bot_detected {
            self.anti_bot_type
        } else {
            None
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StatusLevel::Ok
    }
}

fn block_suggestions(kind: BlockReason) -> Vec<String> {
    let tips: &[&str] = match kind {
        BlockReason::TitleKeyword | BlockReason::CaptchaElement => &[
            "The site is asking for human verification; retry later or use another engine",
            "Rotate the user agent or route through a proxy",
        ],
        BlockReason::ContentText => &[
            "Requests are being throttled; lower the request rate",
            "Wait before retrying this site",
        ],
        BlockReason::IpBlocked => &[
            "The IP address is blocked; switch proxy or wait for the cool-down",
        ],
    };
    strings(tips)
}

fn http_suggestions(status: u16) -> Vec<String> {
    match status {
        403 => strings(&["Access forbidden; the site may require cookies or a different region"]),
        404 | 410 => strings(&["The page no longer exists; check the URL"]),
        429 => strings(&["Too many requests; lower the request rate"]),
        500..=599 => strings(&["The site is failing; retry later"]),
        _ => Vec::new(),
    }
}

/// What the detector looks at.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub status: Option<u16>,
    pub title: String,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(status: Option<u16>, title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            html: html.into(),
        }
    }
}

/// Classifies pages as blocked or usable.
pub struct AntiBotDetector {
    config: DetectorConfig,
    selectors: Vec<(String, Selector)>,
    title_keywords: Vec<String>,
    content_phrases: Vec<String>,
    ip_phrases: Vec<String>,
}

impl AntiBotDetector {
    /// Builds a detector. Selectors that fail to parse are skipped with a warning.
    pub fn new(config: DetectorConfig) -> Self {
        let selectors = config
            .captcha_selectors
            .iter()
            .filter_map(|css| match Selector::parse(css) {
                Ok(sel) => Some((css.clone(), sel)),
                Err(e) => {
                    warn!("Ignoring invalid captcha selector '{}': {:?}", css, e);
                    None
                }
            })
            .collect();
        let lower = |v: &[String]| v.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();
        Self {
            title_keywords: lower(&config.title_keywords),
            content_phrases: lower(&config.content_phrases),
            ip_phrases: lower(&config.ip_phrases),
            selectors,
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Runs the ordered checks against a page.
    pub fn detect(&self, page: &PageSnapshot) -> PageStatus {
        let mut checks = Vec::new();

        if let Some(code) = page.status.filter(|c| *c >= 400) {
            checks.push(Check::fail("http_status", format!("HTTP {}", code)));
            let mut status = PageStatus::error(format!("HTTP {}", code), checks);
            status.suggestions = http_suggestions(code);
            return status;
        }
        checks.push(Check::pass("http_status"));

        let title = page.title.to_lowercase();
        if let Some(keyword) = self.title_keywords.iter().find(|k| title.contains(k.as_str())) {
            debug!("Title '{}' matched block keyword '{}'", page.title, keyword);
            checks.push(Check::fail("title_keyword", keyword.clone()));
            return PageStatus::blocked(BlockReason::TitleKeyword, keyword.clone(), checks);
        }
        checks.push(Check::pass("title_keyword"));

        let document = Html::parse_document(&page.html);

        if let Some((css, _)) = self
            .selectors
            .iter()
            .find(|(_, sel)| document.select(sel).next().is_some())
        {
            debug!("Page contains verification element '{}'", css);
            checks.push(Check::fail("captcha_element", css.clone()));
            return PageStatus::blocked(BlockReason::CaptchaElement, css.clone(), checks);
        }
        checks.push(Check::pass("captcha_element"));

        let body = body_prefix(&document, self.config.body_scan_chars).to_lowercase();

        if let Some(phrase) = self.content_phrases.iter().find(|p| body.contains(p.as_str())) {
            checks.push(Check::fail("content_text", phrase.clone()));
            return PageStatus::blocked(BlockReason::ContentText, phrase.clone(), checks);
        }
        checks.push(Check::pass("content_text"));

        if let Some(phrase) = self.ip_phrases.iter().find(|p| body.contains(p.as_str())) {
            checks.push(Check::fail("ip_blocked", phrase.clone()));
            return PageStatus::blocked(BlockReason::IpBlocked, phrase.clone(), checks);
        }
        checks.push(Check::pass("ip_blocked"));

        PageStatus::ok(checks)
    }
}

impl Default for AntiBotDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

/// Leading visible text of the document body, at most `limit` characters.
fn body_prefix(document: &Html, limit: usize) -> String {
    let Ok(skip) = Selector::parse("script, style, noscript, template") else {
        return String::new();
    };
    let hidden: std::collections::HashSet<_> = document
        .select(&skip)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let mut out = String::new();
    let mut taken = 0;
    for node in document.root_element().descendants() {
        if hidden.contains(&node.id()) {
            continue;
        }
        if let Some(text) = node.value().as_text() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            for ch in text.chars() {
                if taken >= limit {
                    return out;
                }
                out.push(ch);
                taken += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(status: Option<u16>, title: &str, html: &str) -> PageStatus {
        AntiBotDetector::default().detect(&PageSnapshot::new(status, title, html))
    }

    #[test]
    fn test_normal_page_is_ok() {
        let s = detect(Some(200), "rust_百度搜索", "<html><body><p>正常结果</p></body></html>");
        assert!(s.is_ok());
        assert!(!s.anti_bot_detected);
        assert_eq!(s.checks.len(), 5);
        assert!(s.checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_http_error_not_attributed_to_antibot() {
        let s = detect(Some(503), "验证", "<html></html>");
        assert_eq!(s.status, StatusLevel::Error);
        assert!(!s.anti_bot_detected);
        assert!(s.block_reason().is_none());
        assert_eq!(s.reason, "HTTP 503");
        assert_eq!(s.checks.len(), 1);
        assert!(!s.suggestions.is_empty());
    }

    #[test]
    fn test_missing_status_passes_http_check() {
        let s = detect(None, "ok", "<html><body>fine</body></html>");
        assert!(s.is_ok());
    }

    #[test]
    fn test_title_keyword() {
        let s = detect(Some(200), "百度安全验证", "<html></html>");
        assert_eq!(s.block_reason(), Some(BlockReason::TitleKeyword));
        assert!(s.reason.starts_with("title_keyword"));
        assert_eq!(s.checks.len(), 2);
    }

    #[test]
    fn test_title_keyword_case_insensitive() {
        let s = detect(Some(200), "Just a moment...", "<html></html>");
        assert_eq!(s.block_reason(), Some(BlockReason::TitleKeyword));
    }

    #[test]
    fn test_captcha_element() {
        let html = r#"<html><body><div class="g-recaptcha" data-sitekey="x"></div></body></html>"#;
        let s = detect(Some(200), "Google", html);
        assert_eq!(s.block_reason(), Some(BlockReason::CaptchaElement));
    }

    #[test]
    fn test_google_sorry_form() {
        let html = r#"<html><body><form action="https://www.google.com/sorry/index" id="f"></form></body></html>"#;
        let s = detect(Some(200), "https://www.google.com/search", html);
        assert_eq!(s.block_reason(), Some(BlockReason::CaptchaElement));
    }

    #[test]
    fn test_content_text() {
        let html = "<html><body><p>Our systems have detected unusual traffic from your computer network.</p></body></html>";
        let s = detect(Some(200), "Google Search", html);
        assert_eq!(s.block_reason(), Some(BlockReason::ContentText));
        assert!(!s.suggestions.is_empty());
    }

    #[test]
    fn test_ip_blocked() {
        let html = "<html><body><h1>Error</h1><p>Your IP address has been blocked.</p></body></html>";
        let s = detect(Some(200), "Error", html);
        assert_eq!(s.block_reason(), Some(BlockReason::IpBlocked));
        assert_eq!(s.checks.len(), 5);
    }

    #[test]
    fn test_order_title_before_content() {
        let html = "<html><body>unusual traffic</body></html>";
        let s = detect(Some(200), "安全验证", html);
        assert_eq!(s.block_reason(), Some(BlockReason::TitleKeyword));
    }

    #[test]
    fn test_script_text_is_ignored() {
        let html = "<html><body><script>var m = 'unusual traffic';</script><p>hello</p></body></html>";
        let s = detect(Some(200), "ok", html);
        assert!(s.is_ok());
    }

    #[test]
    fn test_phrase_beyond_scan_window_is_ignored() {
        let filler = "x".repeat(6000);
        let html = format!("<html><body><p>{}</p><p>unusual traffic</p></body></html>", filler);
        let s = detect(Some(200), "ok", &html);
        assert!(s.is_ok());
    }

    #[test]
    fn test_custom_config() {
        let config = DetectorConfig {
            title_keywords: vec!["blocked!".to_string()],
            captcha_selectors: vec!["div[[".to_string(), "#gate".to_string()],
            content_phrases: vec![],
            ip_phrases: vec![],
            body_scan_chars: 100,
        };
        let detector = AntiBotDetector::new(config);
        let s = detector.detect(&PageSnapshot::new(Some(200), "t", "<div id='gate'></div>"));
        assert_eq!(s.block_reason(), Some(BlockReason::CaptchaElement));
        let s = detector.detect(&PageSnapshot::new(Some(200), "验证", "<p>x</p>"));
        assert!(s.is_ok());
    }

    #[test]
    fn test_default_phrase_sets_are_disjoint() {
        let config = DetectorConfig::default();
        for ip in &config.ip_phrases {
            assert!(
                !config.content_phrases.iter().any(|c| ip.contains(c.as_str())),
                "ip phrase '{}' shadowed by a content phrase",
                ip
            );
        }
    }

    #[test]
    fn test_page_status_serialization() {
        let s = detect(Some(200), "验证", "<html></html>");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["anti_bot_detected"], true);
        assert_eq!(json["anti_bot_type"], "title_keyword");
        assert!(json.get("quality").is_none());
    }
}
