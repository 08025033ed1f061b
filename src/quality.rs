//! Heuristic quality score for extracted article text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::antibot::Check;

/// Phrases that mark an error or removed-content page.
const ERROR_PHRASES: &[&str] = &[
    "not found",
    "page not found",
    "页面不存在",
    "页面已删除",
    "文章不存在",
    "内容已被删除",
    "访问出错",
    "出错了",
];

/// A 404 status only counts next to error wording, or standing alone.
static ERROR_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*404\s*$|\b404\b\W{0,3}(error|page|错误|页面)|(error|错误)\W{0,3}404\b")
        .expect("ERROR_CODE: hardcoded regex is valid")
});

/// Phrases that mark advertising copy.
const AD_PHRASES: &[&str] = &["广告", "推广", "赞助", "sponsored", "advertisement"];

/// Coarse verdict on extracted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Poor,
    Warning,
    Acceptable,
    Good,
}

impl QualityLevel {
    fn from_score(score: u32) -> Self {
        match score {
            75.. => QualityLevel::Good,
            50..=74 => QualityLevel::Acceptable,
            25..=49 => QualityLevel::Warning,
            _ => QualityLevel::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Good => "good",
            QualityLevel::Acceptable => "acceptable",
            QualityLevel::Warning => "warning",
            QualityLevel::Poor => "poor",
        }
    }

    /// Warning or worse.
    pub fn is_degraded(&self) -> bool {
        *self <= QualityLevel::Warning
    }
}

/// Score out of 100 with the issues that cost points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: u32,
    pub level: QualityLevel,
    pub issues: Vec<String>,
    pub checks: Vec<Check>,
}

/// Scores title and body text of an extracted article.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores `content`, whose paragraphs are separated by blank lines.
    pub fn score(&self, title: &str, content: &str) -> QualityReport {
        let mut score: i32 = 0;
        let mut issues = Vec::new();
        let mut checks = Vec::new();

        let title = title.trim();
        let title_len = title.chars().count();
        if title_len == 0 {
            issues.push("missing title".to_string());
            checks.push(Check::fail("title", "missing"));
        } else if (5..=200).contains(&title_len) {
            score += 20;
            checks.push(Check::pass("title"));
        } else {
            score += 10;
            issues.push(format!("unusual title length ({} chars)", title_len));
            checks.push(Check::fail("title", format!("{} chars", title_len)));
        }

        let content_len = content.chars().count();
        let length_points = match content_len {
            1000.. => 40,
            300..=999 => 30,
            100..=299 => 15,
            1..=99 => 5,
            0 => 0,
        };
        score += length_points;
        if content_len < 300 {
            issues.push(format!("short content ({} chars)", content_len));
            checks.push(Check::fail("content_length", format!("{} chars", content_len)));
        } else {
            checks.push(Check::pass("content_length"));
        }

        let paragraphs = content
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count();
        match paragraphs {
            5.. => {
                score += 20;
                checks.push(Check::pass("paragraphs"));
            }
            2..=4 => {
                score += 10;
                checks.push(Check::pass("paragraphs"));
            }
            _ => {
                issues.push(format!("too few paragraphs ({})", paragraphs));
                checks.push(Check::fail("paragraphs", paragraphs.to_string()));
            }
        }

        let lower_title = title.to_lowercase();
        let lower = content.to_lowercase();
        let short = content_len < 500;
        let error_hit = ERROR_PHRASES
            .iter()
            .find(|p| lower_title.contains(*p) || (short && lower.contains(*p)))
            .copied()
            .or_else(|| {
                (ERROR_CODE.is_match(&lower_title) || (short && ERROR_CODE.is_match(&lower)))
                    .then_some("404")
            });
        if let Some(phrase) = error_hit {
            score -= 40;
            issues.push(format!("looks like an error page ('{}')", phrase));
            checks.push(Check::fail("error_page", phrase));
        } else {
            checks.push(Check::pass("error_page"));
        }

        let ad_hits: usize = AD_PHRASES.iter().map(|p| lower.matches(p).count()).sum();
        let ad_density = if paragraphs == 0 {
            0.0
        } else {
            ad_hits as f64 / paragraphs as f64
        };
        if ad_density > 0.3 {
            score -= 20;
            issues.push(format!("ad-heavy content ({} ad phrases)", ad_hits));
            checks.push(Check::fail("ad_density", format!("{:.2}", ad_density)));
        } else {
            score += 20;
            checks.push(Check::pass("ad_density"));
        }

        let score = score.clamp(0, 100) as u32;
        QualityReport {
            score,
            level: QualityLevel::from_score(score),
            issues,
            checks,
        }
    }
}
