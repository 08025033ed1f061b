//! Cookie records and the on-disk cookie jar.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// A browser cookie as persisted in the jar file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Expiry as seconds since the Unix epoch; `None` or negative for session cookies.
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }
}

/// A JSON file holding a list of cookies.
///
/// Loading a missing file yields an empty list. Saving overwrites the file.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<Cookie>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cookie file at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let cookies: Vec<Cookie> = serde_json::from_str(&raw)?;
        Ok(cookies)
    }

    pub async fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let json = serde_json::to_string_pretty(cookies)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::new(dir.path().join("none.json"));
        assert!(jar.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::new(dir.path().join("nested/cookies.json"));
        let mut c = Cookie::new("BAIDUID", "abc", ".baidu.com");
        c.http_only = true;
        jar.save(&[c.clone()]).await.unwrap();
        let loaded = jar.load().await.unwrap();
        assert_eq!(loaded, vec![c]);
    }

    #[tokio::test]
    async fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::new(dir.path().join("cookies.json"));
        jar.save(&[Cookie::new("a", "1", "x.com"), Cookie::new("b", "2", "x.com")])
            .await
            .unwrap();
        jar.save(&[Cookie::new("c", "3", "y.com")]).await.unwrap();
        let loaded = jar.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "c");
    }

    #[tokio::test]
    async fn test_load_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "{not json").unwrap();
        let jar = CookieJar::new(path);
        assert!(matches!(jar.load().await, Err(crate::SearchError::Json(_))));
    }

    #[test]
    fn test_cookie_wire_format_is_camel_case() {
        let json = r#"[{"name":"n","value":"v","domain":".a.com","httpOnly":true,"sameSite":"Lax"}]"#;
        let cookies: Vec<Cookie> = serde_json::from_str(json).unwrap();
        assert!(cookies[0].http_only);
        assert_eq!(cookies[0].path, "/");
        assert_eq!(cookies[0].same_site.as_deref(), Some("Lax"));
        let out = serde_json::to_string(&cookies[0]).unwrap();
        assert!(out.contains("\"httpOnly\":true"));
    }
}
