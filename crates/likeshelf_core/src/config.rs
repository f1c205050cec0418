/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use directories::ProjectDirs;
use likeshelf_protocol::SortDirection;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::query::QuerySpec;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    #[serde(alias = "base_url")]
    pub api_base_url: String,
    pub page_size: u32,
    /// HTTP client timeout for each request (seconds).
    pub http_timeout_secs: Option<u64>,
    pub retry_attempts: Option<u32>,
    /// Upper bound on a whole page fetch, retries included. Unset means a
    /// stuck fetch keeps the feed loading until the transport gives up.
    pub fetch_timeout_secs: Option<u64>,
    /// Abort the task of a fetch that a query change superseded instead of
    /// letting it finish and discarding its result.
    pub cancel_superseded: bool,
    pub initial_tags: Vec<String>,
    pub sort: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            page_size: 10,
            http_timeout_secs: None,
            retry_attempts: None,
            fetch_timeout_secs: None,
            cancel_superseded: false,
            initial_tags: Vec::new(),
            sort: None,
        }
    }
}

impl FeedConfig {
    /// Reads `path` when it exists, then applies `LIKESHELF_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("read config: {}", p.display()))?;
                serde_json::from_str::<FeedConfig>(&raw)
                    .with_context(|| format!("parse config json: {}", p.display()))?
            }
            _ => FeedConfig::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("LIKESHELF_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = v.trim().to_string();
        }
        if let Some(v) = get("LIKESHELF_PAGE_SIZE") {
            self.page_size = v
                .trim()
                .parse()
                .with_context(|| format!("invalid LIKESHELF_PAGE_SIZE: {v}"))?;
        }
        if let Some(v) = get("LIKESHELF_TAGS") {
            self.initial_tags = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("LIKESHELF_SORT") {
            self.sort = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be positive");
        }
        if self.api_base_url.trim().is_empty() {
            anyhow::bail!("api_base_url is empty");
        }
        if let Some(s) = self.sort.as_deref() {
            if SortDirection::from_str(s).is_none() {
                anyhow::bail!("invalid sort {s:?}: expected asc or desc");
            }
        }
        Ok(())
    }

    pub fn page_size(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.page_size).context("page_size must be positive")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(30).clamp(5, 120))
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(3).clamp(1, 5)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn initial_spec(&self) -> QuerySpec {
        let sort = self
            .sort
            .as_deref()
            .and_then(SortDirection::from_str)
            .unwrap_or_default();
        QuerySpec::new(&self.initial_tags, sort)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(v) = std::env::var("LIKESHELF_CONFIG") {
        return Ok(PathBuf::from(v));
    }
    let proj = ProjectDirs::from("net", "likeshelf", "Likeshelf")
        .context("unable to determine platform config dir")?;
    Ok(proj.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_remote_page_size() {
        let cfg = FeedConfig::default();
        assert_eq!(cfg.page_size().unwrap().get(), 10);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.retry_attempts(), 3);
        assert_eq!(cfg.fetch_timeout(), None);
        assert_eq!(cfg.initial_spec(), QuerySpec::default());
    }

    #[test]
    fn json_fields_and_clamping() {
        let cfg: FeedConfig = serde_json::from_str(
            r#"{"base_url": "http://h/api", "page_size": 25, "http_timeout_secs": 1,
                "retry_attempts": 9, "fetch_timeout_secs": 12, "sort": "asc",
                "initial_tags": ["b", "a"]}"#,
        )
        .unwrap();
        assert_eq!(cfg.api_base_url, "http://h/api");
        assert_eq!(cfg.http_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.retry_attempts(), 5);
        assert_eq!(cfg.fetch_timeout(), Some(Duration::from_secs(12)));
        let spec = cfg.initial_spec();
        assert_eq!(spec.canonical_key(), "tags=a,b;sort=asc");
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LIKESHELF_API_BASE_URL", "http://other/api"),
            ("LIKESHELF_PAGE_SIZE", "5"),
            ("LIKESHELF_TAGS", "x, ,y"),
        ]);
        let mut cfg = FeedConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.api_base_url, "http://other/api");
        assert_eq!(cfg.page_size, 5);
        assert_eq!(cfg.initial_tags, vec!["x", "y"]);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let cfg = FeedConfig {
            page_size: 0,
            ..FeedConfig::default()
        };
        assert!(cfg.validate().is_err());
        let mut cfg = FeedConfig::default();
        assert!(cfg.apply_env(|_| Some("ten".to_string())).is_err());
    }

    #[test]
    fn bad_sort_is_rejected() {
        let cfg = FeedConfig {
            sort: Some("sideways".to_string()),
            ..FeedConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
