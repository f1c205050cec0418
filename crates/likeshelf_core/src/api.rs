/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::Context;
use async_trait::async_trait;
use likeshelf_protocol::{Item, ItemCreate, ItemId, ListParams, Tag, TagsUpdate};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FeedConfig;
use crate::error::SyncError;
use crate::http_retry::{send_once, send_with_retry};
use crate::net_metrics::NetMetrics;

/// The remote collection endpoint.
#[async_trait]
pub trait CollectionApi: Send + Sync {
    /// One page of items. The remote applies AND semantics over `tag_names`.
    async fn list(&self, params: &ListParams) -> Result<Vec<Item>, SyncError>;

    async fn get(&self, id: ItemId) -> Result<Item, SyncError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, SyncError>;

    /// Replaces the whole tag set of `id` and returns the stored item.
    async fn update_tags(&self, id: ItemId, tags: &[String]) -> Result<Item, SyncError>;

    async fn create(&self, payload: &ItemCreate) -> Result<Item, SyncError>;
}

/// Trims the url and tag names, drops blank and repeated tags.
pub fn validate_create(payload: &ItemCreate) -> Result<ItemCreate, SyncError> {
    let url = payload.url.trim();
    if url.is_empty() {
        return Err(SyncError::Validation("url is required".to_string()));
    }
    let mut tags: Vec<String> = Vec::new();
    for t in payload.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|x| x == t) {
            tags.push(t.to_string());
        }
    }
    Ok(ItemCreate {
        url: url.to_string(),
        folder_id: payload.folder_id,
        tags,
    })
}

pub struct HttpCollectionApi {
    http: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    timeout: Duration,
    metrics: Arc<NetMetrics>,
}

impl HttpCollectionApi {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        retry_attempts: u32,
        timeout: Duration,
        metrics: Arc<NetMetrics>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            retry_attempts,
            timeout,
            metrics,
        }
    }

    pub fn from_config(cfg: &FeedConfig, metrics: Arc<NetMetrics>) -> anyhow::Result<Self> {
        let timeout = cfg.http_timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self::new(
            http,
            &cfg.api_base_url,
            cfg.retry_attempts(),
            timeout,
            metrics,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(ACCEPT, "application/json")
            .header(USER_AGENT, format!("likeshelf/{}", env!("CARGO_PKG_VERSION")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send_idempotent<F>(&self, build: F) -> Result<Response, SyncError>
    where
        F: FnMut() -> RequestBuilder,
    {
        send_with_retry(build, self.retry_attempts, &self.metrics)
            .await
            .map_err(|e| SyncError::from_reqwest(e, self.timeout))
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        resp: Response,
        item: Option<ItemId>,
    ) -> Result<T, SyncError> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = item {
                return Err(SyncError::NotFound(id));
            }
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| SyncError::from_reqwest(e, self.timeout))
    }
}

#[async_trait]
impl CollectionApi for HttpCollectionApi {
    async fn list(&self, params: &ListParams) -> Result<Vec<Item>, SyncError> {
        let url = self.url("posts/");
        let resp = self
            .send_idempotent(|| self.request(self.http.get(&url)).query(params))
            .await?;
        self.decode(resp, None).await
    }

    async fn get(&self, id: ItemId) -> Result<Item, SyncError> {
        let url = self.url(&format!("posts/{id}"));
        let resp = self
            .send_idempotent(|| self.request(self.http.get(&url)))
            .await?;
        self.decode(resp, Some(id)).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, SyncError> {
        let url = self.url("tags/");
        let resp = self
            .send_idempotent(|| self.request(self.http.get(&url)))
            .await?;
        let mut tags: Vec<Tag> = self.decode(resp, None).await?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn update_tags(&self, id: ItemId, tags: &[String]) -> Result<Item, SyncError> {
        let url = self.url(&format!("posts/{id}/tags"));
        let body = TagsUpdate {
            tags: tags.to_vec(),
        };
        let resp = self
            .send_idempotent(|| self.request(self.http.put(&url)).json(&body))
            .await?;
        self.decode(resp, Some(id)).await
    }

    async fn create(&self, payload: &ItemCreate) -> Result<Item, SyncError> {
        let payload = validate_create(payload)?;
        let url = self.url("posts/");
        let resp = send_once(self.request(self.http.post(&url)).json(&payload), &self.metrics)
            .await
            .map_err(|e| SyncError::from_reqwest(e, self.timeout))?;
        self.decode(resp, None).await
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_normalized() {
        let p = validate_create(&ItemCreate {
            url: "  https://x.com/a/status/9 ".to_string(),
            folder_id: None,
            tags: vec![" rust".into(), "".into(), "rust".into(), "async ".into()],
        })
        .unwrap();
        assert_eq!(p.url, "https://x.com/a/status/9");
        assert_eq!(p.tags, vec!["rust", "async"]);
    }

    #[test]
    fn create_without_url_is_rejected() {
        let err = validate_create(&ItemCreate::default()).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn base_url_is_normalized() {
        let api = HttpCollectionApi::new(
            reqwest::Client::new(),
            " http://127.0.0.1:8000/api/ ",
            3,
            Duration::from_secs(5),
            Arc::new(NetMetrics::new()),
        );
        assert_eq!(api.base_url(), "http://127.0.0.1:8000/api");
        assert_eq!(api.url("/posts/"), "http://127.0.0.1:8000/api/posts/");
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundary() {
        let s = "é".repeat(10);
        let t = truncate(&s, 5);
        assert!(t.ends_with('…'));
        assert!(t.len() <= 5 + '…'.len_utf8());
    }
}
