//! HTTP client for a remote served by [`build_router`](crate::build_router).

use std::time::Duration;

use arx_store::Object;
use arx_types::ObjectId;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthMethod;
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteTransport;
use crate::types::{FetchRequest, RefUpdate, RefUpdateResult, RemoteRef, RepoInfo, StoreResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// A remote reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    base_url: String,
    http: reqwest::Client,
    auth: AuthMethod,
}

impl HttpRemote {
    /// Client for `base_url` (e.g. `http://server:7420`).
    pub fn new(base_url: &str, auth: AuthMethod) -> SyncResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SyncError::Config(format!("not an http(s) url: {base_url}")));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(Self {
            base_url,
            http,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fail with `RemoteProtocol` on a non-2xx status.
    async fn check(response: Response, what: &str) -> SyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::RemoteProtocol {
            status: status.as_u16(),
            message: format!("{what}: {}", body.trim()),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> SyncResult<T> {
        response
            .json()
            .await
            .map_err(|e| SyncError::Decode(format!("{what}: {e}")))
    }
}

#[async_trait]
impl RemoteTransport for HttpRemote {
    async fn list_refs(&self) -> SyncResult<Vec<RemoteRef>> {
        let request = self.auth.apply(self.http.get(self.url("/refs")));
        let response = Self::check(request.send().await?, "GET /refs").await?;
        Self::decode(response, "GET /refs").await
    }

    async fn fetch_objects(&self, ids: &[ObjectId]) -> SyncResult<Vec<Object>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = FetchRequest { ids: ids.to_vec() };
        let request = self
            .auth
            .apply(self.http.post(self.url("/objects/batch")))
            .json(&body);
        let response = Self::check(request.send().await?, "POST /objects/batch").await?;
        let objects: Vec<Object> = Self::decode(response, "POST /objects/batch").await?;
        debug!(requested = ids.len(), received = objects.len(), "fetched objects");
        Ok(objects)
    }

    async fn push_objects(&self, objects: &[Object]) -> SyncResult<usize> {
        if objects.is_empty() {
            return Ok(0);
        }
        let request = self
            .auth
            .apply(self.http.put(self.url("/objects/batch")))
            .json(objects);
        let response = Self::check(request.send().await?, "PUT /objects/batch").await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(objects.len());
        }
        let stored: StoreResponse = Self::decode(response, "PUT /objects/batch").await?;
        Ok(stored.stored)
    }

    async fn update_refs(&self, updates: &[RefUpdate]) -> SyncResult<Vec<RefUpdateResult>> {
        let request = self
            .auth
            .apply(self.http.post(self.url("/refs")))
            .json(updates);
        let response = Self::check(request.send().await?, "POST /refs").await?;
        Self::decode(response, "POST /refs").await
    }

    async fn info(&self) -> SyncResult<RepoInfo> {
        let request = self.auth.apply(self.http.get(self.url("/info")));
        let response = Self::check(request.send().await?, "GET /info").await?;
        Self::decode(response, "GET /info").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let remote = HttpRemote::new("http://example.com:7420/", AuthMethod::Anonymous).unwrap();
        assert_eq!(remote.base_url(), "http://example.com:7420");
        assert_eq!(remote.url("/refs"), "http://example.com:7420/refs");
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = HttpRemote::new("ssh://example.com/repo", AuthMethod::Anonymous).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
