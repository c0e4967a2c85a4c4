//! HTTP client for one mock server admin API.

use crate::error::{SyncError, UploadError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Proxy};
use std::time::Duration;
use tracing::debug;

/// Operations the engine needs from a mock server target.
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// Base URL of the target, without trailing slash.
    fn base_url(&self) -> &str;

    /// POST `payload` to `path` on the target.
    async fn upload(&self, path: &str, payload: &str) -> Result<(), UploadError>;

    /// Remove every entry the target holds at `path`.
    async fn delete_all(&self, path: &str) -> Result<(), UploadError>;
}

/// How the outbound HTTP client reaches the targets.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Proxy every request through this URL; `None` means direct.
    pub proxy: Option<String>,
    /// Request timeout; `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

/// Admin API client bound to a single mock server.
#[derive(Debug, Clone)]
pub struct TargetClient {
    base_url: String,
    http: Client,
}

impl TargetClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, options: &TransportOptions) -> Result<Self, SyncError> {
        let mut builder = Client::builder();

        builder = match &options.proxy {
            Some(proxy) => {
                let proxy = Proxy::all(proxy.as_str()).map_err(|source| SyncError::HttpClient {
                    url: base_url.to_string(),
                    source,
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(|source| SyncError::HttpClient {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: Option<&str>,
    ) -> Result<String, UploadError> {
        let url = format!("{}{}", self.base_url, path);
        let request = format!("{} {}", method, url);

        let mut builder = self.http.request(method, &url);
        if let Some(payload) = payload {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_string());
        }

        let response = builder.send().await.map_err(|source| UploadError::Transport {
            request: request.clone(),
            source,
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "null".to_string());

        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.to_string(),
                request,
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl AdminClient for TargetClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, path: &str, payload: &str) -> Result<(), UploadError> {
        debug!(target_url = %self.base_url, path = %path, payload = %payload, "Sending payload");
        let body = self.execute(Method::POST, path, Some(payload)).await?;
        debug!(target_url = %self.base_url, path = %path, response = %body, "Upload accepted");
        Ok(())
    }

    async fn delete_all(&self, path: &str) -> Result<(), UploadError> {
        debug!(target_url = %self.base_url, path = %path, "Deleting all entries");
        self.execute(Method::DELETE, path, None).await?;
        Ok(())
    }
}
