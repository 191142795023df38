//! HTTP transport for delivering visits
//!
//! A single POST per visit. The response status is returned but not judged:
//! only a failure to complete the request counts as a delivery failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::ReporterConfig;
use crate::error::{Error, Result};

/// One outbound JSON POST
#[derive(Debug, Clone)]
pub struct PostRequest<'a> {
    pub url: &'a str,
    /// Sent as `Authorization: Bearer <token>` when present
    pub bearer_token: Option<&'a str>,
    pub body: serde_json::Value,
}

/// Sends JSON POST requests; returns the HTTP status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: PostRequest<'_>) -> Result<u16>;
}

/// [`Transport`] backed by a shared `reqwest` client
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from reporter configuration
    ///
    /// No timeout is set unless `timeout_secs` is configured.
    pub fn new(config: &ReporterConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: PostRequest<'_>) -> Result<u16> {
        let mut builder = self.http_client.post(request.url).json(&request.body);
        if let Some(token) = request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %request.url, %status, "Non-success status from endpoint");
        }
        Ok(status.as_u16())
    }
}
