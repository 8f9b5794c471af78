//! HTTP transport backed by reqwest.

use super::{Fetch, FetchRequest, FetchResponse, Method};
use crate::config::{AppConfig, NetworkConfig};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client bound to the app origin.
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| LecternError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: Some(e.to_string()),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };

        if let Some(ref body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?;

        debug!("{:?} {} -> {}", request.method, request.path, status);
        Ok(FetchResponse::new(status, content_type, body))
    }
}
