//! Async HTTP client wrapping reqwest.
//!
//! One GET per call, no retries. Every request carries a freshly rotated
//! user agent and browser-like headers. Redirects are followed up to a fixed
//! bound; a non-2xx final status is a transport failure.

use crate::config::HttpConfig;
use crate::errors::FetchError;
use crate::stealth;
use anyhow::{Context, Result};
use reqwest::header::USER_AGENT;
use std::time::Duration;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// HTTP client for static fetches.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }

    /// GET a page with a rotated user agent.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let mut request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(USER_AGENT, stealth::random_user_agent());
        for (name, value) in stealth::BROWSER_HEADERS {
            request = request.header(*name, *value);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::transport(url, format!("timed out after {}ms", self.timeout.as_millis()))
            } else {
                FetchError::transport(url, e)
            }
        })?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(FetchError::transport(url, format!("HTTP {}", status.as_u16())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::transport(url, format!("failed to read body: {e}")))?;

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}
