//! HTTP access to the radiation monitor
//!
//! Each fetch makes up to `1 + max_retries` requests, pausing a fixed delay
//! between them. Any transport error, timeout, non-2xx status or empty body
//! counts as a failed attempt.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument, trace};

use crate::config::Config;
use crate::error::{CycleError, CycleResult};

/// Device path to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Regular data request
    Read,

    /// Ask the device to reboot (its clock or counters are suspect)
    Reset,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Read => "rdata",
            Endpoint::Reset => "reset",
        }
    }
}

/// Bounded retry settings for one fetch
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
}

pub struct DeviceFetcher {
    /// HTTP client (reused across requests)
    client: reqwest::Client,

    device_url: String,

    mirror_url: Option<String>,

    retry: RetryPolicy,
}

impl DeviceFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            device_url: config.device_url.trim_end_matches('/').to_string(),
            mirror_url: config.mirror_url.clone(),
            retry: RetryPolicy {
                max_retries: config.retry.max_retries,
                delay: config.retry_delay(),
            },
        })
    }

    /// URL requested for the given endpoint
    pub fn url(&self, endpoint: Endpoint) -> String {
        match &self.mirror_url {
            Some(mirror) => mirror.clone(),
            None => format!("{}/{}", self.device_url, endpoint.path()),
        }
    }

    /// Fetch the raw data string, retrying transient failures
    #[instrument(skip(self))]
    pub async fn fetch(&self, endpoint: Endpoint) -> CycleResult<String> {
        let url = self.url(endpoint);
        let attempts = self.retry.max_retries + 1;

        let mut attempt = 0;
        loop {
            attempt += 1;
            trace!("{url}: request attempt {attempt}/{attempts}");

            let error = match self.request(&url).await {
                Ok(content) => {
                    debug!("{url}: received {} bytes", content.len());
                    return Ok(content);
                }
                Err(e) => e,
            };

            if attempt >= attempts {
                return Err(CycleError::Network(format!(
                    "{url}: giving up after {attempts} attempts: {error:#}"
                )));
            }

            debug!("{url}: http error: {error:#}");
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    /// One request; the body lines are trimmed and joined into one string
    async fn request(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to send HTTP request")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("failed to read response body")?;

        let content: String = body.lines().map(str::trim).collect();
        if content.is_empty() {
            anyhow::bail!("empty response body");
        }

        Ok(content)
    }
}
