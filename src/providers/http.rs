use super::util::with_retry;
use crate::core::fetch::{FetchResponse, RateFetcher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = "xrates/1.0";

/// [`RateFetcher`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            retries: 0,
            retry_delay_ms: 0,
        })
    }

    /// Opt-in retries for connect and timeout errors. Each retry is an extra
    /// request, and the request timeout applies per attempt.
    pub fn with_retries(mut self, retries: usize, retry_delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }
}

#[async_trait]
impl RateFetcher for HttpFetcher {
    #[instrument(name = "TickerFetch", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        debug!("Requesting rate from {}", url);

        let response = with_retry(
            || self.client.get(url).send(),
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Request error for URL: {url}"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to get response text")?;
        debug!(status, "Received ticker response");

        Ok(FetchResponse { status, body })
    }
}
