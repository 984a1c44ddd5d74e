//! Outbound fetch abstraction used by the rate cache

use crate::core::path::PathError;
use anyhow::Result;
use async_trait::async_trait;

/// Raw outcome of a GET that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs a single GET. An `Err` means the request never produced a
/// response (connection, DNS, timeout); HTTP error statuses come back as
/// `Ok` with the status set.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Why a single source produced no rate during a refresh pass.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Failed to parse JSON response: {0}")]
    Body(#[from] serde_json::Error),
    #[error(transparent)]
    Path(#[from] PathError),
}
