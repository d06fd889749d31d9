use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::model::RawFeedDocument;
use crate::config::Config;
use crate::util::{ensure_public_host, parse_feed_url, UrlValidationError};

/// Errors that can occur while retrieving a feed body.
///
/// None of these abort a run; the pipeline logs them against the URL and
/// moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the configured size limit
    #[error("Response too large (limit {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// URL rejected before any request was made
    #[error("URL not fetchable: {0}")]
    Blocked(#[from] UrlValidationError),
}

/// Single-attempt HTTP retrieval of feed documents.
///
/// Cheap to clone; the inner `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
    allow_private_hosts: bool,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: config.max_feed_bytes,
            allow_private_hosts: config.allow_private_hosts,
        }
    }

    /// Performs one GET against `url` and returns the full body.
    ///
    /// There are no retries: a failed feed is picked up again on the next
    /// run.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Blocked`] - URL malformed, or private host while the policy forbids it
    /// - [`FetchError::Network`] - Connection or TLS errors
    /// - [`FetchError::Timeout`] - Request exceeded the configured timeout
    /// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
    /// - [`FetchError::ResponseTooLarge`] - Body exceeded `max_feed_bytes`
    /// - [`FetchError::IncompleteResponse`] - Body shorter than `Content-Length`
    pub async fn fetch(&self, url: &str) -> Result<RawFeedDocument, FetchError> {
        let parsed = parse_feed_url(url)?;
        if !self.allow_private_hosts {
            ensure_public_host(&parsed)?;
        }

        let body = tokio::time::timeout(self.timeout, self.get_body(parsed))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        tracing::debug!(url = %url, bytes = body.len(), "Fetched feed");

        Ok(RawFeedDocument {
            url: url.to_string(),
            body,
        })
    }

    async fn get_body(&self, url: url::Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
