use futures::StreamExt;
use std::time::Duration;

use super::error::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RSSReader/1.0)";
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// HTTP transport shared by discovery and feed fetching.
///
/// Built once at startup and handed to every pipeline operation. Cloning is
/// cheap: `reqwest::Client` is reference counted internally.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl FeedClient {
    /// Builds a client with the given user agent and per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Ok(Self { http, timeout })
    }

    /// Wraps an existing `reqwest::Client`. The caller owns its configuration.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `url` and returns the body bytes.
    ///
    /// The whole exchange, headers and body, runs under one timeout. On expiry
    /// the request future is dropped, which aborts the connection, and
    /// [`FetchError::Timeout`] is returned. Non-2xx responses fail with
    /// [`FetchError::HttpStatus`] without reading the body.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::timeout(self.timeout, self.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_BODY_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: trust an oversized Content-Length
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
