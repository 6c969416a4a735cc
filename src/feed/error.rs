use thiserror::Error;

use crate::storage::StoreError;

/// Errors from a single outbound HTTP request.
///
/// Covers both the discovery scrape and the feed fetch; they share one
/// transport discipline.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the per-call timeout and was cancelled
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout)
    }
}

/// Failure taxonomy for the discovery and ingestion pipeline.
///
/// `InvalidUrl` is raised before any network call. Inside a refresh cycle,
/// `Fetch`, `Parse` and `Persistence` skip the affected feed only; in the
/// subscribe path every variant is surfaced to the caller.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Input could not be turned into an absolute http/https URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Network failure, non-2xx status, or timeout
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// Body was retrieved but is not a valid RSS/Atom document
    #[error("parse error: {0}")]
    Parse(String),
    /// The discovery rule chain was exhausted without finding a feed link
    #[error("no RSS/Atom feed found for this site")]
    FeedNotFound,
    /// The store rejected a read or write
    #[error("storage error: {0}")]
    Persistence(#[from] StoreError),
}
