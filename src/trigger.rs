//! Entry point for refresh cycles.
//!
//! A scheduled caller (cron, the `watch` loop) must present the shared
//! secret; a manual caller needs nothing. Both run the same cycle.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::feed::{refresh_all, FeedClient, FeedError, RefreshSummary};
use crate::storage::{FeedScope, FeedStore};

#[derive(Debug, Error)]
pub enum TriggerError {
    /// Scheduled trigger without a matching secret, or no secret configured
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Who asked for the refresh. Either way every known feed is refreshed.
pub enum RefreshTrigger<'a> {
    /// Cron-style caller presenting the shared secret
    Scheduled { credential: &'a str },
    /// Interactive caller
    Manual,
}

/// Checks the trigger and runs one refresh cycle.
///
/// A scheduled trigger is rejected before any feed is touched when no secret
/// is configured or the credential does not match.
pub async fn run_refresh<S: FeedStore>(
    trigger: RefreshTrigger<'_>,
    expected_secret: Option<&SecretString>,
    store: &S,
    client: &FeedClient,
    cap: usize,
) -> Result<RefreshSummary, TriggerError> {
    if let RefreshTrigger::Scheduled { credential } = &trigger {
        let authorized = expected_secret
            .map(|secret| secrets_match(credential, secret.expose_secret()))
            .unwrap_or(false);
        if !authorized {
            tracing::warn!("Scheduled refresh rejected: bad or missing credential");
            return Err(TriggerError::Unauthorized);
        }
    }

    Ok(refresh_all(store, client, FeedScope::AllUsers, cap).await?)
}

/// The message both trigger paths report back.
pub fn completion_message(summary: &RefreshSummary) -> String {
    format!(
        "Refresh complete. Added {} new articles.",
        summary.new_articles
    )
}

/// Compares fixed-length digests so timing does not depend on where the
/// inputs first differ, or on the secret's length.
fn secrets_match(given: &str, expected: &str) -> bool {
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
