//! The ingestion drivers: first-time subscription and the refresh cycle.
//!
//! Both share one tail: load the feed's known links, diff the parsed items
//! against them, sanitize what survives, and store it.

use chrono::Utc;

use super::client::FeedClient;
use super::dedup::diff_new_items;
use super::discovery::{discover_feed, DiscoveryRule};
use super::error::FeedError;
use super::normalize::normalize_url;
use super::parser::{fetch_feed, ParsedItem};
use super::sanitize::sanitize_html;
use crate::storage::{Article, Feed, FeedScope, FeedStore};

/// Title stored when a newly subscribed feed does not name itself.
pub const UNKNOWN_FEED_TITLE: &str = "Unknown Feed";

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Feeds the cycle attempted
    pub feeds: usize,
    /// Feeds skipped because fetching, parsing or storing failed
    pub failed: usize,
    /// Articles stored across all feeds
    pub new_articles: usize,
}

/// A feed that was just subscribed, with the articles stored for it.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub feed: Feed,
    pub rule: DiscoveryRule,
    pub articles: Vec<Article>,
}

/// Subscribes `user_id` to the feed behind `raw_url`.
///
/// Normalizes the input, resolves it through the discovery chain, fetches
/// and parses the feed, records it, then stores up to `cap` of its items.
/// Any failure is returned as is; nothing is retried.
pub async fn subscribe<S: FeedStore>(
    store: &S,
    client: &FeedClient,
    user_id: &str,
    raw_url: &str,
    cap: usize,
) -> Result<Subscription, FeedError> {
    let url = normalize_url(raw_url)?;
    let discovered = discover_feed(client, &url).await?;
    let parsed = fetch_feed(client, discovered.feed_url.as_str()).await?;

    let title = if parsed.title.is_empty() {
        UNKNOWN_FEED_TITLE
    } else {
        parsed.title.as_str()
    };

    let feed = store
        .insert_feed(user_id, discovered.feed_url.as_str(), title)
        .await?;
    let articles = ingest_items(store, feed.id, &parsed.items, cap).await?;

    tracing::info!(
        feed_id = feed.id,
        url = %feed.url,
        rule = ?discovered.rule,
        new_articles = articles.len(),
        "Subscribed to feed"
    );

    Ok(Subscription {
        feed,
        rule: discovered.rule,
        articles,
    })
}

/// Runs one refresh cycle over every feed in `scope`.
///
/// Feeds are processed one at a time, in the order the store lists them.
/// Each feed is fetched from its stored URL; discovery is not re-run. A feed
/// whose fetch, parse or store step fails is logged and skipped, and the
/// cycle moves on.
///
/// # Errors
///
/// Only a failure to list the feeds aborts the cycle.
pub async fn refresh_all<S: FeedStore>(
    store: &S,
    client: &FeedClient,
    scope: FeedScope<'_>,
    cap: usize,
) -> Result<RefreshSummary, FeedError> {
    let feeds = store.list_feeds(scope).await?;
    let mut summary = RefreshSummary {
        feeds: feeds.len(),
        ..Default::default()
    };

    tracing::info!(feeds = feeds.len(), "Starting refresh cycle");

    for feed in &feeds {
        match refresh_feed(store, client, feed, cap).await {
            Ok(added) => summary.new_articles += added,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    feed_id = feed.id,
                    url = %feed.url,
                    error = %e,
                    "Feed refresh failed, skipping"
                );
            }
        }
    }

    tracing::info!(
        feeds = summary.feeds,
        failed = summary.failed,
        new_articles = summary.new_articles,
        "Refresh cycle complete"
    );
    Ok(summary)
}

/// Refreshes a single stored feed and returns how many articles it gained.
///
/// `last_fetched` is bumped after every successful fetch, including when no
/// item was new.
pub async fn refresh_feed<S: FeedStore>(
    store: &S,
    client: &FeedClient,
    feed: &Feed,
    cap: usize,
) -> Result<usize, FeedError> {
    let parsed = fetch_feed(client, &feed.url).await?;

    let added = ingest_items(store, feed.id, &parsed.items, cap).await?;

    if !parsed.title.is_empty() && parsed.title != feed.title {
        store.update_feed_title(feed.id, &parsed.title).await?;
    }
    store.update_feed_last_fetched(feed.id, Utc::now()).await?;

    tracing::debug!(feed_id = feed.id, new_articles = added.len(), "Feed refreshed");
    Ok(added.len())
}

async fn ingest_items<S: FeedStore>(
    store: &S,
    feed_id: i64,
    items: &[ParsedItem],
    cap: usize,
) -> Result<Vec<Article>, FeedError> {
    let existing = store.existing_links(feed_id).await?;

    let mut candidates = diff_new_items(feed_id, &existing, items, cap, Utc::now());
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    for article in &mut candidates {
        article.description = sanitize_html(&article.description);
    }

    Ok(store.insert_articles(&candidates).await?)
}
