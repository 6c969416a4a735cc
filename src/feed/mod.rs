//! Feed discovery and ingestion.
//!
//! The pipeline, leaf first:
//!
//! - `normalize` turns user input into an absolute http/https URL
//! - `discovery` resolves a site URL to its feed URL
//! - `parser` fetches and parses RSS/Atom through the shared [`FeedClient`]
//! - `dedup` picks the items a feed has not stored yet
//! - `sanitize` cleans item HTML before it is stored
//! - `refresh` drives all of the above for subscription and refresh cycles
//!
//! # Example
//!
//! ```ignore
//! use gleaner::feed::{refresh_all, subscribe, FeedClient, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, REFRESH_CAP, SUBSCRIBE_CAP};
//! use gleaner::storage::{FeedScope, JsonStore};
//!
//! let store = JsonStore::in_memory();
//! let client = FeedClient::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)?;
//! subscribe(&store, &client, "local", "example.substack.com", SUBSCRIBE_CAP).await?;
//! let summary = refresh_all(&store, &client, FeedScope::AllUsers, REFRESH_CAP).await?;
//! ```

mod client;
mod dedup;
mod discovery;
mod error;
mod normalize;
mod parser;
mod refresh;
mod sanitize;

pub use client::{FeedClient, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use dedup::{diff_new_items, REFRESH_CAP, SUBSCRIBE_CAP};
pub use discovery::{discover_feed, discover_offline, find_feed_link, DiscoveredFeed, DiscoveryRule};
pub use error::{FeedError, FetchError};
pub use normalize::normalize_url;
pub use parser::{fetch_feed, parse_feed, ParsedFeed, ParsedItem};
pub use refresh::{
    refresh_all, refresh_feed, subscribe, RefreshSummary, Subscription, UNKNOWN_FEED_TITLE,
};
pub use sanitize::sanitize_html;
