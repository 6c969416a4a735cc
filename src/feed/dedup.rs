//! Link-based novelty detection.
//!
//! Turns a freshly parsed item list into the articles that should be stored,
//! given the links the feed already has. Everything here is a pure function
//! of its inputs (the ingestion time is passed in), so the refresh and
//! subscribe paths share it and tests need no I/O.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::parser::ParsedItem;
use crate::storage::NewArticle;

/// Items admitted per feed during a scheduled or manual refresh.
pub const REFRESH_CAP: usize = 10;
/// Items admitted when a feed is first subscribed.
pub const SUBSCRIBE_CAP: usize = 5;

const UNTITLED: &str = "Untitled";

/// Selects the items of `items` that are new for a feed.
///
/// An item is new when it has a non-empty link that is neither in
/// `existing_links` nor used by an earlier item of the same batch. At most
/// `cap` items survive, taken in source order; nothing is re-sorted.
///
/// Each survivor is mapped with:
/// - description: `content_encoded`, then `content`, then `content_snippet`, then `""`
/// - pub_date: `iso_date`, then `pub_date`, then `now` (RFC 3339)
/// - `is_read = false`
///
/// Descriptions are returned raw; sanitize before storing.
pub fn diff_new_items(
    feed_id: i64,
    existing_links: &HashSet<String>,
    items: &[ParsedItem],
    cap: usize,
    now: DateTime<Utc>,
) -> Vec<NewArticle> {
    let mut batch_links: HashSet<&str> = HashSet::new();

    items
        .iter()
        .filter_map(|item| {
            let link = item.link.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
            if existing_links.contains(link) || !batch_links.insert(link) {
                return None;
            }
            Some((item, link))
        })
        .take(cap)
        .map(|(item, link)| NewArticle {
            feed_id,
            title: item
                .title
                .clone()
                .unwrap_or_else(|| UNTITLED.to_owned()),
            link: link.to_owned(),
            description: select_content(item).to_owned(),
            pub_date: select_pub_date(item, now),
            is_read: false,
        })
        .collect()
}

fn select_content(item: &ParsedItem) -> &str {
    [&item.content_encoded, &item.content, &item.content_snippet]
        .into_iter()
        .find_map(|c| c.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or("")
}

fn select_pub_date(item: &ParsedItem, now: DateTime<Utc>) -> String {
    [&item.iso_date, &item.pub_date]
        .into_iter()
        .find_map(|d| d.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_owned)
        .unwrap_or_else(|| now.to_rfc3339())
}
