//! Feed discovery and ingestion.
//!
//! Given a site or feed URL, `gleaner` finds the RSS/Atom feed, parses it,
//! and periodically re-fetches known feeds, storing only items whose link it
//! has not seen before.

pub mod config;
pub mod feed;
pub mod storage;
pub mod trigger;
mod util;
