//! Persistence for feeds and articles.
//!
//! [`FeedStore`] is the contract the ingestion pipeline is written against.
//! [`Database`] backs it with SQLite; [`JsonStore`] keeps everything in
//! process and can snapshot to a JSON file.

mod articles;
mod feeds;
mod json;
mod schema;
mod store;
mod types;

pub use json::JsonStore;
pub use schema::Database;
pub use store::FeedStore;
pub use types::{Article, Feed, FeedScope, NewArticle, StoreError};
