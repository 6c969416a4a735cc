use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::types::{Article, Feed, FeedScope, NewArticle, StoreError};

/// Persistence contract for feeds and articles.
///
/// Two implementations exist: [`Database`](super::Database) (SQLite) and
/// [`JsonStore`](super::JsonStore) (in-process, optionally snapshotted to a
/// file). One is chosen at startup and the pipeline is generic over it.
#[allow(async_fn_in_trait)]
pub trait FeedStore {
    /// Feeds in `scope`, newest subscription first.
    async fn list_feeds(&self, scope: FeedScope<'_>) -> Result<Vec<Feed>, StoreError>;

    /// Links of every article already stored for `feed_id`.
    async fn existing_links(&self, feed_id: i64) -> Result<HashSet<String>, StoreError>;

    /// Stores `articles` and returns the rows actually created.
    ///
    /// An article whose link is already stored for its feed is skipped rather
    /// than rejected, so a concurrent refresh that inserted it first is not
    /// an error.
    async fn insert_articles(&self, articles: &[NewArticle]) -> Result<Vec<Article>, StoreError>;

    async fn update_feed_last_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Subscribes `user_id` to `url`. Re-subscribing updates the title and
    /// returns the existing feed.
    async fn insert_feed(&self, user_id: &str, url: &str, title: &str)
        -> Result<Feed, StoreError>;

    async fn update_feed_title(&self, feed_id: i64, title: &str) -> Result<(), StoreError>;

    /// Deletes a feed and its articles. Returns false if it did not exist.
    async fn delete_feed(&self, feed_id: i64) -> Result<bool, StoreError>;

    /// All of a user's articles, most recently ingested first.
    async fn list_articles(&self, user_id: &str) -> Result<Vec<Article>, StoreError>;

    /// Marks an article read. Returns whether it changed; read never reverts.
    async fn mark_article_read(&self, article_id: i64) -> Result<bool, StoreError>;

    /// Marks every unread article of a user read; returns how many changed.
    async fn mark_all_read(&self, user_id: &str) -> Result<u64, StoreError>;
}

impl FeedStore for super::Database {
    async fn list_feeds(&self, scope: FeedScope<'_>) -> Result<Vec<Feed>, StoreError> {
        super::Database::list_feeds(self, scope).await
    }

    async fn existing_links(&self, feed_id: i64) -> Result<HashSet<String>, StoreError> {
        super::Database::existing_links(self, feed_id).await
    }

    async fn insert_articles(&self, articles: &[NewArticle]) -> Result<Vec<Article>, StoreError> {
        super::Database::insert_articles(self, articles).await
    }

    async fn update_feed_last_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        super::Database::update_feed_last_fetched(self, feed_id, at).await
    }

    async fn insert_feed(
        &self,
        user_id: &str,
        url: &str,
        title: &str,
    ) -> Result<Feed, StoreError> {
        super::Database::insert_feed(self, user_id, url, title).await
    }

    async fn update_feed_title(&self, feed_id: i64, title: &str) -> Result<(), StoreError> {
        super::Database::update_feed_title(self, feed_id, title).await
    }

    async fn delete_feed(&self, feed_id: i64) -> Result<bool, StoreError> {
        super::Database::delete_feed(self, feed_id).await
    }

    async fn list_articles(&self, user_id: &str) -> Result<Vec<Article>, StoreError> {
        super::Database::list_articles(self, user_id).await
    }

    async fn mark_article_read(&self, article_id: i64) -> Result<bool, StoreError> {
        super::Database::mark_article_read(self, article_id).await
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, StoreError> {
        super::Database::mark_all_read(self, user_id).await
    }
}
