use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{Feed, FeedScope, StoreError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed, or update the title if the user already has this URL
    pub async fn insert_feed(
        &self,
        user_id: &str,
        url: &str,
        title: &str,
    ) -> Result<Feed, StoreError> {
        let now = Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (user_id, url, title, last_fetched, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, url) DO UPDATE SET title = excluded.title
            RETURNING id, user_id, url, title, last_fetched, created_at
        "#,
        )
        .bind(user_id)
        .bind(url)
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(feed)
    }

    /// List feeds, newest subscription first
    pub async fn list_feeds(&self, scope: FeedScope<'_>) -> Result<Vec<Feed>, StoreError> {
        let feeds = match scope {
            FeedScope::AllUsers => {
                sqlx::query_as::<_, Feed>(
                    r#"
                    SELECT id, user_id, url, title, last_fetched, created_at
                    FROM feeds
                    ORDER BY created_at DESC, id DESC
                "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            FeedScope::User(user_id) => {
                sqlx::query_as::<_, Feed>(
                    r#"
                    SELECT id, user_id, url, title, last_fetched, created_at
                    FROM feeds
                    WHERE user_id = ?
                    ORDER BY created_at DESC, id DESC
                "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(feeds)
    }

    /// Record a completed fetch
    pub async fn update_feed_last_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE feeds SET last_fetched = ? WHERE id = ?")
            .bind(at.timestamp())
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::FeedNotFound(feed_id));
        }
        Ok(())
    }

    pub async fn update_feed_title(&self, feed_id: i64, title: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE feeds SET title = ? WHERE id = ?")
            .bind(title)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::FeedNotFound(feed_id));
        }
        Ok(())
    }

    /// Delete a feed and its articles in one transaction
    ///
    /// The foreign key cascades too; the explicit delete keeps the behavior
    /// for databases created with foreign keys disabled.
    pub async fn delete_feed(&self, feed_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM articles WHERE feed_id = ?")
            .bind(feed_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(feed_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
