use std::collections::HashSet;

use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{Article, NewArticle, StoreError};

/// 6 bound columns * 50 rows stays well under SQLite's parameter limit
const BATCH_SIZE: usize = 50;

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Links already stored for a feed, used by the dedup engine
    pub async fn existing_links(&self, feed_id: i64) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT link FROM articles WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(link,)| link).collect())
    }

    /// Insert articles, skipping any whose (feed_id, link) already exists
    ///
    /// Returns only the rows that were created. All batches run in a single
    /// transaction.
    pub async fn insert_articles(
        &self,
        articles: &[NewArticle],
    ) -> Result<Vec<Article>, StoreError> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(articles.len());

        for chunk in articles.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO articles (feed_id, title, link, description, pub_date, is_read, created_at) ",
            );

            builder.push_values(chunk, |mut b, article| {
                b.push_bind(article.feed_id)
                    .push_bind(&article.title)
                    .push_bind(&article.link)
                    .push_bind(&article.description)
                    .push_bind(&article.pub_date)
                    .push_bind(article.is_read)
                    .push_bind(now);
            });

            // OR IGNORE rows produce no RETURNING output
            builder.push(
                " RETURNING id, feed_id, title, link, description, pub_date, is_read, created_at",
            );

            let rows = builder
                .build_query_as::<Article>()
                .fetch_all(&mut *tx)
                .await?;
            inserted.extend(rows);
        }

        tx.commit().await?;

        tracing::debug!(
            requested = articles.len(),
            inserted = inserted.len(),
            "Inserted articles"
        );
        Ok(inserted)
    }

    /// Articles across every feed the user is subscribed to
    ///
    /// Ordered by ingestion time, newest first. `pub_date` is free-form text
    /// from the feed and does not sort reliably.
    pub async fn list_articles(&self, user_id: &str) -> Result<Vec<Article>, StoreError> {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT a.id, a.feed_id, a.title, a.link, a.description, a.pub_date, a.is_read, a.created_at
            FROM articles a
            JOIN feeds f ON f.id = a.feed_id
            WHERE f.user_id = ?
            ORDER BY a.created_at DESC, a.id ASC
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    /// Returns true if the article existed and was unread
    pub async fn mark_article_read(&self, article_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE articles SET is_read = 1 WHERE id = ? AND is_read = 0")
            .bind(article_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE articles SET is_read = 1
            WHERE is_read = 0
              AND feed_id IN (SELECT id FROM feeds WHERE user_id = ?)
        "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
