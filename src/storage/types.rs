use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors with user-facing messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process holds the SQLite database lock
    #[error("Another instance of gleaner appears to be using the database. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading or writing the JSON store file failed
    #[error("Store file error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON store could not be encoded or decoded
    #[error("Store file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// The referenced feed does not exist
    #[error("Feed {0} not found")]
    FeedNotFound(i64),
}

impl StoreError {
    /// Maps SQLite lock conditions to [`StoreError::InstanceLocked`]
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return StoreError::InstanceLocked;
        }
        StoreError::Database(err)
    }
}

/// SQLITE_BUSY, SQLITE_LOCKED and SQLITE_CANTOPEN all surface as these messages
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Data Structures
// ============================================================================

/// A subscribed feed.
///
/// Timestamps are Unix seconds. `last_fetched` is set at subscription and
/// bumped after every successful refresh, whether or not it found new items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub last_fetched: Option<i64>,
    pub created_at: i64,
}

/// A stored article.
///
/// `link` is unique per feed. `description` is sanitized HTML. `pub_date` is
/// text: RFC 3339 when the feed gave a parseable date, the feed's own date
/// string otherwise, or the ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
    pub is_read: bool,
    pub created_at: i64,
}

/// An article ready to be stored; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
    pub is_read: bool,
}

/// Which feeds a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope<'a> {
    /// Every user's feeds (scheduled refresh runs with this)
    AllUsers,
    /// One user's feeds
    User(&'a str),
}

impl FeedScope<'_> {
    pub fn includes(&self, user_id: &str) -> bool {
        match self {
            FeedScope::AllUsers => true,
            FeedScope::User(id) => *id == user_id,
        }
    }
}
