use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::store::FeedStore;
use super::types::{Article, Feed, FeedScope, NewArticle, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    next_feed_id: i64,
    next_article_id: i64,
    feeds: Vec<Feed>,
    articles: Vec<Article>,
}

impl StoreData {
    fn alloc_feed_id(&mut self) -> i64 {
        self.next_feed_id += 1;
        self.next_feed_id
    }

    fn alloc_article_id(&mut self) -> i64 {
        self.next_article_id += 1;
        self.next_article_id
    }

    fn feed_mut(&mut self, feed_id: i64) -> Result<&mut Feed, StoreError> {
        self.feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or(StoreError::FeedNotFound(feed_id))
    }

    fn user_feed_ids(&self, user_id: &str) -> HashSet<i64> {
        self.feeds
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.id)
            .collect()
    }
}

/// In-process [`FeedStore`] with optional JSON snapshots.
///
/// Without a path everything lives in memory and is gone when the process
/// exits. With a path, every mutation rewrites the snapshot atomically
/// (temp file, then rename).
#[derive(Debug, Clone)]
pub struct JsonStore {
    inner: Arc<RwLock<StoreData>>,
    path: Option<PathBuf>,
}

impl JsonStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreData::default())),
            path: None,
        }
    }

    /// Load the snapshot at `path`, starting empty if it does not exist.
    ///
    /// A snapshot that cannot be decoded is moved aside to `<path>.corrupt`
    /// and the store starts empty.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<StoreData>(&bytes) {
                Ok(data) => data,
                Err(err) => {
                    let backup = backup_path(&path);
                    warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %err,
                        "Store file is corrupt, starting empty"
                    );
                    tokio::fs::rename(&path, &backup).await?;
                    StoreData::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => StoreData::default(),
            Err(err) => return Err(err.into()),
        };

        debug!(
            path = %path.display(),
            feeds = data.feeds.len(),
            articles = data.articles.len(),
            "JSON store loaded"
        );

        Ok(Self {
            inner: Arc::new(RwLock::new(data)),
            path: Some(path),
        })
    }

    /// Applies `change` to a copy of the data and swaps it in once the
    /// snapshot is on disk, so a failed write leaves memory untouched.
    ///
    /// `change` returns its result plus whether anything changed; unchanged
    /// data is neither written nor swapped. The write guard is held across
    /// the write so concurrent mutations land on disk in order.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.inner.write().await;
        let mut next = data.clone();
        let (out, changed) = change(&mut next)?;
        if changed {
            self.persist(&next).await?;
            *data = next;
        }
        Ok(out)
    }

    async fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(data)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}

impl FeedStore for JsonStore {
    async fn list_feeds(&self, scope: FeedScope<'_>) -> Result<Vec<Feed>, StoreError> {
        let data = self.inner.read().await;
        let mut feeds: Vec<Feed> = data
            .feeds
            .iter()
            .filter(|f| scope.includes(&f.user_id))
            .cloned()
            .collect();
        feeds.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feeds)
    }

    async fn existing_links(&self, feed_id: i64) -> Result<HashSet<String>, StoreError> {
        let data = self.inner.read().await;
        Ok(data
            .articles
            .iter()
            .filter(|a| a.feed_id == feed_id)
            .map(|a| a.link.clone())
            .collect())
    }

    async fn insert_articles(&self, articles: &[NewArticle]) -> Result<Vec<Article>, StoreError> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now().timestamp();
        self.mutate(|data| {
            let mut seen: HashSet<(i64, String)> = data
                .articles
                .iter()
                .map(|a| (a.feed_id, a.link.clone()))
                .collect();

            let mut inserted = Vec::new();
            for article in articles {
                if !seen.insert((article.feed_id, article.link.clone())) {
                    continue;
                }
                let stored = Article {
                    id: data.alloc_article_id(),
                    feed_id: article.feed_id,
                    title: article.title.clone(),
                    link: article.link.clone(),
                    description: article.description.clone(),
                    pub_date: article.pub_date.clone(),
                    is_read: article.is_read,
                    created_at: now,
                };
                data.articles.push(stored.clone());
                inserted.push(stored);
            }

            let changed = !inserted.is_empty();
            Ok((inserted, changed))
        })
        .await
    }

    async fn update_feed_last_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.mutate(|data| {
            data.feed_mut(feed_id)?.last_fetched = Some(at.timestamp());
            Ok(((), true))
        })
        .await
    }

    async fn insert_feed(
        &self,
        user_id: &str,
        url: &str,
        title: &str,
    ) -> Result<Feed, StoreError> {
        let now = Utc::now().timestamp();
        self.mutate(|data| {
            if let Some(existing) = data
                .feeds
                .iter_mut()
                .find(|f| f.user_id == user_id && f.url == url)
            {
                existing.title = title.to_string();
                return Ok((existing.clone(), true));
            }

            let feed = Feed {
                id: data.alloc_feed_id(),
                user_id: user_id.to_string(),
                url: url.to_string(),
                title: title.to_string(),
                last_fetched: Some(now),
                created_at: now,
            };
            data.feeds.push(feed.clone());
            Ok((feed, true))
        })
        .await
    }

    async fn update_feed_title(&self, feed_id: i64, title: &str) -> Result<(), StoreError> {
        self.mutate(|data| {
            data.feed_mut(feed_id)?.title = title.to_string();
            Ok(((), true))
        })
        .await
    }

    async fn delete_feed(&self, feed_id: i64) -> Result<bool, StoreError> {
        self.mutate(|data| {
            let before = data.feeds.len();
            data.feeds.retain(|f| f.id != feed_id);
            if data.feeds.len() == before {
                return Ok((false, false));
            }
            data.articles.retain(|a| a.feed_id != feed_id);
            Ok((true, true))
        })
        .await
    }

    async fn list_articles(&self, user_id: &str) -> Result<Vec<Article>, StoreError> {
        let data = self.inner.read().await;
        let feed_ids = data.user_feed_ids(user_id);
        let mut articles: Vec<Article> = data
            .articles
            .iter()
            .filter(|a| feed_ids.contains(&a.feed_id))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(articles)
    }

    async fn mark_article_read(&self, article_id: i64) -> Result<bool, StoreError> {
        self.mutate(|data| {
            let Some(article) = data
                .articles
                .iter_mut()
                .find(|a| a.id == article_id && !a.is_read)
            else {
                return Ok((false, false));
            };
            article.is_read = true;
            Ok((true, true))
        })
        .await
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, StoreError> {
        self.mutate(|data| {
            let feed_ids = data.user_feed_ids(user_id);
            let mut changed = 0u64;
            for article in data
                .articles
                .iter_mut()
                .filter(|a| !a.is_read && feed_ids.contains(&a.feed_id))
            {
                article.is_read = true;
                changed += 1;
            }
            Ok((changed, changed > 0))
        })
        .await
    }
}
