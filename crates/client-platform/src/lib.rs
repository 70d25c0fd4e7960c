//! Local article cache used by repositories for offline lists.

use std::sync::{Arc, RwLock};

use client_core::Article;
use thiserror::Error;

mod file_cache;

pub use file_cache::JsonFileArticleCache;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("article cache unavailable: {0}")]
    Unavailable(String),
    #[error("article cache contents are corrupt: {0}")]
    Corrupt(String),
    #[error("article cache backend failure: {0}")]
    Backend(String),
}

/// Synchronous local store for cached articles.
///
/// Implementations may block; callers run them on a blocking worker.
pub trait ArticleCache: Send + Sync {
    fn read_articles(&self) -> Result<Vec<Article>, CacheError>;

    /// Insert or replace articles by `article_id`.
    fn write_articles(&self, articles: &[Article]) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}

impl<C: ArticleCache + ?Sized> ArticleCache for Arc<C> {
    fn read_articles(&self) -> Result<Vec<Article>, CacheError> {
        (**self).read_articles()
    }

    fn write_articles(&self, articles: &[Article]) -> Result<(), CacheError> {
        (**self).write_articles(articles)
    }

    fn clear(&self) -> Result<(), CacheError> {
        (**self).clear()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryArticleCache {
    data: Arc<RwLock<Vec<Article>>>,
}

impl ArticleCache for InMemoryArticleCache {
    fn read_articles(&self) -> Result<Vec<Article>, CacheError> {
        let data = self
            .data
            .read()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))?;
        Ok(data.clone())
    }

    fn write_articles(&self, articles: &[Article]) -> Result<(), CacheError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))?;
        upsert_articles(&mut data, articles);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))?;
        data.clear();
        Ok(())
    }
}

/// Replace entries with matching ids in place and append the rest in order.
pub(crate) fn upsert_articles(existing: &mut Vec<Article>, incoming: &[Article]) {
    for article in incoming {
        match existing
            .iter_mut()
            .find(|current| current.article_id == article.article_id)
        {
            Some(current) => *current = article.clone(),
            None => existing.push(article.clone()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn article(id: u64, title: &str) -> Article {
        Article {
            article_id: id,
            article_image: None,
            article_title: title.to_owned(),
            article_price: "12,000".to_owned(),
            book_status: "BEST".to_owned(),
            selling_location: "SEOUL".to_owned(),
            chat_count: 0,
            favorite_count: 1,
            before_time: "1 hour ago".to_owned(),
        }
    }

    #[test]
    fn in_memory_upserts_by_id() {
        let cache = InMemoryArticleCache::default();
        cache
            .write_articles(&[article(1, "one"), article(2, "two")])
            .expect("write should work");
        cache
            .write_articles(&[article(2, "two v2"), article(3, "three")])
            .expect("second write should work");

        let titles: Vec<String> = cache
            .read_articles()
            .expect("read should work")
            .into_iter()
            .map(|a| a.article_title)
            .collect();
        assert_eq!(titles, vec!["one", "two v2", "three"]);
    }

    #[test]
    fn clones_share_storage() {
        let cache = InMemoryArticleCache::default();
        let other = cache.clone();
        cache.write_articles(&[article(1, "one")]).expect("write");
        assert_eq!(other.read_articles().expect("read").len(), 1);

        other.clear().expect("clear");
        assert!(cache.read_articles().expect("read").is_empty());
    }

    #[derive(Default)]
    struct FailingCache;

    impl ArticleCache for FailingCache {
        fn read_articles(&self) -> Result<Vec<Article>, CacheError> {
            Err(CacheError::Unavailable("mock outage".to_owned()))
        }

        fn write_articles(&self, _articles: &[Article]) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("mock outage".to_owned()))
        }

        fn clear(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("mock outage".to_owned()))
        }
    }

    #[test]
    fn failure_propagates_through_shared_handle() {
        let shared: Arc<dyn ArticleCache> = Arc::new(FailingCache);
        let err = shared.read_articles().expect_err("read must fail");
        assert_eq!(err, CacheError::Unavailable("mock outage".to_owned()));
    }
}
