use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use client_core::Article;
use tracing::debug;

use crate::{ArticleCache, CacheError, upsert_articles};

/// Article cache persisted as a JSON array on disk.
///
/// Writes go to a temp file first and are renamed over the target.
#[derive(Debug)]
pub struct JsonFileArticleCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileArticleCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Article>, CacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(CacheError::Unavailable(format!(
                    "failed reading {}: {err}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&raw).map_err(|err| {
            CacheError::Corrupt(format!("failed parsing {}: {err}", self.path.display()))
        })
    }

    fn store(&self, articles: &[Article]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                CacheError::Backend(format!(
                    "failed creating cache directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let encoded =
            serde_json::to_vec(articles).map_err(|err| CacheError::Backend(err.to_string()))?;
        let temp_path = temp_path_for(&self.path);
        fs::write(&temp_path, encoded).map_err(|err| {
            CacheError::Backend(format!(
                "failed writing temp cache {}: {err}",
                temp_path.display()
            ))
        })?;

        if let Err(rename_err) = fs::rename(&temp_path, &self.path) {
            // Windows does not allow replacing existing files via rename.
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    let _ = fs::remove_file(&temp_path);
                    return Err(CacheError::Backend(format!(
                        "failed replacing {} after rename error ({rename_err}): {err}",
                        self.path.display()
                    )));
                }
            }
            fs::rename(&temp_path, &self.path).map_err(|err| {
                let _ = fs::remove_file(&temp_path);
                CacheError::Backend(format!(
                    "failed moving temp cache into {}: {err}",
                    self.path.display()
                ))
            })?;
        }

        debug!(path = %self.path.display(), count = articles.len(), "persisted article cache");
        Ok(())
    }
}

impl ArticleCache for JsonFileArticleCache {
    fn read_articles(&self) -> Result<Vec<Article>, CacheError> {
        self.load()
    }

    fn write_articles(&self, articles: &[Article]) -> Result<(), CacheError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))?;
        let mut current = self.load()?;
        upsert_articles(&mut current, articles);
        self.store(&current)
    }

    fn clear(&self) -> Result<(), CacheError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheError::Backend(format!(
                "failed deleting {}: {err}",
                self.path.display()
            ))),
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("articles.json");
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    parent.join(format!(".{file_name}.{now_nanos}.tmp"))
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::tests::article;

    fn unique_temp_path(label: &str) -> PathBuf {
        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        env::temp_dir().join(format!("market-client-{label}-{now_nanos}.json"))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let cache = JsonFileArticleCache::new(unique_temp_path("missing"));
        assert!(cache.read_articles().expect("read").is_empty());
    }

    #[test]
    fn persists_and_upserts_across_instances() {
        let path = unique_temp_path("articles");
        let cache = JsonFileArticleCache::new(&path);
        cache
            .write_articles(&[article(1, "one"), article(2, "two")])
            .expect("write should work");

        let reopened = JsonFileArticleCache::new(&path);
        reopened
            .write_articles(&[article(1, "one v2")])
            .expect("upsert should work");
        let loaded = reopened.read_articles().expect("read should work");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].article_title, "one v2");

        reopened.clear().expect("clear should work");
        assert!(cache.read_articles().expect("read after clear").is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = unique_temp_path("corrupt");
        fs::write(&path, "not json").expect("seed corrupt file");
        let cache = JsonFileArticleCache::new(&path);

        let err = cache.read_articles().expect_err("corrupt file should fail");
        assert!(matches!(err, CacheError::Corrupt(_)));
        cache.clear().expect("cleanup");
    }
}
