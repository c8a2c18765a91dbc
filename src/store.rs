//! Durable key-value persistence for the favorite set.
//!
//! Values are whole strings replaced atomically; there are no partial updates.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Fixed key under which the favorite ids are stored.
pub const FAVORITES_KEY: &str = "favoriteMovieIds";

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl FavoriteStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence(format!(
                "reading {} failed: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::Persistence(format!("creating {} failed: {e}", self.dir.display()))
        })?;
        let path = self.path_for(key);
        // Write-then-rename so readers never see a half-written value.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| Error::Persistence(format!("writing {} failed: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Persistence(format!("replacing {} failed: {e}", path.display())))?;
        debug!(key, path = %path.display(), "Persisted value");
        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::FavoriteSet;

    #[tokio::test]
    async fn file_store_round_trips_favorite_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get(FAVORITES_KEY).await.unwrap(), None);

        let set: FavoriteSet = [550, 13, 603, -1].into_iter().collect();
        store.set(FAVORITES_KEY, &set.to_json()).await.unwrap();

        let raw = store.get(FAVORITES_KEY).await.unwrap().unwrap();
        assert_eq!(raw, "[550,13,603,-1]");
        assert_eq!(FavoriteSet::from_json(&raw).unwrap(), set);
    }

    #[tokio::test]
    async fn file_store_replaces_whole_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.set(FAVORITES_KEY, "[1,2,3]").await.unwrap();
        store.set(FAVORITES_KEY, "[]").await.unwrap();

        assert_eq!(store.get(FAVORITES_KEY).await.unwrap().as_deref(), Some("[]"));
        assert!(!dir.path().join("favoriteMovieIds.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_reports_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = FileStore::new(blocker.join("data"));

        let err = store.set(FAVORITES_KEY, "[1]").await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn memory_store_keeps_keys_apart() {
        let store = MemoryStore::new();
        store.set("a", "[1]").await.unwrap();
        store.set("b", "[2]").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
