use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store not found: {0}")]
    NotFound(String),
}

/// One JSON document on disk holding a whole component state.
#[derive(Debug, Clone)]
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Strict load: a missing file is `NotFound`, bad JSON is an error.
    pub async fn try_load(&self) -> Result<T, MemoryError> {
        if !self.exists().await {
            return Err(MemoryError::NotFound(self.path.display().to_string()));
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Lenient load used at startup. Missing or unreadable state starts fresh.
    pub async fn load(&self) -> T {
        match self.try_load().await {
            Ok(value) => {
                tracing::debug!("Loaded store {:?}", self.path);
                value
            }
            Err(MemoryError::NotFound(_)) => {
                tracing::info!("No store at {:?}, starting fresh", self.path);
                T::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable store {:?}: {}", self.path, e);
                T::default()
            }
        }
    }

    pub async fn save(&self, value: &T) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        let content = serde_json::to_string_pretty(value)?;

        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;

        tracing::debug!("Saved store {:?}", self.path);
        Ok(())
    }

    pub async fn remove(&self) -> Result<(), MemoryError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
            tracing::info!("Removed store {:?}", self.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Usage {
        counts: BTreeMap<String, u32>,
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Usage> = JsonStore::new(temp_dir.path().join("launcher/usage.json"));

        assert_eq!(store.load().await, Usage::default());
        assert!(matches!(store.try_load().await, Err(MemoryError::NotFound(_))));

        let mut usage = Usage::default();
        usage.counts.insert("firefox".to_string(), 3);
        store.save(&usage).await.unwrap();

        assert_eq!(store.load().await, usage);
        assert!(!temp_dir.path().join("launcher/usage.tmp").exists());

        store.remove().await.unwrap();
        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn test_corrupt_store_starts_fresh() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store: JsonStore<Usage> = JsonStore::new(&path);
        assert_eq!(store.load().await, Usage::default());
        assert!(matches!(store.try_load().await, Err(MemoryError::Serialization(_))));
    }
}
