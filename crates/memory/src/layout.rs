use crate::store::JsonStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DIR_NAME: &str = ".personalaios";

/// Directory tree holding all persisted state: `<root>/<component>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// `~/.personalaios`, or `./.personalaios` when no home directory is known.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DIR_NAME)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn component_dir(&self, component: &str) -> PathBuf {
        self.root.join(component)
    }

    pub fn file(&self, component: &str, name: &str) -> PathBuf {
        self.component_dir(component).join(name)
    }

    pub fn store<T>(&self, component: &str, name: &str) -> JsonStore<T>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        JsonStore::new(self.file(component, name))
    }

    pub async fn ensure(&self, component: &str) -> std::io::Result<PathBuf> {
        let dir = self.component_dir(component);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = StorageLayout::new("/tmp/pa");
        assert_eq!(layout.config_path(), PathBuf::from("/tmp/pa/config.yaml"));
        assert_eq!(
            layout.file("workspaces", "workspaces.json"),
            PathBuf::from("/tmp/pa/workspaces/workspaces.json")
        );
    }

    #[test]
    fn test_default_root_name() {
        assert!(StorageLayout::default_root().ends_with(DEFAULT_DIR_NAME));
    }

    #[tokio::test]
    async fn test_ensure_creates_component_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(temp_dir.path());
        let dir = layout.ensure("session").await.unwrap();
        assert!(dir.is_dir());
    }
}
