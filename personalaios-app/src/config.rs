use anyhow::{bail, Context, Result};
use personalaios_core::MatchPolicy;
use personalaios_memory::StorageLayout;
use personalaios_providers::ModelSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Contents of `config.yaml`. Every field has a default, so a partial file
/// (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelSettings,
    /// Storage root; `~/.personalaios` when unset.
    pub data_dir: Option<PathBuf>,
    /// Directory the file manager starts in; the home directory when unset.
    pub files_root: Option<PathBuf>,
    pub match_policy: MatchPolicy,
    /// Record desktop commands instead of running them.
    pub dry_run: bool,
    pub command_timeout_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            data_dir: None,
            files_root: None,
            match_policy: MatchPolicy::default(),
            dry_run: false,
            command_timeout_secs: 5,
            dispatch_timeout_secs: 30,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        StorageLayout::new(StorageLayout::default_root()).config_path()
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse configuration")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if Self::exists(path) {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_yaml()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.model.base_url.trim();
        if url.is_empty() {
            bail!("model.base_url cannot be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("model.base_url must start with http:// or https://");
        }
        if self.model.request_timeout_secs == 0 {
            bail!("model.request_timeout_secs must be greater than zero");
        }
        if self.model.ready_interval_secs == 0 || self.model.health_poll_secs == 0 {
            bail!("model polling intervals must be greater than zero");
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            bail!("model.temperature must be between 0 and 2");
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            bail!("model.top_p must be between 0 and 1");
        }
        if self.command_timeout_secs == 0 {
            bail!("command_timeout_secs must be greater than zero");
        }
        if self.dispatch_timeout_secs == 0 {
            bail!("dispatch_timeout_secs must be greater than zero");
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("log_level must be one of {}", LOG_LEVELS.join(", "));
        }
        Ok(())
    }

    pub fn layout(&self) -> StorageLayout {
        match &self.data_dir {
            Some(dir) => StorageLayout::new(dir),
            None => StorageLayout::default(),
        }
    }

    pub fn files_root(&self) -> PathBuf {
        self.files_root
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.model.max_tokens, 512);
        assert_eq!(config.model.ready_attempts, 120);
        assert_eq!(config.match_policy, MatchPolicy::BestMatch);
        assert_eq!(config.command_timeout_secs, 5);
        assert_eq!(config.dispatch_timeout_secs, 30);
        assert_eq!(config.log_level, "warn");
        assert!(!config.model.autostart);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("\n  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_layout_prefers_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/paios")),
            ..Config::default()
        };
        assert_eq!(config.layout().root(), Path::new("/tmp/paios"));
        assert_eq!(config.layout().config_path(), PathBuf::from("/tmp/paios/config.yaml"));
    }
}
