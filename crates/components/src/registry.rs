use crate::apps::{default_search_dirs, ApplicationLauncher};
use crate::files::FileManager;
use crate::notifications::NotificationSystem;
use crate::sessions::SessionManager;
use crate::settings::SettingsManager;
use crate::status::StatusArea;
use crate::windows::WindowManager;
use crate::workspaces::WorkspaceManager;
use personalaios_core::{Component, MatchPolicy, ShellResult};
use personalaios_executor::{CommandRunner, Desktop, SystemControl, WindowControl};
use personalaios_memory::StorageLayout;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Components addressable by route name.
pub struct ComponentRegistry {
    components: HashMap<&'static str, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    pub fn register(&mut self, component: Arc<dyn Component>) {
        self.components.insert(component.name(), component);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.components.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SuiteOptions {
    /// Root the file manager resolves relative names against.
    pub files_root: PathBuf,
    /// `.desktop` directories; empty means the XDG defaults.
    pub app_dirs: Vec<PathBuf>,
    pub policy: MatchPolicy,
    pub connectivity_target: Option<String>,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            files_root: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            app_dirs: Vec::new(),
            policy: MatchPolicy::default(),
            connectivity_target: Some("8.8.8.8:53".to_string()),
        }
    }
}

/// Every component, typed, sharing one command runner and storage root.
#[derive(Clone)]
pub struct ComponentSuite {
    pub files: Arc<FileManager>,
    pub apps: Arc<ApplicationLauncher>,
    pub windows: Arc<WindowManager>,
    pub workspaces: Arc<WorkspaceManager>,
    pub notifications: Arc<NotificationSystem>,
    pub settings: Arc<SettingsManager>,
    pub sessions: Arc<SessionManager>,
    pub status: Arc<StatusArea>,
}

impl ComponentSuite {
    pub async fn build(
        runner: Arc<dyn CommandRunner>,
        layout: &StorageLayout,
        options: SuiteOptions,
    ) -> ShellResult<Self> {
        let policy = options.policy;
        let desktop = Desktop::new(runner.clone());
        let system = SystemControl::new(runner.clone());
        let app_dirs = if options.app_dirs.is_empty() {
            default_search_dirs()
        } else {
            options.app_dirs
        };

        let suite = Self {
            files: Arc::new(FileManager::new(options.files_root, desktop.clone(), policy)?),
            apps: Arc::new(
                ApplicationLauncher::new(desktop.clone(), layout, app_dirs, policy).await?,
            ),
            windows: Arc::new(WindowManager::new(WindowControl::new(runner.clone()), policy)?),
            workspaces: Arc::new(
                WorkspaceManager::new(WindowControl::new(runner.clone()), layout, policy).await?,
            ),
            notifications: Arc::new(
                NotificationSystem::new(desktop.clone(), layout, policy).await?,
            ),
            settings: Arc::new(SettingsManager::new(layout, policy).await?),
            sessions: Arc::new(SessionManager::new(system.clone(), layout, policy).await?),
            status: Arc::new(
                StatusArea::new(system, desktop, policy)?
                    .with_connectivity_target(options.connectivity_target),
            ),
        };
        tracing::info!("component suite ready");
        Ok(suite)
    }

    pub fn registry(&self) -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(self.files.clone());
        registry.register(self.apps.clone());
        registry.register(self.windows.clone());
        registry.register(self.workspaces.clone());
        registry.register(self.notifications.clone());
        registry.register(self.settings.clone());
        registry.register(self.sessions.clone());
        registry.register(self.status.clone());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personalaios_executor::DryRunRunner;

    #[tokio::test]
    async fn test_suite_registers_every_route() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(DryRunRunner::new());
        let options = SuiteOptions {
            files_root: dir.path().to_path_buf(),
            app_dirs: vec![dir.path().join("applications")],
            connectivity_target: None,
            ..SuiteOptions::default()
        };
        let layout = StorageLayout::new(dir.path().join("data"));
        let suite = ComponentSuite::build(runner, &layout, options).await.unwrap();

        let registry = suite.registry();
        assert_eq!(
            registry.list(),
            vec![
                "apps",
                "files",
                "notifications",
                "sessions",
                "settings",
                "status",
                "windows",
                "workspaces",
            ]
        );
        assert!(registry.contains("workspaces"));
        assert!(registry.get("launcher").is_none());

        let reply = registry.get("settings").unwrap().process_command("theme setting").await;
        assert!(reply.starts_with("⚙️ **Theme Mode:**"));
    }
}
