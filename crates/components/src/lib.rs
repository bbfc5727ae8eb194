//! Natural-language desktop components and the registry that routes to them.

pub mod apps;
pub mod files;
pub mod notifications;
pub mod registry;
pub mod sessions;
pub mod settings;
pub mod status;
pub mod windows;
pub mod workspaces;

pub use apps::ApplicationLauncher;
pub use files::FileManager;
pub use notifications::NotificationSystem;
pub use registry::{ComponentRegistry, ComponentSuite, SuiteOptions};
pub use sessions::{SessionManager, SessionRequest};
pub use settings::SettingsManager;
pub use status::StatusArea;
pub use windows::WindowManager;
pub use workspaces::WorkspaceManager;
