//! Session lifecycle: component states, restarts, saved sessions and logout.

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use personalaios_core::format::{format_duration, help_text};
use personalaios_core::fuzzy;
use personalaios_core::{
    ComponentState, ContextRules, FillerStyle, Intent, IntentEngine, IntentHandler, IntentMatch,
    MatchPolicy, Normalizer, PatternTable, ShellError, ShellResult,
};
use personalaios_executor::{SystemControl, SystemSnapshot};
use personalaios_memory::{JsonStore, StorageLayout};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tokio::sync::watch;

const FILLERS: &[&str] = &["please", "can you", "would you", "could you"];
const DEFAULT_RESTARTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionIntent {
    Info,
    RestartComponent,
    StopComponent,
    StartComponent,
    ListComponents,
    Save,
    Restore,
    Logout,
    Shutdown,
    RestartSession,
}

impl Intent for SessionIntent {
    fn as_str(&self) -> &'static str {
        match self {
            SessionIntent::Info => "session_info",
            SessionIntent::RestartComponent => "restart_component",
            SessionIntent::StopComponent => "stop_component",
            SessionIntent::StartComponent => "start_component",
            SessionIntent::ListComponents => "list_components",
            SessionIntent::Save => "save_session",
            SessionIntent::Restore => "restore_session",
            SessionIntent::Logout => "logout",
            SessionIntent::Shutdown => "shutdown",
            SessionIntent::RestartSession => "restart_session",
        }
    }
}

fn pattern_table() -> Result<PatternTable<SessionIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            SessionIntent::Info,
            &[
                r"(?:session|desktop)\s+(?:info|information|status|details)",
                r"(?:what\s+is\s+)?(?:the\s+)?(?:current\s+)?session\s+(?:status|state)",
                r"(?:how\s+is\s+)?(?:the\s+)?session\s+(?:doing|running)",
                r"(?:show\s+me\s+)?session\s+(?:details|information)",
            ],
        )
        .intent(
            SessionIntent::RestartComponent,
            &[r"^(?:restart|reload|reboot|reset)\s+(?:the\s+)?(.+?)(?:\s+component)?$"],
        )
        .intent(
            SessionIntent::StopComponent,
            &[r"^(?:stop|kill|disable|turn\s+off)\s+(?:the\s+)?(.+?)(?:\s+component)?$"],
        )
        .intent(
            SessionIntent::StartComponent,
            &[r"^(?:start|launch|enable|turn\s+on)\s+(?:the\s+)?(.+?)(?:\s+component)?$"],
        )
        .intent(
            SessionIntent::ListComponents,
            &[
                r"list\s+(?:all\s+)?(?:session\s+)?components",
                r"show\s+(?:me\s+)?(?:all\s+)?(?:session\s+)?components",
                r"(?:what\s+)?components\s+(?:are\s+)?(?:running|active|loaded)",
                r"display\s+(?:all\s+)?components",
            ],
        )
        .intent(
            SessionIntent::Save,
            &[
                r"save\s+(?:the\s+)?session",
                r"preserve\s+(?:the\s+)?session(?:\s+state)?",
                r"store\s+(?:current\s+)?session",
                r"backup\s+(?:the\s+)?session",
            ],
        )
        .intent(
            SessionIntent::Restore,
            &[
                r"restore\s+(?:the\s+)?(?:last\s+)?session",
                r"load\s+(?:the\s+)?(?:saved\s+)?session",
                r"recover\s+(?:the\s+)?(?:previous\s+)?session",
                r"bring\s+back\s+(?:the\s+)?(?:last\s+)?session",
            ],
        )
        .intent(
            SessionIntent::Logout,
            &[
                r"^(?:log\s*out|sign\s*out)$",
                r"end\s+(?:the\s+)?session",
                r"close\s+(?:the\s+)?session",
                r"exit\s+(?:the\s+)?(?:desktop|session)",
            ],
        )
        .intent(
            SessionIntent::Shutdown,
            &[
                r"^(?:shut\s*down|power\s+off|power\s+down)(?:\s+(?:the\s+)?(?:computer|system))?$",
                r"turn\s+off\s+(?:the\s+)?(?:computer|system)",
            ],
        )
        .intent(
            SessionIntent::RestartSession,
            &[r"^(?:restart|reload|refresh|reboot)\s+(?:the\s+)?(?:desktop|session)$"],
        )
        .build()
}

/// Lifecycle of the session as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Running,
    Saving,
    ShuttingDown,
    Crashed,
    Idle,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Starting => "Starting",
            SessionState::Running => "Running",
            SessionState::Saving => "Saving",
            SessionState::ShuttingDown => "Shutting Down",
            SessionState::Crashed => "Crashed",
            SessionState::Idle => "Idle",
        }
    }
}

/// What the host should do after a session command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequest {
    Logout,
    Restart,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub key: &'static str,
    pub name: &'static str,
    /// Router name of the component serving commands, if any.
    pub route: Option<&'static str>,
    pub required: bool,
    pub restart_on_failure: bool,
    pub max_restarts: u32,
    pub dependencies: &'static [&'static str],
}

impl ComponentSpec {
    const fn new(key: &'static str, name: &'static str, route: Option<&'static str>) -> Self {
        Self {
            key,
            name,
            route,
            required: false,
            restart_on_failure: true,
            max_restarts: DEFAULT_RESTARTS,
            dependencies: &[],
        }
    }
}

/// Everything the session supervises, in declaration order.
pub fn core_components() -> Vec<ComponentSpec> {
    vec![
        ComponentSpec {
            required: true,
            max_restarts: 5,
            ..ComponentSpec::new("ai_shell", "AI Shell", None)
        },
        ComponentSpec {
            required: true,
            dependencies: &["ai_shell"],
            ..ComponentSpec::new("desktop_manager", "Desktop Manager", None)
        },
        ComponentSpec::new("window_manager", "Window Manager", Some("windows")),
        ComponentSpec::new("notification_system", "Notification System", Some("notifications")),
        ComponentSpec::new("application_launcher", "Application Launcher", Some("apps")),
        ComponentSpec::new("file_manager", "File Manager", Some("files")),
        ComponentSpec::new("settings_manager", "Settings Manager", Some("settings")),
        ComponentSpec::new("workspace_manager", "Workspace Manager", Some("workspaces")),
        ComponentSpec::new("system_status", "System Status", Some("status")),
    ]
}

fn state_icon(state: ComponentState) -> &'static str {
    match state {
        ComponentState::Running => "✅",
        ComponentState::Starting => "🟡",
        ComponentState::Stopping => "🟠",
        ComponentState::Failed => "❌",
        ComponentState::Inactive => "⚪",
    }
}

fn state_label(state: ComponentState) -> &'static str {
    match state {
        ComponentState::Running => "Running",
        ComponentState::Starting => "Starting",
        ComponentState::Stopping => "Stopping",
        ComponentState::Failed => "Failed",
        ComponentState::Inactive => "Inactive",
    }
}

#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub spec: ComponentSpec,
    pub state: ComponentState,
    /// Starts after the first one.
    pub restart_count: u32,
    started_once: bool,
    pub last_start: Option<i64>,
    pub last_failure: Option<i64>,
}

impl ComponentRecord {
    fn new(spec: ComponentSpec) -> Self {
        Self {
            spec,
            state: ComponentState::Inactive,
            restart_count: 0,
            started_once: false,
            last_start: None,
            last_failure: None,
        }
    }
}

/// Contents of `session/session.lock`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLock {
    pub pid: u32,
    pub start_time: i64,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionPreferences {
    pub natural_language_enabled: bool,
    pub auto_suggestions: bool,
    pub learning_enabled: bool,
    pub voice_commands: bool,
    pub debug_mode: bool,
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            natural_language_enabled: true,
            auto_suggestions: true,
            learning_enabled: true,
            voice_commands: false,
            debug_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedComponent {
    pub state: ComponentState,
    pub restart_count: u32,
    pub enabled: bool,
}

/// Contents of `session/saved_session.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub session_id: String,
    pub save_time: i64,
    #[serde(default)]
    pub components: BTreeMap<String, SavedComponent>,
    #[serde(default)]
    pub preferences: SessionPreferences,
    #[serde(default)]
    pub environment_vars: BTreeMap<String, String>,
}

struct Inner {
    state: SessionState,
    components: Vec<ComponentRecord>,
    preferences: SessionPreferences,
}

impl Inner {
    fn position(&self, key: &str) -> Option<usize> {
        self.components.iter().position(|c| c.spec.key == key)
    }

    /// Exact name, partial name, key, then route.
    fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        let snake = name.replace(' ', "_");
        let components = &self.components;
        components
            .iter()
            .position(|c| c.spec.name.to_lowercase() == name)
            .or_else(|| components.iter().position(|c| c.spec.name.to_lowercase().contains(&name)))
            .or_else(|| components.iter().position(|c| c.spec.key.contains(snake.as_str())))
            .or_else(|| components.iter().position(|c| c.spec.route == Some(name.as_str())))
    }

    fn not_found(&self, name: &str) -> ShellError {
        let mut suggestions: Vec<String> =
            fuzzy::suggest(name, self.components.iter(), |c| c.spec.name, 0.3, 3)
                .into_iter()
                .map(|c| c.spec.name.to_string())
                .collect();
        if suggestions.is_empty() {
            suggestions = self.components.iter().map(|c| c.spec.key.to_string()).collect();
        }
        ShellError::not_found_with("component", name, suggestions)
    }

    /// Keys ordered so every dependency precedes its dependents.
    fn start_order(&self) -> Vec<&'static str> {
        fn visit(
            inner: &Inner,
            key: &'static str,
            seen: &mut HashSet<&'static str>,
            order: &mut Vec<&'static str>,
        ) {
            if !seen.insert(key) {
                return;
            }
            if let Some(index) = inner.position(key) {
                for dep in inner.components[index].spec.dependencies {
                    visit(inner, *dep, seen, order);
                }
                order.push(key);
            }
        }

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.components.len());
        for component in &self.components {
            visit(self, component.spec.key, &mut seen, &mut order);
        }
        order
    }

    fn start(&mut self, index: usize, now: i64) -> ShellResult<()> {
        let missing = self.components[index]
            .spec
            .dependencies
            .iter()
            .find(|dep| {
                self.position(dep)
                    .map_or(true, |i| self.components[i].state != ComponentState::Running)
            })
            .copied();

        let component = &mut self.components[index];
        component.state = ComponentState::Starting;
        if let Some(dep) = missing {
            component.state = ComponentState::Failed;
            component.last_failure = Some(now);
            tracing::warn!(
                component = component.spec.key,
                dependency = dep,
                "dependency not running"
            );
            return Err(ShellError::refused(format!(
                "Cannot start {}: dependency {} is not running",
                component.spec.name, dep
            )));
        }
        if component.started_once {
            component.restart_count += 1;
        }
        component.started_once = true;
        component.last_start = Some(now);
        component.state = ComponentState::Running;
        tracing::info!(component = component.spec.key, "component started");
        Ok(())
    }

    fn stop(&mut self, index: usize) {
        let component = &mut self.components[index];
        component.state = ComponentState::Inactive;
        tracing::info!(component = component.spec.key, "component stopped");
    }

    /// Stop running components in reverse start order.
    fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for key in self.start_order().into_iter().rev() {
            if let Some(index) = self.position(key) {
                if self.components[index].state == ComponentState::Running {
                    self.stop(index);
                    stopped += 1;
                }
            }
        }
        stopped
    }
}

pub struct SessionManager {
    engine: IntentEngine<SessionIntent>,
    system: SystemControl,
    session_id: String,
    user: String,
    start_time: i64,
    lock: JsonStore<SessionLock>,
    saved: JsonStore<SavedSession>,
    inner: Mutex<Inner>,
    requests: watch::Sender<Option<SessionRequest>>,
}

impl SessionManager {
    /// Create the session and write `session/session.lock`.
    pub async fn new(
        system: SystemControl,
        layout: &StorageLayout,
        policy: MatchPolicy,
    ) -> ShellResult<Self> {
        let normalizer = Normalizer::new(FILLERS, FillerStyle::WordBoundary)?;
        let engine = IntentEngine::new(normalizer, pattern_table()?, ContextRules::new())
            .with_policy(policy);

        let start_time = Local::now().timestamp();
        let pid = std::process::id();
        let session_id = format!("personalaios_{}_{}", start_time, pid);

        let lock: JsonStore<SessionLock> = layout.store("session", "session.lock");
        if let Ok(previous) = lock.try_load().await {
            if previous.pid != pid && process_alive(previous.pid) {
                tracing::warn!(
                    session = %previous.session_id,
                    pid = previous.pid,
                    "another session holds the lock, taking it over"
                );
            } else {
                tracing::info!(session = %previous.session_id, "replacing stale session lock");
            }
        }
        lock.save(&SessionLock {
            pid,
            start_time,
            session_id: session_id.clone(),
        })
        .await?;

        let saved: JsonStore<SavedSession> = layout.store("session", "saved_session.json");
        let preferences = saved.load().await.preferences;
        tracing::info!(session = %session_id, "session initialized");

        let (requests, _) = watch::channel(None);
        Ok(Self {
            engine,
            system,
            session_id,
            user: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
            start_time,
            lock,
            saved,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                components: core_components().into_iter().map(ComponentRecord::new).collect(),
                preferences,
            }),
            requests,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn preferences(&self) -> SessionPreferences {
        self.inner.lock().preferences
    }

    pub fn components(&self) -> Vec<ComponentRecord> {
        self.inner.lock().components.clone()
    }

    pub fn component(&self, key: &str) -> Option<ComponentRecord> {
        let inner = self.inner.lock();
        inner.position(key).map(|i| inner.components[i].clone())
    }

    /// Receives logout, restart and shutdown requests issued by commands.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionRequest>> {
        self.requests.subscribe()
    }

    /// Start every component in dependency order. Fails when a required
    /// component cannot start, leaving the session crashed.
    pub fn start_all(&self) -> ShellResult<Vec<&'static str>> {
        let mut inner = self.inner.lock();
        inner.state = SessionState::Starting;
        let now = Local::now().timestamp();
        let mut started = Vec::new();
        for key in inner.start_order() {
            let Some(index) = inner.position(key) else {
                continue;
            };
            if inner.components[index].state == ComponentState::Running {
                continue;
            }
            match inner.start(index, now) {
                Ok(()) => started.push(inner.components[index].spec.name),
                Err(e) if inner.components[index].spec.required => {
                    inner.state = SessionState::Crashed;
                    tracing::error!(
                        component = key,
                        error = %e,
                        "required component failed to start"
                    );
                    return Err(e);
                }
                Err(e) => tracing::warn!(component = key, error = %e, "component failed to start"),
            }
        }
        inner.state = SessionState::Running;
        tracing::info!(started = started.len(), "session started");
        Ok(started)
    }

    /// Whether the component behind router `route` takes commands.
    pub fn accepts_commands(&self, route: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .components
            .iter()
            .find(|c| c.spec.route == Some(route))
            .map_or(true, |c| c.state != ComponentState::Inactive)
    }

    /// Record a crash of the component behind router `route`.
    pub fn mark_failed(&self, route: &str) {
        let mut inner = self.inner.lock();
        if let Some(component) = inner.components.iter_mut().find(|c| c.spec.route == Some(route)) {
            component.state = ComponentState::Failed;
            component.last_failure = Some(Local::now().timestamp());
            tracing::warn!(component = component.spec.key, "component marked failed");
        }
    }

    /// Restart failed components that still have restart budget. Returns the
    /// keys restarted.
    pub fn monitor_tick(&self) -> Vec<&'static str> {
        let mut inner = self.inner.lock();
        let now = Local::now().timestamp();
        let mut restarted = Vec::new();
        for index in 0..inner.components.len() {
            let component = &inner.components[index];
            if component.state != ComponentState::Failed || !component.spec.restart_on_failure {
                continue;
            }
            if component.restart_count >= component.spec.max_restarts {
                tracing::debug!(component = component.spec.key, "restart budget exhausted");
                continue;
            }
            let key = component.spec.key;
            match inner.start(index, now) {
                Ok(()) => restarted.push(key),
                Err(e) => tracing::warn!(component = key, error = %e, "automatic restart failed"),
            }
        }
        restarted
    }

    /// Remove the lock file. Called when the host exits.
    pub async fn release(&self) -> ShellResult<()> {
        self.lock.remove().await?;
        tracing::info!(session = %self.session_id, "session lock released");
        Ok(())
    }

    fn lookup(&self, target: Option<&str>) -> ShellResult<Option<usize>> {
        let Some(target) = target else {
            return Ok(None);
        };
        let inner = self.inner.lock();
        inner.find(target).map(Some).ok_or_else(|| inner.not_found(target))
    }

    async fn session_info(&self) -> String {
        let snapshot = SystemSnapshot::capture_async().await;
        let inner = self.inner.lock();
        let uptime = (Local::now().timestamp() - self.start_time).max(0) as u64;

        let mut out = format!(
            "🔐 **PersonalAIOS Session Information**\n\n**Session ID:** {}\n**State:** {}\n\
             **Uptime:** {}\n**User:** {}\n\n**Components:** {} total\n",
            self.session_id,
            inner.state.label(),
            format_duration(uptime),
            self.user,
            inner.components.len()
        );
        for state in [
            ComponentState::Running,
            ComponentState::Starting,
            ComponentState::Stopping,
            ComponentState::Failed,
            ComponentState::Inactive,
        ] {
            let count = inner.components.iter().filter(|c| c.state == state).count();
            if count > 0 {
                out.push_str(&format!(
                    "• {} {}: {}\n",
                    state_icon(state),
                    state_label(state),
                    count
                ));
            }
        }
        if snapshot.process_rss_mb > 0 {
            out.push_str(&format!("\n**Memory Usage:** {} MB", snapshot.process_rss_mb));
        }
        out.trim_end().to_string()
    }

    fn list_components(&self) -> String {
        let inner = self.inner.lock();
        let now = Local::now().timestamp();
        let mut out = format!("🔐 **Session Components** ({} total):\n\n", inner.components.len());
        for state in [
            ComponentState::Running,
            ComponentState::Starting,
            ComponentState::Stopping,
            ComponentState::Failed,
            ComponentState::Inactive,
        ] {
            let members: Vec<&ComponentRecord> =
                inner.components.iter().filter(|c| c.state == state).collect();
            if members.is_empty() {
                continue;
            }
            out.push_str(&format!("**{} {}:**\n", state_icon(state), state_label(state)));
            for component in members {
                out.push_str(&format!("• **{}**", component.spec.name));
                if component.spec.required {
                    out.push_str(" 🔒");
                }
                if component.restart_count > 0 {
                    out.push_str(&format!(" (restarted {}x)", component.restart_count));
                }
                if let (ComponentState::Running, Some(started)) = (state, component.last_start) {
                    out.push_str(&format!(" • {}", format_duration((now - started).max(0) as u64)));
                }
                out.push('\n');
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    fn restart_component(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(index) = self.lookup(target)? else {
            return Ok(
                "🔄 **Please specify which component to restart**\n\n\
                 **Examples:** restart window manager, reload notification system"
                    .to_string(),
            );
        };
        let mut inner = self.inner.lock();
        if inner.components[index].state == ComponentState::Running {
            inner.stop(index);
        }
        inner.start(index, Local::now().timestamp())?;
        let component = &inner.components[index];
        Ok(format!(
            "🔄 **Restarted component:** {}\n   └─ Status: {}",
            component.spec.name,
            state_label(component.state)
        ))
    }

    fn stop_component(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(index) = self.lookup(target)? else {
            return Ok(
                "🛑 **Please specify which component to stop**\n\n\
                 **Examples:** stop file manager, disable notifications"
                    .to_string(),
            );
        };
        let mut inner = self.inner.lock();
        let spec = inner.components[index].spec.clone();
        if spec.required {
            return Err(ShellError::refused(format!(
                "Cannot stop required component: {}",
                spec.name
            )));
        }
        inner.stop(index);
        Ok(format!(
            "🛑 **Stopped component:** {}\n   └─ Status: {}",
            spec.name,
            state_label(inner.components[index].state)
        ))
    }

    fn start_component(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(index) = self.lookup(target)? else {
            return Ok(
                "🚀 **Please specify which component to start**\n\n\
                 **Examples:** start window manager, enable file manager"
                    .to_string(),
            );
        };
        let mut inner = self.inner.lock();
        if inner.components[index].state == ComponentState::Running {
            return Ok(format!(
                "✅ **Component already running:** {}",
                inner.components[index].spec.name
            ));
        }
        inner.start(index, Local::now().timestamp())?;
        let component = &inner.components[index];
        Ok(format!(
            "🚀 **Started component:** {}\n   └─ Status: {}",
            component.spec.name,
            state_label(component.state)
        ))
    }

    /// Write component states and preferences to `saved_session.json`.
    pub async fn save(&self) -> ShellResult<SavedSession> {
        let saved = {
            let mut inner = self.inner.lock();
            inner.state = SessionState::Saving;
            SavedSession {
                session_id: self.session_id.clone(),
                save_time: Local::now().timestamp(),
                components: inner
                    .components
                    .iter()
                    .map(|c| {
                        (
                            c.spec.key.to_string(),
                            SavedComponent {
                                state: c.state,
                                restart_count: c.restart_count,
                                enabled: c.state != ComponentState::Inactive,
                            },
                        )
                    })
                    .collect(),
                preferences: inner.preferences,
                environment_vars: std::env::vars()
                    .filter(|(key, _)| key.starts_with("PERSONALAIOS_"))
                    .collect(),
            }
        };
        let result = self.saved.save(&saved).await;
        self.inner.lock().state = SessionState::Running;
        result?;
        tracing::info!(components = saved.components.len(), "session saved");
        Ok(saved)
    }

    async fn restore(&self) -> ShellResult<String> {
        let saved = match self.saved.try_load().await {
            Ok(saved) => saved,
            Err(personalaios_memory::MemoryError::NotFound(_)) => {
                return Ok(
                    "📂 **No saved session found**\n\nSave a session first using 'save session'"
                        .to_string(),
                );
            }
            Err(e) => return Err(e.into()),
        };

        let (restored, failed) = {
            let mut inner = self.inner.lock();
            let now = Local::now().timestamp();
            let (mut restored, mut failed) = (0, 0);
            for key in inner.start_order() {
                let (Some(entry), Some(index)) = (saved.components.get(key), inner.position(key))
                else {
                    continue;
                };
                let component = &inner.components[index];
                if entry.enabled && component.state != ComponentState::Running {
                    match inner.start(index, now) {
                        Ok(()) => restored += 1,
                        Err(_) => failed += 1,
                    }
                } else if !entry.enabled
                    && component.state == ComponentState::Running
                    && !component.spec.required
                {
                    inner.stop(index);
                }
            }
            inner.preferences = saved.preferences;
            (restored, failed)
        };
        tracing::info!(restored, failed, "session restored");

        let saved_on = Local
            .timestamp_opt(saved.save_time, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mut out = format!(
            "📂 **Session restored**\n   └─ Saved on: {}\n   └─ Restored: {} components",
            saved_on, restored
        );
        if failed > 0 {
            out.push_str(&format!("\n   └─ Failed: {} components", failed));
        }
        Ok(out)
    }

    /// Stop everything, drop the lock and tell the host what to do next.
    async fn end_session(&self, request: SessionRequest) -> ShellResult<usize> {
        let stopped = {
            let mut inner = self.inner.lock();
            inner.state = SessionState::ShuttingDown;
            inner.stop_all()
        };
        self.release().await?;
        self.requests.send_replace(Some(request));
        tracing::info!(?request, stopped, "session ending");
        Ok(stopped)
    }

    async fn logout(&self) -> ShellResult<String> {
        self.save().await?;
        let stopped = self.end_session(SessionRequest::Logout).await?;
        Ok(format!(
            "👋 **Logging out...**\n   └─ Stopped {} components\n   └─ Session saved successfully",
            stopped
        ))
    }

    async fn restart_session(&self) -> ShellResult<String> {
        self.save().await?;
        let stopped = self.end_session(SessionRequest::Restart).await?;
        Ok(format!(
            "🔄 **Restarting PersonalAIOS session...**\n   └─ Stopped {} components",
            stopped
        ))
    }

    async fn shutdown(&self) -> ShellResult<String> {
        let logout = self.logout().await?;
        self.system.power_off().await?;
        self.requests.send_replace(Some(SessionRequest::Shutdown));
        Ok(format!("🔌 **Shutting down system...**\n{}", logout))
    }
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[async_trait]
impl IntentHandler for SessionManager {
    type Intent = SessionIntent;
    const NAME: &'static str = "sessions";
    const TITLE: &'static str = "session management";

    fn engine(&self) -> &IntentEngine<SessionIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<SessionIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        let target = matched.entities.group(0);
        match matched.intent {
            SessionIntent::Info => Ok(self.session_info().await),
            SessionIntent::RestartComponent => self.restart_component(target),
            SessionIntent::StopComponent => self.stop_component(target),
            SessionIntent::StartComponent => self.start_component(target),
            SessionIntent::ListComponents => Ok(self.list_components()),
            SessionIntent::Save => {
                let saved = self.save().await?;
                Ok(format!(
                    "💾 **Session saved successfully**\n   └─ Saved to: {}\n   └─ Components: {}",
                    self.saved.path().display(),
                    saved.components.len()
                ))
            }
            SessionIntent::Restore => self.restore().await,
            SessionIntent::Logout => self.logout().await,
            SessionIntent::Shutdown => self.shutdown().await,
            SessionIntent::RestartSession => self.restart_session().await,
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "🔐 **Try these natural language session commands:**",
            &[
                (
                    "Session Control",
                    &["session info", "save session", "restore session"],
                ),
                (
                    "Component Management",
                    &["list components", "restart window manager", "stop notification system"],
                ),
                ("Session Actions", &["logout", "restart session", "shutdown"]),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personalaios_core::Component;
    use personalaios_executor::DryRunRunner;
    use std::sync::Arc;

    async fn manager(dir: &Path) -> (SessionManager, Arc<DryRunRunner>) {
        let runner = Arc::new(DryRunRunner::new());
        let system = SystemControl::with_sysfs(runner.clone(), dir.join("sys"));
        let sessions = SessionManager::new(system, &StorageLayout::new(dir), MatchPolicy::BestMatch)
            .await
            .unwrap();
        (sessions, runner)
    }

    #[tokio::test]
    async fn test_lock_file_written_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        assert!(sessions.session_id().starts_with("personalaios_"));

        let lock: SessionLock = JsonStore::new(dir.path().join("session/session.lock"))
            .try_load()
            .await
            .unwrap();
        assert_eq!(lock.session_id, sessions.session_id());
        assert_eq!(lock.pid, std::process::id());
    }

    #[tokio::test]
    async fn test_start_all_respects_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        assert_eq!(sessions.state(), SessionState::Idle);

        let started = sessions.start_all().unwrap();
        assert_eq!(started.len(), 9);
        let shell = started.iter().position(|n| *n == "AI Shell").unwrap();
        let desktop = started.iter().position(|n| *n == "Desktop Manager").unwrap();
        assert!(shell < desktop);
        assert_eq!(sessions.state(), SessionState::Running);
        assert!(sessions
            .components()
            .iter()
            .all(|c| c.state == ComponentState::Running && c.restart_count == 0));
    }

    #[tokio::test]
    async fn test_stop_and_start_components() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        sessions.start_all().unwrap();

        let reply = sessions.process_command("stop ai shell").await;
        assert_eq!(reply, "⚠️ **Cannot stop required component: AI Shell**");

        let reply = sessions.process_command("stop window manager").await;
        assert_eq!(reply, "🛑 **Stopped component:** Window Manager\n   └─ Status: Inactive");
        assert!(!sessions.accepts_commands("windows"));

        let reply = sessions.process_command("start window manager").await;
        assert!(reply.starts_with("🚀 **Started component:** Window Manager"));
        assert!(sessions.accepts_commands("windows"));

        let reply = sessions.process_command("start window manager").await;
        assert_eq!(reply, "✅ **Component already running:** Window Manager");

        let reply = sessions.process_command("restart notifications").await;
        assert!(reply.starts_with("🔄 **Restarted component:** Notification System"));

        let reply = sessions.process_command("restart warp drive").await;
        assert!(reply.starts_with("🔍 **Component not found:** 'warp drive'"));
    }

    #[tokio::test]
    async fn test_monitor_restarts_until_budget_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        sessions.start_all().unwrap();

        for attempt in 1..=3 {
            sessions.mark_failed("files");
            assert_eq!(sessions.monitor_tick(), vec!["file_manager"]);
            let record = sessions.component("file_manager").unwrap();
            assert_eq!(record.restart_count, attempt);
            assert_eq!(record.state, ComponentState::Running);
        }

        sessions.mark_failed("files");
        assert!(sessions.monitor_tick().is_empty());
        assert_eq!(
            sessions.component("file_manager").unwrap().state,
            ComponentState::Failed
        );
    }

    #[tokio::test]
    async fn test_save_and_restore_session() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;

        let reply = sessions.process_command("restore session").await;
        assert!(reply.starts_with("📂 **No saved session found**"));

        sessions.start_all().unwrap();
        sessions.process_command("stop file manager").await;
        let reply = sessions.process_command("save session").await;
        assert!(reply.starts_with("💾 **Session saved successfully**"));
        assert!(reply.contains("Components: 9"));

        sessions.process_command("start file manager").await;
        sessions.process_command("stop settings manager").await;
        let reply = sessions.process_command("restore session").await;
        assert!(reply.contains("Restored: 1 components"));
        assert_eq!(
            sessions.component("file_manager").unwrap().state,
            ComponentState::Inactive
        );
        assert_eq!(
            sessions.component("settings_manager").unwrap().state,
            ComponentState::Running
        );
    }

    #[tokio::test]
    async fn test_logout_releases_lock_and_signals_host() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        sessions.start_all().unwrap();
        let requests = sessions.subscribe();

        let reply = sessions.process_command("log out").await;
        assert_eq!(
            reply,
            "👋 **Logging out...**\n   └─ Stopped 9 components\n   └─ Session saved successfully"
        );
        assert_eq!(*requests.borrow(), Some(SessionRequest::Logout));
        assert_eq!(sessions.state(), SessionState::ShuttingDown);
        assert!(!dir.path().join("session/session.lock").exists());
        assert!(dir.path().join("session/saved_session.json").exists());
    }

    #[tokio::test]
    async fn test_shutdown_powers_off() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, runner) = manager(dir.path()).await;
        sessions.start_all().unwrap();
        let requests = sessions.subscribe();

        let reply = sessions.process_command("shut down the computer").await;
        assert!(reply.starts_with("🔌 **Shutting down system...**\n👋 **Logging out...**"));
        assert!(runner
            .invocations()
            .iter()
            .any(|i| i.program == "systemctl" && i.args == ["poweroff"]));
        assert_eq!(*requests.borrow(), Some(SessionRequest::Shutdown));
    }

    #[tokio::test]
    async fn test_restart_session_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        sessions.start_all().unwrap();

        let reply = sessions.process_command("session info").await;
        assert!(reply.contains(&format!("**Session ID:** {}", sessions.session_id())));
        assert!(reply.contains("• ✅ Running: 9"));

        let reply = sessions.process_command("list components").await;
        assert!(reply.starts_with("🔐 **Session Components** (9 total):"));
        assert!(reply.contains("• **AI Shell** 🔒"));

        let requests = sessions.subscribe();
        let reply = sessions.process_command("restart desktop manager").await;
        assert!(reply.starts_with("🔄 **Restarted component:** Desktop Manager"));
        assert_eq!(*requests.borrow(), None);

        let reply = sessions.process_command("restart the session").await;
        assert!(reply.starts_with("🔄 **Restarting PersonalAIOS session...**"));
        assert_eq!(*requests.borrow(), Some(SessionRequest::Restart));
    }

    #[tokio::test]
    async fn test_unknown_command_shows_help() {
        let dir = tempfile::tempdir().unwrap();
        let (sessions, _) = manager(dir.path()).await;
        let reply = sessions.process_command("tell me a joke").await;
        assert!(reply.starts_with("❓ **I didn't understand:** \"tell me a joke\""));
        assert!(reply.contains("• \"restart session\""));
    }
}
