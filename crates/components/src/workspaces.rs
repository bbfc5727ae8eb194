//! Named, typed workspaces on top of the desktop's numbered ones.

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use personalaios_core::format::{help_text, time_ago};
use personalaios_core::{
    ContextRules, FillerStyle, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy,
    Normalizer, PatternTable, ShellError, ShellResult,
};
use personalaios_executor::WindowControl;
use personalaios_memory::{JsonStore, StorageLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FILLERS: &[&str] = &["please", "can you", "would you", "could you", "i want to"];
pub const MAX_WORKSPACES: usize = 16;
pub const MAIN_WORKSPACE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceIntent {
    Create,
    Switch,
    List,
    Rename,
    Delete,
    MoveWindow,
    Info,
    Organize,
    Overview,
}

impl Intent for WorkspaceIntent {
    fn as_str(&self) -> &'static str {
        match self {
            WorkspaceIntent::Create => "create_workspace",
            WorkspaceIntent::Switch => "switch_workspace",
            WorkspaceIntent::List => "list_workspaces",
            WorkspaceIntent::Rename => "rename_workspace",
            WorkspaceIntent::Delete => "delete_workspace",
            WorkspaceIntent::MoveWindow => "move_window",
            WorkspaceIntent::Info => "workspace_info",
            WorkspaceIntent::Organize => "organize_workspaces",
            WorkspaceIntent::Overview => "workspace_overview",
        }
    }
}

fn pattern_table() -> Result<PatternTable<WorkspaceIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            WorkspaceIntent::Create,
            &[
                r"(?:create|make|add) (?:a )?(?:new )?workspace (?:called |named |for )?(.+)",
                r"(?:create|make|add) (?:a )?(?:new )?(.+?) workspace$",
                r"^new workspace (?:called |named |for )?(.+)",
                r"(?:i )?(?:need|want) (?:a )?(?:new )?workspace (?:for )?(.+)",
            ],
        )
        .intent(
            WorkspaceIntent::Switch,
            &[
                r"(?:switch|go|move|jump) to workspace (\d+|next|previous|last|first)",
                r"(?:change to|use) workspace (\d+|next|previous|last|first)",
                r"^workspace (\d+|next|previous|last|first)$",
                r"(?:switch|go|jump) to (?:the )?(.+?) workspace$",
                r"(?:open|show) (?:the )?(.+?) workspace$",
            ],
        )
        .intent(
            WorkspaceIntent::List,
            &[
                r"^(?:list|show)(?: all)?(?: my)? workspaces$",
                r"(?:what|which) workspaces (?:do i have|are there|exist)",
                r"(?:display|show me) (?:all )?workspaces",
                r"^workspace list$",
            ],
        )
        .intent(
            WorkspaceIntent::Rename,
            &[
                r"rename workspace (\d+|current|this) (?:to )?(.+)",
                r"call workspace (\d+|current|this) (.+)",
                r"call (?:the )?(current|this) workspace (.+)",
                r"(?:change|set) workspace (\d+|current|this) name (?:to )?(.+)",
                r"^workspace (\d+|current|this) (?:should be )?(?:called|named) (.+)",
            ],
        )
        .intent(
            WorkspaceIntent::Delete,
            &[
                r"(?:delete|remove|close) (?:the )?workspace (\d+|current|last)$",
                r"(?:delete|remove|close) (?:the )?(current|last) workspace$",
                r"(?:destroy|kill) workspace (\d+|current|last)",
                r"(?:get rid of|eliminate) workspace (\d+|current|last)",
            ],
        )
        .intent(
            WorkspaceIntent::MoveWindow,
            &[
                r"(?:move|send|put) (?:this |the )?(?:window|app) (?:to|in|on) workspace (\d+)",
                r"(?:move|send|put) (?:this |the )?(?:window|app) (?:to|in|on) (?:the )?(.+?) workspace$",
            ],
        )
        .intent(
            WorkspaceIntent::Info,
            &[
                r"(?:info|information|details) (?:about |on )?workspace (\d+|current|this)",
                r"(?:what is|describe) workspace (\d+|current|this)",
                r"(?:tell me about|show) workspace (\d+|current|this)(?: details| info)?$",
                r"^(?:current )?workspace (?:info|information|details)$",
            ],
        )
        .intent(
            WorkspaceIntent::Organize,
            &[
                r"organize (?:my )?workspaces",
                r"(?:auto|smart) (?:arrange|organize|group) workspaces",
                r"optimize (?:my )?workspace (?:layout|arrangement)",
                r"(?:clean up|tidy) (?:my )?workspaces",
            ],
        )
        .intent(
            WorkspaceIntent::Overview,
            &[
                r"workspace (?:overview|summary|dashboard|statistics|stats|analytics)",
                r"show (?:me )?(?:all )?workspace (?:activity|usage)",
            ],
        )
        .build()
}

fn context_rules() -> ContextRules {
    ContextRules::new()
        .rule("urgency", &[("high", &["urgent", "quickly", "asap"])])
        .rule("persistent", &[("true", &["permanent", "persistent", "keep"])])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceType {
    #[default]
    General,
    Development,
    Productivity,
    Creative,
    Communication,
    Entertainment,
    Research,
    System,
}

impl WorkspaceType {
    pub const ALL: [WorkspaceType; 8] = [
        WorkspaceType::General,
        WorkspaceType::Development,
        WorkspaceType::Productivity,
        WorkspaceType::Creative,
        WorkspaceType::Communication,
        WorkspaceType::Entertainment,
        WorkspaceType::Research,
        WorkspaceType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceType::General => "general",
            WorkspaceType::Development => "development",
            WorkspaceType::Productivity => "productivity",
            WorkspaceType::Creative => "creative",
            WorkspaceType::Communication => "communication",
            WorkspaceType::Entertainment => "entertainment",
            WorkspaceType::Research => "research",
            WorkspaceType::System => "system",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkspaceType::General => "General",
            WorkspaceType::Development => "Development",
            WorkspaceType::Productivity => "Productivity",
            WorkspaceType::Creative => "Creative",
            WorkspaceType::Communication => "Communication",
            WorkspaceType::Entertainment => "Entertainment",
            WorkspaceType::Research => "Research",
            WorkspaceType::System => "System",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WorkspaceType::General => "🗂️",
            WorkspaceType::Development => "💻",
            WorkspaceType::Productivity => "📄",
            WorkspaceType::Creative => "🎨",
            WorkspaceType::Communication => "💬",
            WorkspaceType::Entertainment => "🎮",
            WorkspaceType::Research => "🔍",
            WorkspaceType::System => "⚙️",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            WorkspaceType::General => &[],
            WorkspaceType::Development => &[
                "code",
                "coding",
                "programming",
                "dev",
                "development",
                "project",
                "git",
                "terminal",
            ],
            WorkspaceType::Productivity => &[
                "work",
                "office",
                "documents",
                "productivity",
                "tasks",
                "planning",
                "notes",
            ],
            WorkspaceType::Creative => &[
                "design",
                "art",
                "creative",
                "photo",
                "video",
                "music",
                "graphics",
                "editing",
            ],
            WorkspaceType::Communication => &[
                "chat",
                "email",
                "communication",
                "social",
                "messaging",
                "calls",
                "meetings",
            ],
            WorkspaceType::Entertainment => &[
                "entertainment",
                "games",
                "media",
                "movies",
                "youtube",
                "streaming",
                "fun",
            ],
            WorkspaceType::Research => &[
                "research",
                "reading",
                "study",
                "learning",
                "web",
                "browser",
                "reference",
            ],
            WorkspaceType::System => &[
                "system",
                "admin",
                "settings",
                "configuration",
                "monitoring",
                "logs",
            ],
        }
    }

    pub fn suggested_apps(&self) -> &'static [&'static str] {
        match self {
            WorkspaceType::General => &[],
            WorkspaceType::Development => &["Visual Studio Code", "Terminal", "Git", "Firefox"],
            WorkspaceType::Productivity => &["LibreOffice Writer", "Calculator", "Files", "Email"],
            WorkspaceType::Creative => &["GIMP", "Inkscape", "Audacity", "Blender"],
            WorkspaceType::Communication => &["Thunderbird", "Slack", "Discord", "Zoom"],
            WorkspaceType::Entertainment => &["VLC", "Spotify", "Games", "YouTube"],
            WorkspaceType::Research => &["Firefox", "Files", "Notes", "PDF Viewer"],
            WorkspaceType::System => &["System Monitor", "Terminal", "Settings", "Files"],
        }
    }

    /// First type with a keyword among the words of `text`.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.keywords().iter().any(|k| words.contains(k)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartWorkspace {
    pub id: u32,
    pub name: String,
    pub workspace_type: WorkspaceType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub window_ids: Vec<String>,
    #[serde(default)]
    pub creation_time: i64,
    #[serde(default)]
    pub last_used: i64,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub auto_created: bool,
    #[serde(default)]
    pub ai_suggested_apps: Vec<String>,
    #[serde(default)]
    pub persistent_layout: bool,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub color_theme: Option<String>,
}

impl SmartWorkspace {
    pub fn new(id: u32, name: &str, workspace_type: WorkspaceType, now: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            workspace_type,
            description: default_description(name),
            applications: Vec::new(),
            window_ids: Vec::new(),
            creation_time: now,
            last_used: now,
            usage_count: 0,
            auto_created: false,
            ai_suggested_apps: workspace_type
                .suggested_apps()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            persistent_layout: false,
            background_image: None,
            color_theme: None,
        }
    }

    fn main(now: i64) -> Self {
        Self {
            description: "Default workspace".to_string(),
            usage_count: 1,
            ..Self::new(MAIN_WORKSPACE, "Main", WorkspaceType::General, now)
        }
    }
}

fn default_description(name: &str) -> String {
    format!("Workspace for {}", name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspacePreferences {
    pub auto_naming: bool,
    pub smart_switching: bool,
    pub usage_learning: bool,
    pub workspace_persistence: bool,
    pub max_history: usize,
}

impl Default for WorkspacePreferences {
    fn default() -> Self {
        Self {
            auto_naming: true,
            smart_switching: true,
            usage_learning: true,
            workspace_persistence: true,
            max_history: 10,
        }
    }
}

/// Layout of `workspaces/workspaces.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspacesFile {
    #[serde(default)]
    pub workspaces: BTreeMap<u32, SmartWorkspace>,
    #[serde(default = "main_id")]
    pub current_workspace_id: u32,
    #[serde(default)]
    pub workspace_history: Vec<u32>,
    #[serde(default)]
    pub user_preferences: WorkspacePreferences,
    #[serde(default)]
    pub last_save: i64,
}

fn main_id() -> u32 {
    MAIN_WORKSPACE
}

impl Default for WorkspacesFile {
    fn default() -> Self {
        Self {
            workspaces: BTreeMap::new(),
            current_workspace_id: MAIN_WORKSPACE,
            workspace_history: Vec::new(),
            user_preferences: WorkspacePreferences::default(),
            last_save: 0,
        }
    }
}

impl WorkspacesFile {
    /// Main always exists and the current workspace is a known one.
    fn repair(&mut self, now: i64) {
        self.workspaces
            .entry(MAIN_WORKSPACE)
            .or_insert_with(|| SmartWorkspace::main(now));
        for (id, workspace) in self.workspaces.iter_mut() {
            workspace.id = *id;
        }
        if !self.workspaces.contains_key(&self.current_workspace_id) {
            self.current_workspace_id = MAIN_WORKSPACE;
        }
        let known = &self.workspaces;
        self.workspace_history.retain(|id| known.contains_key(id));
        if self.workspace_history.is_empty() {
            self.workspace_history.push(self.current_workspace_id);
        }
    }

    /// `next`, `previous`, `first`, `last`, `current` or a number.
    fn resolve(&self, identifier: &str) -> Option<u32> {
        let identifier = identifier.trim().to_lowercase();
        let ids: Vec<u32> = self.workspaces.keys().copied().collect();
        let position = ids.iter().position(|id| *id == self.current_workspace_id).unwrap_or(0);
        match identifier.as_str() {
            "current" | "this" => Some(self.current_workspace_id),
            "next" => ids.get((position + 1) % ids.len().max(1)).copied(),
            "previous" => ids.get((position + ids.len().max(1) - 1) % ids.len().max(1)).copied(),
            "first" => ids.first().copied(),
            "last" => ids.last().copied(),
            number => number.parse().ok(),
        }
    }

    /// Exact name, partial name, then a workspace of the type `name` suggests.
    fn find_by_name(&self, name: &str) -> Option<u32> {
        let name = name.trim().to_lowercase();
        let all = || self.workspaces.values();
        all()
            .find(|w| w.name.to_lowercase() == name)
            .or_else(|| all().find(|w| w.name.to_lowercase().contains(&name)))
            .or_else(|| {
                let kind = WorkspaceType::detect(&name)?;
                all().find(|w| w.workspace_type == kind)
            })
            .map(|w| w.id)
    }

    fn locate(&self, target: &str) -> Option<u32> {
        self.resolve(target)
            .filter(|id| self.workspaces.contains_key(id))
            .or_else(|| self.find_by_name(target))
    }

    fn not_found(&self, target: &str) -> ShellError {
        let available = self
            .workspaces
            .values()
            .map(|w| format!("{} ({})", w.id, w.name))
            .collect();
        ShellError::not_found_with("workspace", target, available)
    }

    fn free_id(&self) -> Option<u32> {
        if self.workspaces.len() >= MAX_WORKSPACES {
            return None;
        }
        (1..=MAX_WORKSPACES as u32).find(|id| !self.workspaces.contains_key(id))
    }

    fn record_switch(&mut self, id: u32, now: i64) {
        if let Some(previous) = self.workspaces.get_mut(&self.current_workspace_id) {
            previous.last_used = now;
        }
        self.current_workspace_id = id;
        if let Some(workspace) = self.workspaces.get_mut(&id) {
            workspace.last_used = now;
            workspace.usage_count += 1;
        }
        self.workspace_history.retain(|seen| *seen != id);
        self.workspace_history.push(id);
        let cap = self.user_preferences.max_history.max(1);
        if self.workspace_history.len() > cap {
            let excess = self.workspace_history.len() - cap;
            self.workspace_history.drain(..excess);
        }
    }

    /// Drop unused workspaces, then renumber the rest from 2 grouped by type
    /// and most used first. Returns the number of changes.
    fn organize(&mut self) -> usize {
        let current = self.current_workspace_id;
        let empty: Vec<u32> = self
            .workspaces
            .values()
            .filter(|w| {
                w.id != MAIN_WORKSPACE
                    && w.id != current
                    && w.usage_count == 0
                    && w.applications.is_empty()
            })
            .map(|w| w.id)
            .collect();
        for id in &empty {
            self.workspaces.remove(id);
        }
        let mut changes = empty.len();

        let main = self.workspaces.remove(&MAIN_WORKSPACE);
        let mut rest: Vec<SmartWorkspace> =
            std::mem::take(&mut self.workspaces).into_values().collect();
        rest.sort_by(|a, b| {
            a.workspace_type
                .as_str()
                .cmp(b.workspace_type.as_str())
                .then(b.usage_count.cmp(&a.usage_count))
                .then(a.id.cmp(&b.id))
        });

        let mut mapping = BTreeMap::new();
        for (offset, mut workspace) in rest.into_iter().enumerate() {
            let new_id = MAIN_WORKSPACE + 1 + offset as u32;
            if new_id != workspace.id {
                mapping.insert(workspace.id, new_id);
                changes += 1;
            }
            workspace.id = new_id;
            self.workspaces.insert(new_id, workspace);
        }
        if let Some(main) = main {
            self.workspaces.insert(MAIN_WORKSPACE, main);
        }

        let remap = |id: u32| mapping.get(&id).copied().unwrap_or(id);
        self.current_workspace_id = remap(current);
        self.workspace_history = self
            .workspace_history
            .iter()
            .filter(|id| !empty.contains(id))
            .map(|id| remap(*id))
            .collect();
        changes
    }
}

pub struct WorkspaceManager {
    engine: IntentEngine<WorkspaceIntent>,
    control: WindowControl,
    store: JsonStore<WorkspacesFile>,
    state: Mutex<WorkspacesFile>,
}

impl WorkspaceManager {
    /// Load `workspaces/workspaces.json`, starting with just Main when absent.
    pub async fn new(
        control: WindowControl,
        layout: &StorageLayout,
        policy: MatchPolicy,
    ) -> ShellResult<Self> {
        let normalizer = Normalizer::new(FILLERS, FillerStyle::WordBoundary)?;
        let engine = IntentEngine::new(normalizer, pattern_table()?, context_rules())
            .with_policy(policy);
        let store: JsonStore<WorkspacesFile> = layout.store("workspaces", "workspaces.json");
        let mut state = store.load().await;
        state.repair(Local::now().timestamp());
        tracing::debug!(workspaces = state.workspaces.len(), "workspaces loaded");

        Ok(Self {
            engine,
            control,
            store,
            state: Mutex::new(state),
        })
    }

    pub fn current(&self) -> u32 {
        self.state.lock().current_workspace_id
    }

    pub fn workspace(&self, id: u32) -> Option<SmartWorkspace> {
        self.state.lock().workspaces.get(&id).cloned()
    }

    pub fn workspaces(&self) -> Vec<SmartWorkspace> {
        self.state.lock().workspaces.values().cloned().collect()
    }

    pub fn history(&self) -> Vec<u32> {
        self.state.lock().workspace_history.clone()
    }

    async fn save(&self) -> ShellResult<()> {
        let snapshot = {
            let mut state = self.state.lock();
            state.last_save = Local::now().timestamp();
            state.clone()
        };
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// Record the switch and move the desktop there. A missing desktop tool
    /// only skips the physical switch.
    async fn switch_to(&self, id: u32) -> ShellResult<()> {
        self.state.lock().record_switch(id, Local::now().timestamp());
        if let Err(e) = self.control.switch_workspace(id).await {
            tracing::warn!(workspace = id, error = %e, "desktop workspace switch unavailable");
        }
        self.save().await
    }

    /// Create a workspace named `name` and switch to it.
    pub async fn create(&self, name: &str, text: &str) -> ShellResult<SmartWorkspace> {
        let workspace = {
            let mut state = self.state.lock();
            let id = state.free_id().ok_or_else(|| {
                ShellError::refused(format!(
                    "Maximum workspaces reached ({}). Delete unused workspaces first.",
                    MAX_WORKSPACES
                ))
            })?;
            let kind = WorkspaceType::detect(text).unwrap_or_default();
            let mut workspace = SmartWorkspace::new(id, name, kind, Local::now().timestamp());
            workspace.persistent_layout = ["permanent", "persistent", "keep", "save"]
                .iter()
                .any(|w| text.split_whitespace().any(|t| t == *w));
            state.workspaces.insert(id, workspace.clone());
            workspace
        };
        tracing::info!(workspace = workspace.id, name = %workspace.name, "workspace created");
        self.switch_to(workspace.id).await?;
        Ok(workspace)
    }

    async fn handle_create(&self, matched: &IntentMatch<WorkspaceIntent>) -> ShellResult<String> {
        let Some(name) = matched.entities.group(0) else {
            return Ok(
                "🗂️ **Please specify a name for the new workspace**\n\n\
                 **Examples:** create workspace for coding, new workspace called research"
                    .to_string(),
            );
        };
        let workspace = self.create(name, &matched.text).await?;
        let mut out = format!("🗂️ **Created workspace:** {}", workspace.name);
        if workspace.workspace_type != WorkspaceType::General {
            out.push_str(&format!(" ({})", workspace.workspace_type.as_str()));
        }
        out.push_str(&format!("\n   └─ ID: {}\n   └─ Switched to new workspace", workspace.id));
        if !workspace.ai_suggested_apps.is_empty() {
            let apps: Vec<&str> =
                workspace.ai_suggested_apps.iter().take(3).map(String::as_str).collect();
            out.push_str(&format!("\n   └─ Suggested apps: {}", apps.join(", ")));
        }
        Ok(out)
    }

    async fn handle_switch(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok(
                "🗂️ **Please specify which workspace to switch to**\n\n\
                 **Examples:** switch to workspace 2, go to next workspace, switch to development \
                 workspace"
                    .to_string(),
            );
        };
        let id = {
            let state = self.state.lock();
            let id = state.locate(target).ok_or_else(|| state.not_found(target))?;
            if id == state.current_workspace_id {
                let name = state.workspaces.get(&id).map(|w| w.name.clone()).unwrap_or_default();
                return Ok(format!("✅ **Already on workspace:** {}", name));
            }
            id
        };
        self.switch_to(id).await?;
        let workspace = self
            .workspace(id)
            .ok_or_else(|| ShellError::not_found("workspace", target))?;
        Ok(format!(
            "🗂️ **Switched to workspace:** {}\n   └─ ID: {}\n   └─ Type: {}",
            workspace.name,
            workspace.id,
            workspace.workspace_type.label()
        ))
    }

    fn handle_list(&self) -> String {
        let state = self.state.lock();
        let now = Local::now().timestamp();
        let current = state.current_workspace_id;
        let mut sorted: Vec<&SmartWorkspace> = state.workspaces.values().collect();
        sorted.sort_by(|a, b| {
            (b.id == current)
                .cmp(&(a.id == current))
                .then(b.usage_count.cmp(&a.usage_count))
                .then(b.last_used.cmp(&a.last_used))
        });

        let mut out = format!("🗂️ **Available Workspaces** ({} total):\n\n", sorted.len());
        for workspace in sorted {
            let marker = if workspace.id == current { "📍 " } else { "   " };
            out.push_str(&format!(
                "{}{} **{}** (#{})",
                marker,
                workspace.workspace_type.icon(),
                workspace.name,
                workspace.id
            ));
            if workspace.usage_count > 0 {
                out.push_str(&format!(" (used {}x)", workspace.usage_count));
            }
            out.push('\n');

            if !workspace.description.is_empty()
                && workspace.description != default_description(&workspace.name)
            {
                let short: String = workspace.description.chars().take(50).collect();
                let ellipsis = if workspace.description.chars().count() > 50 { "..." } else { "" };
                out.push_str(&format!("      └─ {}{}\n", short, ellipsis));
            }
            let mut details = String::new();
            if !workspace.applications.is_empty() {
                details.push_str(&format!(" • {} apps", workspace.applications.len()));
            }
            if workspace.last_used > 0 {
                details.push_str(&format!(" • {}", time_ago(workspace.last_used, now)));
            }
            if !details.is_empty() {
                out.push_str(&format!(
                    "      └─ {}{}\n",
                    workspace.workspace_type.label(),
                    details
                ));
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    async fn handle_rename(&self, matched: &IntentMatch<WorkspaceIntent>) -> ShellResult<String> {
        let (Some(identifier), Some(new_name)) =
            (matched.entities.group(0), matched.entities.group(1))
        else {
            return Ok(
                "🏷️ **Please specify workspace and new name**\n\n\
                 **Examples:** rename workspace 2 to development, call current workspace research"
                    .to_string(),
            );
        };
        let (id, old_name) = {
            let mut state = self.state.lock();
            let id = state
                .resolve(identifier)
                .ok_or_else(|| {
                    ShellError::invalid(format!("Invalid workspace identifier: '{}'", identifier))
                })?;
            let workspace = state
                .workspaces
                .get_mut(&id)
                .ok_or_else(|| ShellError::not_found("workspace", id.to_string()))?;
            let old_name = std::mem::replace(&mut workspace.name, new_name.to_string());
            if workspace.description == default_description(&old_name) {
                workspace.description = default_description(new_name);
            }
            (id, old_name)
        };
        self.save().await?;
        Ok(format!(
            "🏷️ **Renamed workspace:** '{}' → '{}'\n   └─ Workspace ID: {}",
            old_name, new_name, id
        ))
    }

    async fn handle_delete(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok(
                "🗑️ **Please specify which workspace to delete**\n\n\
                 **Examples:** delete workspace 3, remove last workspace"
                    .to_string(),
            );
        };
        let deleted = {
            let mut state = self.state.lock();
            let id = state
                .resolve(target)
                .ok_or_else(|| {
                    ShellError::invalid(format!("Invalid workspace identifier: '{}'", target))
                })?;
            if !state.workspaces.contains_key(&id) {
                return Err(state.not_found(&id.to_string()));
            }
            if id == MAIN_WORKSPACE {
                return Err(ShellError::refused("Cannot delete the main workspace (ID: 1)"));
            }
            if id == state.current_workspace_id {
                return Err(ShellError::refused(
                    "Cannot delete current active workspace. Switch to another workspace first.",
                ));
            }
            state.workspace_history.retain(|seen| *seen != id);
            state
                .workspaces
                .remove(&id)
                .ok_or_else(|| ShellError::not_found("workspace", id.to_string()))?
        };
        self.save().await?;
        tracing::info!(workspace = deleted.id, "workspace deleted");
        Ok(format!(
            "🗑️ **Deleted workspace:** {}\n   └─ ID: {}\n   └─ Type: {}",
            deleted.name,
            deleted.id,
            deleted.workspace_type.label()
        ))
    }

    async fn handle_move_window(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok(
                "🔄 **Please specify target workspace**\n\n\
                 **Examples:** move window to workspace 2, send app to development workspace"
                    .to_string(),
            );
        };
        let (id, name) = {
            let state = self.state.lock();
            let id = state.locate(target).ok_or_else(|| state.not_found(target))?;
            let name = state.workspaces.get(&id).map(|w| w.name.clone()).unwrap_or_default();
            (id, name)
        };
        self.control.move_active_to_workspace(id).await.map_err(|e| {
            tracing::warn!(workspace = id, error = %e, "moving the active window failed");
            ShellError::ToolUnavailable(
                "Window management tools not available. \
                 Install 'wmctrl' for window moving functionality."
                    .to_string(),
            )
        })?;
        Ok(format!("🔄 **Moved window to workspace:** {}\n   └─ ID: {}", name, id))
    }

    fn handle_info(&self, target: Option<&str>) -> ShellResult<String> {
        let state = self.state.lock();
        let target = target.unwrap_or("current");
        let id = state
            .locate(target)
            .filter(|id| state.workspaces.contains_key(id))
            .ok_or_else(|| state.not_found(target))?;
        let workspace = state
            .workspaces
            .get(&id)
            .ok_or_else(|| state.not_found(target))?;

        let stamp = |ts: i64| {
            Local
                .timestamp_opt(ts, 0)
                .single()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string())
        };
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };

        let mut out = format!(
            "ℹ️ **Workspace Information:** {}\n\n**ID:** {}\n**Type:** {}\n",
            workspace.name,
            workspace.id,
            workspace.workspace_type.label()
        );
        if !workspace.description.is_empty() {
            out.push_str(&format!("**Description:** {}\n", workspace.description));
        }
        out.push_str(&format!("**Created:** {}\n", stamp(workspace.creation_time)));
        if workspace.usage_count > 0 {
            out.push_str(&format!(
                "**Usage:** {} times\n**Last Used:** {}\n",
                workspace.usage_count,
                stamp(workspace.last_used)
            ));
        }
        if !workspace.applications.is_empty() {
            out.push_str(&format!("**Applications:** {}\n", workspace.applications.len()));
            for app in workspace.applications.iter().take(5) {
                out.push_str(&format!("  • {}\n", app));
            }
            if workspace.applications.len() > 5 {
                out.push_str(&format!("  • ... and {} more\n", workspace.applications.len() - 5));
            }
        }
        if !workspace.ai_suggested_apps.is_empty() {
            let apps: Vec<&str> =
                workspace.ai_suggested_apps.iter().take(3).map(String::as_str).collect();
            out.push_str(&format!("**AI Suggestions:** {}\n", apps.join(", ")));
        }
        out.push_str(&format!(
            "**Auto-created:** {}\n**Persistent Layout:** {}",
            yes_no(workspace.auto_created),
            yes_no(workspace.persistent_layout)
        ));
        Ok(out)
    }

    async fn handle_organize(&self) -> ShellResult<String> {
        let changes = self.state.lock().organize();
        if changes == 0 {
            return Ok("✅ **Workspaces already organized**\n\nNo changes needed.".to_string());
        }
        self.save().await?;
        tracing::info!(changes, "workspaces organized");
        Ok(format!(
            "🗂️ **Organized workspaces:** {} changes made\n   \
             └─ Workspaces sorted by type and usage\n   └─ Empty workspaces removed",
            changes
        ))
    }

    fn handle_overview(&self) -> String {
        let state = self.state.lock();
        let total_usage: u32 = state.workspaces.values().map(|w| w.usage_count).sum();
        let most_used = state
            .workspaces
            .values()
            .fold(None::<&SmartWorkspace>, |best, w| match best {
                Some(b) if b.usage_count >= w.usage_count => Some(b),
                _ => Some(w),
            });
        let current_name = state
            .workspaces
            .get(&state.current_workspace_id)
            .map(|w| w.name.as_str())
            .unwrap_or("Main");

        let mut out = format!(
            "📊 **Workspace Overview & Analytics**\n\n**Total Workspaces:** {}\n\
             **Current Workspace:** {}\n**Total Usage:** {} switches\n",
            state.workspaces.len(),
            current_name,
            total_usage
        );
        if let Some(most_used) = most_used {
            out.push_str(&format!(
                "**Most Used:** {} ({}x)\n",
                most_used.name, most_used.usage_count
            ));
        }
        out.push_str("\n**By Type:**\n");
        for kind in WorkspaceType::ALL {
            let count = state.workspaces.values().filter(|w| w.workspace_type == kind).count();
            if count > 0 {
                out.push_str(&format!("• {} {}: {}\n", kind.icon(), kind.label(), count));
            }
        }

        let recent: Vec<&SmartWorkspace> = state
            .workspace_history
            .iter()
            .rev()
            .take(5)
            .filter_map(|id| state.workspaces.get(id))
            .collect();
        if !recent.is_empty() {
            out.push_str("\n**Recent Activity:**\n");
            for workspace in recent {
                out.push_str(&format!("• {} (#{})\n", workspace.name, workspace.id));
            }
        }
        out.trim_end().to_string()
    }
}

#[async_trait]
impl IntentHandler for WorkspaceManager {
    type Intent = WorkspaceIntent;
    const NAME: &'static str = "workspaces";
    const TITLE: &'static str = "workspace management";

    fn engine(&self) -> &IntentEngine<WorkspaceIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<WorkspaceIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        let target = matched.entities.group(0);
        match matched.intent {
            WorkspaceIntent::Create => self.handle_create(matched).await,
            WorkspaceIntent::Switch => self.handle_switch(target).await,
            WorkspaceIntent::List => Ok(self.handle_list()),
            WorkspaceIntent::Rename => self.handle_rename(matched).await,
            WorkspaceIntent::Delete => self.handle_delete(target).await,
            WorkspaceIntent::MoveWindow => self.handle_move_window(target).await,
            WorkspaceIntent::Info => self.handle_info(target),
            WorkspaceIntent::Organize => self.handle_organize().await,
            WorkspaceIntent::Overview => Ok(self.handle_overview()),
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "🗂️ **Try these natural language workspace commands:**",
            &[
                (
                    "Workspace Creation",
                    &[
                        "create workspace for coding",
                        "new workspace called research",
                        "make productivity workspace",
                    ],
                ),
                (
                    "Workspace Navigation",
                    &[
                        "switch to workspace 2",
                        "go to next workspace",
                        "switch to development workspace",
                    ],
                ),
                (
                    "Workspace Management",
                    &[
                        "list all workspaces",
                        "rename workspace 3 to projects",
                        "delete workspace 4",
                        "workspace overview",
                    ],
                ),
                (
                    "Window Management",
                    &[
                        "move window to workspace 2",
                        "send app to coding workspace",
                        "workspace info",
                    ],
                ),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personalaios_core::Component;
    use personalaios_executor::DryRunRunner;
    use std::path::Path;
    use std::sync::Arc;

    async fn manager(dir: &Path) -> (WorkspaceManager, Arc<DryRunRunner>) {
        let runner = Arc::new(DryRunRunner::new());
        let workspaces = WorkspaceManager::new(
            WindowControl::new(runner.clone()),
            &StorageLayout::new(dir),
            MatchPolicy::BestMatch,
        )
        .await
        .unwrap();
        (workspaces, runner)
    }

    fn wmctrl_calls(runner: &DryRunRunner) -> Vec<Vec<String>> {
        runner
            .invocations()
            .into_iter()
            .filter(|i| i.program == "wmctrl")
            .map(|i| i.args)
            .collect()
    }

    #[test]
    fn test_type_detection_uses_whole_words() {
        assert_eq!(WorkspaceType::detect("workspace for coding"), Some(WorkspaceType::Development));
        assert_eq!(WorkspaceType::detect("music and video"), Some(WorkspaceType::Creative));
        assert_eq!(WorkspaceType::detect("device drivers"), None);
        assert_eq!(WorkspaceType::detect("artichoke"), None);
    }

    #[tokio::test]
    async fn test_create_switches_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, runner) = manager(dir.path()).await;

        let reply = workspaces.process_command("create workspace for coding").await;
        assert_eq!(
            reply,
            "🗂️ **Created workspace:** coding (development)\n   └─ ID: 2\n   \
             └─ Switched to new workspace\n   └─ Suggested apps: Visual Studio Code, Terminal, Git"
        );
        assert_eq!(workspaces.current(), 2);
        assert_eq!(workspaces.workspace(2).unwrap().usage_count, 1);
        assert_eq!(wmctrl_calls(&runner), vec![vec!["-s".to_string(), "1".to_string()]]);

        let (reloaded, _) = manager(dir.path()).await;
        assert_eq!(reloaded.workspaces(), workspaces.workspaces());
        assert_eq!(reloaded.current(), 2);
        assert_eq!(reloaded.history(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_switch_by_number_direction_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, runner) = manager(dir.path()).await;
        workspaces.process_command("make productivity workspace").await;
        workspaces.process_command("create workspace for music").await;
        assert_eq!(workspaces.current(), 3);

        let reply = workspaces.process_command("switch to workspace 1").await;
        assert_eq!(reply, "🗂️ **Switched to workspace:** Main\n   └─ ID: 1\n   └─ Type: General");

        workspaces.process_command("go to next workspace").await;
        assert_eq!(workspaces.current(), 2);
        workspaces.process_command("workspace previous").await;
        assert_eq!(workspaces.current(), 1);

        let reply = workspaces.process_command("switch to design workspace").await;
        assert!(reply.starts_with("🗂️ **Switched to workspace:** music"));

        let reply = workspaces.process_command("switch to workspace 3").await;
        assert_eq!(reply, "✅ **Already on workspace:** music");

        let reply = workspaces.process_command("switch to workspace 9").await;
        assert!(reply.starts_with("🔍 **Workspace not found:** '9'"));
        assert!(reply.contains("• 1 (Main)"));

        assert_eq!(wmctrl_calls(&runner).last().unwrap(), &vec!["-s".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn test_switch_without_desktop_tools_still_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, runner) = manager(dir.path()).await;
        runner.missing("wmctrl");
        runner.missing("xdotool");
        workspaces.process_command("new workspace called research").await;
        assert_eq!(workspaces.current(), 2);
        assert_eq!(workspaces.workspace(2).unwrap().workspace_type, WorkspaceType::Research);
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, _) = manager(dir.path()).await;
        workspaces.process_command("create workspace for coding").await;
        workspaces.process_command("create workspace for email").await;

        let reply = workspaces.process_command("delete workspace 1").await;
        assert_eq!(reply, "⚠️ **Cannot delete the main workspace (ID: 1)**");

        let reply = workspaces.process_command("delete workspace 3").await;
        assert!(reply.starts_with("⚠️ **Cannot delete current active workspace."));

        let reply = workspaces.process_command("delete workspace 2").await;
        assert_eq!(reply, "🗑️ **Deleted workspace:** coding\n   └─ ID: 2\n   └─ Type: Development");
        assert!(workspaces.workspace(2).is_none());
        assert!(!workspaces.history().contains(&2));

        let reply = workspaces.process_command("delete workspace 7").await;
        assert!(reply.starts_with("🔍 **Workspace not found:** '7'"));
    }

    #[tokio::test]
    async fn test_rename_updates_generated_description() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, _) = manager(dir.path()).await;
        workspaces.process_command("create workspace for coding").await;

        let reply = workspaces.process_command("rename workspace 2 to projects").await;
        assert_eq!(reply, "🏷️ **Renamed workspace:** 'coding' → 'projects'\n   └─ Workspace ID: 2");
        assert_eq!(workspaces.workspace(2).unwrap().description, "Workspace for projects");

        workspaces.process_command("call current workspace deep work").await;
        assert_eq!(workspaces.workspace(2).unwrap().name, "deep work");
    }

    #[tokio::test]
    async fn test_limit_and_history_cap() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, _) = manager(dir.path()).await;
        for n in 2..=16 {
            workspaces.create(&format!("space {}", n), "").await.unwrap();
        }
        assert_eq!(workspaces.workspaces().len(), MAX_WORKSPACES);
        assert_eq!(workspaces.history().len(), 10);
        assert_eq!(workspaces.history().last(), Some(&16));

        let reply = workspaces.process_command("create workspace for games").await;
        assert!(reply.starts_with("⚠️ **Maximum workspaces reached (16)."));
    }

    #[tokio::test]
    async fn test_move_window() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, runner) = manager(dir.path()).await;
        workspaces.process_command("create workspace for coding").await;

        let reply = workspaces.process_command("send app to coding workspace").await;
        assert_eq!(reply, "🔄 **Moved window to workspace:** coding\n   └─ ID: 2");
        assert_eq!(
            wmctrl_calls(&runner).last().unwrap(),
            &vec!["-r".to_string(), ":ACTIVE:".to_string(), "-t".to_string(), "1".to_string()]
        );

        runner.missing("wmctrl");
        runner.missing("xdotool");
        let reply = workspaces.process_command("move window to workspace 1").await;
        assert!(reply
            .starts_with("⚠️ **Tool not available:** Window management tools not available."));
    }

    #[tokio::test]
    async fn test_organize_removes_unused_and_renumbers() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        let mut file = WorkspacesFile::default();
        file.workspaces.insert(1, SmartWorkspace::main(0));
        let mut chat = SmartWorkspace::new(3, "chat", WorkspaceType::Communication, 0);
        chat.usage_count = 4;
        let mut code = SmartWorkspace::new(5, "code", WorkspaceType::Development, 0);
        code.usage_count = 2;
        file.workspaces.insert(3, chat);
        file.workspaces.insert(4, SmartWorkspace::new(4, "unused", WorkspaceType::General, 0));
        file.workspaces.insert(5, code);
        file.current_workspace_id = 5;
        file.workspace_history = vec![1, 4, 3, 5];
        layout.store::<WorkspacesFile>("workspaces", "workspaces.json").save(&file).await.unwrap();

        let (workspaces, _) = manager(dir.path()).await;
        let reply = workspaces.process_command("organize my workspaces").await;
        assert!(reply.starts_with("🗂️ **Organized workspaces:** 3 changes made"));

        let names: Vec<(u32, String)> =
            workspaces.workspaces().into_iter().map(|w| (w.id, w.name)).collect();
        assert_eq!(
            names,
            vec![(1, "Main".to_string()), (2, "chat".to_string()), (3, "code".to_string())]
        );
        assert_eq!(workspaces.current(), 3);
        assert_eq!(workspaces.history(), vec![1, 2, 3]);

        let reply = workspaces.process_command("tidy my workspaces").await;
        assert!(reply.starts_with("✅ **Workspaces already organized**"));
    }

    #[tokio::test]
    async fn test_list_info_and_overview() {
        let dir = tempfile::tempdir().unwrap();
        let (workspaces, _) = manager(dir.path()).await;
        workspaces.process_command("create workspace for coding").await;

        let reply = workspaces.process_command("list all workspaces").await;
        assert!(reply.starts_with(
            "🗂️ **Available Workspaces** (2 total):\n\n📍 💻 **coding** (#2) (used 1x)"
        ));

        let reply = workspaces.process_command("workspace info").await;
        assert!(reply.starts_with("ℹ️ **Workspace Information:** coding"));
        assert!(reply.contains("**AI Suggestions:** Visual Studio Code, Terminal, Git"));

        let reply = workspaces.process_command("show workspace 1 details").await;
        assert!(reply.contains("**Description:** Default workspace"));

        let reply = workspaces.process_command("workspace overview").await;
        assert!(reply.contains("**Total Workspaces:** 2"));
        assert!(reply.contains("**Current Workspace:** coding"));
        assert!(reply.contains("• 💻 Development: 1"));
        assert!(reply.ends_with("**Recent Activity:**\n• coding (#2)\n• Main (#1)"));
    }
}
