//! Application launcher over XDG desktop entries.

use async_trait::async_trait;
use parking_lot::RwLock;
use personalaios_core::format::help_text;
use personalaios_core::fuzzy::{self, FuzzyOptions, MatchTier, TieBreak};
use personalaios_core::{
    ContextRules, FillerStyle, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy,
    Normalizer, PatternTable, ShellError, ShellResult,
};
use personalaios_executor::Desktop;
use personalaios_memory::{JsonStore, StorageLayout};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

const FUZZY: FuzzyOptions = FuzzyOptions::new(0.6, TieBreak::BestScore);
const SUGGESTION_FLOOR: f64 = 0.3;
const MAX_SUGGESTIONS: usize = 10;
const SEARCH_LIMIT: usize = 10;
const LIST_LIMIT: usize = 15;

const FILLERS: &[&str] = &[
    "please",
    "can you",
    "would you",
    "could you",
    "i want to",
    "help me",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppIntent {
    Launch,
    Search,
    List,
    ListFavorites,
    Favorite,
    Unfavorite,
    Refresh,
}

impl Intent for AppIntent {
    fn as_str(&self) -> &'static str {
        match self {
            AppIntent::Launch => "launch",
            AppIntent::Search => "search",
            AppIntent::List => "list",
            AppIntent::ListFavorites => "list_favorites",
            AppIntent::Favorite => "favorite",
            AppIntent::Unfavorite => "unfavorite",
            AppIntent::Refresh => "refresh",
        }
    }
}

fn pattern_table() -> Result<PatternTable<AppIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            AppIntent::Launch,
            &[
                r"(?:open|launch|start|run|execute)\s+(.+)",
                r"(?:use|open|start)\s+(.+)",
                r"(.+?)(?:\s+please)?$",
            ],
        )
        .intent(
            AppIntent::Search,
            &[
                r"(?:find|search|look\s+for|locate)\s+(?:an?\s+)?(?:app|application|program)s?\s+(?:for\s+)?(.+)",
                r"(?:what\s+)?(?:apps|applications|programs)\s+(?:do\s+i\s+have\s+)?for\s+(.+)",
                r"(?:find|search(?:\s+for)?|look\s+for|locate)\s+(.+)",
            ],
        )
        .intent(
            AppIntent::List,
            &[
                r"(?:list|show)\s+(?:all\s+)?(?:my\s+)?(?:apps|applications|programs)",
                r"(?:what\s+)?(?:apps|applications|programs)\s+(?:do\s+i\s+have|are\s+installed)",
                r"(?:display|show\s+me)\s+(?:installed\s+)?(?:apps|applications)",
            ],
        )
        .intent(
            AppIntent::ListFavorites,
            &[
                r"(?:list|show)\s+(?:my\s+)?favou?rites?(?:\s+(?:apps|applications))?",
                r"favou?rite\s+(?:apps|applications)",
            ],
        )
        .intent(
            AppIntent::Favorite,
            &[
                r"add\s+(.+?)\s+to\s+(?:my\s+)?favou?rites",
                r"^favou?rite\s+(.+)",
            ],
        )
        .intent(
            AppIntent::Unfavorite,
            &[
                r"remove\s+(.+?)\s+from\s+(?:my\s+)?favou?rites",
                r"^unfavou?rite\s+(.+)",
            ],
        )
        .intent(
            AppIntent::Refresh,
            &[
                r"(?:refresh|rescan|reload|update)\s+(?:the\s+)?(?:apps|applications|application\s+cache|app\s+list)",
            ],
        )
        .build()
}

/// XDG application directories searched when none are configured.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs_list = vec![
        PathBuf::from("/usr/share/applications"),
        PathBuf::from("/usr/local/share/applications"),
        PathBuf::from("/var/lib/flatpak/exports/share/applications"),
        PathBuf::from("/var/lib/snapd/desktop/applications"),
    ];
    if let Some(data) = dirs::data_dir() {
        dirs_list.push(data.join("applications"));
        dirs_list.push(data.join("flatpak/exports/share/applications"));
    }
    dirs_list
}

/// One launchable application from a `.desktop` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub description: String,
    pub executable: String,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub desktop_file: Option<PathBuf>,
    pub icon: Option<String>,
    pub terminal: bool,
    pub usage_count: u32,
    pub last_used: i64,
    pub is_favorite: bool,
}

impl Application {
    /// Name accepted by `gtk-launch`: the desktop file name.
    pub fn desktop_id(&self) -> String {
        self.desktop_file
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn emoji(&self) -> &'static str {
        const BY_NAME: &[(&str, &str)] = &[
            ("firefox", "🦊"),
            ("chrome", "🌐"),
            ("browser", "🌐"),
            ("terminal", "💻"),
            ("console", "💻"),
            ("editor", "📝"),
            ("text", "📝"),
            ("file", "📁"),
            ("folder", "📁"),
            ("music", "🎵"),
            ("audio", "🎵"),
            ("video", "🎬"),
            ("movie", "🎬"),
            ("image", "🖼️"),
            ("photo", "🖼️"),
            ("game", "🎮"),
            ("calculator", "🧮"),
            ("calc", "🧮"),
            ("mail", "📧"),
            ("settings", "⚙️"),
            ("config", "⚙️"),
        ];
        let name = self.name.to_lowercase();
        if let Some((_, icon)) = BY_NAME.iter().find(|(key, _)| name.contains(key)) {
            return *icon;
        }
        for category in &self.categories {
            let category = category.to_lowercase();
            if category.contains("development") || category.contains("programming") {
                return "💻";
            } else if category.contains("graphics") || category.contains("multimedia") {
                return "🎨";
            } else if category.contains("office") {
                return "📄";
            } else if category.contains("network") || category.contains("internet") {
                return "🌐";
            } else if category.contains("game") {
                return "🎮";
            } else if category.contains("system") || category.contains("utility") {
                return "⚙️";
            }
        }
        "📱"
    }
}

fn semicolon_list(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the `[Desktop Entry]` group. Entries without a name or `Exec`
/// line, and hidden entries, are skipped.
pub fn parse_desktop_entry(content: &str, path: &Path) -> Option<Application> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut in_entry = false;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            // Localized keys such as Name[de] are ignored.
            if !key.contains('[') {
                fields
                    .entry(key.to_string())
                    .or_insert_with(|| value.trim().to_string());
            }
        }
    }

    let flag = |key: &str| fields.get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if flag("Hidden") || flag("NoDisplay") {
        return None;
    }

    let stem = path.file_stem()?.to_string_lossy().to_string();
    let name = fields.get("Name").cloned().unwrap_or(stem);
    let executable = fields.get("Exec").cloned().unwrap_or_default();
    if name.is_empty() || executable.is_empty() {
        return None;
    }

    Some(Application {
        id: String::new(),
        name,
        description: fields.get("Comment").cloned().unwrap_or_default(),
        executable,
        categories: semicolon_list(fields.get("Categories")),
        keywords: semicolon_list(fields.get("Keywords")),
        desktop_file: Some(path.to_path_buf()),
        icon: fields.get("Icon").cloned(),
        terminal: flag("Terminal"),
        usage_count: 0,
        last_used: 0,
        is_favorite: false,
    })
}

/// Lowercased name with characters outside `[a-z0-9_-]` replaced by `_`,
/// suffixed `_N` when already taken.
pub fn unique_id<V>(name: &str, taken: &BTreeMap<String, V>) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut id = base.clone();
    let mut counter = 1;
    while taken.contains_key(&id) {
        id = format!("{}_{}", base, counter);
        counter += 1;
    }
    id
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub name: String,
    pub usage_count: u32,
    pub last_used: i64,
    #[serde(default)]
    pub is_favorite: bool,
}

pub type UsageStats = BTreeMap<String, UsageRecord>;

/// Score of `app` for a search `query` (already lowercased).
fn search_score(app: &Application, query: &str) -> u32 {
    let contains = |text: &str| text.to_lowercase().contains(query);
    let mut score = 0;
    if contains(&app.name) {
        score += 10;
    }
    if contains(&app.description) {
        score += 5;
    }
    if app.keywords.iter().any(|k| contains(k)) {
        score += 8;
    }
    if app.categories.iter().any(|c| contains(c)) {
        score += 6;
    }
    if contains(&app.executable) {
        score += 4;
    }
    if score > 0 {
        score += app.usage_count.min(5);
    }
    score
}

pub struct ApplicationLauncher {
    engine: IntentEngine<AppIntent>,
    desktop: Desktop,
    search_dirs: Vec<PathBuf>,
    apps: RwLock<BTreeMap<String, Application>>,
    usage: JsonStore<UsageStats>,
}

impl ApplicationLauncher {
    /// Build the launcher and scan `search_dirs`.
    pub async fn new(
        desktop: Desktop,
        layout: &StorageLayout,
        search_dirs: Vec<PathBuf>,
        policy: MatchPolicy,
    ) -> ShellResult<Self> {
        let normalizer = Normalizer::new(FILLERS, FillerStyle::WordBoundary)?;
        let engine = IntentEngine::new(normalizer, pattern_table()?, ContextRules::new())
            .with_policy(policy);
        let launcher = Self {
            engine,
            desktop,
            search_dirs,
            apps: RwLock::new(BTreeMap::new()),
            usage: layout.store("launcher", "usage_stats.json"),
        };
        launcher.refresh().await;
        Ok(launcher)
    }

    /// Rescan every search directory and reapply stored usage. Returns the
    /// number of applications found.
    pub async fn refresh(&self) -> usize {
        let mut apps = BTreeMap::new();
        for dir in &self.search_dirs {
            let mut reader = match fs::read_dir(dir).await {
                Ok(reader) => reader,
                Err(_) => continue,
            };
            let mut files = Vec::new();
            while let Ok(Some(entry)) = reader.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "desktop") {
                    files.push(path);
                }
            }
            files.sort();
            for path in files {
                let content = match fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::debug!("Skipping {:?}: {}", path, e);
                        continue;
                    }
                };
                if let Some(mut app) = parse_desktop_entry(&content, &path) {
                    app.id = unique_id(&app.name, &apps);
                    apps.insert(app.id.clone(), app);
                }
            }
        }

        let stats = self.usage.load().await;
        for (id, record) in &stats {
            if let Some(app) = apps.get_mut(id) {
                app.usage_count = record.usage_count;
                app.last_used = record.last_used;
                app.is_favorite = record.is_favorite;
            }
        }

        let count = apps.len();
        *self.apps.write() = apps;
        tracing::info!("Discovered {} applications", count);
        count
    }

    pub fn applications(&self) -> Vec<Application> {
        self.apps.read().values().cloned().collect()
    }

    /// Name lookup through the shared fuzzy tiers, with keyword matches
    /// preferred over character-set similarity.
    pub fn find(&self, query: &str) -> Option<Application> {
        let apps = self.apps.read();
        let by_name = fuzzy::resolve(query, apps.values(), |a| a.name.as_str(), FUZZY);
        if let Some(hit) = &by_name {
            if hit.tier < MatchTier::Similarity {
                return Some(hit.item.clone());
            }
        }
        let query = query.trim().to_lowercase();
        if let Some(app) = apps
            .values()
            .find(|a| a.keywords.iter().any(|k| k.to_lowercase().contains(&query)))
        {
            return Some(app.clone());
        }
        by_name.map(|hit| hit.item.clone())
    }

    fn suggestions(&self, query: &str) -> Vec<String> {
        let apps = self.apps.read();
        fuzzy::suggest(
            query,
            apps.values(),
            |a| a.name.as_str(),
            SUGGESTION_FLOOR,
            MAX_SUGGESTIONS,
        )
        .into_iter()
        .map(|a| format!("{} {} - Try: 'open {}'", a.emoji(), a.name, a.name))
        .collect()
    }

    pub fn search(&self, query: &str) -> Vec<Application> {
        let query = query.trim().to_lowercase();
        let apps = self.apps.read();
        let mut scored: Vec<(u32, &Application)> = apps
            .values()
            .map(|app| (search_score(app, &query), app))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, app)| app.clone()).collect()
    }

    async fn save_usage(&self) -> ShellResult<()> {
        let stats: UsageStats = self
            .apps
            .read()
            .values()
            .filter(|a| a.usage_count > 0 || a.is_favorite)
            .map(|a| {
                (
                    a.id.clone(),
                    UsageRecord {
                        name: a.name.clone(),
                        usage_count: a.usage_count,
                        last_used: a.last_used,
                        is_favorite: a.is_favorite,
                    },
                )
            })
            .collect();
        self.usage.save(&stats).await?;
        Ok(())
    }

    async fn launch(&self, target: &str) -> ShellResult<String> {
        let Some(app) = self.find(target) else {
            let suggestions = self.suggestions(target);
            return Err(ShellError::not_found_with("application", target, suggestions));
        };

        let used = self
            .desktop
            .launch(
                &app.desktop_id(),
                app.desktop_file.as_deref(),
                Some(&app.executable),
            )
            .await
            .map_err(|e| ShellError::CommandFailed(format!("Cannot launch {}: {}", app.name, e)))?;

        if let Some(entry) = self.apps.write().get_mut(&app.id) {
            entry.usage_count += 1;
            entry.last_used = chrono::Utc::now().timestamp();
        }
        if let Err(e) = self.save_usage().await {
            tracing::warn!("Failed to save usage stats: {}", e);
        }
        tracing::info!("Launched {} via {}", app.name, used.program);

        Ok(format!(
            "🚀 **Launched {}** {}\n\n✨ Started successfully via {}!",
            app.name,
            app.emoji(),
            used.program
        ))
    }

    fn format_search(&self, query: &str) -> String {
        let results = self.search(query);
        if results.is_empty() {
            return format!("🔍 **No applications found** for '{}'", query);
        }
        let mut out = format!(
            "🔍 **Found {} application(s)** for '{}':\n\n",
            results.len(),
            query
        );
        for app in results.iter().take(SEARCH_LIMIT) {
            let favorite = if app.is_favorite { " ⭐" } else { "" };
            let usage = if app.usage_count > 0 {
                format!(" (used {}x)", app.usage_count)
            } else {
                String::new()
            };
            out.push_str(&format!("{} **{}**{}{}\n", app.emoji(), app.name, favorite, usage));
            if !app.description.is_empty() {
                let short: String = app.description.chars().take(60).collect();
                let ellipsis = if app.description.chars().count() > 60 { "..." } else { "" };
                out.push_str(&format!("   └─ {}{}\n", short, ellipsis));
            }
            out.push_str(&format!("   └─ **Launch:** 'open {}'\n\n", app.name));
        }
        out.trim_end().to_string()
    }

    fn format_list(&self) -> String {
        let mut apps = self.applications();
        if apps.is_empty() {
            return "📱 **No applications discovered**\n\nTry refreshing the application cache."
                .to_string();
        }
        apps.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        let mut out = format!("📱 **Installed Applications** ({} total):\n\n", apps.len());
        let favorites: Vec<&Application> = apps.iter().filter(|a| a.is_favorite).collect();
        if !favorites.is_empty() {
            out.push_str("**⭐ Favorites:**\n");
            for app in favorites.iter().take(5) {
                out.push_str(&format!("{} {} - 'open {}'\n", app.emoji(), app.name, app.name));
            }
            out.push('\n');
        }
        let frequent: Vec<&Application> = apps
            .iter()
            .filter(|a| a.usage_count > 0 && !a.is_favorite)
            .collect();
        if !frequent.is_empty() {
            out.push_str("**🔥 Frequently Used:**\n");
            for app in frequent.iter().take(5) {
                out.push_str(&format!(
                    "{} {} ({}x) - 'open {}'\n",
                    app.emoji(),
                    app.name,
                    app.usage_count,
                    app.name
                ));
            }
            out.push('\n');
        }
        out.push_str("**📱 All Applications:**\n");
        for app in apps.iter().take(LIST_LIMIT) {
            out.push_str(&format!("{} {} - 'open {}'\n", app.emoji(), app.name, app.name));
        }
        if apps.len() > LIST_LIMIT {
            out.push_str(&format!(
                "\n*(Showing {} of {} applications)*",
                LIST_LIMIT,
                apps.len()
            ));
        }
        out.trim_end().to_string()
    }

    fn format_favorites(&self) -> String {
        let favorites: Vec<Application> = self
            .applications()
            .into_iter()
            .filter(|a| a.is_favorite)
            .collect();
        if favorites.is_empty() {
            return "⭐ **No favorite applications yet**\n\n\
                    Say 'add firefox to favorites' to add one."
                .to_string();
        }
        let mut out = format!("⭐ **Favorite Applications** ({}):\n\n", favorites.len());
        for app in favorites {
            out.push_str(&format!("{} {} - 'open {}'\n", app.emoji(), app.name, app.name));
        }
        out.trim_end().to_string()
    }

    async fn set_favorite(&self, target: &str, favorite: bool) -> ShellResult<String> {
        let Some(app) = self.find(target) else {
            return Err(ShellError::not_found_with(
                "application",
                target,
                self.suggestions(target),
            ));
        };
        if let Some(entry) = self.apps.write().get_mut(&app.id) {
            entry.is_favorite = favorite;
        }
        self.save_usage().await?;
        Ok(if favorite {
            format!("⭐ **Added to favorites:** {}", app.name)
        } else {
            format!("☆ **Removed from favorites:** {}", app.name)
        })
    }

    fn launch_help() -> String {
        help_text(
            "",
            "🚀 **Application Launcher Help**",
            &[
                ("Launch Applications", &["open firefox", "start terminal"]),
                ("Search Applications", &["find video editor", "search games"]),
                ("List Applications", &["list applications", "show my favorites"]),
            ],
        )
    }
}

#[async_trait]
impl IntentHandler for ApplicationLauncher {
    type Intent = AppIntent;
    const NAME: &'static str = "apps";
    const TITLE: &'static str = "application launcher";

    fn engine(&self) -> &IntentEngine<AppIntent> {
        &self.engine
    }

    async fn execute(&self, matched: &IntentMatch<AppIntent>, _raw: &str) -> ShellResult<String> {
        let target = matched.entities.target().unwrap_or_default();
        match matched.intent {
            AppIntent::Launch if target.is_empty() => Ok(Self::launch_help()),
            AppIntent::Launch => self.launch(target).await,
            AppIntent::Search if target.is_empty() => {
                Err(ShellError::invalid("Please specify what to search for"))
            }
            AppIntent::Search => Ok(self.format_search(target)),
            AppIntent::List => Ok(self.format_list()),
            AppIntent::ListFavorites => Ok(self.format_favorites()),
            AppIntent::Favorite => self.set_favorite(target, true).await,
            AppIntent::Unfavorite => self.set_favorite(target, false).await,
            AppIntent::Refresh => {
                let count = self.refresh().await;
                Ok(format!("🔄 **Application cache refreshed:** {} applications", count))
            }
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "**Here's what I can help you with:**",
            &[
                ("Launch Applications", &["open firefox", "start terminal", "run calculator"]),
                ("Search Applications", &["find video editor", "search games"]),
                ("List Applications", &["list applications", "show my favorites"]),
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
    use tempfile::TempDir;

    const FIREFOX: &str = "[Desktop Entry]\nName=Firefox\nName[de]=Feuerfuchs\n\
        Comment=Browse the World Wide Web\nExec=firefox %u\nCategories=Network;WebBrowser;\n\
        Keywords=web;internet;\n";
    const FIREFOX_DEV: &str =
        "[Desktop Entry]\nName=Firefox Developer Edition\nExec=firefox-dev %u\n";
    const GEDIT: &str = "[Desktop Entry]\nName=Text Editor\nComment=Edit text files\n\
        Exec=gedit %U\nCategories=Utility;TextEditor;\nKeywords=notepad;write;\n";
    const HIDDEN: &str = "[Desktop Entry]\nName=Secret\nExec=secret\nNoDisplay=true\n";

    async fn launcher_with(
        entries: &[(&str, &str)],
    ) -> (ApplicationLauncher, Arc<DryRunRunner>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let apps = dir.path().join("applications");
        std::fs::create_dir_all(&apps).unwrap();
        for (file, content) in entries {
            std::fs::write(apps.join(file), content).unwrap();
        }
        let runner = Arc::new(DryRunRunner::new());
        let layout = StorageLayout::new(dir.path().join("data"));
        let launcher = ApplicationLauncher::new(
            Desktop::new(runner.clone()),
            &layout,
            vec![apps],
            MatchPolicy::BestMatch,
        )
        .await
        .unwrap();
        (launcher, runner, dir)
    }

    #[test]
    fn test_parse_desktop_entry() {
        let app = parse_desktop_entry(FIREFOX, Path::new("/x/firefox.desktop")).unwrap();
        assert_eq!(app.name, "Firefox");
        assert_eq!(app.categories, vec!["Network", "WebBrowser"]);
        assert_eq!(app.keywords, vec!["web", "internet"]);
        assert_eq!(app.desktop_id(), "firefox.desktop");
        assert!(parse_desktop_entry(HIDDEN, Path::new("/x/secret.desktop")).is_none());
        assert!(parse_desktop_entry("[Other]\nName=x\n", Path::new("/x/o.desktop")).is_none());
    }

    #[test]
    fn test_unique_id() {
        let mut taken = BTreeMap::new();
        assert_eq!(unique_id("Text Editor", &taken), "text_editor");
        taken.insert("text_editor".to_string(), ());
        assert_eq!(unique_id("Text Editor", &taken), "text_editor_1");
    }

    #[tokio::test]
    async fn test_empty_catalogue_list() {
        let (launcher, _, _dir) = launcher_with(&[]).await;
        let reply = launcher.process_command("list applications").await;
        assert!(reply.starts_with("📱 **No applications discovered**"));
        assert!(reply.contains("Try refreshing the application cache."));
    }

    #[tokio::test]
    async fn test_exact_name_beats_substring() {
        let (launcher, _, _dir) =
            launcher_with(&[("a-dev.desktop", FIREFOX_DEV), ("firefox.desktop", FIREFOX)]).await;
        assert_eq!(launcher.find("firefox").unwrap().name, "Firefox");
        assert_eq!(launcher.find("FIREFOX").unwrap().name, "Firefox");
        assert_eq!(launcher.find("developer").unwrap().name, "Firefox Developer Edition");
        assert_eq!(launcher.find("internet").unwrap().name, "Firefox");
    }

    #[tokio::test]
    async fn test_launch_records_usage() {
        let (launcher, runner, dir) =
            launcher_with(&[("firefox.desktop", FIREFOX), ("gedit.desktop", GEDIT)]).await;
        let reply = launcher.process_command("open firefox").await;
        assert!(reply.starts_with("🚀 **Launched Firefox** 🦊"));
        assert_eq!(runner.invocations()[0].program, "gtk-launch");
        assert_eq!(runner.invocations()[0].args, vec!["firefox.desktop"]);

        let stats: UsageStats = JsonStore::new(dir.path().join("data/launcher/usage_stats.json"))
            .try_load()
            .await
            .unwrap();
        assert_eq!(stats["firefox"].usage_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_app_suggests() {
        let (launcher, runner, _dir) = launcher_with(&[("firefox.desktop", FIREFOX)]).await;
        let reply = launcher.process_command("open firefx").await;
        assert!(reply.starts_with("🚀"), "{}", reply);

        let reply = launcher.process_command("launch zzz").await;
        assert!(reply.starts_with("🔍 **Application not found:** 'zzz'"));
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_score() {
        let (launcher, _, _dir) =
            launcher_with(&[("firefox.desktop", FIREFOX), ("gedit.desktop", GEDIT)]).await;
        let results = launcher.search("text");
        assert_eq!(results[0].name, "Text Editor");
        let reply = launcher.process_command("find web").await;
        assert!(reply.starts_with("🔍 **Found 1 application(s)** for 'web'"));
    }

    #[tokio::test]
    async fn test_favorites_persist_across_refresh() {
        let (launcher, _, _dir) = launcher_with(&[("gedit.desktop", GEDIT)]).await;
        let reply = launcher.process_command("add text editor to favorites").await;
        assert_eq!(reply, "⭐ **Added to favorites:** Text Editor");
        launcher.refresh().await;
        assert!(launcher.applications()[0].is_favorite);
        assert!(launcher
            .process_command("show my favorites")
            .await
            .contains("Text Editor"));
    }
}
