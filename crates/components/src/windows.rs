//! Window management by natural language over `wmctrl`/`xdotool`.

use async_trait::async_trait;
use personalaios_core::format::help_text;
use personalaios_core::fuzzy::{self, FuzzyOptions, TieBreak};
use personalaios_core::{
    ContextRules, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy, Normalizer,
    PatternTable, ShellError, ShellResult,
};
use personalaios_executor::{Geometry, Invocation, WindowControl, WindowInfo, WindowTarget};
use regex::Regex;

const FUZZY: FuzzyOptions = FuzzyOptions::new(0.5, TieBreak::FirstQualifying);
const LIST_LIMIT: usize = 15;

/// Application names recognised anywhere in a command as the target.
const KNOWN_APPS: &[&str] = &[
    "firefox",
    "chrome",
    "terminal",
    "vscode",
    "code",
    "nautilus",
    "files",
    "calculator",
    "text editor",
    "browser",
    "editor",
];
const CURRENT_WORDS: &[&str] = &["current", "active", "this", "focused"];
const DIRECTIONS: &[&str] = &["left", "right", "top", "bottom"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowIntent {
    Maximize,
    Minimize,
    Close,
    Focus,
    Tile,
    Move,
    Resize,
    SwitchWorkspace,
    ListWindows,
    WindowProperties,
    WindowInfo,
    Arrange,
}

impl Intent for WindowIntent {
    fn as_str(&self) -> &'static str {
        match self {
            WindowIntent::Maximize => "maximize_window",
            WindowIntent::Minimize => "minimize_window",
            WindowIntent::Close => "close_window",
            WindowIntent::Focus => "focus_window",
            WindowIntent::Tile => "tile_window",
            WindowIntent::Move => "move_window",
            WindowIntent::Resize => "resize_window",
            WindowIntent::SwitchWorkspace => "workspace_action",
            WindowIntent::ListWindows => "list_windows",
            WindowIntent::WindowProperties => "window_properties",
            WindowIntent::WindowInfo => "window_info",
            WindowIntent::Arrange => "arrange_windows",
        }
    }
}

fn pattern_table() -> Result<PatternTable<WindowIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            WindowIntent::Maximize,
            &[
                r"maximi[sz]e (?:the )?(?:window|app)(?:\s+(.+))?",
                r"make (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:full\s*screen|bigger|maximum)",
                r"expand (?:the )?(?:window|app)(?:\s+(.+))?",
                r"maximi[sz]e\s+(?:the\s+)?(.+?)(?:\s+window)?$",
                r"^maximi[sz]e$",
            ],
        )
        .intent(
            WindowIntent::Minimize,
            &[
                r"minimi[sz]e (?:the )?(?:window|app)(?:\s+(.+))?",
                r"hide (?:the )?(?:window|app)(?:\s+(.+))?",
                r"put (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:away|in\s+background)",
                r"(?:minimi[sz]e|hide)\s+(?:the\s+)?(.+?)(?:\s+window)?$",
                r"^minimi[sz]e$",
            ],
        )
        .intent(
            WindowIntent::Close,
            &[
                r"(?:close|quit|exit|kill) (?:the )?(?:window|app)(?:\s+(.+))?",
                r"shut\s*down (?:the )?(?:window|app)(?:\s+(.+))?",
                r"close\s+(?:the\s+)?(.+?)(?:\s+window)?$",
            ],
        )
        .intent(
            WindowIntent::Focus,
            &[
                r"focus (?:on )?(?:the )?(?:window|app)(?:\s+(.+))?",
                r"bring (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:to\s+)?(?:front|forward)",
                r"focus\s+(?:on\s+)?(?:the\s+)?(.+?)(?:\s+window)?$",
                r"switch\s+to\s+(?:the\s+)?(.+?)(?:\s+window)?$",
                r"bring\s+(?:the\s+)?(.+?)\s+to\s+(?:the\s+)?front",
            ],
        )
        .intent(
            WindowIntent::Tile,
            &[
                r"(?:tile|snap|dock) (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:to\s+)?(?:the\s+)?(left|right|top|bottom)",
                r"(?:tile|snap|dock)\s+(?:the\s+)?(.+?)\s+(?:to\s+)?(?:the\s+)?(left|right|top|bottom)",
                r"(?:window|app)(?:\s+(.+))?\s+(?:to\s+)?(?:the\s+)?(left|right|top|bottom)\s+(?:side|half)",
            ],
        )
        .intent(
            WindowIntent::Move,
            &[
                r"move (?:the )?(?:window|app)(?:\s+(.+))?\s+to\s+(.+)",
                r"(?:put|place|position) (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:on|at)\s+(.+)",
                r"(?:move|put|place)\s+(?:the\s+)?(.+?)\s+(?:to|on|at)\s+(.+)",
            ],
        )
        .intent(
            WindowIntent::Resize,
            &[
                r"resize (?:the )?(?:window|app)(?:\s+(.+))?\s+to\s+(.+)",
                r"change (?:the )?(?:window|app)(?:\s+(.+))?\s+size\s+to\s+(.+)",
                r"make (?:the )?(?:window|app)(?:\s+(.+))?\s+(small|medium|large|smaller)",
                r"resize\s+(?:the\s+)?(.+?)(?:\s+to\s+(.+))?$",
            ],
        )
        .intent(
            WindowIntent::SwitchWorkspace,
            &[
                r"(?:move|send) (?:the )?(?:window|app)(?:\s+(.+))?\s+to\s+workspace\s+(\d+|next|previous|left|right)",
                r"(?:move|send)\s+(?:the\s+)?(.+?)\s+to\s+workspace\s+(\d+|next|previous|left|right)",
                r"switch\s+to\s+workspace\s+(\d+|next|previous|left|right)",
                r"go\s+to\s+workspace\s+(\d+|next|previous|left|right)",
                r"(next|previous) workspace",
            ],
        )
        .intent(
            WindowIntent::ListWindows,
            &[
                r"list (?:all )?(?:open )?windows",
                r"show (?:me )?(?:all )?(?:open )?windows",
                r"what windows\s+are\s+(?:open|running)",
                r"display (?:all )?(?:open )?windows",
            ],
        )
        .intent(
            WindowIntent::WindowProperties,
            &[
                r"make (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:always\s+on\s+top|stick|sticky)",
                r"keep (?:the )?(?:window|app)(?:\s+(.+))?\s+(?:on\s+top|visible)",
                r"pin (?:the )?(?:window|app)(?:\s+(.+))?",
                r"keep\s+(?:the\s+)?(.+?)\s+on\s+top",
            ],
        )
        .intent(
            WindowIntent::WindowInfo,
            &[
                r"(?:info|information|details)\s+(?:about\s+)?(?:the )?(?:window|app)(?:\s+(.+))?",
                r"describe (?:the )?(?:window|app)(?:\s+(.+))?",
                r"tell\s+me\s+about\s+(?:the )?(?:window|app)(?:\s+(.+))?",
                r"(?:info|information|details)\s+about\s+(?:the\s+)?(.+?)(?:\s+window)?$",
            ],
        )
        .intent(
            WindowIntent::Arrange,
            &[
                r"arrange (?:all )?(?:the )?(?:open )?windows",
                r"(?:tile|organi[sz]e) all (?:the )?(?:open )?windows",
                r"organi[sz]e (?:the )?(?:open )?windows",
                r"windows in a grid",
            ],
        )
        .build()
}

fn context_rules() -> ContextRules {
    ContextRules::new()
        .rule(
            "direction",
            &[
                ("left", &["left", "west"]),
                ("right", &["right", "east"]),
                ("top", &["top", "up", "north"]),
                ("bottom", &["bottom", "down", "south"]),
                ("center", &["center", "centre", "middle"]),
                ("corner", &["corner"]),
            ],
        )
        .rule(
            "size",
            &[
                ("small", &["small", "tiny", "mini", "compact"]),
                ("medium", &["medium", "normal", "regular", "half"]),
                ("large", &["large", "big", "huge", "maximum"]),
            ],
        )
}

/// Which window a command addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Current,
    Named(String),
}

/// A known application name in the text, else a current-window keyword,
/// else the first capture, else the current window.
/// `word` occurs in `text` with no letter or digit on either side.
fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

pub fn identify_target(text: &str, first_capture: Option<&str>) -> Target {
    if let Some(app) = KNOWN_APPS.iter().find(|app| contains_word(text, app)) {
        return Target::Named(app.to_string());
    }
    if CURRENT_WORDS.iter().any(|w| contains_word(text, w)) {
        return Target::Current;
    }
    match first_capture {
        Some(name) if !name.is_empty() && name != "window" && name != "app" => {
            Target::Named(name.to_string())
        }
        _ => Target::Current,
    }
}

/// Half of the screen on `direction`.
pub fn tile_geometry(direction: &str, screen: (u32, u32)) -> Option<Geometry> {
    let (w, h) = screen;
    let (x, y, width, height) = match direction {
        "left" => (0, 0, w / 2, h),
        "right" => (w / 2, 0, w / 2, h),
        "top" => (0, 0, w, h / 2),
        "bottom" => (0, h / 2, w, h / 2),
        _ => return None,
    };
    Some(Geometry {
        x,
        y,
        width,
        height,
    })
}

/// A window of `size` (small third, medium half, large two thirds) placed
/// toward `direction`, centered when no direction is given.
pub fn placement(direction: Option<&str>, size: Option<&str>, screen: (u32, u32)) -> Geometry {
    let (w, h) = screen;
    let (num, den) = match size {
        Some("small") => (1, 3),
        Some("large") => (2, 3),
        _ => (1, 2),
    };
    let width = w * num / den;
    let height = h * num / den;
    let center_x = (w - width) / 2;
    let center_y = (h - height) / 2;
    let (x, y) = match direction {
        Some("left") => (0, center_y),
        Some("right") => (w - width, center_y),
        Some("top") => (center_x, 0),
        Some("bottom") => (center_x, h - height),
        Some("corner") => (0, 0),
        _ => (center_x, center_y),
    };
    Geometry {
        x,
        y,
        width,
        height,
    }
}

/// Cells of a near-square grid holding `count` windows.
pub fn grid(count: usize, screen: (u32, u32)) -> Vec<Geometry> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f64).sqrt().ceil() as u32;
    let rows = (count as u32).div_ceil(cols);
    let (w, h) = (screen.0 / cols, screen.1 / rows);
    (0..count as u32)
        .map(|i| Geometry {
            x: (i % cols) * w,
            y: (i / cols) * h,
            width: w,
            height: h,
        })
        .collect()
}

fn window_icon(title: &str) -> &'static str {
    const ICONS: &[(&str, &str)] = &[
        ("firefox", "🦊"),
        ("chrom", "🌐"),
        ("terminal", "🖥️"),
        ("konsole", "🖥️"),
        ("nautilus", "📁"),
        ("files", "📁"),
        ("thunar", "📁"),
        ("code", "💻"),
        ("libreoffice", "📄"),
        ("writer", "📄"),
        ("gimp", "🎨"),
        ("inkscape", "🎨"),
        ("vlc", "🎬"),
        ("mpv", "🎬"),
        ("spotify", "🎵"),
        ("rhythmbox", "🎵"),
        ("calculator", "🧮"),
    ];
    let title = title.to_lowercase();
    ICONS
        .iter()
        .find(|(key, _)| title.contains(key))
        .map(|(_, icon)| *icon)
        .unwrap_or("🪟")
}

fn via_shortcut(used: &Invocation) -> &'static str {
    if used.program == "xdotool" {
        " (using keyboard shortcut)"
    } else {
        ""
    }
}

pub struct WindowManager {
    engine: IntentEngine<WindowIntent>,
    control: WindowControl,
    workspace_re: Regex,
}

/// A resolved target: the selector and how to describe it.
struct Resolved {
    selector: WindowTarget,
    title: Option<String>,
}

impl Resolved {
    fn label(&self) -> String {
        match &self.title {
            Some(title) => format!("window:** {}", title),
            None => "current window**".to_string(),
        }
    }
}

impl WindowManager {
    pub fn new(control: WindowControl, policy: MatchPolicy) -> ShellResult<Self> {
        let engine = IntentEngine::new(Normalizer::standard()?, pattern_table()?, context_rules())
            .with_policy(policy);
        Ok(Self {
            engine,
            control,
            workspace_re: Regex::new(r"workspace\s+(\d+|next|previous|left|right)")?,
        })
    }

    /// Match `name` against open window titles.
    pub async fn find_window(&self, name: &str) -> ShellResult<WindowInfo> {
        let windows = self.control.list_windows().await?;
        if let Some(hit) = fuzzy::resolve(name, windows.iter(), |w| w.title.as_str(), FUZZY) {
            return Ok(hit.item.clone());
        }
        let words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
        if let Some(window) = windows.iter().find(|w| {
            let title = w.title.to_lowercase();
            words.iter().any(|word| title.contains(word.as_str()))
        }) {
            return Ok(window.clone());
        }
        let suggestions = fuzzy::suggest(name, windows.iter(), |w| w.title.as_str(), 0.3, 3)
            .into_iter()
            .map(|w| w.title.clone())
            .collect();
        Err(ShellError::not_found_with("window", name, suggestions))
    }

    async fn resolve(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<Resolved> {
        match identify_target(&matched.text, matched.entities.group(0)) {
            Target::Current => Ok(Resolved {
                selector: WindowTarget::Active,
                title: None,
            }),
            Target::Named(name) => {
                let window = self.find_window(&name).await?;
                Ok(Resolved {
                    selector: WindowTarget::Id(window.id),
                    title: Some(window.title),
                })
            }
        }
    }

    async fn maximize(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let target = self.resolve(matched).await?;
        let used = self.control.maximize(&target.selector).await?;
        Ok(format!("🔲 **Maximized {}{}", target.label(), via_shortcut(&used)))
    }

    async fn minimize(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let target = self.resolve(matched).await?;
        let used = self.control.minimize(&target.selector).await?;
        Ok(format!("📉 **Minimized {}{}", target.label(), via_shortcut(&used)))
    }

    async fn close(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let target = self.resolve(matched).await?;
        let used = self.control.close(&target.selector).await?;
        Ok(format!("✖️ **Closed {}{}", target.label(), via_shortcut(&used)))
    }

    async fn focus(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let target = self.resolve(matched).await?;
        match &target.title {
            None => Ok("👁️ **The current window is already focused**".to_string()),
            Some(title) => {
                self.control.focus(&target.selector).await?;
                Ok(format!("👁️ **Focused on window:** {}", title))
            }
        }
    }

    async fn tile(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let direction = matched
            .entities
            .groups
            .iter()
            .rev()
            .flatten()
            .map(|g| g.trim())
            .find(|g| DIRECTIONS.contains(g))
            .or_else(|| matched.entities.context("direction"))
            .unwrap_or("left")
            .to_string();
        let screen = self.control.screen_size().await;
        let geometry = tile_geometry(&direction, screen)
            .ok_or_else(|| ShellError::invalid(format!("Unknown direction: {}", direction)))?;
        let target = self.resolve(matched).await?;
        self.control.place(&target.selector, geometry).await?;
        Ok(match &target.title {
            Some(title) => format!("🔲 **Tiled {} to {}**", title, direction),
            None => format!("🔲 **Tiled current window to {}**", direction),
        })
    }

    async fn move_window(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let direction = matched.entities.context("direction");
        let size = matched.entities.context("size");
        if direction.is_none() {
            return Err(ShellError::invalid(
                "Say where to move the window: left, right, top, bottom, center or corner",
            ));
        }
        let screen = self.control.screen_size().await;
        let geometry = placement(direction, size, screen);
        let target = self.resolve(matched).await?;
        self.control.place(&target.selector, geometry).await?;
        Ok(format!(
            "↔️ **Moved {} to {}",
            target.label(),
            direction.unwrap_or("center")
        ))
    }

    async fn resize(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let size = matched.entities.context("size").unwrap_or("medium");
        let screen = self.control.screen_size().await;
        let geometry = placement(matched.entities.context("direction"), Some(size), screen);
        let target = self.resolve(matched).await?;
        self.control.place(&target.selector, geometry).await?;
        Ok(format!(
            "📐 **Resized {} to {}** ({}×{})",
            target.label(),
            size,
            geometry.width,
            geometry.height
        ))
    }

    /// Resolve `next`/`previous`/`left`/`right` or a number to a 1-based
    /// workspace index.
    async fn workspace_number(&self, spec: &str) -> ShellResult<u32> {
        if let Ok(n) = spec.parse::<u32>() {
            if n == 0 {
                return Err(ShellError::invalid("Workspaces are numbered from 1"));
            }
            return Ok(n);
        }
        let (current, count) = self.control.workspaces().await?;
        Ok(match spec {
            "next" | "right" => current % count + 1,
            _ => (current + count - 2) % count + 1,
        })
    }

    async fn workspace(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let spec = self
            .workspace_re
            .captures(&matched.text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| matched.entities.target().map(str::to_string))
            .unwrap_or_else(|| "1".to_string());
        let number = self.workspace_number(&spec).await?;

        let moving = matches!(matched.text.split_whitespace().next(), Some("move" | "send"));
        if moving {
            let target = match matched.entities.group(0) {
                Some(_) => self.resolve(matched).await?,
                None => Resolved {
                    selector: WindowTarget::Active,
                    title: None,
                },
            };
            if target.title.is_some() {
                self.control.focus(&target.selector).await?;
            }
            self.control.move_active_to_workspace(number).await?;
            return Ok(format!("🔄 **Moved {} to workspace {}", target.label(), number));
        }

        self.control.switch_workspace(number).await?;
        Ok(format!("🔄 **Switched to workspace {}**", number))
    }

    async fn list_windows(&self) -> ShellResult<String> {
        let windows = self.control.list_windows().await?;
        if windows.is_empty() {
            return Ok("🪟 **No windows found** or window management not available".to_string());
        }
        let mut out = format!("🪟 **Open Windows** ({} total):\n\n", windows.len());
        for window in windows.iter().take(LIST_LIMIT) {
            let title: String = window.title.chars().take(50).collect();
            let workspace = if window.desktop < 0 {
                "all".to_string()
            } else {
                (window.desktop + 1).to_string()
            };
            out.push_str(&format!(
                "{} **{}**\n   └─ Host: {} | Workspace: {}\n",
                window_icon(&window.title),
                title,
                window.host,
                workspace
            ));
        }
        if windows.len() > LIST_LIMIT {
            out.push_str(&format!(
                "\n*(Showing first {} of {} windows)*",
                LIST_LIMIT,
                windows.len()
            ));
        }
        Ok(out.trim_end().to_string())
    }

    async fn properties(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let sticky = matched.text.contains("stick");
        let target = self.resolve(matched).await?;
        let state = if sticky { "sticky" } else { "above" };
        self.control.add_state(&target.selector, state).await?;
        let what = match &target.title {
            Some(title) => title.clone(),
            None => "Current window".to_string(),
        };
        Ok(if sticky {
            format!("📌 **{} is now visible on every workspace**", what)
        } else {
            format!("📌 **{} will stay on top**", what)
        })
    }

    async fn info(&self, matched: &IntentMatch<WindowIntent>) -> ShellResult<String> {
        let window = match identify_target(&matched.text, matched.entities.group(0)) {
            Target::Named(name) => self.find_window(&name).await?,
            Target::Current => {
                let active = self
                    .control
                    .active_window_id()
                    .await
                    .ok_or_else(|| ShellError::not_found("window", "current"))?;
                self.control
                    .list_windows()
                    .await?
                    .into_iter()
                    .find(|w| w.id == active)
                    .ok_or_else(|| ShellError::not_found("window", "current"))?
            }
        };
        Ok(format!(
            "ℹ️ **Window Information:**\n\n**Title:** {}\n**Id:** {}\n**Host:** {}\n**Workspace:** {}",
            window.title,
            window.id,
            window.host,
            if window.desktop < 0 {
                "all".to_string()
            } else {
                (window.desktop + 1).to_string()
            }
        ))
    }

    async fn arrange(&self) -> ShellResult<String> {
        let windows = self.control.list_windows().await?;
        let current = match self.control.workspaces().await {
            Ok((current, _)) => current as i32 - 1,
            Err(e) => {
                tracing::debug!("workspace query failed, arranging all windows: {}", e);
                -2
            }
        };
        let visible: Vec<WindowInfo> = windows
            .into_iter()
            .filter(|w| w.desktop >= 0 && (current == -2 || w.desktop == current))
            .collect();
        if visible.is_empty() {
            return Ok("🪟 **No windows to arrange**".to_string());
        }
        let screen = self.control.screen_size().await;
        let cells = grid(visible.len(), screen);
        for (window, cell) in visible.iter().zip(cells) {
            self.control
                .place(&WindowTarget::Id(window.id.clone()), cell)
                .await?;
        }
        Ok(format!("🪟 **Arranged {} windows** in a grid", visible.len()))
    }
}

#[async_trait]
impl IntentHandler for WindowManager {
    type Intent = WindowIntent;
    const NAME: &'static str = "windows";
    const TITLE: &'static str = "window management";

    fn engine(&self) -> &IntentEngine<WindowIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<WindowIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        match matched.intent {
            WindowIntent::Maximize => self.maximize(matched).await,
            WindowIntent::Minimize => self.minimize(matched).await,
            WindowIntent::Close => self.close(matched).await,
            WindowIntent::Focus => self.focus(matched).await,
            WindowIntent::Tile => self.tile(matched).await,
            WindowIntent::Move => self.move_window(matched).await,
            WindowIntent::Resize => self.resize(matched).await,
            WindowIntent::SwitchWorkspace => self.workspace(matched).await,
            WindowIntent::ListWindows => self.list_windows().await,
            WindowIntent::WindowProperties => self.properties(matched).await,
            WindowIntent::WindowInfo => self.info(matched).await,
            WindowIntent::Arrange => self.arrange().await,
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "🪟 **Try these natural language window commands:**",
            &[
                (
                    "Window Control",
                    &[
                        "maximize the browser window",
                        "minimize firefox",
                        "close the terminal",
                        "focus on vscode",
                    ],
                ),
                (
                    "Window Arrangement",
                    &[
                        "tile the current window to the left",
                        "snap firefox to the right side",
                        "move the editor to workspace 2",
                        "arrange all windows",
                    ],
                ),
                (
                    "Information",
                    &[
                        "list all open windows",
                        "what windows are open",
                        "info about the current window",
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
    use personalaios_executor::{CommandOutput, DryRunRunner};
    use std::sync::Arc;

    const WMCTRL_LIST: &str = "0x03a00007  0 laptop Mozilla Firefox\n\
                               0x05200004  0 laptop notes.txt - Text Editor\n\
                               0x06000001  1 laptop Terminal\n";

    fn manager() -> (WindowManager, Arc<DryRunRunner>) {
        let runner = Arc::new(DryRunRunner::new());
        runner.respond("wmctrl -l", CommandOutput::ok(WMCTRL_LIST));
        runner.respond(
            "wmctrl -d",
            CommandOutput::ok("0  * DG: 1920x1080  Main\n1  - DG: 1920x1080  Dev\n"),
        );
        runner.missing("xrandr");
        let manager =
            WindowManager::new(WindowControl::new(runner.clone()), MatchPolicy::BestMatch).unwrap();
        (manager, runner)
    }

    #[test]
    fn test_identify_target() {
        assert_eq!(
            identify_target("maximize firefox", Some("firefox")),
            Target::Named("firefox".to_string())
        );
        assert_eq!(identify_target("close this window", Some("this")), Target::Current);
        assert_eq!(identify_target("maximize the window", None), Target::Current);
        assert_eq!(
            identify_target("minimize spotify", Some("spotify")),
            Target::Named("spotify".to_string())
        );
        assert_eq!(
            identify_target("focus the text editor", Some("text editor")),
            Target::Named("text editor".to_string())
        );
    }

    #[test]
    fn test_identify_target_needs_whole_words() {
        assert_eq!(
            identify_target("maximize decoder", Some("decoder")),
            Target::Named("decoder".to_string())
        );
        assert_eq!(
            identify_target("close thistle", Some("thistle")),
            Target::Named("thistle".to_string())
        );
        assert_eq!(
            identify_target("minimize activestate", Some("activestate")),
            Target::Named("activestate".to_string())
        );
    }

    #[test]
    fn test_geometry_helpers() {
        let screen = (1920, 1080);
        assert_eq!(
            tile_geometry("right", screen),
            Some(Geometry { x: 960, y: 0, width: 960, height: 1080 })
        );
        assert_eq!(tile_geometry("diagonal", screen), None);
        let small_left = placement(Some("left"), Some("small"), screen);
        assert_eq!((small_left.x, small_left.width), (0, 640));
        assert_eq!(grid(3, screen).len(), 3);
        assert_eq!(grid(3, screen)[2], Geometry { x: 0, y: 540, width: 960, height: 540 });
    }

    #[tokio::test]
    async fn test_maximize_current_uses_wmctrl() {
        let (manager, runner) = manager();
        let reply = manager.process_command("maximize the window").await;
        assert_eq!(reply, "🔲 **Maximized current window**");
        let last = runner.invocations().pop().unwrap();
        assert_eq!(last.args, vec!["-r", ":ACTIVE:", "-b", "add,maximized_vert,maximized_horz"]);
    }

    #[tokio::test]
    async fn test_close_named_window_by_id() {
        let (manager, runner) = manager();
        let reply = manager.process_command("close firefox").await;
        assert_eq!(reply, "✖️ **Closed window:** Mozilla Firefox");
        let last = runner.invocations().pop().unwrap();
        assert_eq!(last.args, vec!["-i", "-c", "0x03a00007"]);
    }

    #[tokio::test]
    async fn test_tile_uses_default_screen_size() {
        let (manager, runner) = manager();
        let reply = manager.process_command("tile the current window to the left").await;
        assert_eq!(reply, "🔲 **Tiled current window to left**");
        assert!(runner
            .invocations()
            .iter()
            .any(|i| i.args.contains(&"0,0,0,960,1080".to_string())));
    }

    #[tokio::test]
    async fn test_workspace_switch_and_next() {
        let (manager, runner) = manager();
        assert_eq!(
            manager.process_command("switch to workspace 3").await,
            "🔄 **Switched to workspace 3**"
        );
        assert_eq!(runner.invocations().pop().unwrap().args, vec!["-s", "2"]);

        assert_eq!(
            manager.process_command("go to workspace next").await,
            "🔄 **Switched to workspace 2**"
        );
    }

    #[tokio::test]
    async fn test_move_active_window_to_workspace() {
        let (manager, runner) = manager();
        let reply = manager.process_command("move window to workspace 2").await;
        assert_eq!(reply, "🔄 **Moved current window** to workspace 2");
        assert_eq!(
            runner.invocations().pop().unwrap().args,
            vec!["-r", ":ACTIVE:", "-t", "1"]
        );
    }

    #[tokio::test]
    async fn test_list_and_missing_window() {
        let (manager, _) = manager();
        let reply = manager.process_command("list all open windows").await;
        assert!(reply.starts_with("🪟 **Open Windows** (3 total)"));
        assert!(reply.contains("🦊 **Mozilla Firefox**"));

        let reply = manager.process_command("focus on zzzz").await;
        assert!(reply.starts_with("🔍 **Window not found:** 'zzzz'"));
    }

    #[tokio::test]
    async fn test_arrange_places_current_workspace_windows() {
        let (manager, runner) = manager();
        let reply = manager.process_command("arrange all windows").await;
        assert_eq!(reply, "🪟 **Arranged 2 windows** in a grid");
        let placed: Vec<_> = runner
            .invocations()
            .into_iter()
            .filter(|i| i.args.contains(&"-e".to_string()))
            .collect();
        assert_eq!(placed.len(), 2);
    }
}
