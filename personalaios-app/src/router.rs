//! Keyword routing of raw utterances to components, with the language model
//! as the fallback for anything no component claims.

use parking_lot::Mutex;
use personalaios_components::{ComponentRegistry, SessionManager};
use personalaios_core::history::{DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_TRIM};
use personalaios_core::{CommandHistory, HistoryEntry, Metrics};
use personalaios_providers::LanguageModel;
use regex::Regex;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const MODEL_NOT_READY: &str = "**AI Engine not ready.** Please wait for initialization.";

/// Route order decides ties.
const ROUTES: &[(&str, &[&str])] = &[
    (
        "files",
        &[
            "file",
            "files",
            "folder",
            "folders",
            "directory",
            "directories",
            "document",
            "documents",
            "touch",
            "mkdir",
            "copy",
            "delete",
            "find",
            "list files",
            "create file",
            "create folder",
        ],
    ),
    (
        "apps",
        &[
            "app",
            "apps",
            "application",
            "applications",
            "program",
            "programs",
            "software",
            "installed",
            "launch",
            "open",
            "start",
            "run",
            "list apps",
            "what applications",
        ],
    ),
    (
        "windows",
        &[
            "window",
            "windows",
            "maximize",
            "minimize",
            "close",
            "focus",
            "tile",
            "arrange",
            "resize",
            "move window",
            "list windows",
        ],
    ),
    (
        "workspaces",
        &[
            "workspace",
            "workspaces",
            "switch to workspace",
            "window to workspace",
            "create workspace",
            "rename workspace",
            "delete workspace",
            "organize workspaces",
            "workspace overview",
        ],
    ),
    (
        "notifications",
        &[
            "notification",
            "notifications",
            "notify",
            "remind",
            "reminder",
            "reminders",
            "do not disturb",
            "dnd",
            "quiet hours",
        ],
    ),
    (
        "settings",
        &[
            "setting",
            "settings",
            "theme",
            "wallpaper",
            "accent",
            "font",
            "preference",
            "preferences",
            "profile",
            "dark mode",
            "light mode",
            "backup settings",
            "restore settings",
        ],
    ),
    (
        "sessions",
        &[
            "session",
            "sessions",
            "component",
            "components",
            "logout",
            "log out",
            "shutdown",
            "shut down",
            "power off",
            "restart component",
            "start component",
            "stop component",
        ],
    ),
    (
        "status",
        &[
            "status",
            "battery",
            "power",
            "wifi",
            "wi-fi",
            "network",
            "ethernet",
            "volume",
            "mute",
            "unmute",
            "bluetooth",
            "brightness",
            "cpu",
            "memory",
            "storage",
            "vpn",
            "indicator",
            "indicators",
            "system status",
        ],
    ),
];

struct Keyword {
    pattern: Regex,
    weight: usize,
}

impl Keyword {
    fn new(keyword: &str) -> Result<Self, regex::Error> {
        let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
        Ok(Self {
            pattern: Regex::new(&format!(r"\b{}\b", words.join(r"\s+")))?,
            weight: words.len(),
        })
    }
}

struct Route {
    component: &'static str,
    keywords: Vec<Keyword>,
}

/// Ordered keyword table. A route scores the summed word count of every
/// keyword found on word boundaries; the highest score wins and ties go to
/// the earlier route.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: &[(&'static str, &[&str])]) -> Result<Self, regex::Error> {
        let routes = routes
            .iter()
            .map(|(component, keywords)| {
                Ok(Route {
                    component: *component,
                    keywords: keywords.iter().map(|k| Keyword::new(k)).collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { routes })
    }

    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(ROUTES)
    }

    pub fn components(&self) -> Vec<&'static str> {
        self.routes.iter().map(|r| r.component).collect()
    }

    /// Non-zero scores in route order.
    pub fn scores(&self, input: &str) -> Vec<(&'static str, usize)> {
        let lowered = input.to_lowercase();
        self.routes
            .iter()
            .map(|route| {
                let score = route
                    .keywords
                    .iter()
                    .filter(|k| k.pattern.is_match(&lowered))
                    .map(|k| k.weight)
                    .sum();
                (route.component, score)
            })
            .filter(|(_, score)| *score > 0)
            .collect()
    }

    pub fn classify(&self, input: &str) -> Option<&'static str> {
        let mut best: Option<(&'static str, usize)> = None;
        for (component, score) in self.scores(input) {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((component, score));
            }
        }
        best.map(|(component, _)| component)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Component(&'static str),
    Model,
    ModelUnavailable,
}

impl Target {
    pub fn label(&self) -> &'static str {
        match self {
            Target::Component(name) => name,
            Target::Model => "model",
            Target::ModelUnavailable => "unrouted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Routed {
    pub target: Target,
    pub reply: String,
    /// The reply was already forwarded fragment by fragment.
    pub streamed: bool,
}

/// Decides which component receives an utterance and runs it there.
pub struct CommandRouter {
    table: RouteTable,
    registry: ComponentRegistry,
    sessions: Option<Arc<SessionManager>>,
    model: Option<Arc<dyn LanguageModel>>,
    history: Mutex<CommandHistory>,
    metrics: Arc<Metrics>,
    dispatch_timeout: Duration,
}

impl CommandRouter {
    pub fn new(table: RouteTable, registry: ComponentRegistry, metrics: Arc<Metrics>) -> Self {
        Self {
            table,
            registry,
            sessions: None,
            model: None,
            history: Mutex::new(CommandHistory::new(
                DEFAULT_HISTORY_CAPACITY,
                DEFAULT_HISTORY_TRIM,
            )),
            metrics,
            dispatch_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn with_history(mut self, history: CommandHistory) -> Self {
        self.history = Mutex::new(history);
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn model_ready(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.is_ready())
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.history.lock().recent(count)
    }

    /// Component that would receive `input`, if it is registered.
    pub fn classify(&self, input: &str) -> Option<&'static str> {
        self.table
            .classify(input)
            .filter(|component| self.registry.contains(component))
    }

    /// Route `input` and produce the reply. Model output is forwarded to
    /// `deltas` as it streams.
    pub async fn handle(&self, input: &str, deltas: Option<mpsc::Sender<String>>) -> Routed {
        let input = input.trim();
        let routed = match self.classify(input) {
            Some(component) => {
                self.metrics.inc_commands_routed();
                Routed {
                    target: Target::Component(component),
                    reply: self.dispatch(component, input).await,
                    streamed: false,
                }
            }
            None => {
                self.metrics.inc_commands_unrouted();
                self.ask_model(input, deltas).await
            }
        };
        self.history.lock().record(input, Some(routed.target.label()));
        routed
    }

    async fn dispatch(&self, component: &'static str, input: &str) -> String {
        let Some(handler) = self.registry.get(component) else {
            return format!("❌ **Component Error:** {} is not loaded", component);
        };
        if let Some(sessions) = &self.sessions {
            if !sessions.accepts_commands(component) {
                return format!(
                    "⚠️ **The {} component is stopped.** Start it again from the session manager.",
                    component
                );
            }
        }
        tracing::debug!(component, "dispatching command");

        let raw = input.to_string();
        let mut task = tokio::spawn(async move { handler.process_command(&raw).await });
        match tokio::time::timeout(self.dispatch_timeout, &mut task).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                self.metrics.inc_dispatch_failures();
                let detail = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                tracing::error!(
                    component,
                    error = %detail,
                    "component crashed while handling command"
                );
                if let Some(sessions) = &self.sessions {
                    sessions.mark_failed(component);
                }
                format!("❌ **Component Error:** {} crashed: {}", component, detail)
            }
            Err(_) => {
                task.abort();
                self.metrics.inc_dispatch_failures();
                tracing::error!(component, "component timed out");
                format!(
                    "❌ **Component Error:** {} did not respond within {}s",
                    component,
                    self.dispatch_timeout.as_secs()
                )
            }
        }
    }

    async fn ask_model(&self, input: &str, deltas: Option<mpsc::Sender<String>>) -> Routed {
        let model = match &self.model {
            Some(model) if model.is_ready() => model,
            _ => {
                return Routed {
                    target: Target::ModelUnavailable,
                    reply: MODEL_NOT_READY.to_string(),
                    streamed: false,
                }
            }
        };
        self.metrics.inc_llm_requests();
        let streamed = deltas.is_some();
        match model.complete(input, deltas).await {
            Ok(text) => Routed {
                target: Target::Model,
                reply: text.trim().to_string(),
                streamed,
            },
            Err(e) => {
                self.metrics.inc_llm_failures();
                tracing::warn!(model = model.name(), error = %e, "completion failed");
                Routed {
                    target: Target::Model,
                    reply: format!("❌ **AI Error:** {}", e),
                    streamed: false,
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::standard().unwrap()
    }

    #[test]
    fn test_route_order_is_fixed() {
        assert_eq!(
            table().components(),
            vec![
                "files",
                "apps",
                "windows",
                "workspaces",
                "notifications",
                "settings",
                "sessions",
                "status",
            ]
        );
    }

    #[test]
    fn test_classification() {
        let table = table();
        let cases = [
            ("create a file named notes.txt", Some("files")),
            ("list applications", Some("apps")),
            ("launch firefox", Some("apps")),
            ("maximize this window", Some("windows")),
            ("switch to workspace 2", Some("workspaces")),
            ("move window to workspace 3", Some("workspaces")),
            ("rename workspace 2 to code", Some("workspaces")),
            ("remind me in 5 minutes to stretch", Some("notifications")),
            ("set theme to dark", Some("settings")),
            ("restart component notification system", Some("sessions")),
            ("turn off bluetooth", Some("status")),
            ("system status", Some("status")),
            ("what is the capital of france", None),
        ];
        for (input, expected) in cases {
            assert_eq!(table.classify(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let table = table();
        // "app" must not fire inside "happy".
        assert_eq!(table.classify("i am happy today"), None);
        assert_eq!(table.classify("restart"), None);
        assert!(table.scores("i am happy").is_empty());
    }

    #[test]
    fn test_multi_word_keyword_outweighs_single() {
        let table = table();
        let scores = table.scores("move window to workspace 3");
        assert!(scores.contains(&("windows", 3)));
        assert!(scores.contains(&("workspaces", 4)));
    }

    #[test]
    fn test_ties_go_to_earlier_route() {
        let table = RouteTable::new(&[("first", &["alpha"]), ("second", &["beta"])]).unwrap();
        assert_eq!(table.classify("alpha beta"), Some("first"));
        assert_eq!(table.classify("beta"), Some("second"));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic");
    }
}
