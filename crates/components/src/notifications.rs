//! Notifications: creation, scheduling, do-not-disturb and history.
//!
//! Active notifications live in memory. Dismissed ones are appended to
//! `notifications/history.json`, which keeps the newest entries only.
//! Scheduled and held notifications are delivered by [`NotificationSystem::tick`],
//! which the application drives from a supervised background job.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, TimeDelta, Timelike};
use parking_lot::Mutex;
use personalaios_core::format::{help_text, time_ago};
use personalaios_core::{
    ContextRules, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy, Normalizer,
    PatternTable, ShellResult,
};
use personalaios_executor::{Desktop, Urgency};
use personalaios_memory::{JsonStore, StorageLayout};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HISTORY_LIMIT: usize = 100;
const AUTO_DISMISS_SECS: i64 = 300;
const LIST_LIMIT: usize = 10;
const TITLE_CHARS: usize = 50;
const PREVIEW_CHARS: usize = 60;
const QUEUED_DETAIL: &str = "   └─ Will be delivered when appropriate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationIntent {
    Show,
    Dismiss,
    List,
    SetPriority,
    DoNotDisturb,
    Schedule,
    Settings,
    Summarize,
}

impl Intent for NotificationIntent {
    fn as_str(&self) -> &'static str {
        match self {
            NotificationIntent::Show => "show_notification",
            NotificationIntent::Dismiss => "dismiss_notification",
            NotificationIntent::List => "list_notifications",
            NotificationIntent::SetPriority => "set_priority",
            NotificationIntent::DoNotDisturb => "do_not_disturb",
            NotificationIntent::Schedule => "schedule_notification",
            NotificationIntent::Settings => "notification_settings",
            NotificationIntent::Summarize => "summarize_notifications",
        }
    }
}

fn pattern_table() -> Result<PatternTable<NotificationIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            NotificationIntent::Show,
            &[
                r#"(?:show|display|create|send)\s+(?:a\s+)?notification\s+(?:saying\s+)?["']?(.+?)["']?$"#,
                r#"notify\s+(?:me\s+)?(?:about\s+)?["']?(.+?)["']?$"#,
                r#"alert\s+(?:me\s+)?(?:about\s+)?["']?(.+?)["']?$"#,
                r#"remind\s+(?:me\s+)?(?:about\s+|to\s+)?["']?(.+?)["']?$"#,
                r#"popup\s+(?:saying\s+)?["']?(.+?)["']?$"#,
            ],
        )
        .intent(
            NotificationIntent::Dismiss,
            &[
                r"(?:dismiss|close|clear|hide|remove)\s+(?:all\s+)?(?:the\s+)?(?:my\s+)?notifications?(?:\s+about\s+(.+))?",
            ],
        )
        .intent(
            NotificationIntent::List,
            &[
                r"list\s+(?:all\s+)?(?:my\s+)?notifications",
                r"show\s+(?:me\s+)?(?:all\s+)?(?:my\s+)?notifications",
                r"what\s+notifications\s+(?:do\s+i\s+have|are\s+there)",
                r"display\s+(?:all\s+)?(?:my\s+)?notifications",
                r"notification\s+history",
            ],
        )
        .intent(
            NotificationIntent::SetPriority,
            &[
                r"set\s+(?:the\s+)?priority\s+(?:of\s+)?(?:the\s+)?(?:notification\s+)?(?:about\s+)?(.+?)\s+to\s+(low|normal|high|critical|urgent)",
                r"make\s+(?:the\s+)?(?:notification\s+)?(?:about\s+)?(.+?)\s+(low|normal|high|critical|urgent)\s+priority",
                r"(?:notification\s+)?(?:about\s+)?(.+?)\s+should\s+be\s+(low|normal|high|critical|urgent)\s+priority",
            ],
        )
        .intent(
            NotificationIntent::DoNotDisturb,
            &[
                r"(?:enable|turn\s+on|activate)\s+(?:do\s+not\s+disturb|dnd|quiet\s+mode)",
                r"(?:disable|turn\s+off|deactivate)\s+(?:do\s+not\s+disturb|dnd|quiet\s+mode)",
                r"(?:set\s+)?(?:do\s+not\s+disturb|dnd|quiet\s+mode)\s+(?:to\s+)?(on|off|enabled|disabled)",
                r"(?:i\s+)?(?:don't\s+)?want\s+(?:to\s+be\s+)?(?:disturbed|interrupted)",
                r"silence\s+(?:all\s+)?notifications",
                r"^(?:do\s+not\s+disturb|dnd)$",
            ],
        )
        .intent(
            NotificationIntent::Schedule,
            &[
                r"(?:schedule|set)\s+(?:a\s+)?(?:notification|reminder|alert)\s+(?:for\s+)?(?:about\s+)?(.+?)\s+((?:at|in|after)\s+.+)",
                r"remind\s+(?:me\s+)?(?:about\s+|to\s+)?(.+?)\s+((?:at|in|after)\s+.+)",
                r"notify\s+(?:me\s+)?(?:about\s+)?(.+?)\s+((?:at|in|after)\s+.+)",
                r"alert\s+(?:me\s+)?(?:about\s+)?(.+?)\s+((?:at|in|after)\s+.+)",
            ],
        )
        .intent(
            NotificationIntent::Settings,
            &[
                r"notification\s+settings",
                r"configure\s+notifications",
                r"notification\s+preferences",
                r"change\s+notification\s+settings",
                r"manage\s+notifications",
            ],
        )
        .intent(
            NotificationIntent::Summarize,
            &[
                r"summari[sz]e\s+(?:my\s+)?notifications",
                r"give\s+(?:me\s+)?(?:a\s+)?(?:summary\s+of\s+)?(?:my\s+)?notifications",
                r"what\s+(?:are\s+)?(?:my\s+)?(?:important\s+)?notifications\s+about",
                r"brief\s+(?:me\s+)?(?:on\s+)?(?:my\s+)?notifications",
            ],
        )
        .build()
}

fn context_rules() -> ContextRules {
    ContextRules::new().rule(
        "type",
        &[
            ("error", &["error", "failed", "problem"]),
            ("warning", &["warning", "caution", "careful"]),
            ("info", &["info", "information", "fyi"]),
            ("reminder", &["reminder", "remember", "don't forget"]),
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Critical,
        Priority::Urgent,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    pub fn parse(word: &str) -> Option<Self> {
        match word.trim() {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    /// Priority implied by keywords in a command.
    pub fn detect(text: &str) -> Self {
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let any = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));
        if any(&["critical", "emergency", "urgent"]) {
            Priority::Critical
        } else if any(&["high", "important", "asap"]) {
            Priority::High
        } else if any(&["low", "minor", "info"]) {
            Priority::Low
        } else {
            Priority::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Normal => "Normal",
            Priority::High => "High",
            Priority::Critical => "Critical",
            Priority::Urgent => "Urgent",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Priority::Critical => "🚨",
            Priority::Urgent => "⚡",
            Priority::High => "🔴",
            Priority::Normal => "🔵",
            Priority::Low => "⚪",
        }
    }

    pub fn urgency(&self) -> Urgency {
        match self {
            Priority::Low => Urgency::Low,
            Priority::Normal | Priority::High => Urgency::Normal,
            Priority::Critical | Priority::Urgent => Urgency::Critical,
        }
    }

    /// Delivered even under do-not-disturb and quiet hours.
    pub fn breaks_through(&self) -> bool {
        matches!(self, Priority::Critical | Priority::Urgent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    System,
    Application,
    User,
    AiGenerated,
    Reminder,
    Alert,
    Info,
    Warning,
    Error,
}

impl NotificationKind {
    fn from_context(value: Option<&str>) -> Self {
        match value {
            Some("reminder") => NotificationKind::Reminder,
            Some("error") => NotificationKind::Error,
            Some("warning") => NotificationKind::Warning,
            Some("info") => NotificationKind::Info,
            _ => NotificationKind::AiGenerated,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::System => "System",
            NotificationKind::Application => "Application",
            NotificationKind::User => "User",
            NotificationKind::AiGenerated => "AI Generated",
            NotificationKind::Reminder => "Reminder",
            NotificationKind::Alert => "Alert",
            NotificationKind::Info => "Info",
            NotificationKind::Warning => "Warning",
            NotificationKind::Error => "Error",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::System => "🖥️",
            NotificationKind::Application => "📱",
            NotificationKind::User => "👤",
            NotificationKind::AiGenerated => "🤖",
            NotificationKind::Reminder => "⏰",
            NotificationKind::Alert => "🚨",
            NotificationKind::Info => "ℹ️",
            NotificationKind::Warning => "⚠️",
            NotificationKind::Error => "❌",
        }
    }

    /// Freedesktop icon name.
    fn icon_name(&self) -> &'static str {
        match self {
            NotificationKind::System => "computer",
            NotificationKind::Application => "application-x-executable",
            NotificationKind::User => "user",
            NotificationKind::AiGenerated => "face-smile",
            NotificationKind::Reminder => "alarm-clock",
            NotificationKind::Alert | NotificationKind::Warning => "dialog-warning",
            NotificationKind::Info => "dialog-information",
            NotificationKind::Error => "dialog-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub source: String,
    pub timestamp: i64,
    #[serde(default)]
    pub deliver_at: Option<i64>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub auto_dismiss: bool,
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", text.chars().take(limit).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Title prefix chosen by the detected type, followed by the start of the message.
pub fn smart_title(message: &str, kind: NotificationKind) -> String {
    let prefix = match kind {
        NotificationKind::Reminder => "Reminder",
        NotificationKind::Error => "Error",
        NotificationKind::Warning => "Warning",
        _ => "PersonalAIOS",
    };
    format!("{}: {}", prefix, truncate(message, TITLE_CHARS))
}

/// A daily window in minutes since midnight. Wraps past midnight when
/// `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: u32,
    pub end: u32,
}

impl QuietHours {
    pub fn contains(&self, minute_of_day: u32) -> bool {
        if self.start <= self.end {
            self.start <= minute_of_day && minute_of_day <= self.end
        } else {
            minute_of_day >= self.start || minute_of_day <= self.end
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start: 22 * 60,
            end: 8 * 60,
        }
    }
}

fn hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub do_not_disturb: bool,
    pub quiet_hours: Option<QuietHours>,
    pub priority_filters: BTreeMap<Priority, bool>,
    pub sound_enabled: bool,
    pub visual_enabled: bool,
    pub auto_summarize: bool,
    pub max_concurrent: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            do_not_disturb: false,
            quiet_hours: Some(QuietHours::default()),
            priority_filters: Priority::ALL
                .iter()
                .map(|p| (*p, *p != Priority::Low))
                .collect(),
            sound_enabled: true,
            visual_enabled: true,
            auto_summarize: true,
            max_concurrent: 5,
        }
    }
}

impl Preferences {
    pub fn allows(&self, priority: Priority) -> bool {
        self.priority_filters.get(&priority).copied().unwrap_or(true)
    }
}

/// Why a notification is not shown right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    DoNotDisturb,
    QuietHours,
    /// Delivery for this priority is disabled.
    Filtered,
}

pub fn suppression(
    prefs: &Preferences,
    priority: Priority,
    minute_of_day: u32,
) -> Option<Suppression> {
    if prefs.do_not_disturb {
        return (!priority.breaks_through()).then_some(Suppression::DoNotDisturb);
    }
    if !prefs.allows(priority) {
        return Some(Suppression::Filtered);
    }
    match prefs.quiet_hours {
        Some(quiet) if quiet.contains(minute_of_day) && !priority.breaks_through() => {
            Some(Suppression::QuietHours)
        }
        _ => None,
    }
}

fn minute_of_day(now: DateTime<Local>) -> u32 {
    now.hour() * 60 + now.minute()
}

/// Parses `in N minutes|hours|days`, `after Nm` and `at HH:MM [am|pm]`.
pub struct TimeSpecParser {
    relative: Regex,
    clock: Regex,
}

impl TimeSpecParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            relative: Regex::new(
                r"(?:in|after)\s+(\d+)\s*(minutes?|mins?|m|hours?|hrs?|h|days?|d)\b",
            )?,
            clock: Regex::new(r"at\s+(\d{1,2}):(\d{2})\s*(am|pm)?")?,
        })
    }

    /// Absolute delivery time. A clock time already past today rolls to tomorrow.
    pub fn parse(&self, spec: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let spec = spec.to_lowercase();
        if let Some(caps) = self.relative.captures(&spec) {
            let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
            let unit = match caps.get(2)?.as_str().chars().next()? {
                'm' => 60,
                'h' => 3_600,
                _ => 86_400,
            };
            let delta = TimeDelta::try_seconds(amount.checked_mul(unit)?)?;
            return now.checked_add_signed(delta);
        }

        let caps = self.clock.captures(&spec)?;
        let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        match caps.get(3).map(|m| m.as_str()) {
            Some("pm") if hour < 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        let today = now
            .date_naive()
            .and_time(time)
            .and_local_timezone(Local)
            .earliest()?;
        if today < now {
            today.checked_add_signed(TimeDelta::try_days(1)?)
        } else {
            Some(today)
        }
    }
}

#[derive(Default)]
struct State {
    active: BTreeMap<String, Notification>,
    /// Waiting for their delivery time.
    scheduled: Vec<Notification>,
    /// Suppressed by do-not-disturb or quiet hours, delivered once allowed.
    held: Vec<Notification>,
    history: Vec<Notification>,
    prefs: Preferences,
}

impl State {
    /// Move matching active notifications to history. Returns how many moved.
    fn dismiss_where(&mut self, mut predicate: impl FnMut(&Notification) -> bool) -> usize {
        let ids: Vec<String> = self
            .active
            .values()
            .filter(|n| predicate(n))
            .map(|n| n.id.clone())
            .collect();
        for id in &ids {
            if let Some(notification) = self.active.remove(id) {
                self.history.push(notification);
            }
        }
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        ids.len()
    }
}

fn matches_term(notification: &Notification, term: &str) -> bool {
    let term = term.to_lowercase();
    notification.title.to_lowercase().contains(&term)
        || notification.message.to_lowercase().contains(&term)
}

pub struct NotificationSystem {
    engine: IntentEngine<NotificationIntent>,
    desktop: Desktop,
    store: JsonStore<Vec<Notification>>,
    times: TimeSpecParser,
    state: Mutex<State>,
}

impl NotificationSystem {
    pub async fn new(
        desktop: Desktop,
        layout: &StorageLayout,
        policy: MatchPolicy,
    ) -> ShellResult<Self> {
        let engine = IntentEngine::new(Normalizer::standard()?, pattern_table()?, context_rules())
            .with_policy(policy);
        let store = layout.store("notifications", "history.json");
        let history: Vec<Notification> = store.load().await;
        tracing::debug!(entries = history.len(), "notification history loaded");
        Ok(Self {
            engine,
            desktop,
            store,
            times: TimeSpecParser::new()?,
            state: Mutex::new(State {
                history,
                ..State::default()
            }),
        })
    }

    pub fn with_preferences(self, prefs: Preferences) -> Self {
        self.state.lock().prefs = prefs;
        self
    }

    pub fn preferences(&self) -> Preferences {
        self.state.lock().prefs.clone()
    }

    pub fn active(&self) -> Vec<Notification> {
        self.state.lock().active.values().cloned().collect()
    }

    pub fn history(&self) -> Vec<Notification> {
        self.state.lock().history.clone()
    }

    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.scheduled.len() + state.held.len()
    }

    async fn save_history(&self) {
        let history = self.state.lock().history.clone();
        if let Err(e) = self.store.save(&history).await {
            tracing::warn!("failed to save notification history: {}", e);
        }
    }

    async fn deliver(&self, notification: &Notification) {
        if let Err(e) = self
            .desktop
            .notify(&notification.title, &notification.message, notification.priority.urgency())
            .await
        {
            tracing::warn!(id = %notification.id, "notification delivery failed: {}", e);
        }
    }

    /// Deliver due scheduled notifications, release held ones that are now
    /// allowed and auto-dismiss stale ones. Returns how many were delivered.
    pub async fn tick(&self, now: DateTime<Local>) -> usize {
        let timestamp = now.timestamp();
        let minute = minute_of_day(now);
        let (to_deliver, dismissed) = {
            let mut state = self.state.lock();
            let state = &mut *state;

            let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.scheduled)
                .into_iter()
                .partition(|n| n.deliver_at.is_some_and(|at| at <= timestamp));
            state.scheduled = waiting;
            state.held.extend(due);

            let mut to_deliver = Vec::new();
            for notification in std::mem::take(&mut state.held) {
                match suppression(&state.prefs, notification.priority, minute) {
                    None => to_deliver.push(notification),
                    Some(Suppression::Filtered) => {
                        state.active.insert(notification.id.clone(), notification);
                    }
                    Some(_) => state.held.push(notification),
                }
            }
            for notification in &to_deliver {
                state.active.insert(notification.id.clone(), notification.clone());
            }

            let dismissed = state
                .dismiss_where(|n| n.auto_dismiss && timestamp - n.timestamp > AUTO_DISMISS_SECS);
            (to_deliver, dismissed)
        };

        for notification in &to_deliver {
            self.deliver(notification).await;
        }
        if dismissed > 0 {
            tracing::debug!(dismissed, "auto-dismissed notifications");
            self.save_history().await;
        }
        to_deliver.len()
    }

    fn build(
        &self,
        message: &str,
        kind: NotificationKind,
        priority: Priority,
        source: &str,
    ) -> Notification {
        Notification {
            id: format!("notification_{}", uuid::Uuid::new_v4().simple()),
            title: smart_title(message, kind),
            message: message.to_string(),
            priority,
            kind,
            source: source.to_string(),
            timestamp: Local::now().timestamp(),
            deliver_at: None,
            icon: kind.icon_name().to_string(),
            auto_dismiss: priority == Priority::Low,
        }
    }

    async fn create(&self, matched: &IntentMatch<NotificationIntent>) -> ShellResult<String> {
        let Some(message) = matched.entities.group(0) else {
            return Ok(
                "🚨 **Please specify the notification message**\n\n\
                 **Example:** notify me about the meeting in 30 minutes"
                    .to_string(),
            );
        };
        let kind = NotificationKind::from_context(matched.entities.context("type"));
        let priority = Priority::detect(&matched.text);
        let notification = self.build(message, kind, priority, "PersonalAIOS");
        let created = format!(
            "🚨 **Notification created:** {}\n   └─ Priority: {}\n   └─ Type: {}",
            notification.title,
            priority.label(),
            kind.label()
        );

        let blocked = {
            let mut state = self.state.lock();
            let blocked = suppression(&state.prefs, priority, minute_of_day(Local::now()));
            match blocked {
                None | Some(Suppression::Filtered) => {
                    state.active.insert(notification.id.clone(), notification.clone());
                }
                Some(_) => state.held.push(notification.clone()),
            }
            blocked
        };

        match blocked {
            None => {
                self.deliver(&notification).await;
                Ok(created)
            }
            Some(Suppression::Filtered) => Ok(format!(
                "{}\n   └─ Not shown on screen: {} priority delivery is disabled",
                created,
                priority.label().to_lowercase()
            )),
            Some(Suppression::DoNotDisturb) => Ok(format!(
                "🔇 **Notification queued** (Do Not Disturb is active)\n{}",
                QUEUED_DETAIL
            )),
            Some(Suppression::QuietHours) => Ok(format!(
                "🔇 **Notification queued** (quiet hours are active)\n{}",
                QUEUED_DETAIL
            )),
        }
    }

    async fn dismiss(&self, matched: &IntentMatch<NotificationIntent>) -> ShellResult<String> {
        let term = matched.entities.group(0).map(str::to_string);
        let (count, total) = {
            let mut state = self.state.lock();
            let total = state.active.len();
            let count = match &term {
                Some(term) => state.dismiss_where(|n| matches_term(n, term)),
                None => state.dismiss_where(|_| true),
            };
            (count, total)
        };
        if count > 0 {
            self.save_history().await;
        }
        Ok(match term {
            Some(term) if count > 0 => format!(
                "🚨 **Dismissed {} notification(s)** matching '{}'",
                count, term
            ),
            Some(term) => format!("🔍 **No notifications found** matching '{}'", term),
            None => format!("🚨 **Dismissed all notifications** ({} total)", total),
        })
    }

    fn list(&self, matched: &IntentMatch<NotificationIntent>) -> String {
        let now = Local::now().timestamp();
        if matched.text.contains("history") {
            let history = self.history();
            if history.is_empty() {
                return "📜 **Notification history is empty**".to_string();
            }
            let mut out = format!("📜 **Notification History** ({} stored):\n\n", history.len());
            for notification in history.iter().rev().take(LIST_LIMIT) {
                out.push_str(&format!(
                    "{} **{}** • {}\n",
                    notification.priority.icon(),
                    notification.title,
                    time_ago(notification.timestamp, now)
                ));
            }
            return out.trim_end().to_string();
        }

        let mut active = self.active();
        if active.is_empty() {
            return "🚨 **No active notifications**\n\nYou're all caught up! 🎉".to_string();
        }
        active.sort_by_key(|n| {
            let rank = match n.priority {
                Priority::Critical => 0,
                Priority::Urgent => 1,
                _ => 2,
            };
            (rank, -n.timestamp)
        });

        let mut out = format!("🚨 **Active Notifications** ({} total):\n\n", active.len());
        for notification in active.iter().take(LIST_LIMIT) {
            out.push_str(&format!(
                "{} **{}**\n   └─ {}\n   └─ {} {} • {}\n\n",
                notification.priority.icon(),
                notification.title,
                truncate(&notification.message, PREVIEW_CHARS),
                notification.kind.icon(),
                notification.kind.label(),
                time_ago(notification.timestamp, now)
            ));
        }
        if active.len() > LIST_LIMIT {
            out.push_str(&format!(
                "*(Showing first {} of {} notifications)*",
                LIST_LIMIT,
                active.len()
            ));
        }
        out.trim_end().to_string()
    }

    fn set_priority(&self, matched: &IntentMatch<NotificationIntent>) -> String {
        let (Some(term), Some(priority)) = (
            matched.entities.group(0),
            matched.entities.group(1).and_then(Priority::parse),
        ) else {
            return "🚨 **Set Priority:** Please name the notification and a priority\n\n\
                    **Example:** set priority of the meeting to high"
                .to_string();
        };
        let mut state = self.state.lock();
        let mut updated = 0;
        for notification in state.active.values_mut().filter(|n| matches_term(n, term)) {
            notification.priority = priority;
            notification.auto_dismiss = priority == Priority::Low;
            updated += 1;
        }
        if updated == 0 {
            return format!("🔍 **No notifications found** matching '{}'", term);
        }
        format!(
            "{} **Priority set to {}** for {} notification(s) matching '{}'",
            priority.icon(),
            priority.label(),
            updated,
            term
        )
    }

    fn do_not_disturb(&self, matched: &IntentMatch<NotificationIntent>) -> String {
        let words: Vec<&str> = matched.text.split_whitespace().collect();
        let has = |options: &[&str]| words.iter().any(|w| options.contains(w));
        let text = &matched.text;
        let disable =
            has(&["disable", "deactivate", "off", "disabled"]) || text.contains("turn off");
        let enable = has(&[
            "enable",
            "activate",
            "on",
            "enabled",
            "silence",
            "disturbed",
            "interrupted",
        ]) || text.contains("turn on");

        let mut state = self.state.lock();
        let explicit = if disable {
            Some(false)
        } else if enable {
            Some(true)
        } else {
            None
        };
        state.prefs.do_not_disturb = explicit.unwrap_or(!state.prefs.do_not_disturb);
        tracing::info!(enabled = state.prefs.do_not_disturb, "do not disturb changed");

        match (state.prefs.do_not_disturb, explicit.is_some()) {
            (true, true) => "🔇 **Do Not Disturb enabled**\n\n\
                             You won't receive notifications except for critical alerts."
                .to_string(),
            (false, true) => "🔔 **Do Not Disturb disabled**\n\n\
                              Notifications will now be delivered normally."
                .to_string(),
            (true, false) => "🔇 **Do Not Disturb enabled**".to_string(),
            (false, false) => "🔔 **Do Not Disturb disabled**".to_string(),
        }
    }

    fn schedule(&self, matched: &IntentMatch<NotificationIntent>) -> String {
        let (Some(message), Some(spec)) = (matched.entities.group(0), matched.entities.group(1))
        else {
            return "⏰ **Schedule Notification:** Please specify message and time\n\n\
                    **Example:** remind me about the meeting in 30 minutes"
                .to_string();
        };
        let now = Local::now();
        let Some(when) = self.times.parse(spec, now) else {
            return format!(
                "⏰ **Invalid time specification:** '{}'\n\n**Try:** in 30 minutes, in 2 hours, at 15:30",
                spec
            );
        };

        let priority = Priority::detect(&matched.text);
        let mut notification = self.build(
            message,
            NotificationKind::Reminder,
            priority,
            "PersonalAIOS Scheduler",
        );
        notification.deliver_at = Some(when.timestamp());
        notification.auto_dismiss = false;
        self.state.lock().scheduled.push(notification);
        tracing::info!(at = %when.format("%Y-%m-%d %H:%M"), "notification scheduled");

        format!(
            "⏰ **Notification scheduled:** {}\n   └─ Will be delivered at: {}",
            message,
            when.format("%Y-%m-%d %H:%M")
        )
    }

    fn settings(&self) -> String {
        let prefs = self.preferences();
        let on_off = |on: bool, yes: &str, no: &str| {
            if on {
                yes.to_string()
            } else {
                no.to_string()
            }
        };
        let mut out = "⚙️ **Notification Settings:**\n\n".to_string();
        out.push_str(&format!(
            "**Do Not Disturb:** {}\n",
            on_off(prefs.do_not_disturb, "🔇 Enabled", "🔔 Disabled")
        ));
        out.push_str(&format!(
            "**Quiet Hours:** {}\n",
            match prefs.quiet_hours {
                Some(q) => format!("{} - {}", hhmm(q.start), hhmm(q.end)),
                None => "Off".to_string(),
            }
        ));
        out.push_str(&format!(
            "**Sound Notifications:** {}\n",
            on_off(prefs.sound_enabled, "🔊 Enabled", "🔇 Disabled")
        ));
        out.push_str(&format!(
            "**Visual Notifications:** {}\n",
            on_off(prefs.visual_enabled, "👁️ Enabled", "👁️‍🗨️ Disabled")
        ));
        out.push_str(&format!(
            "**Auto Summarize:** {}\n",
            on_off(prefs.auto_summarize, "🤖 Enabled", "📝 Disabled")
        ));
        out.push_str(&format!("**Max Concurrent:** {} notifications\n\n", prefs.max_concurrent));
        out.push_str("**Priority Filters:**\n");
        for priority in Priority::ALL {
            out.push_str(&format!(
                "• {} {}: {}\n",
                priority.icon(),
                priority.label(),
                on_off(prefs.allows(priority), "✅ Enabled", "❌ Disabled")
            ));
        }
        out.trim_end().to_string()
    }

    fn summarize(&self) -> String {
        let active = self.active();
        if active.is_empty() {
            return "📋 **Notification Summary:** No active notifications".to_string();
        }
        let mut by_priority: BTreeMap<Priority, usize> = BTreeMap::new();
        let mut by_kind: BTreeMap<NotificationKind, usize> = BTreeMap::new();
        for notification in &active {
            *by_priority.entry(notification.priority).or_default() += 1;
            *by_kind.entry(notification.kind).or_default() += 1;
        }

        let mut out = format!(
            "📋 **Notification Summary**\n\n**Total Active:** {} notifications\n\n**By Priority:**\n",
            active.len()
        );
        for priority in Priority::ALL {
            if let Some(count) = by_priority.get(&priority) {
                out.push_str(&format!("• {} {}: {}\n", priority.icon(), priority.label(), count));
            }
        }
        out.push_str("\n**By Type:**\n");
        for (kind, count) in &by_kind {
            out.push_str(&format!("• {} {}: {}\n", kind.icon(), kind.label(), count));
        }

        let now = Local::now().timestamp();
        let mut insights = Vec::new();
        let pressing = active.iter().filter(|n| n.priority.breaks_through()).count();
        if pressing > 0 {
            insights.push(format!(
                "🚨 You have {} urgent notification(s) requiring attention",
                pressing
            ));
        }
        let stale = active.iter().filter(|n| now - n.timestamp > 3_600).count();
        if stale > 0 {
            insights.push(format!("⏰ {} notification(s) are over an hour old", stale));
        }
        if !insights.is_empty() {
            out.push_str("\n**Insights:**\n");
            for insight in insights {
                out.push_str(&format!("• {}\n", insight));
            }
        }
        out.trim_end().to_string()
    }
}

#[async_trait]
impl IntentHandler for NotificationSystem {
    type Intent = NotificationIntent;
    const NAME: &'static str = "notifications";
    const TITLE: &'static str = "notification system";

    fn engine(&self) -> &IntentEngine<NotificationIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<NotificationIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        match matched.intent {
            NotificationIntent::Show => self.create(matched).await,
            NotificationIntent::Dismiss => self.dismiss(matched).await,
            NotificationIntent::List => Ok(self.list(matched)),
            NotificationIntent::SetPriority => Ok(self.set_priority(matched)),
            NotificationIntent::DoNotDisturb => Ok(self.do_not_disturb(matched)),
            NotificationIntent::Schedule => Ok(self.schedule(matched)),
            NotificationIntent::Settings => Ok(self.settings()),
            NotificationIntent::Summarize => Ok(self.summarize()),
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "🚨 **Try these natural language notification commands:**",
            &[
                (
                    "Create Notifications",
                    &[
                        "notify me about the build results",
                        "remind me about the meeting in 30 minutes",
                        "schedule a reminder for standup at 09:30",
                    ],
                ),
                (
                    "Manage Notifications",
                    &[
                        "dismiss all notifications",
                        "list my notifications",
                        "enable do not disturb",
                        "set priority of the meeting to high",
                    ],
                ),
                ("Settings", &["notification settings", "summarize my notifications"]),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use personalaios_core::Component;
    use personalaios_executor::DryRunRunner;
    use std::sync::Arc;

    async fn system(dir: &std::path::Path) -> (NotificationSystem, Arc<DryRunRunner>) {
        let runner = Arc::new(DryRunRunner::new());
        let layout = StorageLayout::new(dir);
        let desktop = Desktop::new(runner.clone());
        let system = NotificationSystem::new(desktop, &layout, MatchPolicy::BestMatch)
            .await
            .unwrap()
            .with_preferences(Preferences {
                quiet_hours: None,
                ..Preferences::default()
            });
        (system, runner)
    }

    fn notify_calls(runner: &DryRunRunner) -> Vec<Vec<String>> {
        runner
            .invocations()
            .into_iter()
            .filter(|i| i.program == "notify-send")
            .map(|i| i.args)
            .collect()
    }

    #[test]
    fn test_priority_detection_and_urgency() {
        assert_eq!(Priority::detect("notify me about an urgent outage"), Priority::Critical);
        assert_eq!(Priority::detect("important: pay rent"), Priority::High);
        assert_eq!(Priority::detect("a minor update"), Priority::Low);
        assert_eq!(Priority::detect("follow up with the team"), Priority::Normal);
        assert_eq!(Priority::High.urgency(), Urgency::Normal);
        assert_eq!(Priority::Urgent.urgency(), Urgency::Critical);
    }

    #[test]
    fn test_quiet_hours_wrap_midnight() {
        let quiet = QuietHours::default();
        assert!(quiet.contains(23 * 60));
        assert!(quiet.contains(7 * 60 + 59));
        assert!(!quiet.contains(12 * 60));

        let prefs = Preferences::default();
        assert_eq!(suppression(&prefs, Priority::Normal, 23 * 60), Some(Suppression::QuietHours));
        assert_eq!(suppression(&prefs, Priority::Critical, 23 * 60), None);
        assert_eq!(suppression(&prefs, Priority::Low, 12 * 60), Some(Suppression::Filtered));

        let dnd = Preferences {
            do_not_disturb: true,
            ..Preferences::default()
        };
        assert_eq!(suppression(&dnd, Priority::High, 12 * 60), Some(Suppression::DoNotDisturb));
        assert_eq!(suppression(&dnd, Priority::Urgent, 12 * 60), None);
    }

    #[test]
    fn test_time_specifications() {
        let parser = TimeSpecParser::new().unwrap();
        let now = Local.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();

        assert_eq!(parser.parse("in 30 minutes", now), Some(now + TimeDelta::minutes(30)));
        assert_eq!(parser.parse("in 2 hours", now), Some(now + TimeDelta::hours(2)));
        assert_eq!(parser.parse("after 5m", now), Some(now + TimeDelta::minutes(5)));
        assert_eq!(parser.parse("in 1 day", now), Some(now + TimeDelta::days(1)));
        assert_eq!(
            parser.parse("at 16:45", now),
            Local.with_ymd_and_hms(2026, 3, 10, 16, 45, 0).single()
        );
        assert_eq!(
            parser.parse("at 9:30", now),
            Local.with_ymd_and_hms(2026, 3, 11, 9, 30, 0).single()
        );
        assert_eq!(parser.parse("tomorrow-ish", now), None);
    }

    #[test]
    fn test_smart_title() {
        assert_eq!(smart_title("disk full", NotificationKind::Error), "Error: disk full");
        let long = "x".repeat(60);
        let title = smart_title(&long, NotificationKind::AiGenerated);
        assert!(title.starts_with("PersonalAIOS: "));
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), "PersonalAIOS: ".len() + 50 + 3);
    }

    #[tokio::test]
    async fn test_create_delivers_through_notify_send() {
        let dir = tempfile::tempdir().unwrap();
        let (system, runner) = system(dir.path()).await;

        let reply = system.process_command("notify me about the build results").await;
        assert!(reply.starts_with("🚨 **Notification created:** PersonalAIOS: the build results"));
        assert!(reply.contains("Priority: Normal"));

        let reply = system.process_command("alert me about an urgent server outage").await;
        assert!(reply.contains("Priority: Critical"));

        let calls = notify_calls(&runner);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0], "--urgency=normal");
        assert_eq!(calls[1][0], "--urgency=critical");
        assert_eq!(system.active().len(), 2);
    }

    #[tokio::test]
    async fn test_do_not_disturb_holds_until_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let (system, runner) = system(dir.path()).await;

        let reply = system.process_command("enable do not disturb").await;
        assert!(reply.starts_with("🔇 **Do Not Disturb enabled**"));

        let reply = system.process_command("notify me about lunch").await;
        assert!(reply.starts_with("🔇 **Notification queued**"));
        let reply = system.process_command("notify me about a critical outage").await;
        assert!(reply.starts_with("🚨 **Notification created:**"));
        assert_eq!(notify_calls(&runner).len(), 1);
        assert_eq!(system.pending(), 1);

        system.process_command("turn off do not disturb").await;
        assert!(!system.preferences().do_not_disturb);
        assert_eq!(system.tick(Local::now()).await, 1);
        assert_eq!(notify_calls(&runner).len(), 2);
        assert_eq!(system.pending(), 0);
    }

    #[tokio::test]
    async fn test_schedule_delivers_when_due() {
        let dir = tempfile::tempdir().unwrap();
        let (system, runner) = system(dir.path()).await;

        let reply = system
            .process_command("remind me about the meeting in 30 minutes")
            .await;
        assert!(reply.starts_with("⏰ **Notification scheduled:** the meeting"));
        assert_eq!(system.tick(Local::now()).await, 0);

        let later = Local::now() + TimeDelta::minutes(31);
        assert_eq!(system.tick(later).await, 1);
        let active = system.active();
        assert_eq!(active[0].title, "Reminder: the meeting");
        assert_eq!(notify_calls(&runner).len(), 1);

        let reply = system
            .process_command("remind me about the call at noonish")
            .await;
        assert!(reply.starts_with("⏰ **Invalid time specification:** 'at noonish'"));
    }

    #[tokio::test]
    async fn test_dismiss_moves_to_persisted_history() {
        let dir = tempfile::tempdir().unwrap();
        let (system, _) = system(dir.path()).await;
        system.process_command("notify me about the build results").await;
        system.process_command("notify me about the deploy").await;

        let reply = system.process_command("dismiss notification about build").await;
        assert_eq!(reply, "🚨 **Dismissed 1 notification(s)** matching 'build'");
        let reply = system.process_command("dismiss notification about nothing").await;
        assert_eq!(reply, "🔍 **No notifications found** matching 'nothing'");
        let reply = system.process_command("dismiss all notifications").await;
        assert_eq!(reply, "🚨 **Dismissed all notifications** (1 total)");

        let stored: Vec<Notification> =
            JsonStore::new(dir.path().join("notifications/history.json")).load().await;
        assert_eq!(stored.len(), 2);

        let (reloaded, _) = self::system(dir.path()).await;
        assert_eq!(reloaded.history().len(), 2);
        let reply = reloaded.process_command("notification history").await;
        assert!(reply.starts_with("📜 **Notification History** (2 stored)"));
    }

    #[tokio::test]
    async fn test_low_priority_recorded_and_auto_dismissed() {
        let dir = tempfile::tempdir().unwrap();
        let (system, runner) = system(dir.path()).await;

        let reply = system.process_command("notify me about a minor update").await;
        assert!(reply.contains("low priority delivery is disabled"));
        assert!(notify_calls(&runner).is_empty());
        assert_eq!(system.active().len(), 1);

        system.tick(Local::now() + TimeDelta::seconds(301)).await;
        assert!(system.active().is_empty());
        assert_eq!(system.history().len(), 1);
    }

    #[tokio::test]
    async fn test_list_priority_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (system, _) = system(dir.path()).await;
        assert!(system
            .process_command("list my notifications")
            .await
            .contains("You're all caught up"));

        system.process_command("notify me about the standup").await;
        system.process_command("notify me about an emergency backup").await;

        let reply = system.process_command("list my notifications").await;
        assert!(reply.starts_with("🚨 **Active Notifications** (2 total)"));
        let critical = reply.find("emergency backup").unwrap();
        let normal = reply.find("the standup").unwrap();
        assert!(critical < normal);

        let reply = system
            .process_command("set priority of standup to high")
            .await;
        assert_eq!(reply, "🔴 **Priority set to High** for 1 notification(s) matching 'standup'");

        let reply = system.process_command("summarize my notifications").await;
        assert!(reply.contains("**Total Active:** 2 notifications"));
        assert!(reply.contains("🔴 High: 1"));
        assert!(reply.contains("1 urgent notification(s)"));
    }

    #[tokio::test]
    async fn test_settings_and_help() {
        let dir = tempfile::tempdir().unwrap();
        let (system, _) = system(dir.path()).await;
        let reply = system.process_command("notification settings").await;
        assert!(reply.starts_with("⚙️ **Notification Settings:**"));
        assert!(reply.contains("⚪ Low: ❌ Disabled"));

        let reply = system.process_command("").await;
        assert!(reply.contains("Create Notifications"));
    }
}
