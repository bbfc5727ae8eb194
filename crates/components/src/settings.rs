//! Settings catalogue with natural language get/set, backups and profiles.

use async_trait::async_trait;
use chrono::Local;
use parking_lot::RwLock;
use personalaios_core::format::help_text;
use personalaios_core::fuzzy;
use personalaios_core::{
    ContextRules, FillerStyle, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy,
    Normalizer, PatternTable, ShellError, ShellResult,
};
use personalaios_memory::{JsonStore, StorageLayout};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const FILLERS: &[&str] = &["please", "can you", "would you", "could you", "i want to"];
const BACKUP_PREFIX: &str = "personalaios_settings_backup_";
const BACKUP_HISTORY_LIMIT: usize = 10;
const LIST_LIMIT: usize = 10;
const PER_CATEGORY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsIntent {
    Get,
    Set,
    Reset,
    List,
    Search,
    Backup,
    Restore,
    Category,
    Info,
    ApplyProfile,
}

impl Intent for SettingsIntent {
    fn as_str(&self) -> &'static str {
        match self {
            SettingsIntent::Get => "get_setting",
            SettingsIntent::Set => "set_setting",
            SettingsIntent::Reset => "reset_setting",
            SettingsIntent::List => "list_settings",
            SettingsIntent::Search => "search_settings",
            SettingsIntent::Backup => "backup_settings",
            SettingsIntent::Restore => "restore_settings",
            SettingsIntent::Category => "category_settings",
            SettingsIntent::Info => "setting_info",
            SettingsIntent::ApplyProfile => "apply_profile",
        }
    }
}

fn pattern_table() -> Result<PatternTable<SettingsIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            SettingsIntent::Get,
            &[
                r"(?:what is|show|get) (?:the )?(?:current )?(.+?) (?:setting|value|preference)",
                r"(?:current|show me) (.+?) (?:setting|value)",
                r"(?:value of|check) (.+?) (?:setting|preference)",
                r"(.+?) (?:setting|preference|value)$",
            ],
        )
        .intent(
            SettingsIntent::Set,
            &[
                r"(?:set|change) (?:the )?(.+?) (?:to|as) (.+)",
                r"(?:make|configure) (?:the )?(.+?) (?:to be|as) (.+)",
                r"(?:update|modify) (?:the )?(.+?) (?:setting|value) (?:to|as) (.+)",
                r"(?:make|turn|switch) (?:the )?(.+?) (on|off|true|false)$",
                r"(.+?) (?:should be|to) (.+)",
            ],
        )
        .intent(
            SettingsIntent::Reset,
            &[
                r"(?:reset|restore) (?:the )?(.+?) (?:setting|preference|value)",
                r"(?:default|original) (?:value for |setting for )?(.+)",
                r"(?:set|change) (.+?) (?:back to|to) (?:default|original)",
                r"(?:reset|restore) (?:the )?(?:default )?(.+?)$",
            ],
        )
        .intent(
            SettingsIntent::List,
            &[
                r"^(?:list|show)(?: all)?(?: the)? settings$",
                r"(?:list|show) (?:all )?(?:the )?(.+?) settings",
                r"(?:what|which) (.+?) settings (?:are there|exist|available)",
                r"(?:settings for|configure) (.+?)$",
                r"(.+?) (?:configuration|preferences|options)$",
            ],
        )
        .intent(
            SettingsIntent::Search,
            &[
                r"(?:find|search|locate) (?:for )?(?:settings (?:for|about) )?(.+)",
                r"(?:settings|options) (?:related to|about|for) (.+)",
                r"how to (?:change|configure|set) (.+)",
            ],
        )
        .intent(
            SettingsIntent::Backup,
            &[
                r"(?:backup|save|export) (?:all )?(?:my )?settings",
                r"(?:create|make) (?:a )?(?:backup|copy) of (?:my )?settings",
                r"(?:save|store) (?:current )?configuration",
            ],
        )
        .intent(
            SettingsIntent::Restore,
            &[
                r"(?:restore|load|import) (?:my )?(?:settings|configuration|backup)",
                r"(?:revert to|go back to) (?:previous|saved|backup) settings",
                r"(?:undo|rollback) (?:settings )?changes",
            ],
        )
        .intent(
            SettingsIntent::Category,
            &[
                r"(?:show|list|display) (.+?) category settings",
                r"(?:all )?(.+?) (?:settings|preferences|options)$",
                r"(?:configure|modify) (.+?) (?:settings|preferences)",
            ],
        )
        .intent(
            SettingsIntent::Info,
            &[
                r"(?:info|information|details|help) (?:about|for|on) (?:the )?(.+?) (?:setting|preference)",
                r"(?:what does|explain) (?:the )?(.+?) (?:setting|preference|option)",
                r"(?:help with|describe) (?:the )?(.+?) (?:setting|preference)",
            ],
        )
        .intent(
            SettingsIntent::ApplyProfile,
            &[
                r"(?:apply|use|load) (?:the )?(.+?) (?:profile|preset|template)",
                r"(?:set|configure) (?:system )?(?:as|to) (.+?) (?:profile|mode)",
                r"(?:switch to|enable) (?:the )?(.+?) (?:profile|preset)",
            ],
        )
        .build()
}

fn context_rules() -> ContextRules {
    ContextRules::new()
        .rule(
            "scope",
            &[
                ("global", &["all", "everything", "global"]),
                ("local", &["current", "this", "local"]),
            ],
        )
        .rule(
            "action_type",
            &[
                ("backup", &["backup", "save", "store"]),
                ("restore", &["restore", "load", "revert"]),
            ],
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    Boolean,
    Integer,
    Float,
    String,
    List,
    Choice,
    Color,
    File,
    Directory,
}

impl SettingType {
    pub fn label(&self) -> &'static str {
        match self {
            SettingType::Boolean => "Boolean",
            SettingType::Integer => "Integer",
            SettingType::Float => "Float",
            SettingType::String => "String",
            SettingType::List => "List",
            SettingType::Choice => "Choice",
            SettingType::Color => "Color",
            SettingType::File => "File",
            SettingType::Directory => "Directory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingCategory {
    Appearance,
    System,
    Privacy,
    Accessibility,
    Applications,
    Network,
    Power,
    Sound,
    Display,
    Keyboard,
    Mouse,
    #[serde(rename = "personalaios")]
    PersonalAios,
}

impl SettingCategory {
    pub const ALL: [SettingCategory; 12] = [
        SettingCategory::Appearance,
        SettingCategory::System,
        SettingCategory::Privacy,
        SettingCategory::Accessibility,
        SettingCategory::Applications,
        SettingCategory::Network,
        SettingCategory::Power,
        SettingCategory::Sound,
        SettingCategory::Display,
        SettingCategory::Keyboard,
        SettingCategory::Mouse,
        SettingCategory::PersonalAios,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingCategory::Appearance => "appearance",
            SettingCategory::System => "system",
            SettingCategory::Privacy => "privacy",
            SettingCategory::Accessibility => "accessibility",
            SettingCategory::Applications => "applications",
            SettingCategory::Network => "network",
            SettingCategory::Power => "power",
            SettingCategory::Sound => "sound",
            SettingCategory::Display => "display",
            SettingCategory::Keyboard => "keyboard",
            SettingCategory::Mouse => "mouse",
            SettingCategory::PersonalAios => "personalaios",
        }
    }

    pub fn label(&self) -> String {
        match self {
            SettingCategory::PersonalAios => "PersonalAIOS".to_string(),
            other => {
                let name = other.as_str();
                let mut chars = name.chars();
                chars
                    .next()
                    .map(|c| c.to_uppercase().chain(chars).collect())
                    .unwrap_or_default()
            }
        }
    }

    /// Exact name, then either name containing the other.
    pub fn find(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|c| c.as_str() == name)
            .or_else(|| {
                Self::ALL
                    .iter()
                    .find(|c| name.contains(c.as_str()) || c.as_str().contains(name.as_str()))
            })
            .copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingPriority {
    Essential,
    Important,
    Normal,
    Advanced,
    Debug,
}

impl SettingPriority {
    fn icon(&self) -> &'static str {
        match self {
            SettingPriority::Essential => "🔴",
            SettingPriority::Important => "🟠",
            SettingPriority::Normal => "🔵",
            SettingPriority::Advanced => "🟡",
            SettingPriority::Debug => "🔍",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SettingPriority::Essential => "Essential",
            SettingPriority::Important => "Important",
            SettingPriority::Normal => "Normal",
            SettingPriority::Advanced => "Advanced",
            SettingPriority::Debug => "Debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingDefinition {
    pub id: &'static str,
    pub category: SettingCategory,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: SettingType,
    pub default: Value,
    pub priority: SettingPriority,
    pub choices: &'static [&'static str],
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub requires_restart: bool,
    pub keywords: &'static [&'static str],
}

impl SettingDefinition {
    fn new(
        id: &'static str,
        category: SettingCategory,
        name: &'static str,
        description: &'static str,
        kind: SettingType,
        default: Value,
    ) -> Self {
        Self {
            id,
            category,
            name,
            description,
            kind,
            default,
            priority: SettingPriority::Normal,
            choices: &[],
            min: None,
            max: None,
            requires_restart: false,
            keywords: &[],
        }
    }

    fn priority(mut self, priority: SettingPriority) -> Self {
        self.priority = priority;
        self
    }

    fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }

    fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    fn restart(mut self) -> Self {
        self.requires_restart = true;
        self
    }

    fn keywords(mut self, keywords: &'static [&'static str]) -> Self {
        self.keywords = keywords;
        self
    }

    /// Whether a stored value has the shape this setting holds.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.kind {
            SettingType::Boolean => value.is_boolean(),
            SettingType::Integer => value.is_i64() || value.is_u64(),
            SettingType::Float => value.is_number(),
            SettingType::List => value.is_array(),
            SettingType::Choice => value
                .as_str()
                .is_some_and(|v| self.choices.contains(&v)),
            _ => value.is_string(),
        }
    }

    fn check_range(&self, value: f64) -> ShellResult<()> {
        if let Some(min) = self.min {
            if value < min {
                return Err(ShellError::invalid(format!("Value must be at least {}", min)));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ShellError::invalid(format!("Value must be at most {}", max)));
            }
        }
        Ok(())
    }

    /// Convert spoken input into a value of this setting's type.
    pub fn validate(&self, raw: &str) -> ShellResult<Value> {
        let raw = raw.trim();
        let lower = raw.to_lowercase();
        match self.kind {
            SettingType::Boolean => match lower.as_str() {
                "true" | "yes" | "on" | "enabled" | "enable" | "1" => Ok(json!(true)),
                "false" | "no" | "off" | "disabled" | "disable" | "0" => Ok(json!(false)),
                _ => Err(ShellError::invalid(
                    "Boolean value must be true/false, yes/no, on/off, enabled/disabled, or 1/0",
                )),
            },
            SettingType::Integer => {
                let value: i64 = raw
                    .parse()
                    .map_err(|_| ShellError::invalid(format!("Invalid integer value: {}", raw)))?;
                self.check_range(value as f64)?;
                Ok(json!(value))
            }
            SettingType::Float => {
                let (number, percent) = match raw.strip_suffix('%') {
                    Some(number) => (number.trim(), true),
                    None => (raw, false),
                };
                let mut value: f64 = number
                    .parse()
                    .map_err(|_| ShellError::invalid(format!("Invalid number value: {}", raw)))?;
                if percent {
                    value /= 100.0;
                }
                self.check_range(value)?;
                Ok(json!(value))
            }
            SettingType::Choice => {
                if let Some(choice) = self.choices.iter().find(|c| **c == raw) {
                    return Ok(json!(choice));
                }
                if let Some(choice) = self.choices.iter().find(|c| c.to_lowercase() == lower) {
                    return Ok(json!(choice));
                }
                let prefixed: Vec<&str> = self
                    .choices
                    .iter()
                    .copied()
                    .filter(|c| c.to_lowercase().starts_with(&lower))
                    .collect();
                match prefixed.as_slice() {
                    [only] => Ok(json!(only)),
                    [] => Err(ShellError::invalid(format!(
                        "Invalid choice '{}'. Options: {}",
                        raw,
                        self.choices.join(", ")
                    ))),
                    many => Err(ShellError::invalid(format!(
                        "Ambiguous choice '{}'. Options: {}",
                        raw,
                        many.join(", ")
                    ))),
                }
            }
            SettingType::Color => {
                let digits = raw.strip_prefix('#').unwrap_or("");
                if matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(json!(raw))
                } else {
                    Err(ShellError::invalid(
                        "Invalid color format. Use hex format like #ff0000 or #f00",
                    ))
                }
            }
            SettingType::File => {
                let path = expand_home(raw);
                if path.exists() {
                    Ok(json!(path.to_string_lossy()))
                } else {
                    Err(ShellError::invalid(format!("File does not exist: {}", raw)))
                }
            }
            SettingType::Directory => {
                let path = expand_home(raw);
                if path.is_dir() {
                    Ok(json!(path.to_string_lossy()))
                } else {
                    Err(ShellError::invalid(format!("Directory does not exist: {}", raw)))
                }
            }
            SettingType::List => Ok(json!(raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>())),
            SettingType::String => Ok(json!(raw)),
        }
    }

    pub fn format(&self, value: &Value) -> String {
        match (self.kind, value) {
            (_, Value::Null) => "None".to_string(),
            (SettingType::Boolean, Value::Bool(on)) => {
                (if *on { "✅ Enabled" } else { "❌ Disabled" }).to_string()
            }
            (SettingType::Float, Value::Number(n)) => match n.as_f64() {
                Some(v) if (0.0..=1.0).contains(&v) => format!("{:.0}%", v * 100.0),
                Some(v) => format!("{:.2}", v),
                None => n.to_string(),
            },
            (SettingType::Color, Value::String(s)) => format!("{} 🎨", s),
            (SettingType::File | SettingType::Directory, Value::String(s)) => format!("`{}`", s),
            (_, Value::String(s)) => s.clone(),
            (_, Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            (_, other) => other.to_string(),
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

/// The built-in settings, in display order.
pub fn core_catalogue(data_root: &Path) -> Vec<SettingDefinition> {
    use SettingCategory as C;
    use SettingPriority as P;
    use SettingType as T;

    let wallpaper = data_root.join("wallpapers").join("default.jpg");
    vec![
        SettingDefinition::new(
            "theme_mode",
            C::Appearance,
            "Theme Mode",
            "System color theme preference",
            T::Choice,
            json!("auto"),
        )
        .choices(&["auto", "light", "dark"])
        .priority(P::Important)
        .keywords(&["theme", "appearance", "dark mode", "light mode"]),
        SettingDefinition::new(
            "accent_color",
            C::Appearance,
            "Accent Color",
            "Primary accent color for the interface",
            T::Color,
            json!("#1c71d8"),
        )
        .keywords(&["color", "accent", "theme"]),
        SettingDefinition::new(
            "wallpaper_path",
            C::Appearance,
            "Wallpaper",
            "Desktop background image",
            T::File,
            json!(wallpaper.to_string_lossy()),
        )
        .keywords(&["wallpaper", "background", "desktop"]),
        SettingDefinition::new(
            "font_size",
            C::Appearance,
            "Font Size",
            "System font size scaling",
            T::Float,
            json!(1.0),
        )
        .range(0.5, 3.0)
        .priority(P::Important)
        .keywords(&["font", "text", "size", "scaling"]),
        SettingDefinition::new(
            "ai_natural_language",
            C::PersonalAios,
            "Natural Language Processing",
            "Enable AI-powered natural language understanding",
            T::Boolean,
            json!(true),
        )
        .priority(P::Essential)
        .keywords(&["ai", "nlp", "natural language", "understanding"]),
        SettingDefinition::new(
            "ai_learning_enabled",
            C::PersonalAios,
            "AI Learning",
            "Allow PersonalAIOS to learn from your usage patterns",
            T::Boolean,
            json!(true),
        )
        .priority(P::Important)
        .keywords(&["learning", "ai", "patterns", "adaptation"]),
        SettingDefinition::new(
            "ai_suggestions",
            C::PersonalAios,
            "AI Suggestions",
            "Show intelligent suggestions and recommendations",
            T::Boolean,
            json!(true),
        )
        .keywords(&["suggestions", "recommendations", "ai"]),
        SettingDefinition::new(
            "desktop_mode_default",
            C::PersonalAios,
            "Default Desktop Mode",
            "Start PersonalAIOS in desktop mode by default",
            T::Boolean,
            json!(true),
        )
        .priority(P::Important)
        .restart()
        .keywords(&["desktop", "mode", "startup"]),
        SettingDefinition::new(
            "animation_speed",
            C::System,
            "Animation Speed",
            "Speed of UI animations and transitions",
            T::Choice,
            json!("normal"),
        )
        .choices(&["none", "fast", "normal", "slow"])
        .keywords(&["animation", "speed", "transitions"]),
        SettingDefinition::new(
            "auto_save_frequency",
            C::System,
            "Auto Save Frequency",
            "Frequency of automatic settings backup (minutes)",
            T::Integer,
            json!(30),
        )
        .range(5.0, 480.0)
        .keywords(&["autosave", "backup", "frequency"]),
        SettingDefinition::new(
            "usage_statistics",
            C::Privacy,
            "Usage Statistics",
            "Collect anonymous usage statistics for improvement",
            T::Boolean,
            json!(false),
        )
        .priority(P::Important)
        .keywords(&["statistics", "telemetry", "privacy", "data"]),
        SettingDefinition::new(
            "location_services",
            C::Privacy,
            "Location Services",
            "Allow applications to access location data",
            T::Boolean,
            json!(false),
        )
        .priority(P::Important)
        .keywords(&["location", "gps", "privacy"]),
        SettingDefinition::new(
            "large_text",
            C::Accessibility,
            "Large Text",
            "Use larger text for better readability",
            T::Boolean,
            json!(false),
        )
        .priority(P::Important)
        .keywords(&["accessibility", "large text", "readability"]),
        SettingDefinition::new(
            "high_contrast",
            C::Accessibility,
            "High Contrast",
            "Use high contrast theme for better visibility",
            T::Boolean,
            json!(false),
        )
        .priority(P::Important)
        .keywords(&["accessibility", "high contrast", "visibility"]),
        SettingDefinition::new(
            "system_sounds",
            C::Sound,
            "System Sounds",
            "Enable system sound effects",
            T::Boolean,
            json!(true),
        )
        .keywords(&["sounds", "audio", "effects"]),
        SettingDefinition::new(
            "notification_sounds",
            C::Sound,
            "Notification Sounds",
            "Play sounds for notifications",
            T::Boolean,
            json!(true),
        )
        .keywords(&["notifications", "sounds", "alerts"]),
    ]
}

/// Spoken synonyms for terms used in setting names and keywords.
const ALIASES: &[(&str, &[&str])] = &[
    ("theme", &["appearance", "look", "style", "colors"]),
    ("wallpaper", &["background", "desktop background"]),
    ("volume", &["sound", "audio", "speaker"]),
    ("brightness", &["screen brightness", "display brightness"]),
    ("wifi", &["wireless", "internet", "network"]),
    ("battery", &["power", "energy", "charging"]),
    ("keyboard", &["keys", "typing", "shortcuts"]),
    ("mouse", &["pointer", "cursor", "clicking"]),
    ("notifications", &["alerts", "popups", "messages"]),
    ("privacy", &["security", "tracking", "data"]),
    ("accessibility", &["a11y", "disability", "assistance"]),
];

/// Built-in profiles: the values each applies.
pub fn profiles() -> Vec<(&'static str, Vec<(&'static str, Value)>)> {
    vec![
        (
            "dark_mode",
            vec![
                ("theme_mode", json!("dark")),
                ("high_contrast", json!(false)),
                ("animation_speed", json!("normal")),
            ],
        ),
        (
            "light_mode",
            vec![
                ("theme_mode", json!("light")),
                ("high_contrast", json!(false)),
                ("animation_speed", json!("normal")),
            ],
        ),
        (
            "accessibility",
            vec![
                ("large_text", json!(true)),
                ("high_contrast", json!(true)),
                ("animation_speed", json!("slow")),
                ("font_size", json!(1.25)),
            ],
        ),
        (
            "performance",
            vec![
                ("animation_speed", json!("fast")),
                ("system_sounds", json!(false)),
                ("ai_suggestions", json!(false)),
                ("usage_statistics", json!(false)),
            ],
        ),
        (
            "privacy_focused",
            vec![
                ("usage_statistics", json!(false)),
                ("location_services", json!(false)),
                ("ai_learning_enabled", json!(false)),
            ],
        ),
        (
            "default",
            vec![
                ("theme_mode", json!("auto")),
                ("ai_natural_language", json!(true)),
                ("ai_learning_enabled", json!(true)),
                ("ai_suggestions", json!(true)),
                ("animation_speed", json!("normal")),
            ],
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSetting {
    pub current_value: Value,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default = "system_actor")]
    pub modified_by: String,
}

fn system_actor() -> String {
    "system".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub timestamp: i64,
    pub file: String,
    pub settings_count: usize,
}

/// Layout of `settings/settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub settings: BTreeMap<String, StoredSetting>,
    #[serde(default)]
    pub backup_history: Vec<BackupRecord>,
    #[serde(default)]
    pub last_save: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub timestamp: i64,
    pub date: String,
    pub version: String,
    pub total_settings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    #[serde(default)]
    pub backup_info: BackupInfo,
    #[serde(default)]
    pub settings: BTreeMap<String, StoredSetting>,
}

struct Setting {
    def: SettingDefinition,
    value: Value,
    last_modified: i64,
    modified_by: String,
}

impl Setting {
    fn display(&self) -> String {
        self.def.format(&self.value)
    }

    fn stored(&self) -> StoredSetting {
        StoredSetting {
            current_value: self.value.clone(),
            last_modified: self.last_modified,
            modified_by: self.modified_by.clone(),
        }
    }

    fn assign(&mut self, value: Value, by: &str) -> Value {
        self.last_modified = Local::now().timestamp();
        self.modified_by = by.to_string();
        std::mem::replace(&mut self.value, value)
    }
}

struct Registry {
    settings: Vec<Setting>,
    backup_history: Vec<BackupRecord>,
}

impl Registry {
    fn position(&self, id: &str) -> Option<usize> {
        self.settings.iter().position(|s| s.def.id == id)
    }

    /// Id, exact name, partial name, keyword, then alias.
    fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        let name = name
            .strip_suffix(" setting")
            .unwrap_or(&name)
            .to_string();
        let snake = name.replace(' ', "_");
        let settings = &self.settings;

        settings
            .iter()
            .position(|s| s.def.id == name || s.def.id == snake)
            .or_else(|| settings.iter().position(|s| s.def.name.to_lowercase() == name))
            .or_else(|| settings.iter().position(|s| s.def.name.to_lowercase().contains(&name)))
            .or_else(|| {
                settings
                    .iter()
                    .position(|s| s.def.keywords.iter().any(|k| k.contains(name.as_str())))
            })
            .or_else(|| {
                ALIASES
                    .iter()
                    .filter(|(_, aliases)| {
                        aliases.contains(&name.as_str()) || aliases.iter().any(|a| name.contains(a))
                    })
                    .find_map(|(term, _)| {
                        settings.iter().position(|s| {
                            s.def.name.to_lowercase().contains(term)
                                || s.def.keywords.contains(term)
                        })
                    })
            })
    }

    fn suggestions(&self, name: &str) -> Vec<String> {
        fuzzy::suggest(name, self.settings.iter(), |s| s.def.name, 0.3, 3)
            .into_iter()
            .map(|s| format!("{} ({})", s.def.name, s.def.category.as_str()))
            .collect()
    }

    /// Weighted search: name 10, keyword 8, id 7, description 5, category 3.
    fn search(&self, query: &str) -> Vec<&Setting> {
        let query = query.trim().to_lowercase();
        let mut scored: Vec<(u32, &Setting)> = self
            .settings
            .iter()
            .map(|s| {
                let mut score = 0;
                if s.def.name.to_lowercase().contains(&query) {
                    score += 10;
                }
                if s.def.description.to_lowercase().contains(&query) {
                    score += 5;
                }
                if s.def.keywords.iter().any(|k| k.contains(query.as_str())) {
                    score += 8;
                }
                if s.def.category.as_str().contains(&query) {
                    score += 3;
                }
                if s.def.id.contains(&query) {
                    score += 7;
                }
                (score, s)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, s)| s).collect()
    }

    fn snapshot(&self) -> SettingsFile {
        SettingsFile {
            settings: self
                .settings
                .iter()
                .map(|s| (s.def.id.to_string(), s.stored()))
                .collect(),
            backup_history: self.backup_history.clone(),
            last_save: Local::now().timestamp(),
        }
    }

    /// Apply stored values that fit their definitions. Returns (applied, rejected).
    fn apply_stored(&mut self, stored: &BTreeMap<String, StoredSetting>) -> (usize, usize) {
        let (mut applied, mut rejected) = (0, 0);
        for (id, entry) in stored {
            let Some(index) = self.position(id) else {
                continue;
            };
            let setting = &mut self.settings[index];
            if setting.def.accepts(&entry.current_value) {
                setting.value = entry.current_value.clone();
                setting.last_modified = entry.last_modified;
                setting.modified_by = entry.modified_by.clone();
                applied += 1;
            } else {
                tracing::warn!(setting = %id, "ignoring stored value of the wrong type");
                rejected += 1;
            }
        }
        (applied, rejected)
    }
}

pub struct SettingsManager {
    engine: IntentEngine<SettingsIntent>,
    store: JsonStore<SettingsFile>,
    backups_dir: PathBuf,
    registry: RwLock<Registry>,
}

impl SettingsManager {
    /// Build the catalogue and apply `settings/settings.json` when present.
    pub async fn new(layout: &StorageLayout, policy: MatchPolicy) -> ShellResult<Self> {
        let normalizer = Normalizer::new(FILLERS, FillerStyle::WordBoundary)?;
        let engine = IntentEngine::new(normalizer, pattern_table()?, context_rules())
            .with_policy(policy);
        let settings = core_catalogue(layout.root())
            .into_iter()
            .map(|def| Setting {
                value: def.default.clone(),
                def,
                last_modified: 0,
                modified_by: system_actor(),
            })
            .collect();
        let mut registry = Registry {
            settings,
            backup_history: Vec::new(),
        };

        let store: JsonStore<SettingsFile> = layout.store("settings", "settings.json");
        let saved = store.load().await;
        let (applied, _) = registry.apply_stored(&saved.settings);
        registry.backup_history = saved.backup_history;
        tracing::debug!(applied, "settings loaded");

        Ok(Self {
            engine,
            store,
            backups_dir: layout.component_dir("settings").join("backups"),
            registry: RwLock::new(registry),
        })
    }

    /// Current value of a setting by id.
    pub fn value(&self, id: &str) -> Option<Value> {
        let registry = self.registry.read();
        registry.position(id).map(|i| registry.settings[i].value.clone())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.registry.read().settings.iter().map(|s| s.def.id).collect()
    }

    /// Validate `raw` for setting `id`, store it and persist.
    pub async fn set_value(&self, id: &str, raw: &str, by: &str) -> ShellResult<Value> {
        let value = {
            let mut registry = self.registry.write();
            let index = registry
                .position(id)
                .ok_or_else(|| ShellError::not_found("setting", id))?;
            let value = registry.settings[index].def.validate(raw)?;
            registry.settings[index].assign(value.clone(), by);
            value
        };
        self.save().await?;
        Ok(value)
    }

    async fn save(&self) -> ShellResult<()> {
        let snapshot = self.registry.read().snapshot();
        self.store.save(&snapshot).await?;
        tracing::info!(settings = snapshot.settings.len(), "settings saved");
        Ok(())
    }

    fn not_found(&self, name: &str) -> ShellError {
        ShellError::not_found_with("setting", name, self.registry.read().suggestions(name))
    }

    fn get(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok(
                "⚙️ **Please specify which setting to check**\n\n\
                 **Examples:** theme setting, current wallpaper, AI learning setting"
                    .to_string(),
            );
        };
        let registry = self.registry.read();
        let index = registry.find(target).ok_or_else(|| {
            ShellError::not_found_with("setting", target, registry.suggestions(target))
        })?;
        let setting = &registry.settings[index];
        let mut out = format!(
            "⚙️ **{}:** {}\n   └─ Category: {}\n   └─ Description: {}",
            setting.def.name,
            setting.display(),
            setting.def.category.label(),
            setting.def.description
        );
        if setting.last_modified > 0 {
            if let Some(when) = chrono::DateTime::from_timestamp(setting.last_modified, 0) {
                out.push_str(&format!(
                    "\n   └─ Last modified: {} by {}",
                    when.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    setting.modified_by
                ));
            }
        }
        if setting.def.requires_restart {
            out.push_str("\n   └─ ⚠️ Requires restart to take effect");
        }
        Ok(out)
    }

    async fn set(&self, matched: &IntentMatch<SettingsIntent>) -> ShellResult<String> {
        let (Some(name), Some(raw)) = (matched.entities.group(0), matched.entities.group(1)) else {
            return Ok(
                "⚙️ **Please specify setting name and value**\n\n\
                 **Examples:** set theme to dark, change font size to 125%, turn large text on"
                    .to_string(),
            );
        };
        let reply = {
            let mut registry = self.registry.write();
            let index = registry.find(name).ok_or_else(|| {
                ShellError::not_found_with("setting", name, registry.suggestions(name))
            })?;
            let setting = &mut registry.settings[index];
            let value = setting.def.validate(raw)?;
            let previous = setting.assign(value.clone(), "user");
            tracing::info!(setting = setting.def.id, "setting updated");

            let mut out = format!("✅ **Updated {}:** {}", setting.def.name, setting.display());
            if previous != value {
                out.push_str(&format!("\n   └─ Previous value: {}", setting.def.format(&previous)));
            }
            if setting.def.requires_restart {
                out.push_str("\n   └─ ⚠️ Restart required to apply changes");
            }
            out
        };
        self.save().await?;
        Ok(reply)
    }

    async fn reset(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok(
                "🔄 **Please specify which setting to reset**\n\n\
                 **Examples:** reset theme setting, restore default wallpaper"
                    .to_string(),
            );
        };
        let reply = {
            let mut registry = self.registry.write();
            let index = registry.find(target).ok_or_else(|| {
                ShellError::not_found_with("setting", target, registry.suggestions(target))
            })?;
            let setting = &mut registry.settings[index];
            let default = setting.def.default.clone();
            let previous = setting.assign(default.clone(), "system");

            let mut out = format!(
                "🔄 **Reset {} to default:** {}",
                setting.def.name,
                setting.display()
            );
            if previous != default {
                out.push_str(&format!("\n   └─ Previous value: {}", setting.def.format(&previous)));
            }
            if setting.def.requires_restart {
                out.push_str("\n   └─ ⚠️ Restart required to apply changes");
            }
            out
        };
        self.save().await?;
        Ok(reply)
    }

    fn list_all(&self) -> String {
        let registry = self.registry.read();
        let mut out = "⚙️ **PersonalAIOS Settings Overview**\n\n".to_string();
        let mut categories = 0;
        for category in SettingCategory::ALL {
            let members: Vec<&Setting> = registry
                .settings
                .iter()
                .filter(|s| s.def.category == category)
                .collect();
            if members.is_empty() {
                continue;
            }
            categories += 1;
            out.push_str(&format!("**{} ({} settings):**\n", category.label(), members.len()));
            for setting in members.iter().take(PER_CATEGORY) {
                out.push_str(&format!("• {}: {}\n", setting.def.name, setting.display()));
            }
            if members.len() > PER_CATEGORY {
                out.push_str(&format!("  ... and {} more\n", members.len() - PER_CATEGORY));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "**Total Settings:** {}\n**Categories:** {}",
            registry.settings.len(),
            categories
        ));
        out
    }

    fn list_category(&self, category: SettingCategory) -> String {
        let registry = self.registry.read();
        let members: Vec<&Setting> = registry
            .settings
            .iter()
            .filter(|s| s.def.category == category)
            .collect();
        if members.is_empty() {
            return format!("📂 **No settings found in category:** {}", category.as_str());
        }
        let mut out = format!(
            "📂 **{} Settings** ({} total):\n\n",
            category.label(),
            members.len()
        );
        for setting in members {
            out.push_str(&format!(
                "{} **{}:** {}\n   └─ {}\n",
                setting.def.priority.icon(),
                setting.def.name,
                setting.display(),
                setting.def.description
            ));
            if setting.def.requires_restart {
                out.push_str("   └─ ⚠️ Requires restart\n");
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    fn list(&self, target: Option<&str>) -> String {
        let target = match target {
            None | Some("all" | "everything") => return self.list_all(),
            Some(target) => target,
        };
        if let Some(category) = SettingCategory::find(target) {
            return self.list_category(category);
        }
        let registry = self.registry.read();
        let matching = registry.search(target);
        if matching.is_empty() {
            return format!("🔍 **No settings found matching:** '{}'", target);
        }
        let mut out = format!("⚙️ **Settings matching '{}':**\n\n", target);
        for setting in matching.iter().take(LIST_LIMIT) {
            out.push_str(&format!(
                "• **{}:** {}\n  └─ {}\n",
                setting.def.name,
                setting.display(),
                setting.def.description
            ));
        }
        if matching.len() > LIST_LIMIT {
            out.push_str(&format!(
                "\n*(Showing first {} of {} settings)*",
                LIST_LIMIT,
                matching.len()
            ));
        }
        out.trim_end().to_string()
    }

    fn search(&self, query: Option<&str>) -> String {
        let Some(query) = query else {
            return "🔍 **Please specify what to search for**\n\n\
                    **Examples:** find theme settings, search for privacy options"
                .to_string();
        };
        let registry = self.registry.read();
        let results = registry.search(query);
        if results.is_empty() {
            return format!(
                "🔍 **No settings found for:** '{}'\n\nTry different keywords or check spelling.",
                query
            );
        }

        let mut groups: Vec<(SettingCategory, Vec<&Setting>)> = Vec::new();
        for setting in &results {
            match groups.iter_mut().find(|(c, _)| *c == setting.def.category) {
                Some((_, members)) => members.push(setting),
                None => groups.push((setting.def.category, vec![setting])),
            }
        }

        let mut out = format!("🔍 **Found {} setting(s) for '{}':**\n\n", results.len(), query);
        for (category, members) in groups {
            out.push_str(&format!("**{}:**\n", category.label()));
            for setting in members.iter().take(PER_CATEGORY) {
                out.push_str(&format!("• {}: {}\n", setting.def.name, setting.display()));
            }
            if members.len() > PER_CATEGORY {
                out.push_str(&format!("  ... and {} more\n", members.len() - PER_CATEGORY));
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    /// Write every current value to a timestamped file under `backups/`.
    pub async fn backup(&self) -> ShellResult<PathBuf> {
        let now = Local::now();
        let name = format!("{}{}.json", BACKUP_PREFIX, now.format("%Y%m%d_%H%M%S"));
        let path = self.backups_dir.join(&name);
        let settings = self.registry.read().snapshot().settings;
        let file = BackupFile {
            backup_info: BackupInfo {
                timestamp: now.timestamp(),
                date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
                version: "1.0".to_string(),
                total_settings: settings.len(),
            },
            settings,
        };
        JsonStore::new(&path).save(&file).await?;

        {
            let mut registry = self.registry.write();
            registry.backup_history.push(BackupRecord {
                timestamp: now.timestamp(),
                file: path.to_string_lossy().to_string(),
                settings_count: file.settings.len(),
            });
            if registry.backup_history.len() > BACKUP_HISTORY_LIMIT {
                let excess = registry.backup_history.len() - BACKUP_HISTORY_LIMIT;
                registry.backup_history.drain(..excess);
            }
        }
        self.save().await?;
        tracing::info!(path = %path.display(), "settings backup written");
        Ok(path)
    }

    /// Newest backup file by its timestamped name.
    pub async fn latest_backup(&self) -> ShellResult<Option<PathBuf>> {
        let mut reader = match tokio::fs::read_dir(&self.backups_dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut latest: Option<PathBuf> = None;
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                let path = entry.path();
                if latest.as_ref().map_or(true, |current| path > *current) {
                    latest = Some(path);
                }
            }
        }
        Ok(latest)
    }

    async fn restore(&self) -> ShellResult<String> {
        let Some(path) = self.latest_backup().await? else {
            return Ok(
                "📂 **No backups found**\n\nCreate a backup first using 'backup settings'"
                    .to_string(),
            );
        };
        let backup: BackupFile = JsonStore::new(&path).try_load().await?;
        let (restored, failed) = self.registry.write().apply_stored(&backup.settings);
        self.save().await?;
        tracing::info!(restored, failed, "settings restored from backup");

        let date = if backup.backup_info.date.is_empty() {
            "unknown".to_string()
        } else {
            backup.backup_info.date
        };
        let mut out = format!(
            "📂 **Settings restored from backup**\n   └─ Backup date: {}\n   └─ Restored: {} settings",
            date, restored
        );
        if failed > 0 {
            out.push_str(&format!("\n   └─ Failed: {} settings", failed));
        }
        out.push_str("\n\n⚠️ **Restart PersonalAIOS** to apply all changes");
        Ok(out)
    }

    fn category(&self, target: Option<&str>) -> String {
        let Some(target) = target else {
            return "📂 **Please specify a settings category**\n\n\
                    **Available categories:** appearance, system, privacy, accessibility, sound, \
                    personalaios"
                .to_string();
        };
        match SettingCategory::find(target) {
            Some(category) => self.list_category(category),
            None => {
                let available: Vec<&str> =
                    SettingCategory::ALL.iter().map(|c| c.as_str()).collect();
                format!(
                    "📂 **Category not found:** '{}'\n\n**Available categories:** {}",
                    target,
                    available.join(", ")
                )
            }
        }
    }

    fn info(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok("ℹ️ **Please specify which setting you need info about**".to_string());
        };
        let registry = self.registry.read();
        let index = registry.find(target).ok_or_else(|| {
            ShellError::not_found_with("setting", target, registry.suggestions(target))
        })?;
        let setting = &registry.settings[index];
        let def = &setting.def;
        let mut out = format!(
            "ℹ️ **Setting Information: {}**\n\n**Current Value:** {}\n**Default Value:** {}\n\
             **Category:** {}\n**Type:** {}\n**Priority:** {}\n**Description:** {}\n",
            def.name,
            setting.display(),
            def.format(&def.default),
            def.category.label(),
            def.kind.label(),
            def.priority.label(),
            def.description
        );
        if !def.choices.is_empty() {
            out.push_str(&format!("**Available Choices:** {}\n", def.choices.join(", ")));
        }
        match (def.min, def.max) {
            (Some(min), Some(max)) => {
                out.push_str(&format!("**Range:** min {} max {}\n", min, max))
            }
            (Some(min), None) => out.push_str(&format!("**Range:** min {}\n", min)),
            (None, Some(max)) => out.push_str(&format!("**Range:** max {}\n", max)),
            (None, None) => {}
        }
        if def.requires_restart {
            out.push_str("**⚠️ Requires Restart:** Yes\n");
        }
        if !def.keywords.is_empty() {
            out.push_str(&format!("**Keywords:** {}\n", def.keywords.join(", ")));
        }
        Ok(out.trim_end().to_string())
    }

    async fn apply_profile(&self, target: Option<&str>) -> ShellResult<String> {
        let Some(target) = target else {
            return Ok(
                "🎭 **Please specify which profile to apply**\n\n\
                 **Examples:** apply dark mode profile, use performance profile"
                    .to_string(),
            );
        };
        let wanted = target.trim().to_lowercase().replace(' ', "_");
        let profiles = profiles();
        let Some((key, values)) = profiles
            .iter()
            .find(|(key, _)| *key == wanted)
            .or_else(|| {
                profiles
                    .iter()
                    .find(|(key, _)| key.contains(wanted.as_str()) || wanted.contains(key))
            })
        else {
            let available: Vec<&str> = profiles.iter().map(|(key, _)| *key).collect();
            return Ok(format!(
                "🎭 **Profile not found:** '{}'\n\n**Available profiles:** {}",
                target,
                available.join(", ")
            ));
        };

        let (applied, failed) = {
            let mut registry = self.registry.write();
            let actor = format!("profile:{}", key);
            let (mut applied, mut failed) = (0, 0);
            for (id, value) in values {
                match registry.position(id) {
                    Some(index) if registry.settings[index].def.accepts(value) => {
                        registry.settings[index].assign(value.clone(), &actor);
                        applied += 1;
                    }
                    _ => failed += 1,
                }
            }
            (applied, failed)
        };
        self.save().await?;
        tracing::info!(profile = key, applied, "settings profile applied");

        let title: Vec<String> = key
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars
                    .next()
                    .map(|c| c.to_uppercase().chain(chars).collect())
                    .unwrap_or_default()
            })
            .collect();
        let mut out = format!(
            "🎭 **Applied {} profile**\n   └─ Settings applied: {}",
            title.join(" "),
            applied
        );
        if failed > 0 {
            out.push_str(&format!("\n   └─ Failed: {} settings", failed));
        }
        Ok(out)
    }
}

#[async_trait]
impl IntentHandler for SettingsManager {
    type Intent = SettingsIntent;
    const NAME: &'static str = "settings";
    const TITLE: &'static str = "settings management";

    fn engine(&self) -> &IntentEngine<SettingsIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<SettingsIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        let target = matched.entities.group(0);
        match matched.intent {
            SettingsIntent::Get => self.get(target),
            SettingsIntent::Set => self.set(matched).await,
            SettingsIntent::Reset => self.reset(target).await,
            SettingsIntent::List => Ok(self.list(target)),
            SettingsIntent::Search => Ok(self.search(target)),
            SettingsIntent::Backup => {
                let path = self.backup().await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                Ok(format!(
                    "💾 **Settings backup created:** {}\n   └─ Location: {}\n   └─ Settings saved: {}",
                    name,
                    path.display(),
                    self.registry.read().settings.len()
                ))
            }
            SettingsIntent::Restore => self.restore().await,
            SettingsIntent::Category => Ok(self.category(target)),
            SettingsIntent::Info => self.info(target),
            SettingsIntent::ApplyProfile => self.apply_profile(target).await,
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "⚙️ **Try these natural language settings commands:**",
            &[
                (
                    "Get Settings",
                    &["theme setting", "current wallpaper setting", "AI learning setting"],
                ),
                (
                    "Change Settings",
                    &["set theme to dark", "turn large text on", "change font size to 125%"],
                ),
                (
                    "Settings Management",
                    &["list appearance settings", "search for privacy", "reset theme setting"],
                ),
                ("Backup & Restore", &["backup settings", "restore settings"]),
                ("Profiles", &["apply dark mode profile", "use accessibility profile"]),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personalaios_core::Component;

    async fn manager(dir: &Path) -> SettingsManager {
        SettingsManager::new(&StorageLayout::new(dir), MatchPolicy::BestMatch)
            .await
            .unwrap()
    }

    fn definition(id: &str) -> SettingDefinition {
        core_catalogue(Path::new("/tmp"))
            .into_iter()
            .find(|d| d.id == id)
            .unwrap()
    }

    #[test]
    fn test_validation_per_type() {
        let large_text = definition("large_text");
        assert_eq!(large_text.validate("Yes").unwrap(), json!(true));
        assert_eq!(large_text.validate("off").unwrap(), json!(false));
        assert!(large_text.validate("maybe").is_err());

        let autosave = definition("auto_save_frequency");
        assert_eq!(autosave.validate("60").unwrap(), json!(60));
        assert!(autosave.validate("2").is_err());
        assert!(autosave.validate("sixty").is_err());

        let font = definition("font_size");
        assert_eq!(font.validate("1.5").unwrap(), json!(1.5));
        assert_eq!(font.validate("125%").unwrap(), json!(1.25));
        assert!(font.validate("10").is_err());

        let theme = definition("theme_mode");
        assert_eq!(theme.validate("DARK").unwrap(), json!("dark"));
        assert_eq!(theme.validate("li").unwrap(), json!("light"));
        let speed = definition("animation_speed");
        assert!(speed.validate("n").unwrap_err().to_string().contains("Ambiguous"));

        let accent = definition("accent_color");
        assert_eq!(accent.validate("#f00").unwrap(), json!("#f00"));
        assert!(accent.validate("#12345").is_err());
        assert!(accent.validate("red").is_err());

        let wallpaper = definition("wallpaper_path");
        assert!(wallpaper.validate("/definitely/not/here.jpg").is_err());
    }

    #[test]
    fn test_formatting() {
        let font = definition("font_size");
        assert_eq!(font.format(&json!(1.0)), "100%");
        assert_eq!(font.format(&json!(1.5)), "1.50");
        let large_text = definition("large_text");
        assert_eq!(large_text.format(&json!(true)), "✅ Enabled");
        let accent = definition("accent_color");
        assert_eq!(accent.format(&json!("#1c71d8")), "#1c71d8 🎨");
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(SettingCategory::find("appearance"), Some(SettingCategory::Appearance));
        assert_eq!(SettingCategory::find("search privacy"), Some(SettingCategory::Privacy));
        assert_eq!(SettingCategory::find("nothing"), None);
    }

    #[tokio::test]
    async fn test_set_theme_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;

        let reply = settings.process_command("set theme to dark").await;
        assert!(reply.starts_with("✅ **Updated Theme Mode:** dark"));
        assert!(reply.contains("Previous value: auto"));
        assert_eq!(settings.value("theme_mode"), Some(json!("dark")));

        let reloaded = manager(dir.path()).await;
        assert_eq!(reloaded.value("theme_mode"), Some(json!("dark")));

        let stored: SettingsFile = JsonStore::new(dir.path().join("settings/settings.json"))
            .load()
            .await;
        assert_eq!(stored.settings["theme_mode"].modified_by, "user");
    }

    #[tokio::test]
    async fn test_reload_reproduces_every_value() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;
        settings.process_command("apply accessibility profile").await;
        settings.set_value("accent_color", "#00ff00", "api").await.unwrap();

        let reloaded = manager(dir.path()).await;
        for id in settings.ids() {
            assert_eq!(settings.value(id), reloaded.value(id), "{}", id);
        }
    }

    #[tokio::test]
    async fn test_get_reset_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;

        let reply = settings.process_command("theme setting").await;
        assert!(reply.starts_with("⚙️ **Theme Mode:** auto"));
        assert!(reply.contains("Category: Appearance"));

        settings.process_command("set theme to light").await;
        let reply = settings.process_command("reset theme setting").await;
        assert!(reply.starts_with("🔄 **Reset Theme Mode to default:** auto"));

        let reply = settings.process_command("set theme to purple").await;
        assert!(reply.starts_with("❌ **Invalid input:** Invalid choice 'purple'"));

        let reply = settings.process_command("set zzqq to 3").await;
        assert!(reply.starts_with("🔍 **Setting not found:** 'zzqq'"));
    }

    #[tokio::test]
    async fn test_alias_and_boolean_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;

        let reply = settings.process_command("background setting").await;
        assert!(reply.starts_with("⚙️ **Wallpaper:**"));

        let reply = settings.process_command("turn large text on").await;
        assert!(reply.starts_with("✅ **Updated Large Text:** ✅ Enabled"));
        assert_eq!(settings.value("large_text"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_list_search_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;

        let reply = settings.process_command("list appearance settings").await;
        assert!(reply.starts_with("📂 **Appearance Settings** (4 total)"));

        let reply = settings.process_command("list all settings").await;
        assert!(reply.contains("**Total Settings:** 16"));

        let reply = settings.process_command("search for privacy").await;
        assert!(reply.starts_with("🔍 **Found 2 setting(s) for 'privacy'"));

        let reply = settings.process_command("info about theme mode setting").await;
        assert!(reply.contains("**Available Choices:** auto, light, dark"));
    }

    #[tokio::test]
    async fn test_backup_and_restore_latest() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;

        let reply = settings.process_command("restore settings").await;
        assert!(reply.starts_with("📂 **No backups found**"));

        settings.process_command("set theme to dark").await;
        let reply = settings.process_command("backup settings").await;
        assert!(reply.starts_with("💾 **Settings backup created:** personalaios_settings_backup_"));

        settings.process_command("set theme to light").await;
        let reply = settings.process_command("restore settings").await;
        assert!(reply.starts_with("📂 **Settings restored from backup**"));
        assert!(reply.contains("Restored: 16 settings"));
        assert_eq!(settings.value("theme_mode"), Some(json!("dark")));

        let stored: SettingsFile = JsonStore::new(dir.path().join("settings/settings.json"))
            .load()
            .await;
        assert_eq!(stored.backup_history.len(), 1);
    }

    #[tokio::test]
    async fn test_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let settings = manager(dir.path()).await;

        let reply = settings.process_command("apply dark mode profile").await;
        assert_eq!(reply, "🎭 **Applied Dark Mode profile**\n   └─ Settings applied: 3");
        assert_eq!(settings.value("theme_mode"), Some(json!("dark")));

        let reply = settings.process_command("use privacy profile").await;
        assert!(reply.starts_with("🎭 **Applied Privacy Focused profile**"));

        let reply = settings.process_command("apply gaming profile").await;
        assert!(reply.starts_with("🎭 **Profile not found:** 'gaming'"));
    }

    #[tokio::test]
    async fn test_corrupt_store_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings/settings.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        let settings = manager(dir.path()).await;
        assert_eq!(settings.value("theme_mode"), Some(json!("auto")));

        std::fs::write(
            &path,
            r#"{"settings":{"theme_mode":{"current_value":42},"large_text":{"current_value":true}}}"#,
        )
        .unwrap();
        let settings = manager(dir.path()).await;
        assert_eq!(settings.value("theme_mode"), Some(json!("auto")));
        assert_eq!(settings.value("large_text"), Some(json!(true)));
    }
}
