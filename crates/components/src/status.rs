//! System status indicators: network, power, audio, radios and load.

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use personalaios_core::format::help_text;
use personalaios_core::{
    ContextRules, FillerStyle, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy,
    Normalizer, PatternTable, ShellError, ShellResult,
};
use personalaios_executor::{
    BatteryInfo, Desktop, ExecutorError, NetworkState, SystemControl, SystemSnapshot, Urgency,
    VolumeState,
};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

const FILLERS: &[&str] = &["please", "can you", "would you", "could you"];
const DEFAULT_CONNECTIVITY_TARGET: &str = "8.8.8.8:53";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const VOLUME_STEP: i16 = 10;
const BATTERY_LOW: u32 = 20;
const BATTERY_CRITICAL: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusIntent {
    StatusQuery,
    ToggleIndicator,
    SystemAction,
    PowerControl,
    NetworkControl,
    VolumeControl,
    OverallStatus,
}

impl Intent for StatusIntent {
    fn as_str(&self) -> &'static str {
        match self {
            StatusIntent::StatusQuery => "status_query",
            StatusIntent::ToggleIndicator => "toggle_indicator",
            StatusIntent::SystemAction => "system_action",
            StatusIntent::PowerControl => "power_control",
            StatusIntent::NetworkControl => "network_control",
            StatusIntent::VolumeControl => "volume_control",
            StatusIntent::OverallStatus => "overall_status",
        }
    }
}

fn pattern_table() -> Result<PatternTable<StatusIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            StatusIntent::StatusQuery,
            &[
                r"(?:what is|show me|check) (?:the )?(.+?) (?:status|level)\??$",
                r"(?:how is|what's) (?:the |my )(.+?)(?: doing| status)?\??$",
                r"^(.+?) (?:info|information|details|status|level|usage)$",
                r"(?:tell me about|show) (?:the |my )(.+)$",
                r"^(?:is )?(?:the |my )?(.+?) (?:okay|working|connected|on)\??$",
                r"^(?:how much )?(?:disk|storage) space(?: left| free)?\??$",
            ],
        )
        .intent(
            StatusIntent::ToggleIndicator,
            &[
                r"(?:toggle|switch) (?:the )?(.+?) (?:indicator|display)$",
                r"(?:show|hide|display) (?:the )?(.+?) (?:indicator|icon)$",
                r"(?:turn (?:on|off)|enable|disable) (?:the )?(.+?) (?:indicator|display)$",
            ],
        )
        .intent(
            StatusIntent::SystemAction,
            &[
                r"(?:set|change) (volume|brightness) to (\d+)(?:%| percent)?$",
                r"^(?:turn (?:on|off)|enable|disable) (?:the )?(wifi|wi-fi|bluetooth)$",
                r"^turn (?:the )?(wifi|wi-fi|bluetooth) (?:on|off)$",
            ],
        )
        .intent(
            StatusIntent::PowerControl,
            &[
                r"(?:battery|power) (?:info|information|status|level)",
                r"(?:how much|what's the) battery (?:left|remaining)",
                r"(?:is (?:the )?)?(?:power|battery|charging) (?:okay|good|low)",
                r"(?:battery|power) (?:left|remaining|health)",
            ],
        )
        .intent(
            StatusIntent::NetworkControl,
            &[
                r"(?:network|wifi|internet) (?:status|info|connection)",
                r"(?:am i|are we) (?:connected|online)",
                r"(?:what|which) network (?:am i on|am i connected to|is connected)",
                r"^is (?:the )?(?:wifi|internet|network) (?:connected|working|on)\??$",
            ],
        )
        .intent(
            StatusIntent::VolumeControl,
            &[
                r"(?:volume|audio|sound) (?:level|status|info)",
                r"(?:what's the|show me the) (?:current )?volume",
                r"(mute|unmute)(?: the)? (?:volume|audio|sound)",
                r"(increase|decrease|raise|lower|turn up|turn down) (?:the )?volume",
            ],
        )
        .intent(
            StatusIntent::OverallStatus,
            &[
                r"(?:system|overall|general) (?:status|info|overview)",
                r"(?:how is|what's) (?:the )?(?:system|computer) (?:doing|status)",
                r"(?:show me|display) (?:all )?(?:system )?(?:status|indicators)",
                r"(?:status|system) (?:overview|summary|dashboard)",
            ],
        )
        .build()
}

fn context_rules() -> ContextRules {
    ContextRules::new()
        .rule("urgency", &[("high", &["urgent", "critical", "emergency", "asap"])])
        .rule(
            "category",
            &[
                ("network", &["network", "internet", "wifi", "ethernet", "connection"]),
                ("power", &["battery", "power", "charging", "energy"]),
                ("audio", &["volume", "sound", "audio", "speaker"]),
                ("performance", &["cpu", "memory", "ram", "performance", "speed"]),
                ("storage", &["disk", "storage", "space", "drive"]),
            ],
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Network,
    Power,
    Volume,
    Bluetooth,
    Security,
    Storage,
    Performance,
}

impl IndicatorType {
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorType::Network => "Network",
            IndicatorType::Power => "Power",
            IndicatorType::Volume => "Volume",
            IndicatorType::Bluetooth => "Bluetooth",
            IndicatorType::Security => "Security",
            IndicatorType::Storage => "Storage",
            IndicatorType::Performance => "Performance",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            IndicatorType::Network => "🌐",
            IndicatorType::Power => "🔋",
            IndicatorType::Volume => "🔊",
            IndicatorType::Bluetooth => "📶",
            IndicatorType::Security => "🔒",
            IndicatorType::Storage => "💾",
            IndicatorType::Performance => "⚡",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            IndicatorType::Network => &["network", "internet", "wifi", "ethernet"],
            IndicatorType::Power => &["power", "battery", "charging"],
            IndicatorType::Volume => &["audio", "volume", "sound"],
            IndicatorType::Performance => &["cpu", "memory", "ram", "performance"],
            IndicatorType::Storage => &["disk", "storage", "space", "drive"],
            IndicatorType::Bluetooth | IndicatorType::Security => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPriority {
    /// Always shown.
    Critical,
    High,
    Normal,
    /// Only in the expanded view.
    Low,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Level(u32),
    Text(String),
}

impl fmt::Display for IndicatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorValue::Level(n) => write!(f, "{}", n),
            IndicatorValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Indicator {
    pub id: &'static str,
    pub kind: IndicatorType,
    pub name: &'static str,
    pub description: &'static str,
    pub priority: IndicatorPriority,
    pub visible: bool,
    pub active: bool,
    pub value: Option<IndicatorValue>,
    pub unit: Option<&'static str>,
    /// `normal`, `charging`, `discharging`, `full` or `muted`.
    pub status: String,
    pub tooltip: Option<String>,
    pub alert_threshold: Option<u32>,
    pub last_updated: i64,
    /// Visibility chosen by the user, overriding automatic hiding.
    pub pinned: Option<bool>,
}

impl Indicator {
    fn new(
        id: &'static str,
        kind: IndicatorType,
        name: &'static str,
        description: &'static str,
        priority: IndicatorPriority,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            description,
            priority,
            visible: true,
            active: false,
            value: None,
            unit: None,
            status: "normal".to_string(),
            tooltip: None,
            alert_threshold: None,
            last_updated: 0,
            pinned: None,
        }
    }

    fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    fn threshold(mut self, threshold: u32) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }

    fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn level(&self) -> Option<u32> {
        match self.value {
            Some(IndicatorValue::Level(n)) => Some(n),
            _ => None,
        }
    }

    fn display_value(&self) -> Option<String> {
        self.value
            .as_ref()
            .map(|v| format!("{}{}", v, self.unit.unwrap_or_default()))
    }

    fn healthy(&self) -> bool {
        if self.status == "muted" {
            return false;
        }
        match (self.level(), self.alert_threshold) {
            (Some(level), Some(threshold)) if self.id == "battery" => level > threshold,
            (Some(level), Some(threshold)) => level < threshold,
            _ => true,
        }
    }
}

fn default_indicators() -> Vec<Indicator> {
    use IndicatorPriority::*;
    use IndicatorType::*;
    vec![
        Indicator::new("wifi", Network, "Wi-Fi", "Wireless network connection", High),
        Indicator::new("ethernet", Network, "Ethernet", "Wired network connection", Normal)
            .hidden(),
        Indicator::new("battery", Power, "Battery", "Battery level and status", Critical)
            .unit("%")
            .threshold(BATTERY_LOW),
        Indicator::new("power", Power, "Power", "Power profile and AC adapter", Normal),
        Indicator::new("volume", Volume, "Volume", "Audio output level", High).unit("%"),
        Indicator::new("bluetooth", Bluetooth, "Bluetooth", "Bluetooth connectivity", Normal)
            .hidden(),
        Indicator::new("cpu", Performance, "CPU", "Processor usage", Low)
            .unit("%")
            .threshold(80),
        Indicator::new("memory", Performance, "Memory", "RAM usage", Low)
            .unit("%")
            .threshold(85),
        Indicator::new("storage", Storage, "Storage", "Disk usage", Low)
            .unit("%")
            .threshold(90),
        Indicator::new("vpn", Security, "VPN", "VPN connection status", High).hidden(),
    ]
}

/// Everything one refresh reads from the machine.
#[derive(Debug, Clone, Default)]
pub struct StatusSample {
    pub network: NetworkState,
    pub wifi_signal: Option<u8>,
    pub wifi_ssid: Option<String>,
    pub battery: Option<BatteryInfo>,
    pub on_ac: bool,
    pub volume: Option<VolumeState>,
    pub bluetooth: bool,
    pub system: SystemSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAlert {
    pub critical: bool,
    pub title: String,
    pub message: String,
}

struct StatusState {
    indicators: Vec<Indicator>,
    system: SystemSnapshot,
    network: NetworkState,
    ssid: Option<String>,
    refreshed_at: i64,
    alerted: HashSet<String>,
}

impl StatusState {
    fn get(&self, id: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Indicator> {
        self.indicators.iter_mut().find(|i| i.id == id)
    }

    /// Id, exact name, partial name, description, then type keywords.
    fn find(&self, name: &str) -> Option<&Indicator> {
        let name = name.trim().to_lowercase();
        let all = || self.indicators.iter();
        all()
            .find(|i| i.id == name)
            .or_else(|| all().find(|i| i.name.to_lowercase() == name))
            .or_else(|| all().find(|i| i.name.to_lowercase().contains(&name)))
            .or_else(|| all().find(|i| i.description.to_lowercase().contains(&name)))
            .or_else(|| all().find(|i| i.kind.keywords().iter().any(|k| name.contains(k))))
    }

    fn not_found(&self, name: &str) -> ShellError {
        let ids = self.indicators.iter().map(|i| i.id.to_string()).collect();
        ShellError::not_found_with("status indicator", name, ids)
    }

    fn apply(&mut self, sample: StatusSample, now: i64, auto_hide: bool) {
        let network = &sample.network;

        if let Some(wifi) = self.get_mut("wifi") {
            let connected = network.wifi_connected();
            wifi.active = connected;
            wifi.visible = connected;
            wifi.value = sample
                .wifi_signal
                .filter(|_| connected)
                .map(|s| IndicatorValue::Level(s as u32));
            wifi.unit = wifi.value.as_ref().map(|_| "%");
            wifi.tooltip = connected.then(|| match &sample.wifi_ssid {
                Some(ssid) => format!("Connected to Wi-Fi ({})", ssid),
                None => "Connected to Wi-Fi".to_string(),
            });
            wifi.last_updated = now;
        }
        if let Some(ethernet) = self.get_mut("ethernet") {
            let connected = network.ethernet_connected();
            ethernet.active = connected;
            ethernet.visible = connected;
            ethernet.value = connected.then(|| IndicatorValue::Text("Connected".to_string()));
            ethernet.tooltip = connected.then(|| "Connected via Ethernet".to_string());
            ethernet.last_updated = now;
        }

        match &sample.battery {
            Some(battery) => {
                let charging = battery.status == "Charging";
                if let Some(indicator) = self.get_mut("battery") {
                    indicator.active = true;
                    indicator.visible = true;
                    indicator.value = Some(IndicatorValue::Level(battery.percent as u32));
                    indicator.status = match battery.status.as_str() {
                        "Charging" => "charging",
                        "Full" => "full",
                        _ => "discharging",
                    }
                    .to_string();
                    indicator.tooltip = Some(if charging {
                        format!("Charging: {}%", battery.percent)
                    } else {
                        format!("Battery: {}%", battery.percent)
                    });
                    indicator.last_updated = now;
                }
                if let Some(power) = self.get_mut("power") {
                    power.active = true;
                    power.visible = true;
                    power.value = Some(IndicatorValue::Text(
                        if sample.on_ac { "AC" } else { "Battery" }.to_string(),
                    ));
                    power.last_updated = now;
                }
            }
            None => {
                if let Some(indicator) = self.get_mut("battery") {
                    indicator.active = false;
                    indicator.visible = false;
                    indicator.value = None;
                }
                if let Some(power) = self.get_mut("power") {
                    power.active = true;
                    power.visible = true;
                    power.value = Some(IndicatorValue::Text("AC Power".to_string()));
                    power.last_updated = now;
                }
            }
        }

        if let Some(indicator) = self.get_mut("volume") {
            match sample.volume {
                Some(volume) => {
                    indicator.active = true;
                    indicator.value = Some(IndicatorValue::Level(volume.percent as u32));
                    indicator.status = if volume.muted { "muted" } else { "normal" }.to_string();
                    indicator.tooltip = Some(if volume.muted {
                        "Audio muted".to_string()
                    } else {
                        format!("Volume: {}%", volume.percent)
                    });
                    indicator.last_updated = now;
                }
                None => {
                    indicator.active = false;
                    indicator.value = None;
                }
            }
        }

        if let Some(bluetooth) = self.get_mut("bluetooth") {
            bluetooth.active = sample.bluetooth;
            bluetooth.visible = sample.bluetooth;
            let tooltip = if sample.bluetooth {
                "Bluetooth enabled"
            } else {
                "Bluetooth disabled"
            };
            bluetooth.tooltip = Some(tooltip.to_string());
            bluetooth.last_updated = now;
        }

        let system = &sample.system;
        let load = [
            (
                "cpu",
                system.cpu_percent,
                format!("CPU Usage: {:.1}%", system.cpu_percent),
                50.0,
            ),
            (
                "memory",
                system.memory_percent(),
                format!(
                    "Memory: {:.1}% ({}GB / {}GB)",
                    system.memory_percent(),
                    system.memory_used_mb / 1024,
                    system.memory_total_mb / 1024
                ),
                70.0,
            ),
            (
                "storage",
                system.storage_percent(),
                format!(
                    "Storage: {:.1}% ({:.0}GB / {:.0}GB)",
                    system.storage_percent(),
                    system.storage_used_gb,
                    system.storage_total_gb
                ),
                80.0,
            ),
        ];
        for (id, percent, tooltip, show_above) in load {
            if let Some(indicator) = self.get_mut(id) {
                indicator.active = true;
                indicator.value = Some(IndicatorValue::Level(percent.round().max(0.0) as u32));
                indicator.tooltip = Some(tooltip);
                indicator.last_updated = now;
                if auto_hide {
                    indicator.visible = percent > show_above;
                }
            }
        }

        if let Some(vpn) = self.get_mut("vpn") {
            let active = network.vpn_active();
            vpn.active = active;
            vpn.visible = active;
            vpn.tooltip = active.then(|| format!("VPN connected ({})", network.vpn.join(", ")));
            vpn.last_updated = now;
        }

        for indicator in &mut self.indicators {
            if let Some(pinned) = indicator.pinned {
                indicator.visible = pinned;
            }
        }
        self.network = sample.network;
        self.ssid = sample.wifi_ssid;
        self.system = sample.system;
        self.refreshed_at = now;
    }

    fn alerts(&self) -> Vec<StatusAlert> {
        let mut alerts = Vec::new();
        if let Some(level) = self.get("battery").filter(|b| b.active).and_then(Indicator::level) {
            if level <= BATTERY_CRITICAL {
                alerts.push(StatusAlert {
                    critical: true,
                    title: "Critical Battery Level".to_string(),
                    message: format!("Battery at {}% - Connect charger immediately", level),
                });
            } else if level <= BATTERY_LOW {
                alerts.push(StatusAlert {
                    critical: false,
                    title: "Low Battery".to_string(),
                    message: format!("Battery at {}% - Consider charging soon", level),
                });
            }
        }
        let load = [
            ("cpu", "High CPU Usage", "CPU usage at {}%"),
            ("memory", "High Memory Usage", "Memory usage at {}%"),
            ("storage", "Low Storage Space", "Storage {}% full - Consider cleaning up files"),
        ];
        for (id, title, message) in load {
            let Some(indicator) = self.get(id) else { continue };
            if let (Some(level), Some(threshold)) = (indicator.level(), indicator.alert_threshold) {
                if level >= threshold {
                    alerts.push(StatusAlert {
                        critical: false,
                        title: title.to_string(),
                        message: message.replace("{}", &level.to_string()),
                    });
                }
            }
        }
        alerts
    }

    fn network_label(&self) -> &'static str {
        if self.get("wifi").is_some_and(|i| i.active) {
            "Wi-Fi Connected"
        } else if self.get("ethernet").is_some_and(|i| i.active) {
            "Ethernet Connected"
        } else {
            "Offline"
        }
    }
}

pub struct StatusArea {
    engine: IntentEngine<StatusIntent>,
    control: SystemControl,
    desktop: Desktop,
    connectivity_target: Option<String>,
    auto_hide: bool,
    state: Mutex<StatusState>,
}

impl StatusArea {
    pub fn new(control: SystemControl, desktop: Desktop, policy: MatchPolicy) -> ShellResult<Self> {
        let normalizer = Normalizer::new(FILLERS, FillerStyle::WordBoundary)?;
        let engine = IntentEngine::new(normalizer, pattern_table()?, context_rules())
            .with_policy(policy);
        Ok(Self {
            engine,
            control,
            desktop,
            connectivity_target: Some(DEFAULT_CONNECTIVITY_TARGET.to_string()),
            auto_hide: true,
            state: Mutex::new(StatusState {
                indicators: default_indicators(),
                system: SystemSnapshot::default(),
                network: NetworkState::default(),
                ssid: None,
                refreshed_at: 0,
                alerted: HashSet::new(),
            }),
        })
    }

    /// Address dialled to confirm internet access; `None` skips the check.
    pub fn with_connectivity_target(mut self, target: Option<String>) -> Self {
        self.connectivity_target = target;
        self
    }

    pub fn indicators(&self) -> Vec<Indicator> {
        self.state.lock().indicators.clone()
    }

    pub fn indicator(&self, id: &str) -> Option<Indicator> {
        self.state.lock().get(id).cloned()
    }

    pub fn visible_indicators(&self) -> Vec<Indicator> {
        self.state
            .lock()
            .indicators
            .iter()
            .filter(|i| i.visible)
            .cloned()
            .collect()
    }

    /// Indicators shown even in compact mode.
    pub fn critical_indicators(&self) -> Vec<Indicator> {
        self.state
            .lock()
            .indicators
            .iter()
            .filter(|i| i.visible && i.priority == IndicatorPriority::Critical)
            .cloned()
            .collect()
    }

    /// One-line panel text, e.g. `🔋 57% • 🌐 Wi-Fi Connected • 🔊 40%`.
    pub fn summary_line(&self) -> String {
        let state = self.state.lock();
        let mut parts = Vec::new();
        if let Some(level) = state
            .get("battery")
            .filter(|b| b.active)
            .and_then(|b| b.display_value())
        {
            parts.push(format!("🔋 {}", level));
        }
        parts.push(format!("🌐 {}", state.network_label()));
        if let Some(volume) = state.get("volume").filter(|v| v.active) {
            if volume.status == "muted" {
                parts.push("🔇 Muted".to_string());
            } else if let Some(level) = volume.display_value() {
                parts.push(format!("🔊 {}", level));
            }
        }
        parts.join(" • ")
    }

    /// Read every device source except the resource snapshot.
    pub async fn sample_devices(&self) -> StatusSample {
        let network = self.control.network().await;
        let (wifi_signal, wifi_ssid) = if network.wifi_connected() {
            (self.control.wifi_signal().await, self.control.wifi_ssid().await)
        } else {
            (None, None)
        };
        StatusSample {
            network,
            wifi_signal,
            wifi_ssid,
            battery: self.control.battery().await,
            on_ac: self.control.on_ac_power().await,
            volume: self.control.volume().await,
            bluetooth: self.control.bluetooth_powered().await,
            system: SystemSnapshot::default(),
        }
    }

    pub async fn refresh(&self) -> Vec<StatusAlert> {
        let mut sample = self.sample_devices().await;
        sample.system = SystemSnapshot::capture_async().await;
        self.update(sample).await
    }

    /// Apply a sample and notify alerts that were not already raised.
    /// Returns the newly raised alerts.
    pub async fn update(&self, sample: StatusSample) -> Vec<StatusAlert> {
        let raised = {
            let mut state = self.state.lock();
            state.apply(sample, Local::now().timestamp(), self.auto_hide);
            let alerts = state.alerts();
            let raised: Vec<StatusAlert> = alerts
                .iter()
                .filter(|a| !state.alerted.contains(&a.title))
                .cloned()
                .collect();
            state.alerted = alerts.into_iter().map(|a| a.title).collect();
            raised
        };
        for alert in &raised {
            let urgency = if alert.critical { Urgency::Critical } else { Urgency::Normal };
            if let Err(e) = self.desktop.notify(&alert.title, &alert.message, urgency).await {
                tracing::warn!(
                    alert = %alert.title,
                    error = %e,
                    "status alert notification failed"
                );
            }
        }
        raised
    }

    async fn ensure_fresh(&self) {
        if self.state.lock().refreshed_at == 0 {
            self.refresh().await;
        }
    }

    fn handle_status_query(&self, matched: &IntentMatch<StatusIntent>) -> ShellResult<String> {
        let target = matched.entities.group(0).unwrap_or(matched.text.as_str());
        let state = self.state.lock();
        let indicator = state.find(target).ok_or_else(|| state.not_found(target))?;
        if !indicator.active {
            return Ok(format!("📊 **{}:** Not currently active or available", indicator.name));
        }

        let mut out = format!("📊 **{} Status:**\n\n", indicator.name);
        if let Some(value) = indicator.display_value() {
            out.push_str(&format!("**Level:** {}\n", value));
        }
        out.push_str(&format!("**Status:** {}\n", title_case(&indicator.status)));
        if let Some(tooltip) = &indicator.tooltip {
            out.push_str(&format!("**Details:** {}\n", tooltip));
        }
        if indicator.last_updated > 0 {
            let age = (Local::now().timestamp() - indicator.last_updated).max(0);
            if age < 60 {
                out.push_str(&format!("**Last Updated:** {} seconds ago\n", age));
            } else {
                out.push_str(&format!("**Last Updated:** {} minutes ago\n", age / 60));
            }
        }

        if let Some(level) = indicator.level() {
            let note = match indicator.id {
                "battery" if level <= BATTERY_CRITICAL => Some("⚠️ **Critical battery level!**"),
                "battery" if level <= BATTERY_LOW => Some("🟡 **Low battery warning**"),
                "battery" if level >= 95 => Some("✅ **Battery fully charged**"),
                "wifi" if level >= 80 => Some("✅ **Excellent signal strength**"),
                "wifi" if level >= 60 => Some("🟢 **Good signal strength**"),
                "wifi" if level >= 40 => Some("🟡 **Fair signal strength**"),
                "wifi" => Some("🔴 **Weak signal strength**"),
                _ => None,
            };
            if let Some(note) = note {
                out.push('\n');
                out.push_str(note);
            }
        }
        Ok(out.trim_end().to_string())
    }

    fn handle_toggle(&self, matched: &IntentMatch<StatusIntent>) -> ShellResult<String> {
        let Some(target) = matched.entities.group(0) else {
            return Ok("📊 **Please specify which indicator to toggle**".to_string());
        };
        let text = matched.text.as_str();
        let shows = ["show", "display", "enable", "turn on"];
        let wanted = if shows.iter().any(|p| text.starts_with(p)) {
            Some(true)
        } else if ["hide", "disable", "turn off"].iter().any(|p| text.starts_with(p)) {
            Some(false)
        } else {
            None
        };

        let mut state = self.state.lock();
        let id = state.find(target).ok_or_else(|| state.not_found(target))?.id;
        let indicator = state
            .get_mut(id)
            .ok_or_else(|| ShellError::not_found("status indicator", target))?;
        let visible = wanted.unwrap_or(!indicator.visible);
        indicator.visible = visible;
        indicator.pinned = Some(visible);
        tracing::debug!(indicator = id, visible, "indicator visibility changed");
        Ok(format!(
            "👁️ **{} indicator {}**",
            indicator.name,
            if visible { "shown" } else { "hidden" }
        ))
    }

    async fn handle_system_action(
        &self,
        matched: &IntentMatch<StatusIntent>,
    ) -> ShellResult<String> {
        let Some(target) = matched.entities.group(0) else {
            return Ok("⚙️ **Please specify the system action to perform**".to_string());
        };

        if let Some(raw) = matched.entities.group(1) {
            let level: u8 = raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n <= 100)
                .map(|n| n as u8)
                .ok_or_else(|| ShellError::invalid(format!("Invalid {} value: {}", target, raw)))?;
            return match target {
                "volume" => {
                    self.control.set_volume(level).await.map_err(|e| {
                        tracing::warn!(error = %e, "setting volume failed");
                        ShellError::ToolUnavailable("Volume control not available".to_string())
                    })?;
                    if let Some(indicator) = self.state.lock().get_mut("volume") {
                        indicator.value = Some(IndicatorValue::Level(level as u32));
                    }
                    Ok(format!("🔊 **Volume set to {}%**", level))
                }
                _ => match self.control.set_brightness(level).await {
                    Ok(_) => Ok(format!("🔆 **Brightness set to {}%**", level)),
                    Err(ExecutorError::AllFailed(attempts))
                        if attempts.iter().any(|a| a.contains("ermission denied")) =>
                    {
                        Err(ShellError::refused(
                            "Permission denied - brightness control requires root access",
                        ))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "setting brightness failed");
                        Err(ShellError::ToolUnavailable(
                            "Brightness control not available".to_string(),
                        ))
                    }
                },
            };
        }

        let text = matched.text.as_str();
        let on = text.starts_with("enable") || text.starts_with("turn on") || text.ends_with(" on");
        let state = if on { "on" } else { "off" };
        if target == "bluetooth" {
            self.control.set_bluetooth(on).await?;
            Ok(format!("🔵 **Bluetooth turned {}**", state))
        } else {
            self.control.set_wifi(on).await?;
            Ok(format!("📶 **Wi-Fi turned {}**", state))
        }
    }

    fn handle_power(&self) -> String {
        let state = self.state.lock();
        let Some(battery) = state.get("battery").filter(|b| b.active) else {
            return "🔋 **Battery information not available**\n\n\
                    This appears to be a desktop system without battery."
                .to_string();
        };
        let mut out = "🔋 **Power Status:**\n\n".to_string();
        if let Some(level) = battery.level() {
            out.push_str(&format!("**Battery Level:** {}%\n", level));
        }
        out.push_str(&format!("**Status:** {}\n", title_case(&battery.status)));
        if let Some(source) = state.get("power").and_then(|p| p.value.as_ref()) {
            out.push_str(&format!("**Power Source:** {}\n", source));
        }
        match battery.level() {
            Some(level) if level <= BATTERY_CRITICAL => {
                out.push_str("\n⚠️ **Critical battery level - charge immediately!**")
            }
            Some(level) if level <= BATTERY_LOW => {
                out.push_str("\n🟡 **Low battery - consider charging soon**")
            }
            _ => {}
        }
        out.trim_end().to_string()
    }

    async fn handle_network(&self) -> String {
        let (mut out, connected) = {
            let state = self.state.lock();
            let mut out = "🌐 **Network Status:**\n\n".to_string();
            let mut connected = false;
            if let Some(wifi) = state.get("wifi").filter(|w| w.active) {
                connected = true;
                out.push_str("**Wi-Fi:** Connected");
                if let Some(signal) = wifi.level() {
                    out.push_str(&format!(" • Signal: {}%", signal));
                }
                out.push('\n');
                if let Some(ssid) = &state.ssid {
                    out.push_str(&format!("**Network:** {}\n", ssid));
                }
            }
            if state.get("ethernet").is_some_and(|e| e.active) {
                connected = true;
                out.push_str("**Ethernet:** Connected\n");
            }
            let interfaces: Vec<&String> = state
                .network
                .up
                .iter()
                .filter(|i| !state.network.vpn.contains(*i))
                .collect();
            if connected && !interfaces.is_empty() {
                let names: Vec<&str> = interfaces.iter().map(|s| s.as_str()).collect();
                out.push_str(&format!("**Interfaces:** {}\n", names.join(", ")));
            }
            if state.get("vpn").is_some_and(|v| v.active) {
                out.push_str(&format!("**VPN:** Active ({})\n", state.network.vpn.join(", ")));
            }
            (out, connected)
        };

        if !connected {
            out.push_str(
                "**Status:** No active network connections\n\n\
                 🔴 **Offline** - Check network settings or connections",
            );
            return out;
        }
        if let Some(target) = &self.connectivity_target {
            let connect = tokio::net::TcpStream::connect(target.as_str());
            let outcome = tokio::time::timeout(CONNECT_TIMEOUT, connect).await;
            let reachable = matches!(outcome, Ok(Ok(_)));
            if reachable {
                out.push_str("\n✅ **Internet connectivity verified**");
            } else {
                out.push_str("\n🟡 **Connected to network but no internet access**");
            }
        }
        out.trim_end().to_string()
    }

    async fn handle_volume(&self, matched: &IntentMatch<StatusIntent>) -> ShellResult<String> {
        let action = matched.entities.group(0);
        let mut prefix = String::new();
        if let Some(action) = action {
            let muted = self
                .state
                .lock()
                .get("volume")
                .is_some_and(|v| v.status == "muted");
            match action {
                "mute" | "unmute" => {
                    let want_muted = action == "mute";
                    if want_muted != muted {
                        self.control.toggle_mute().await?;
                    }
                    prefix = if want_muted {
                        "🔇 **Audio muted**\n\n"
                    } else {
                        "🔊 **Audio unmuted**\n\n"
                    }
                    .to_string();
                }
                "increase" | "raise" | "turn up" => {
                    self.control.adjust_volume(VOLUME_STEP).await?;
                    prefix = "🔊 **Volume increased**\n\n".to_string();
                }
                _ => {
                    self.control.adjust_volume(-VOLUME_STEP).await?;
                    prefix = "🔉 **Volume decreased**\n\n".to_string();
                }
            }
            let volume = self.control.volume().await;
            let now = Local::now().timestamp();
            if let (Some(volume), Some(indicator)) = (volume, self.state.lock().get_mut("volume")) {
                indicator.active = true;
                indicator.value = Some(IndicatorValue::Level(volume.percent as u32));
                indicator.status = if volume.muted { "muted" } else { "normal" }.to_string();
                indicator.last_updated = now;
            }
        }

        let state = self.state.lock();
        let Some(volume) = state.get("volume").filter(|v| v.active) else {
            return Ok(format!("{}🔊 **Volume control not available**", prefix));
        };
        let mut out = format!("{}🔊 **Volume Status:**\n\n", prefix);
        if let Some(level) = volume.level() {
            out.push_str(&format!("**Volume Level:** {}%\n", level));
        }
        out.push_str(&format!("**Status:** {}", title_case(&volume.status)));
        if volume.status == "muted" {
            out.push_str("\n\n🔇 **Audio is currently muted**");
        } else if let Some(level) = volume.level() {
            if level > 80 {
                out.push_str("\n\n🔊 **High volume**");
            } else if level < 20 {
                out.push_str("\n\n🔉 **Low volume**");
            }
        }
        Ok(out)
    }

    fn handle_overall(&self) -> String {
        let state = self.state.lock();
        let mut out = "📊 **PersonalAIOS System Status Overview**\n\n".to_string();

        let shown: Vec<&Indicator> =
            state.indicators.iter().filter(|i| i.visible && i.active).collect();
        let mut kinds: Vec<IndicatorType> = Vec::new();
        for indicator in &shown {
            if !kinds.contains(&indicator.kind) {
                kinds.push(indicator.kind);
            }
        }
        for kind in kinds {
            out.push_str(&format!("**{} {}:**\n", kind.icon(), kind.label()));
            for indicator in shown.iter().filter(|i| i.kind == kind) {
                let value = indicator
                    .display_value()
                    .map(|v| format!(" • {}", v))
                    .unwrap_or_default();
                let icon = if indicator.healthy() { "✅" } else { "⚠️" };
                out.push_str(&format!("  {} {}{}\n", icon, indicator.name, value));
            }
            out.push('\n');
        }

        out.push_str("**💻 Quick Summary:**\n");
        out.push_str(&format!("  • CPU: {:.1}% usage\n", state.system.cpu_percent));
        out.push_str(&format!("  • Memory: {:.1}% used\n", state.system.memory_percent()));
        if let Some(level) = state.get("battery").filter(|b| b.active).and_then(Indicator::level) {
            out.push_str(&format!("  • Battery: {}%\n", level));
        }
        out.push_str(&format!("  • Network: {}", state.network_label()));
        out
    }
}

fn title_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl IntentHandler for StatusArea {
    type Intent = StatusIntent;
    const NAME: &'static str = "status";
    const TITLE: &'static str = "system status";

    fn engine(&self) -> &IntentEngine<StatusIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<StatusIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        self.ensure_fresh().await;
        match matched.intent {
            StatusIntent::StatusQuery => self.handle_status_query(matched),
            StatusIntent::ToggleIndicator => self.handle_toggle(matched),
            StatusIntent::SystemAction => self.handle_system_action(matched).await,
            StatusIntent::PowerControl => Ok(self.handle_power()),
            StatusIntent::NetworkControl => Ok(self.handle_network().await),
            StatusIntent::VolumeControl => self.handle_volume(matched).await,
            StatusIntent::OverallStatus => Ok(self.handle_overall()),
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "📊 **Try these natural language system status commands:**",
            &[
                (
                    "Status Queries",
                    &["battery status", "network info", "volume level", "system overview"],
                ),
                (
                    "System Control",
                    &["set volume to 50%", "show cpu indicator", "is wifi connected?"],
                ),
                ("Power Management", &["how much battery left?", "power status", "is power okay?"]),
                ("Performance", &["cpu usage", "memory info", "storage space"]),
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

    fn status_area() -> (StatusArea, Arc<DryRunRunner>) {
        let runner = Arc::new(DryRunRunner::new());
        let area = StatusArea::new(
            SystemControl::with_sysfs(runner.clone(), "/nonexistent-sysfs"),
            Desktop::new(runner.clone()),
            MatchPolicy::BestMatch,
        )
        .unwrap()
        .with_connectivity_target(None);
        (area, runner)
    }

    fn laptop() -> StatusSample {
        StatusSample {
            network: NetworkState {
                wifi: vec!["wlan0".to_string()],
                ethernet: vec!["eth0".to_string()],
                vpn: Vec::new(),
                up: vec!["wlan0".to_string()],
            },
            wifi_signal: Some(76),
            wifi_ssid: Some("HomeNet".to_string()),
            battery: Some(BatteryInfo {
                percent: 57,
                status: "Discharging".to_string(),
            }),
            on_ac: false,
            volume: Some(VolumeState {
                percent: 40,
                muted: false,
            }),
            bluetooth: false,
            system: SystemSnapshot {
                cpu_percent: 12.5,
                memory_used_mb: 4096,
                memory_total_mb: 16384,
                storage_used_gb: 100.0,
                storage_total_gb: 400.0,
                ..SystemSnapshot::default()
            },
        }
    }

    #[test]
    fn test_indicator_lookup_order() {
        let (area, _) = status_area();
        let state = area.state.lock();
        assert_eq!(state.find("wifi").unwrap().id, "wifi");
        assert_eq!(state.find("Wi-Fi").unwrap().id, "wifi");
        assert_eq!(state.find("bat").unwrap().id, "battery");
        assert_eq!(state.find("ram").unwrap().id, "memory");
        assert_eq!(state.find("internet").unwrap().id, "wifi");
        assert_eq!(state.find("sound").unwrap().id, "volume");
        assert_eq!(state.find("storage space").unwrap().id, "storage");
        assert!(state.find("toaster").is_none());
    }

    #[tokio::test]
    async fn test_update_applies_sample() {
        let (area, _) = status_area();
        area.update(laptop()).await;

        let wifi = area.indicator("wifi").unwrap();
        assert!(wifi.active && wifi.visible);
        assert_eq!(wifi.level(), Some(76));
        assert!(!area.indicator("ethernet").unwrap().active);
        assert_eq!(area.indicator("battery").unwrap().status, "discharging");
        assert_eq!(
            area.indicator("power").unwrap().value,
            Some(IndicatorValue::Text("Battery".to_string()))
        );
        assert_eq!(area.indicator("memory").unwrap().level(), Some(25));
        assert!(!area.indicator("cpu").unwrap().visible);
        assert_eq!(area.summary_line(), "🔋 57% • 🌐 Wi-Fi Connected • 🔊 40%");
        assert_eq!(area.critical_indicators().len(), 1);
    }

    #[tokio::test]
    async fn test_status_queries() {
        let (area, _) = status_area();
        area.update(laptop()).await;

        let reply = area.process_command("what is the wifi status").await;
        assert!(reply.starts_with("📊 **Wi-Fi Status:**\n\n**Level:** 76%\n**Status:** Normal"));
        assert!(reply.ends_with("🟢 **Good signal strength**"));

        let reply = area.process_command("memory info").await;
        assert!(reply.contains("**Level:** 25%"));

        let reply = area.process_command("storage space").await;
        assert!(reply.starts_with("📊 **Storage Status:**"));

        let reply = area.process_command("is ethernet working").await;
        assert_eq!(reply, "📊 **Ethernet:** Not currently active or available");

        let reply = area.process_command("toaster status").await;
        assert!(reply.starts_with("🔍 **Status indicator not found:** 'toaster'"));
    }

    #[tokio::test]
    async fn test_power_and_network_replies() {
        let (area, _) = status_area();
        let mut sample = laptop();
        sample.battery = Some(BatteryInfo {
            percent: 15,
            status: "Discharging".to_string(),
        });
        area.update(sample).await;

        let reply = area.process_command("battery status").await;
        assert_eq!(
            reply,
            "🔋 **Power Status:**\n\n**Battery Level:** 15%\n**Status:** Discharging\n\
             **Power Source:** Battery\n\n🟡 **Low battery - consider charging soon**"
        );

        let reply = area.process_command("network info").await;
        assert_eq!(
            reply,
            "🌐 **Network Status:**\n\n**Wi-Fi:** Connected • Signal: 76%\n**Network:** HomeNet\n\
             **Interfaces:** wlan0"
        );

        let mut desktop = laptop();
        desktop.battery = None;
        desktop.network.up.clear();
        area.update(desktop).await;
        let reply = area.process_command("how much battery left").await;
        assert!(reply.starts_with("🔋 **Battery information not available**"));
        let reply = area.process_command("am i online").await;
        assert!(reply.ends_with("🔴 **Offline** - Check network settings or connections"));
    }

    #[tokio::test]
    async fn test_alerts_notify_once() {
        let (area, runner) = status_area();
        let mut sample = laptop();
        sample.battery = Some(BatteryInfo {
            percent: 8,
            status: "Discharging".to_string(),
        });
        sample.system.cpu_percent = 93.0;

        let raised = area.update(sample.clone()).await;
        let titles: Vec<&str> = raised.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Critical Battery Level", "High CPU Usage"]);
        let notices: Vec<_> = runner
            .invocations()
            .into_iter()
            .filter(|i| i.program == "notify-send")
            .collect();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].args.contains(&"--urgency=critical".to_string()));

        assert!(area.update(sample).await.is_empty());
        assert!(area.update(laptop()).await.is_empty());
        assert!(area.indicator("cpu").is_some_and(|c| !c.visible));
    }

    #[tokio::test]
    async fn test_toggle_indicator_survives_refresh() {
        let (area, _) = status_area();
        area.update(laptop()).await;

        let reply = area.process_command("show cpu indicator").await;
        assert_eq!(reply, "👁️ **CPU indicator shown**");
        area.update(laptop()).await;
        assert!(area.indicator("cpu").unwrap().visible);

        let reply = area.process_command("toggle the cpu indicator").await;
        assert_eq!(reply, "👁️ **CPU indicator hidden**");
    }

    #[tokio::test]
    async fn test_system_actions() {
        let (area, runner) = status_area();
        area.update(laptop()).await;

        let reply = area.process_command("set volume to 65%").await;
        assert_eq!(reply, "🔊 **Volume set to 65%**");
        assert!(runner
            .invocations()
            .iter()
            .any(|i| i.program == "pactl"
                && i.args == vec!["set-sink-volume", "@DEFAULT_SINK@", "65%"]));

        let reply = area.process_command("set brightness to 40").await;
        assert_eq!(reply, "⚠️ **Tool not available:** Brightness control not available");

        let reply = area.process_command("set volume to 400").await;
        assert_eq!(reply, "❌ **Invalid input:** Invalid volume value: 400");

        let reply = area.process_command("turn off bluetooth").await;
        assert_eq!(reply, "🔵 **Bluetooth turned off**");
        assert!(runner
            .invocations()
            .iter()
            .any(|i| i.program == "bluetoothctl" && i.args == vec!["power", "off"]));
    }

    #[tokio::test]
    async fn test_volume_control_and_overview() {
        let (area, runner) = status_area();
        area.update(laptop()).await;
        runner.respond(
            "pactl get-sink-volume @DEFAULT_SINK@",
            CommandOutput::ok("Volume: front-left: 26214 /  40% / -23.88 dB"),
        );
        runner.respond("pactl get-sink-mute @DEFAULT_SINK@", CommandOutput::ok("Mute: yes"));

        let reply = area.process_command("mute the volume").await;
        assert!(reply.starts_with("🔇 **Audio muted**\n\n🔊 **Volume Status:**"));
        assert!(reply.ends_with("🔇 **Audio is currently muted**"));
        assert!(runner.ran("pactl"));

        let reply = area.process_command("system overview").await;
        assert!(reply.starts_with(
            "📊 **PersonalAIOS System Status Overview**\n\n**🌐 Network:**\n  ✅ Wi-Fi • 76%"
        ));
        assert!(reply.contains("  ⚠️ Volume • 40%"));
        assert!(reply.ends_with("  • Battery: 57%\n  • Network: Wi-Fi Connected"));
    }

    #[tokio::test]
    async fn test_sample_devices_reads_sysfs_and_tools() {
        let root = tempfile::tempdir().unwrap();
        let bat = root.path().join("class/power_supply/BAT0");
        std::fs::create_dir_all(&bat).unwrap();
        std::fs::write(bat.join("capacity"), "88\n").unwrap();
        std::fs::write(bat.join("status"), "Charging\n").unwrap();
        let wlan = root.path().join("class/net/wlan0");
        std::fs::create_dir_all(&wlan).unwrap();
        std::fs::write(wlan.join("operstate"), "up").unwrap();

        let runner = Arc::new(DryRunRunner::new());
        runner.respond(
            "iwconfig",
            CommandOutput::ok("wlan0  ESSID:\"Cafe\"  Signal level=-55 dBm"),
        );
        runner.respond("bluetoothctl", CommandOutput::ok("Controller\n\tPowered: yes\n"));
        let area = StatusArea::new(
            SystemControl::with_sysfs(runner.clone(), root.path()),
            Desktop::new(runner.clone()),
            MatchPolicy::BestMatch,
        )
        .unwrap();

        let sample = area.sample_devices().await;
        assert_eq!(sample.wifi_signal, Some(90));
        assert_eq!(sample.wifi_ssid.as_deref(), Some("Cafe"));
        assert_eq!(sample.battery.as_ref().map(|b| b.percent), Some(88));
        assert!(sample.bluetooth);

        area.update(sample).await;
        assert_eq!(area.indicator("battery").unwrap().status, "charging");
        assert!(area.indicator("bluetooth").unwrap().visible);
    }
}
