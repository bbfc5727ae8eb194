//! System operations - volume, brightness, power, radios, sysfs readings.

use crate::runner::{try_in_order, CommandRunner, ExecResult, ExecutorError, Invocation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

const BACKLIGHTS: &[&str] = &["intel_backlight", "acpi_video0"];
const VPN_PREFIXES: &[&str] = &["tun", "tap", "vpn", "wg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeState {
    pub percent: u8,
    pub muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub percent: u8,
    /// `Charging`, `Discharging`, `Full` or `Unknown` as reported by sysfs.
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkState {
    pub wifi: Vec<String>,
    pub ethernet: Vec<String>,
    pub vpn: Vec<String>,
    /// Interfaces whose `operstate` is `up`.
    pub up: Vec<String>,
}

impl NetworkState {
    pub fn wifi_connected(&self) -> bool {
        self.wifi.iter().any(|i| self.up.contains(i))
    }

    pub fn ethernet_connected(&self) -> bool {
        self.ethernet.iter().any(|i| self.up.contains(i))
    }

    pub fn vpn_active(&self) -> bool {
        !self.vpn.is_empty()
    }
}

/// Parse the first `N%` in `pactl get-sink-volume` or `amixer get Master`.
pub fn parse_volume_percent(output: &str) -> Option<u8> {
    output.split(|c: char| c.is_whitespace() || c == '[' || c == ']' || c == '/').find_map(|token| {
        let number = token.strip_suffix('%')?;
        number.parse::<u32>().ok().map(|n| n.min(100) as u8)
    })
}

pub fn parse_signal_percent(output: &str) -> Option<u8> {
    let level = output.split("Signal level=").nth(1)?;
    let digits: String = level
        .chars()
        .take_while(|c| *c == '-' || c.is_ascii_digit())
        .collect();
    let dbm: i32 = digits.parse().ok()?;
    Some(((dbm + 100) * 2).clamp(0, 100) as u8)
}

#[derive(Clone)]
pub struct SystemControl {
    runner: Arc<dyn CommandRunner>,
    sysfs_root: PathBuf,
}

impl SystemControl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_sysfs(runner, "/sys")
    }

    /// Read sysfs from `root` instead of `/sys`.
    pub fn with_sysfs<P: AsRef<Path>>(runner: Arc<dyn CommandRunner>, root: P) -> Self {
        Self {
            runner,
            sysfs_root: root.as_ref().to_path_buf(),
        }
    }

    pub async fn volume(&self) -> Option<VolumeState> {
        let sink = "@DEFAULT_SINK@".to_string();
        let pactl = self
            .runner
            .run_checked("pactl", &["get-sink-volume".to_string(), sink.clone()])
            .await;
        if let Some(percent) = pactl.ok().as_deref().and_then(parse_volume_percent) {
            let muted = self
                .runner
                .run_checked("pactl", &["get-sink-mute".to_string(), sink])
                .await
                .map(|out| out.to_lowercase().contains("yes"))
                .unwrap_or(false);
            return Some(VolumeState { percent, muted });
        }

        let amixer = self
            .runner
            .run_checked("amixer", &["get".to_string(), "Master".to_string()])
            .await
            .ok()?;
        let percent = parse_volume_percent(&amixer)?;
        Some(VolumeState {
            percent,
            muted: amixer.contains("[off]"),
        })
    }

    pub async fn set_volume(&self, percent: u8) -> ExecResult<Invocation> {
        let level = format!("{}%", percent.min(100));
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("pactl", ["set-sink-volume", "@DEFAULT_SINK@", level.as_str()]),
                Invocation::new("amixer", ["set", "Master", level.as_str()]),
            ],
        )
        .await
    }

    /// Step the volume by `delta` percentage points.
    pub async fn adjust_volume(&self, delta: i16) -> ExecResult<Invocation> {
        let step = if delta >= 0 {
            format!("+{}%", delta)
        } else {
            format!("-{}%", delta.unsigned_abs())
        };
        let sign = if delta >= 0 { "+" } else { "-" };
        let amixer_step = format!("{}%{}", delta.unsigned_abs(), sign);
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("pactl", ["set-sink-volume", "@DEFAULT_SINK@", step.as_str()]),
                Invocation::new("amixer", ["set", "Master", amixer_step.as_str()]),
            ],
        )
        .await
    }

    pub async fn toggle_mute(&self) -> ExecResult<Invocation> {
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("pactl", ["set-sink-mute", "@DEFAULT_SINK@", "toggle"]),
                Invocation::new("amixer", ["set", "Master", "toggle"]),
            ],
        )
        .await
    }

    pub async fn bluetooth_powered(&self) -> bool {
        self.runner
            .run_checked("bluetoothctl", &["show".to_string()])
            .await
            .map(|out| out.contains("Powered: yes"))
            .unwrap_or(false)
    }

    pub async fn set_bluetooth(&self, on: bool) -> ExecResult<Invocation> {
        let state = if on { "on" } else { "off" };
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("bluetoothctl", ["power", state]),
                Invocation::new("rfkill", [if on { "unblock" } else { "block" }, "bluetooth"]),
            ],
        )
        .await
    }

    pub async fn set_wifi(&self, on: bool) -> ExecResult<Invocation> {
        let state = if on { "on" } else { "off" };
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("nmcli", ["radio", "wifi", state]),
                Invocation::new("rfkill", [if on { "unblock" } else { "block" }, "wifi"]),
            ],
        )
        .await
    }

    /// ESSID reported by `iwconfig`, if associated.
    pub async fn wifi_ssid(&self) -> Option<String> {
        let output = self.runner.run_checked("iwconfig", &[]).await.ok()?;
        output.lines().find_map(|line| {
            let essid = line.split("ESSID:").nth(1)?;
            let name = essid.split_whitespace().next()?.trim_matches('"');
            (!name.is_empty() && name != "off/any").then(|| name.to_string())
        })
    }

    /// Signal quality from `iwconfig`, mapping -100..-50 dBm onto 0..100.
    pub async fn wifi_signal(&self) -> Option<u8> {
        let output = self.runner.run_checked("iwconfig", &[]).await.ok()?;
        parse_signal_percent(&output)
    }

    pub async fn power_off(&self) -> ExecResult<Invocation> {
        let invocation = Invocation::new("systemctl", ["poweroff"]);
        self.runner.invoke(&invocation).await?;
        tracing::info!("Power action: {}", invocation);
        Ok(invocation)
    }

    /// Write a brightness percentage through the first writable backlight.
    pub async fn set_brightness(&self, percent: u8) -> ExecResult<PathBuf> {
        let percent = percent.min(100) as u64;
        let mut attempts = Vec::new();
        for name in BACKLIGHTS {
            let dir = self.sysfs_root.join("class/backlight").join(name);
            let max = match read_number(&dir.join("max_brightness")).await {
                Some(max) => max,
                None => {
                    attempts.push(format!("{}: unavailable", name));
                    continue;
                }
            };
            let value = max * percent / 100;
            let path = dir.join("brightness");
            match fs::write(&path, value.to_string()).await {
                Ok(()) => return Ok(path),
                Err(e) => attempts.push(format!("{}: {}", name, e)),
            }
        }
        Err(ExecutorError::AllFailed(attempts))
    }

    pub async fn battery(&self) -> Option<BatteryInfo> {
        let supplies = self.sysfs_root.join("class/power_supply");
        let mut entries = fs::read_dir(&supplies).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("BAT") {
                continue;
            }
            let Some(percent) = read_number(&entry.path().join("capacity")).await else {
                continue;
            };
            let status = fs::read_to_string(entry.path().join("status"))
                .await
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "Unknown".to_string());
            return Some(BatteryInfo {
                percent: percent.min(100) as u8,
                status,
            });
        }
        None
    }

    /// Whether any mains adapter reports `online`.
    pub async fn on_ac_power(&self) -> bool {
        let supplies = self.sysfs_root.join("class/power_supply");
        let Ok(mut entries) = fs::read_dir(&supplies).await else {
            return false;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("AC") || name.starts_with("ADP") {
                if read_number(&entry.path().join("online")).await == Some(1) {
                    return true;
                }
            }
        }
        false
    }

    pub async fn network(&self) -> NetworkState {
        let mut state = NetworkState::default();
        let Ok(mut entries) = fs::read_dir(self.sysfs_root.join("class/net")).await else {
            return state;
        };
        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
        names.sort();

        for (name, path) in names {
            if name == "lo" {
                continue;
            }
            if fs::read_to_string(path.join("operstate"))
                .await
                .map(|s| s.trim() == "up")
                .unwrap_or(false)
            {
                state.up.push(name.clone());
            }
            if name.starts_with("wl") {
                state.wifi.push(name);
            } else if name.starts_with("en") || name.starts_with("eth") {
                state.ethernet.push(name);
            } else if VPN_PREFIXES.iter().any(|p| name.starts_with(p)) {
                state.vpn.push(name);
            }
        }
        state
    }
}

async fn read_number(path: &Path) -> Option<u64> {
    fs::read_to_string(path).await.ok()?.trim().parse().ok()
}
