//! Window and workspace control through `wmctrl`, with `xdotool` fallbacks.

use crate::runner::{try_in_order, CommandRunner, ExecResult, Invocation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_SCREEN: (u32, u32) = (1920, 1080);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Hex id as printed by `wmctrl -l`, e.g. `0x03a00007`.
    pub id: String,
    /// Desktop index, `-1` for sticky windows.
    pub desktop: i32,
    pub host: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowTarget {
    Active,
    Id(String),
}

impl WindowTarget {
    /// `wmctrl` selector arguments ending with `flag`, e.g. `-r :ACTIVE:`.
    fn selector(&self, flag: &str) -> Vec<String> {
        match self {
            WindowTarget::Active => vec![flag.to_string(), ":ACTIVE:".to_string()],
            WindowTarget::Id(id) => vec!["-i".to_string(), flag.to_string(), id.clone()],
        }
    }

    /// `xdotool` window argument. Hex ids are converted to decimal.
    fn xdotool_window(&self) -> Option<String> {
        match self {
            WindowTarget::Active => None,
            WindowTarget::Id(id) => {
                let hex = id.trim_start_matches("0x");
                u64::from_str_radix(hex, 16).ok().map(|n| n.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parse `wmctrl -l` output.
pub fn parse_wmctrl_list(output: &str) -> Vec<WindowInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?.to_string();
            let desktop = parts.next()?.parse().ok()?;
            let host = parts.next().unwrap_or_default().to_string();
            let title = parts.collect::<Vec<_>>().join(" ");
            Some(WindowInfo {
                id,
                desktop,
                host,
                title,
            })
        })
        .collect()
}

/// Parse `xrandr` output for the current screen size.
pub fn parse_xrandr_size(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().find(|line| line.contains(" current "))?;
    let rest = line.split(" current ").nth(1)?;
    let mut parts = rest.split(',').next()?.split(" x ");
    let width = parts.next()?.trim().parse().ok()?;
    let height = parts.next()?.trim().parse().ok()?;
    Some((width, height))
}

#[derive(Clone)]
pub struct WindowControl {
    runner: Arc<dyn CommandRunner>,
}

impl WindowControl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn list_windows(&self) -> ExecResult<Vec<WindowInfo>> {
        match self.runner.run_checked("wmctrl", &["-l".to_string()]).await {
            Ok(output) => Ok(parse_wmctrl_list(&output)),
            Err(e) => {
                tracing::warn!("wmctrl listing failed, falling back to xdotool: {}", e);
                self.list_windows_xdotool().await
            }
        }
    }

    async fn list_windows_xdotool(&self) -> ExecResult<Vec<WindowInfo>> {
        let args: Vec<String> = ["search", "--onlyvisible", "--name", "."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ids = self.runner.run_checked("xdotool", &args).await?;

        let mut windows = Vec::new();
        for id in ids.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let title = self
                .runner
                .run_checked("xdotool", &["getwindowname".to_string(), id.to_string()])
                .await
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            let hex = id
                .parse::<u64>()
                .map(|n| format!("0x{:08x}", n))
                .unwrap_or_else(|_| id.to_string());
            windows.push(WindowInfo {
                id: hex,
                desktop: 0,
                host: String::new(),
                title,
            });
        }
        Ok(windows)
    }

    pub async fn active_window_id(&self) -> Option<String> {
        let output = self
            .runner
            .run_checked("xdotool", &["getactivewindow".to_string()])
            .await
            .ok()?;
        let id: u64 = output.trim().parse().ok()?;
        Some(format!("0x{:08x}", id))
    }

    async fn wmctrl_or_key(
        &self,
        target: &WindowTarget,
        flag: &str,
        rest: &[&str],
        key: &str,
    ) -> ExecResult<Invocation> {
        let mut args = target.selector(flag);
        args.extend(rest.iter().map(|s| s.to_string()));
        let mut chain = vec![Invocation::new("wmctrl", args)];
        if let Some(window) = target.xdotool_window() {
            chain.push(Invocation::new(
                "xdotool",
                ["windowactivate", "--sync", window.as_str(), "key", key],
            ));
        } else {
            chain.push(Invocation::new("xdotool", ["key", key]));
        }
        try_in_order(self.runner.as_ref(), &chain).await
    }

    pub async fn maximize(&self, target: &WindowTarget) -> ExecResult<Invocation> {
        self.wmctrl_or_key(target, "-r", &["-b", "add,maximized_vert,maximized_horz"], "super+Up")
            .await
    }

    pub async fn minimize(&self, target: &WindowTarget) -> ExecResult<Invocation> {
        self.wmctrl_or_key(target, "-r", &["-b", "add,hidden"], "super+h")
            .await
    }

    pub async fn close(&self, target: &WindowTarget) -> ExecResult<Invocation> {
        self.wmctrl_or_key(target, "-c", &[], "alt+F4").await
    }

    pub async fn focus(&self, target: &WindowTarget) -> ExecResult<Invocation> {
        let mut chain = vec![Invocation::new("wmctrl", target.selector("-a"))];
        if let Some(window) = target.xdotool_window() {
            chain.push(Invocation::new("xdotool", ["windowactivate", window.as_str()]));
        }
        try_in_order(self.runner.as_ref(), &chain).await
    }

    /// Add a `_NET_WM_STATE` property such as `above` or `sticky`.
    pub async fn add_state(&self, target: &WindowTarget, state: &str) -> ExecResult<Invocation> {
        let mut args = target.selector("-r");
        args.push("-b".to_string());
        args.push(format!("add,{}", state));
        try_in_order(self.runner.as_ref(), &[Invocation::new("wmctrl", args)]).await
    }

    /// Unmaximize, then place the window at `geometry`.
    pub async fn place(&self, target: &WindowTarget, geometry: Geometry) -> ExecResult<Invocation> {
        let mut unmax = target.selector("-r");
        unmax.extend(["-b", "remove,maximized_vert,maximized_horz"].map(String::from));
        // Best effort: some windows are not maximized.
        if let Err(e) = self.runner.run_checked("wmctrl", &unmax).await {
            tracing::debug!("unmaximize skipped: {}", e);
        }

        let mut place = target.selector("-r");
        place.push("-e".to_string());
        place.push(format!(
            "0,{},{},{},{}",
            geometry.x, geometry.y, geometry.width, geometry.height
        ));

        let size = [geometry.width.to_string(), geometry.height.to_string()];
        let position = [geometry.x.to_string(), geometry.y.to_string()];
        let xdotool_args: Vec<String> = match target.xdotool_window() {
            Some(window) => [
                vec!["windowsize".to_string(), window.clone()],
                size.to_vec(),
                vec!["windowmove".to_string(), window],
                position.to_vec(),
            ]
            .concat(),
            None => [
                vec!["getactivewindow".to_string(), "windowsize".to_string()],
                size.to_vec(),
                vec!["windowmove".to_string()],
                position.to_vec(),
            ]
            .concat(),
        };
        let chain = [
            Invocation::new("wmctrl", place),
            Invocation::new("xdotool", xdotool_args),
        ];
        try_in_order(self.runner.as_ref(), &chain).await
    }

    /// Switch to workspace `number` (1-based).
    pub async fn switch_workspace(&self, number: u32) -> ExecResult<Invocation> {
        let index = number.saturating_sub(1).to_string();
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("wmctrl", ["-s", index.as_str()]),
                Invocation::new("xdotool", ["set_desktop", index.as_str()]),
            ],
        )
        .await
    }

    /// Move the active window to workspace `number` (1-based).
    pub async fn move_active_to_workspace(&self, number: u32) -> ExecResult<Invocation> {
        let index = number.saturating_sub(1).to_string();
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("wmctrl", ["-r", ":ACTIVE:", "-t", index.as_str()]),
                Invocation::new(
                    "xdotool",
                    ["getactivewindow", "set_desktop_for_window", index.as_str()],
                ),
            ],
        )
        .await
    }

    /// Current workspace (1-based) and workspace count from `wmctrl -d`.
    pub async fn workspaces(&self) -> ExecResult<(u32, u32)> {
        let output = self.runner.run_checked("wmctrl", &["-d".to_string()]).await?;
        let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
        let current = lines
            .iter()
            .position(|line| line.split_whitespace().nth(1) == Some("*"))
            .map(|i| i as u32 + 1)
            .unwrap_or(1);
        Ok((current, lines.len().max(1) as u32))
    }

    pub async fn screen_size(&self) -> (u32, u32) {
        match self.runner.run_checked("xrandr", &[]).await {
            Ok(output) => parse_xrandr_size(&output).unwrap_or(DEFAULT_SCREEN),
            Err(e) => {
                tracing::debug!("xrandr unavailable, assuming {:?}: {}", DEFAULT_SCREEN, e);
                DEFAULT_SCREEN
            }
        }
    }
}
