//! Desktop operations - opening paths, launching applications, notifications.

use crate::runner::{try_in_order, CommandRunner, ExecResult, ExecutorError, Invocation};
use std::path::Path;
use std::sync::Arc;

/// Field codes from the desktop entry spec that are dropped from `Exec`.
const FIELD_CODES: &[&str] = &[
    "%f", "%F", "%u", "%U", "%i", "%c", "%k", "%d", "%D", "%n", "%N", "%v", "%m",
];

/// Split a desktop entry `Exec` line into argv, removing field codes.
/// Double-quoted arguments may contain spaces.
pub fn exec_argv(exec: &str) -> Vec<String> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for ch in exec.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    argv.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        argv.push(current);
    }

    argv.into_iter()
        .filter(|arg| !FIELD_CODES.contains(&arg.as_str()))
        .map(|arg| arg.replace("%%", "%"))
        .filter(|arg| !arg.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

fn validate_arg(arg: &str) -> ExecResult<()> {
    if arg.contains('\0') || arg.contains('\n') {
        return Err(ExecutorError::InvalidArgument(
            "argument contains invalid control characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct Desktop {
    runner: Arc<dyn CommandRunner>,
}

impl Desktop {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Open a file or directory with the default handler.
    pub async fn open_path(&self, path: &Path) -> ExecResult<Invocation> {
        let path = path.to_string_lossy().to_string();
        validate_arg(&path)?;
        try_in_order(
            self.runner.as_ref(),
            &[
                Invocation::new("xdg-open", [path.as_str()]),
                Invocation::new("gio", ["open", path.as_str()]),
            ],
        )
        .await
    }

    /// Launch an application: `gtk-launch`, then opening its desktop file,
    /// then running its `Exec` line directly.
    pub async fn launch(
        &self,
        desktop_id: &str,
        desktop_file: Option<&Path>,
        exec: Option<&str>,
    ) -> ExecResult<Invocation> {
        validate_arg(desktop_id)?;
        let mut chain = vec![Invocation::new("gtk-launch", [desktop_id])];

        if let Some(file) = desktop_file {
            let file = file.to_string_lossy().to_string();
            chain.push(Invocation::new("xdg-open", [file.as_str()]));
            chain.push(Invocation::new("gio", ["open", file.as_str()]));
        }

        if let Some(exec) = exec {
            let argv = exec_argv(exec);
            if let Some((program, args)) = argv.split_first() {
                chain.push(Invocation::detached(program, args.iter().cloned()));
            }
        }

        try_in_order(self.runner.as_ref(), &chain).await
    }

    pub async fn notify(&self, title: &str, body: &str, urgency: Urgency) -> ExecResult<()> {
        validate_arg(title)?;
        let args = vec![
            format!("--urgency={}", urgency.as_str()),
            "--app-name=PersonalAIOS".to_string(),
            title.to_string(),
            body.to_string(),
        ];
        self.runner.run_checked("notify-send", &args).await.map(|_| ())
    }
}
